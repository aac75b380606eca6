//! Service layer for the harvester.
//!
//! This module contains the business logic for:
//! - Page fetching with retries (`HttpFetcher`)
//! - Structure fingerprinting and drift detection (`Fingerprinter`, `StructureMonitor`)
//! - Listing and notice page parsing (`ListingParser`)
//! - PDF text extraction with OCR fallback (`PopplerExtractor`)
//! - Field extraction from notice documents (`FieldExtractor`)
//! - Relevance scoring (`RelevanceScorer`)

pub mod extraction;
pub mod fetch;
pub mod fingerprint;
pub mod listing;
pub mod pdf;
pub mod relevance;
pub mod structure;

pub use extraction::FieldExtractor;
pub use fetch::{Fetcher, HttpFetcher};
pub use fingerprint::{Fingerprinter, MarkupDocument};
pub use listing::ListingParser;
pub use pdf::{PdfText, PdfTextExtractor, PopplerExtractor};
pub use relevance::RelevanceScorer;
pub use structure::StructureMonitor;
