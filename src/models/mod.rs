// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod cache;
mod config;
mod edital;
mod signature;

// Re-export all public types
pub use cache::CacheEntry;
pub use config::{
    CacheConfig, Config, CrawlerConfig, FeatureFlags, InterestArea, OcrConfig, PathsConfig,
    RelevanceProfile, SiteConfig, StructureConfig,
};
pub use edital::{
    BeneficiaryProfile, CollectionOutput, Complexity, Edital, EditalDetails, ExtractionMethod,
    KeyDates, Link, PdfDetails, Recommendation, Relevance, Requirement, SchedulePhase,
    StructureCheck, Values, format_brl,
};
pub use signature::{
    ChangeReport, ElementCountChange, ElementKey, SignatureRecord, StructureSignature, TagCounts,
};
