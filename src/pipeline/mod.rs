//! Pipeline entry points.
//!
//! - `run_collector`: Walk the listing, notices and PDFs, then persist the collection
//! - `calculate_diff`: Compare a collection against the previous run

pub mod collect;
pub mod diff;

pub use collect::{RunSummary, run_collector};
pub use diff::{Diff, DiffResult, calculate_diff};
