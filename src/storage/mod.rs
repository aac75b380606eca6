//! Storage abstractions.
//!
//! Three kinds of data are persisted, each in its own directory:
//!
//! ```text
//! cache_estrutura/          # one SignatureRecord per URL hash
//! │   └── <url_key>.json
//! cache_resultados/         # one CacheEntry per URL hash
//! │   └── <url_key>.json
//! output/
//!     └── editais.json      # the latest CollectionOutput
//! ```
//!
//! Every file is written atomically (temp file, then rename).

pub mod cache;
pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{CollectionOutput, SignatureRecord};

// Re-export for convenience
pub use cache::{CacheStats, ResultCache};
pub use local::LocalStorage;

/// Metadata about a collection write.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// Number of editais written
    pub count: usize,
    /// Where they were written
    pub location: String,
    /// Timestamp of the write
    pub timestamp: DateTime<Utc>,
}

/// Persistence of the last structurally distinct signature per URL.
#[async_trait]
pub trait SignatureStore: Send + Sync {
    /// Load the record for `url`, if one was ever saved.
    async fn load_signature(&self, url: &str) -> Result<Option<SignatureRecord>>;

    /// Save `record`, replacing any previous record for the same URL.
    async fn save_signature(&self, record: &SignatureRecord) -> Result<()>;
}

/// Persistence of harvested editais.
#[async_trait]
pub trait EditalStorage: Send + Sync {
    /// Replace the stored collection with `output`.
    async fn write_collection(&self, output: &CollectionOutput) -> Result<WriteMetadata>;

    /// Load the collection written by the previous run.
    async fn load_collection(&self) -> Result<Option<CollectionOutput>>;
}
