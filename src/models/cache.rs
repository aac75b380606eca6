// src/models/cache.rs

//! Result cache entry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A cached payload, stored one file per URL hash.
///
/// `content` is opaque to the cache and written through verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry<T> {
    pub url: String,

    /// When the payload was stored
    #[serde(rename = "timestamp")]
    pub stored_at: DateTime<Utc>,

    pub content: T,
}

impl<T> CacheEntry<T> {
    pub fn new(url: impl Into<String>, content: T, stored_at: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            stored_at,
            content,
        }
    }

    /// Fresh while `now - stored_at < ttl`.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.stored_at) < ttl
    }
}
