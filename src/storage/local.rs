//! Local filesystem storage implementation.
//!
//! A directory of JSON documents addressed by relative keys. Writes go to a
//! `.tmp` sibling first and are renamed into place, so readers never observe
//! a partially written file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{CollectionOutput, SignatureRecord};
use crate::storage::{EditalStorage, SignatureStore, WriteMetadata};
use crate::utils::url_key;

const COLLECTION_KEY: &str = "editais.json";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    pub async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    pub async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    pub async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    pub async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Keys and sizes of the `.json` files directly under the root.
    pub async fn list_json(&self) -> Result<Vec<(String, u64)>> {
        let mut entries = match tokio::fs::read_dir(&self.root_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".json") {
                continue;
            }
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                files.push((name, metadata.len()));
            }
        }
        files.sort();
        Ok(files)
    }

    /// Key of the signature record for `url`.
    fn signature_key(url: &str) -> String {
        format!("{}.json", url_key(url))
    }
}

#[async_trait]
impl SignatureStore for LocalStorage {
    async fn load_signature(&self, url: &str) -> Result<Option<SignatureRecord>> {
        self.read_json(&Self::signature_key(url)).await
    }

    async fn save_signature(&self, record: &SignatureRecord) -> Result<()> {
        self.write_json(&Self::signature_key(&record.url), record)
            .await
    }
}

#[async_trait]
impl EditalStorage for LocalStorage {
    async fn write_collection(&self, output: &CollectionOutput) -> Result<WriteMetadata> {
        self.write_json(COLLECTION_KEY, output).await?;
        log::info!(
            "{} editais written to {}",
            output.count,
            self.path(COLLECTION_KEY).display()
        );

        Ok(WriteMetadata {
            count: output.count,
            location: self.path(COLLECTION_KEY).display().to_string(),
            timestamp: Utc::now(),
        })
    }

    async fn load_collection(&self) -> Result<Option<CollectionOutput>> {
        let collection = self.read_json(COLLECTION_KEY).await?;
        if collection.is_none() {
            log::debug!("No {} found under {}", COLLECTION_KEY, self.root_dir.display());
        }
        Ok(collection)
    }
}
