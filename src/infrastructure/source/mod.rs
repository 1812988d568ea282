//! Byte sources for CSV content.
//!
//! A `Source` hands back the full raw bytes of one file; decoding to text is
//! a separate step so callers can pick the encoding per dataset.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use tracing::warn;

use crate::domain::error::{AppError, Result};

#[async_trait]
pub trait Source: Send + Sync {
    /// Read the complete content behind `source_id`
    async fn read_all(&self, source_id: &str) -> Result<Vec<u8>>;
}

/// Reads files from disk, optionally relative to a root directory
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    root: Option<PathBuf>,
}

impl FileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, source_id: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(source_id),
            None => PathBuf::from(source_id),
        }
    }
}

#[async_trait]
impl Source for FileSource {
    async fn read_all(&self, source_id: &str) -> Result<Vec<u8>> {
        let path = self.resolve(source_id);
        tokio::fs::read(&path).await.map_err(|e| {
            AppError::SourceUnavailable(format!("Failed to read {}: {}", path.display(), e))
        })
    }
}

/// In-memory source keyed by source id
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, source_id: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(source_id, content);
        self
    }

    pub fn insert(&mut self, source_id: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(source_id.into(), content.into());
    }
}

#[async_trait]
impl Source for MemorySource {
    async fn read_all(&self, source_id: &str) -> Result<Vec<u8>> {
        self.files
            .get(source_id)
            .cloned()
            .ok_or_else(|| AppError::SourceUnavailable(format!("No such source: {}", source_id)))
    }
}

/// Decode raw bytes with the given encoding label (default UTF-8).
/// A byte-order mark wins over the label and is stripped; malformed
/// sequences become U+FFFD instead of failing the job.
pub fn decode(bytes: &[u8], encoding_label: Option<&str>) -> Result<String> {
    let encoding = match encoding_label {
        Some(label) => Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
            AppError::ConfigError(format!("Unknown encoding label: {}", label))
        })?,
        None => UTF_8,
    };

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        warn!(encoding = used.name(), "Replaced malformed byte sequences while decoding");
    }

    Ok(text.into_owned())
}
