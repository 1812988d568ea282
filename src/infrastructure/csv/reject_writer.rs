// ============================================================
// REJECT WRITER
// ============================================================
// Persist rejected records to a CSV file for later inspection

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Writer, WriterBuilder};

use crate::domain::error::{AppError, Result};

pub struct RejectWriter {
    path: PathBuf,
    writer: Writer<File>,
    written: usize,
}

impl RejectWriter {
    /// Create (or truncate) the reject file and write its header
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::IoError(format!("Failed to create reject dir {}: {}", parent.display(), e))
            })?;
        }

        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .from_path(path)
            .map_err(|e| {
                AppError::IoError(format!("Failed to open reject file {}: {}", path.display(), e))
            })?;

        writer
            .write_record(["row_index", "line", "reason", "record"])
            .map_err(|e| AppError::IoError(format!("Failed to write reject header: {}", e)))?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            written: 0,
        })
    }

    pub fn write(&mut self, row_index: usize, line: usize, reason: &str, record: &str) -> Result<()> {
        self.writer
            .write_record([
                row_index.to_string().as_str(),
                line.to_string().as_str(),
                reason,
                record,
            ])
            .map_err(|e| {
                AppError::IoError(format!("Failed to write reject record to {}: {}", self.path.display(), e))
            })?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn finish(mut self) -> Result<usize> {
        self.writer
            .flush()
            .map_err(|e| AppError::IoError(format!("Failed to flush reject file: {}", e)))?;
        Ok(self.written)
    }
}
