use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    SourceUnavailable(String),
    SchemaMismatch(String),
    ValidationError(String),
    ConfigError(String),
    ParseError(String),
    DatabaseError(String),
    IoError(String),
}

impl AppError {
    /// Short machine-friendly label used in logs and the runner summary.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Internal(_) => "internal",
            AppError::SourceUnavailable(_) => "source_unavailable",
            AppError::SchemaMismatch(_) => "schema_mismatch",
            AppError::ValidationError(_) => "validation",
            AppError::ConfigError(_) => "config",
            AppError::ParseError(_) => "parse",
            AppError::DatabaseError(_) => "database",
            AppError::IoError(_) => "io",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::SourceUnavailable(msg) => write!(f, "Source unavailable: {}", msg),
            AppError::SchemaMismatch(msg) => write!(f, "Schema mismatch: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
