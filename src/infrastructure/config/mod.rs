//! Runner configuration.
//!
//! Loaded from an optional TOML file merged with `INGEST_`-prefixed
//! environment variables (nested keys split on `__`, e.g.
//! `INGEST_MAX_CONNECTIONS=8`). A `.env` file is read first, and a plain
//! `DATABASE_URL` fills in the destination when nothing else sets it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use crate::domain::csv::{
    table_name_from_path, ColumnSpec, DatasetImportJob, LoaderConfig, ParsingConfig, SchemaPolicy,
};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::db::ConnectOptions;

pub const ENV_PREFIX: &str = "INGEST_";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(length(min = 1, message = "database_url must not be empty"))]
    pub database_url: String,

    #[validate(range(min = 1, max = 256))]
    pub max_connections: u32,

    #[validate(range(min = 1))]
    pub acquire_timeout_secs: u64,

    /// Resolves relative dataset paths
    pub data_dir: Option<PathBuf>,

    #[validate(nested)]
    pub datasets: Vec<DatasetConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://ingest.db".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 10,
            data_dir: None,
            datasets: Vec::new(),
        }
    }
}

/// One `[[datasets]]` entry
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatasetConfig {
    #[validate(length(min = 1, message = "dataset path must not be empty"))]
    pub path: String,

    /// Derived from the file name when absent
    pub table: Option<String>,

    /// Column declaration such as `"id:int!, url, likes:int"`
    pub columns: Option<String>,

    #[validate(range(min = 1))]
    pub target_count: Option<usize>,

    pub dedup_key: Option<String>,
    pub policy: SchemaPolicy,
    pub infer_types: bool,

    #[validate(range(min = 1))]
    pub infer_sample_rows: Option<usize>,

    pub encoding: Option<String>,
    pub reject_path: Option<PathBuf>,
    pub parsing: ParsingConfig,
    pub loader: LoaderConfig,
}

impl DatasetConfig {
    /// Build the import job this entry describes
    pub fn to_job(&self) -> Result<DatasetImportJob> {
        let table = self
            .table
            .clone()
            .unwrap_or_else(|| table_name_from_path(Path::new(&self.path)));

        let mut job = DatasetImportJob::new(self.path.clone(), table)
            .with_policy(self.policy)
            .with_parsing(self.parsing.clone())
            .with_loader(self.loader.clone());

        if let Some(declaration) = &self.columns {
            let columns = ColumnSpec::parse_list(declaration).map_err(|e| {
                AppError::ConfigError(format!("Invalid columns for {}: {}", self.path, e))
            })?;
            job = job.with_columns(columns);
        }
        if let Some(target) = self.target_count {
            job = job.with_target_count(target);
        }
        if let Some(key) = &self.dedup_key {
            job = job.with_dedup_key(key.clone());
        }
        if self.infer_types {
            job = job.with_type_inference(self.infer_sample_rows.unwrap_or(200));
        }
        if let Some(path) = &self.reject_path {
            job = job.with_reject_path(path.clone());
        }
        job.encoding = self.encoding.clone();

        job.validate()
            .map_err(|e| AppError::ValidationError(format!("{}: {}", self.path, e)))?;
        Ok(job)
    }
}

impl AppConfig {
    /// Load configuration from `path` (optional) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Ok(url) = std::env::var("DATABASE_URL") {
            figment = figment.merge(Serialized::default("database_url", url));
        }
        if let Some(path) = path {
            if !path.exists() {
                return Err(AppError::ConfigError(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::from_figment(figment)
    }

    /// Parse configuration from TOML text (environment ignored)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(content));
        Self::from_figment(figment)
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Failed to load config: {}", e)))?;

        config
            .validate()
            .map_err(|e| AppError::ValidationError(format!("Invalid config: {}", e)))?;

        debug!(
            datasets = config.datasets.len(),
            max_connections = config.max_connections,
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
        }
    }

    /// Import jobs for every configured dataset, paths resolved against `data_dir`
    pub fn jobs(&self) -> Result<Vec<DatasetImportJob>> {
        self.datasets
            .iter()
            .map(|dataset| {
                let mut job = dataset.to_job()?;
                if let Some(dir) = &self.data_dir {
                    let path = Path::new(&dataset.path);
                    if path.is_relative() {
                        job.source_id = dir.join(path).to_string_lossy().into_owned();
                    }
                }
                Ok(job)
            })
            .collect()
    }
}
