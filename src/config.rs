// src/config.rs

use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf, time::Duration};
use tracing::debug;
use url::Url;

use crate::error::{EtlError, Result};
use crate::extract::ExtractionRules;
use crate::load::validate_table_name;
use crate::query::default_queries;

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Raw settings from one layer (YAML file, environment, CLI flags).
/// Every field is optional; layers are merged and then resolved.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub source_url: Option<String>,
    pub rates_path: Option<PathBuf>,
    pub csv_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub table_name: Option<String>,
    pub log_path: Option<PathBuf>,
    pub fetch_timeout_secs: Option<u64>,
    pub extraction: Option<ExtractionRules>,
    pub queries: Option<Vec<String>>,
}

impl Settings {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| EtlError::Config(format!("reading {}: {}", path.display(), e)))?;
        let settings: Settings = serde_yaml::from_str(&text)
            .map_err(|e| EtlError::Config(format!("parsing {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "loaded config file");
        Ok(settings)
    }

    /// Fields set in `over` win.
    pub fn merge(self, over: Settings) -> Settings {
        Settings {
            source_url: over.source_url.or(self.source_url),
            rates_path: over.rates_path.or(self.rates_path),
            csv_path: over.csv_path.or(self.csv_path),
            db_path: over.db_path.or(self.db_path),
            table_name: over.table_name.or(self.table_name),
            log_path: over.log_path.or(self.log_path),
            fetch_timeout_secs: over.fetch_timeout_secs.or(self.fetch_timeout_secs),
            extraction: over.extraction.or(self.extraction),
            queries: over.queries.or(self.queries),
        }
    }

    /// Everything a full ETL run needs. Missing keys are reported together.
    pub fn into_etl_config(self) -> Result<EtlConfig> {
        let mut missing = Vec::new();
        let source_url = require(self.source_url, "source_url", &mut missing);
        let rates_path = require(self.rates_path, "rates_path", &mut missing);
        let csv_path = require(self.csv_path, "csv_path", &mut missing);
        let db_path = require(self.db_path, "db_path", &mut missing);
        let table_name = require(self.table_name, "table_name", &mut missing);
        let log_path = require(self.log_path, "log_path", &mut missing);

        let (
            Some(source_url),
            Some(rates_path),
            Some(csv_path),
            Some(db_path),
            Some(table_name),
            Some(log_path),
        ) = (source_url, rates_path, csv_path, db_path, table_name, log_path)
        else {
            return Err(missing_error(&missing));
        };

        let source_url = Url::parse(&source_url)
            .map_err(|e| EtlError::Config(format!("source_url `{}`: {}", source_url, e)))?;
        let database = DatabaseConfig::new(db_path, table_name)?;
        let fetch_timeout = match self.fetch_timeout_secs.unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS) {
            0 => return Err(EtlError::Config("fetch_timeout_secs must be positive".into())),
            secs => Duration::from_secs(secs),
        };
        let queries = self
            .queries
            .unwrap_or_else(|| default_queries(&database.table_name));

        Ok(EtlConfig {
            source_url,
            rates_path,
            csv_path,
            database,
            log_path,
            fetch_timeout,
            extraction: self.extraction.unwrap_or_default(),
            queries,
        })
    }

    /// Just enough to query an existing database.
    pub fn into_query_config(self) -> Result<QueryConfig> {
        let mut missing = Vec::new();
        let db_path = require(self.db_path, "db_path", &mut missing);
        let table_name = require(self.table_name, "table_name", &mut missing);
        let (Some(db_path), Some(table_name)) = (db_path, table_name) else {
            return Err(missing_error(&missing));
        };
        let database = DatabaseConfig::new(db_path, table_name)?;
        let queries = self
            .queries
            .unwrap_or_else(|| default_queries(&database.table_name));
        Ok(QueryConfig { database, queries })
    }
}

fn require<T>(value: Option<T>, key: &'static str, missing: &mut Vec<&'static str>) -> Option<T> {
    if value.is_none() {
        missing.push(key);
    }
    value
}

fn missing_error(missing: &[&str]) -> EtlError {
    EtlError::Config(format!("missing required setting(s): {}", missing.join(", ")))
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub table_name: String,
}

impl DatabaseConfig {
    pub fn new(path: PathBuf, table_name: String) -> Result<Self> {
        validate_table_name(&table_name).map_err(EtlError::Config)?;
        Ok(Self { path, table_name })
    }
}

/// Validated configuration for one ETL run.
#[derive(Debug, Clone, PartialEq)]
pub struct EtlConfig {
    pub source_url: Url,
    pub rates_path: PathBuf,
    pub csv_path: PathBuf,
    pub database: DatabaseConfig,
    pub log_path: PathBuf,
    pub fetch_timeout: Duration,
    pub extraction: ExtractionRules,
    pub queries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryConfig {
    pub database: DatabaseConfig,
    pub queries: Vec<String>,
}
