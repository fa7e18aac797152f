// src/error.rs

use std::{error::Error as StdError, path::PathBuf};
use thiserror::Error;

pub type Result<T, E = EtlError> = std::result::Result<T, E>;

/// Every way a run can fail. None of these are retried.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("fetching {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("unexpected document structure: {0}")]
    Parse(String),

    #[error("no usable data: {0}")]
    DataQuality(String),

    #[error("exchange rate for {0} missing from rate table")]
    MissingRate(String),

    #[error("rate table {}: {reason}", path.display())]
    RateFile { path: PathBuf, reason: String },

    #[error("writing {target}: {reason}")]
    SinkWrite { target: String, reason: String },

    #[error("query `{statement}` failed: {reason}")]
    Query { statement: String, reason: String },

    #[error("configuration: {0}")]
    Config(String),
}

impl EtlError {
    /// Process exit status for this failure class, so a scheduler can tell
    /// extraction, transform, load and query failures apart.
    pub fn exit_code(&self) -> u8 {
        match self {
            EtlError::Config(_) => 1,
            EtlError::Fetch { .. } | EtlError::Parse(_) | EtlError::DataQuality(_) => 2,
            EtlError::MissingRate(_) | EtlError::RateFile { .. } => 3,
            EtlError::SinkWrite { .. } => 4,
            EtlError::Query { .. } => 5,
        }
    }

    pub(crate) fn sink(target: impl std::fmt::Display, err: impl StdError) -> Self {
        EtlError::SinkWrite {
            target: target.to_string(),
            reason: error_chain(&err),
        }
    }
}

/// Render an error and all of its sources as `outer: inner: ...`.
pub(crate) fn error_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut cur = err.source();
    while let Some(src) = cur {
        let msg = src.to_string();
        // reqwest and io errors often repeat their source verbatim
        if !out.ends_with(&msg) {
            out.push_str(": ");
            out.push_str(&msg);
        }
        cur = src.source();
    }
    out
}
