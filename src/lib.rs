//! Quarterly ETL for the largest banks by market capitalisation: scrape the
//! ranked table, convert USD to the target currencies, write CSV and SQLite,
//! then run the report queries.

pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod load;
pub mod pipeline;
pub mod progress;
pub mod query;
pub mod report;
pub mod transform;
pub mod types;

pub use error::{EtlError, Result};
