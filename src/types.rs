// src/types.rs

use crate::error::{EtlError, Result};
use std::fmt;

pub const NAME_COLUMN: &str = "Name";
pub const USD_COLUMN: &str = "MC_USD_Billions";

/// Target currencies, in the order their columns appear in every sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Currency {
    Gbp,
    Eur,
    Inr,
}

impl Currency {
    pub const TARGETS: [Currency; 3] = [Currency::Gbp, Currency::Eur, Currency::Inr];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Gbp => "GBP",
            Currency::Eur => "EUR",
            Currency::Inr => "INR",
        }
    }

    /// Name of the derived column, e.g. `MC_GBP_Billion`.
    pub fn column(self) -> &'static str {
        match self {
            Currency::Gbp => "MC_GBP_Billion",
            Currency::Eur => "MC_EUR_Billion",
            Currency::Inr => "MC_INR_Billion",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One ranked row as scraped from the source table.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntity {
    pub name: String,
    /// `None` when the source cell held no parseable non-negative number.
    pub mc_usd_billions: Option<f64>,
}

impl RankedEntity {
    pub fn new(name: impl Into<String>, mc_usd_billions: Option<f64>) -> Self {
        Self {
            name: name.into(),
            mc_usd_billions,
        }
    }
}

/// Entities in source rank order. Built once from parsed rows, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntityTable {
    rows: Vec<RankedEntity>,
}

impl RankedEntityTable {
    /// Validates that at least one row carries a usable metric.
    pub fn new(rows: Vec<RankedEntity>) -> Result<Self> {
        if rows.is_empty() {
            return Err(EtlError::DataQuality("source table has no data rows".into()));
        }
        if rows.iter().all(|r| r.mc_usd_billions.is_none()) {
            return Err(EtlError::DataQuality(format!(
                "none of the {} rows has a numeric {}",
                rows.len(),
                USD_COLUMN
            )));
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[RankedEntity] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub name: String,
    pub mc_usd_billions: Option<f64>,
    /// Indexed in `Currency::TARGETS` order.
    converted: [Option<f64>; 3],
}

impl EnrichedRow {
    pub fn new(
        name: impl Into<String>,
        mc_usd_billions: Option<f64>,
        converted: [Option<f64>; 3],
    ) -> Self {
        Self {
            name: name.into(),
            mc_usd_billions,
            converted,
        }
    }

    pub fn value(&self, currency: Currency) -> Option<f64> {
        self.converted[currency.index()]
    }

    /// USD followed by every target currency, in column order.
    pub fn metrics(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        std::iter::once(self.mc_usd_billions).chain(self.converted.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnrichedTable {
    rows: Vec<EnrichedRow>,
}

impl EnrichedTable {
    pub fn new(rows: Vec<EnrichedRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[EnrichedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names shared by the CSV and database sinks.
    pub fn columns() -> Vec<&'static str> {
        let mut cols = vec![NAME_COLUMN, USD_COLUMN];
        cols.extend(Currency::TARGETS.iter().map(|c| c.column()));
        cols
    }
}
