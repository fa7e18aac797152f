// src/transform/mod.rs

pub mod rates;

pub use rates::{load_rates, RateTable};

use tracing::{info, instrument};

use crate::error::{EtlError, Result};
use crate::types::{Currency, EnrichedRow, EnrichedTable, RankedEntityTable};

/// Round to 2 decimal places, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Add one converted column per target currency. Every required rate is
/// resolved before any row is touched.
#[instrument(level = "info", skip_all, fields(rows = table.len()))]
pub fn transform(table: &RankedEntityTable, rates: &RateTable) -> Result<EnrichedTable> {
    let mut multipliers = [0.0; 3];
    for (slot, currency) in multipliers.iter_mut().zip(Currency::TARGETS) {
        *slot = rates
            .get(currency.code())
            .ok_or_else(|| EtlError::MissingRate(currency.code().to_string()))?;
    }

    let rows = table
        .rows()
        .iter()
        .map(|entity| {
            let converted = multipliers.map(|m| entity.mc_usd_billions.map(|usd| round2(usd * m)));
            EnrichedRow::new(entity.name.clone(), entity.mc_usd_billions, converted)
        })
        .collect();

    let enriched = EnrichedTable::new(rows);
    info!(
        currencies = ?Currency::TARGETS.map(Currency::code),
        "converted market caps"
    );
    Ok(enriched)
}
