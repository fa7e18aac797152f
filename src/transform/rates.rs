// src/transform/rates.rs

use csv::{ReaderBuilder, StringRecord};
use std::{collections::BTreeMap, path::Path};
use tracing::{debug, info, warn};

use crate::error::{error_chain, EtlError, Result};

/// Currency code → multiplier from USD. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RateTable {
    rates: BTreeMap<String, f64>,
}

impl RateTable {
    /// Build from `(code, rate)` pairs. Codes are upper-cased; on duplicates
    /// the first entry wins and later ones are logged and dropped.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut rates = BTreeMap::new();
        for (code, rate) in entries {
            let code = code.as_ref().trim().to_ascii_uppercase();
            if let Some(existing) = rates.get(&code) {
                warn!(currency = %code, kept = existing, ignored = rate, "duplicate rate ignored");
                continue;
            }
            rates.insert(code, rate);
        }
        Self { rates }
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Load a `Currency,Rate` CSV with a header row.
pub fn load_rates(path: impl AsRef<Path>) -> Result<RateTable> {
    let path = path.as_ref();
    let fail = |reason: String| EtlError::RateFile {
        path: path.to_path_buf(),
        reason,
    };

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| fail(error_chain(&e)))?;

    let headers = rdr.headers().map_err(|e| fail(error_chain(&e)))?.clone();
    let code_idx = column_index(&headers, "Currency").ok_or_else(|| fail("no `Currency` column".into()))?;
    let rate_idx = column_index(&headers, "Rate").ok_or_else(|| fail("no `Rate` column".into()))?;

    let mut entries = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| fail(error_chain(&e)))?;
        // header is line 1
        let line = i + 2;
        let code = record.get(code_idx).unwrap_or_default();
        if code.is_empty() {
            return Err(fail(format!("line {}: empty currency code", line)));
        }
        let raw = record.get(rate_idx).unwrap_or_default();
        let rate = raw
            .parse::<f64>()
            .ok()
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| fail(format!("line {}: rate `{}` for {} is not a positive number", line, raw, code)))?;
        debug!(currency = code, rate, "rate");
        entries.push((code.to_string(), rate));
    }

    let table = RateTable::from_entries(entries);
    info!(path = %path.display(), currencies = table.len(), "loaded exchange rates");
    Ok(table)
}

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("exchange_rate.csv");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_rates() {
        let tmp = tempdir().unwrap();
        let path = write(tmp.path(), "Currency,Rate\nEUR,0.93\nGBP,0.8\nINR,82.95\n");
        let rates = load_rates(&path).unwrap();
        assert_eq!(rates.len(), 3);
        assert_eq!(rates.get("GBP"), Some(0.8));
        assert_eq!(rates.get("INR"), Some(82.95));
    }

    #[test]
    fn first_duplicate_wins() {
        let tmp = tempdir().unwrap();
        let path = write(tmp.path(), "Currency,Rate\ngbp,0.8\nGBP,0.5\n");
        let rates = load_rates(&path).unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates.get("GBP"), Some(0.8));
    }

    #[test]
    fn columns_found_by_name() {
        let tmp = tempdir().unwrap();
        let path = write(tmp.path(), "Rate, Currency\n0.93, EUR\n");
        assert_eq!(load_rates(&path).unwrap().get("EUR"), Some(0.93));
    }

    #[test]
    fn rejects_bad_rates() {
        let tmp = tempdir().unwrap();
        for body in [
            "Currency,Rate\nGBP,abc\n",
            "Currency,Rate\nGBP,0\n",
            "Currency,Rate\nGBP,-1.2\n",
            "Currency,Rate\n,1.2\n",
            "Code,Rate\nGBP,1.2\n",
        ] {
            let path = write(tmp.path(), body);
            assert!(
                matches!(load_rates(&path), Err(EtlError::RateFile { .. })),
                "{body:?}"
            );
        }
    }

    #[test]
    fn missing_file() {
        let tmp = tempdir().unwrap();
        let err = load_rates(tmp.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, EtlError::RateFile { .. }));
    }
}
