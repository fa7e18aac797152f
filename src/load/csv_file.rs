// src/load/csv_file.rs

use csv::{ReaderBuilder, WriterBuilder};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, instrument};

use crate::error::{error_chain, EtlError, Result};
use crate::report::format_metric;
use crate::types::{EnrichedRow, EnrichedTable};

/// Write `table` with a header row and a leading 0-based index column.
///
/// The file is staged next to `path` and renamed over it, so an existing
/// report is either left alone or fully replaced.
#[instrument(level = "info", skip(table), fields(rows = table.len()))]
pub fn write_csv(table: &EnrichedTable, path: &Path) -> Result<()> {
    let dir = staging_dir(path);
    let sink = |e: &dyn std::error::Error| EtlError::SinkWrite {
        target: path.display().to_string(),
        reason: error_chain(e),
    };

    let mut staged = NamedTempFile::new_in(&dir).map_err(|e| sink(&e))?;
    {
        let mut wtr = WriterBuilder::new().from_writer(staged.as_file_mut());

        let mut header = vec![""];
        header.extend(EnrichedTable::columns());
        wtr.write_record(&header).map_err(|e| sink(&e))?;

        for (i, row) in table.rows().iter().enumerate() {
            let mut record = vec![i.to_string(), row.name.clone()];
            record.extend(row.metrics().map(format_metric));
            wtr.write_record(&record).map_err(|e| sink(&e))?;
        }
        wtr.flush().map_err(|e| sink(&e))?;
    }
    staged.as_file_mut().sync_all().map_err(|e| sink(&e))?;
    staged.persist(path).map_err(|e| sink(&e))?;

    info!(path = %path.display(), "wrote CSV");
    Ok(())
}

/// Read a file produced by [`write_csv`] back into a table, dropping the
/// index column.
pub fn read_csv(path: &Path) -> Result<EnrichedTable> {
    let fail = |reason: String| EtlError::Parse(format!("{}: {}", path.display(), reason));

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| fail(error_chain(&e)))?;

    let headers = rdr.headers().map_err(|e| fail(error_chain(&e)))?;
    let expected = EnrichedTable::columns();
    let found: Vec<&str> = headers.iter().skip(1).collect();
    if found != expected {
        return Err(fail(format!("unexpected header {:?}", found)));
    }

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| fail(error_chain(&e)))?;
        let line = i + 2;
        let mut metrics = [None; 4];
        for (slot, raw) in metrics.iter_mut().zip(record.iter().skip(2)) {
            *slot = parse_optional(raw)
                .map_err(|_| fail(format!("line {}: `{}` is not a number", line, raw)))?;
        }
        let name = record.get(1).unwrap_or_default();
        let [usd, converted @ ..] = metrics;
        rows.push(EnrichedRow::new(name, usd, converted));
    }
    Ok(EnrichedTable::new(rows))
}

fn parse_optional(raw: &str) -> std::result::Result<Option<f64>, std::num::ParseFloatError> {
    let raw = raw.trim();
    if raw.is_empty() {
        Ok(None)
    } else {
        raw.parse().map(Some)
    }
}

fn staging_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
