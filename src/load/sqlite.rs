// src/load/sqlite.rs

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{info, instrument};

use crate::error::{EtlError, Result};
use crate::types::{Currency, EnrichedTable, NAME_COLUMN, USD_COLUMN};

/// Open the database file, creating it if it doesn't exist.
pub fn open_database(path: &Path) -> Result<Connection> {
    Connection::open(path).map_err(|e| EtlError::sink(path.display(), e))
}

static TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid table name regex"));

/// Table names must be plain identifiers: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_table_name(name: &str) -> std::result::Result<(), String> {
    if TABLE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(format!("`{}` is not a valid table name", name))
    }
}

/// Replace `table_name` wholesale with the contents of `table`.
///
/// Drop, create and insert run in one transaction, so a concurrent reader sees
/// either the previous table or the new one.
#[instrument(level = "info", skip(table, conn), fields(rows = table.len()))]
pub fn write_table(table: &EnrichedTable, conn: &mut Connection, table_name: &str) -> Result<()> {
    validate_table_name(table_name).map_err(|reason| EtlError::SinkWrite {
        target: table_name.to_string(),
        reason,
    })?;
    let fail = |e: rusqlite::Error| EtlError::sink(format!("table {}", table_name), e);

    let mut columns = vec![format!("\"{}\" TEXT", NAME_COLUMN), format!("\"{}\" REAL", USD_COLUMN)];
    columns.extend(Currency::TARGETS.iter().map(|c| format!("\"{}\" REAL", c.column())));

    let tx = conn.transaction().map_err(fail)?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS \"{t}\"; CREATE TABLE \"{t}\" ({cols});",
        t = table_name,
        cols = columns.join(", ")
    ))
    .map_err(fail)?;
    {
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO \"{}\" VALUES (?1, ?2, ?3, ?4, ?5)",
                table_name
            ))
            .map_err(fail)?;
        for row in table.rows() {
            let [gbp, eur, inr] = Currency::TARGETS.map(|c| row.value(c));
            stmt.execute(params![row.name, row.mc_usd_billions, gbp, eur, inr])
                .map_err(fail)?;
        }
    }
    tx.commit().map_err(fail)?;

    info!(table = table_name, "replaced database table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EnrichedRow;
    use tempfile::tempdir;

    fn table(n: usize) -> EnrichedTable {
        EnrichedTable::new(
            (0..n)
                .map(|i| {
                    let usd = 100.0 + i as f64;
                    EnrichedRow::new(format!("Bank {}", i), Some(usd), [Some(usd * 0.5), Some(usd), None])
                })
                .collect(),
        )
    }

    fn dump(conn: &Connection) -> Vec<(String, Option<f64>, Option<f64>)> {
        let mut stmt = conn
            .prepare("SELECT Name, MC_USD_Billions, MC_INR_Billion FROM Largest_banks")
            .unwrap();
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .unwrap();
        let out = rows.map(Result::unwrap).collect();
        out
    }

    #[test]
    fn repeated_loads_do_not_duplicate() {
        let tmp = tempdir().unwrap();
        let mut conn = open_database(&tmp.path().join("Banks.db")).unwrap();
        let data = table(10);

        write_table(&data, &mut conn, "Largest_banks").unwrap();
        let once = dump(&conn);
        write_table(&data, &mut conn, "Largest_banks").unwrap();
        let twice = dump(&conn);

        assert_eq!(once.len(), 10);
        assert_eq!(once, twice);
        assert_eq!(once[0], ("Bank 0".to_string(), Some(100.0), None));
    }

    #[test]
    fn replaces_rather_than_appends() {
        let tmp = tempdir().unwrap();
        let mut conn = open_database(&tmp.path().join("Banks.db")).unwrap();
        write_table(&table(10), &mut conn, "Largest_banks").unwrap();
        write_table(&table(3), &mut conn, "Largest_banks").unwrap();
        assert_eq!(dump(&conn).len(), 3);
    }

    #[test]
    fn persists_across_connections() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("Banks.db");
        {
            let mut conn = open_database(&path).unwrap();
            write_table(&table(2), &mut conn, "Largest_banks").unwrap();
        }
        let conn = open_database(&path).unwrap();
        assert_eq!(dump(&conn).len(), 2);
    }

    #[test]
    fn rejects_injection_in_table_name() {
        let mut conn = Connection::open_in_memory().unwrap();
        for bad in ["", "1abc", "banks; DROP TABLE x", "a\"b", "naïve", "banks\n"] {
            assert!(
                matches!(write_table(&table(1), &mut conn, bad), Err(EtlError::SinkWrite { .. })),
                "{bad}"
            );
        }
        validate_table_name("_Largest_banks2").unwrap();
    }
}
