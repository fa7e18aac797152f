// src/query.rs

use rusqlite::{types::Value, Connection, OpenFlags};
use std::{fmt, path::Path};
use tracing::{debug, instrument};

use crate::error::{EtlError, Result};
use crate::report::{bordered_table, format_float};

/// The queries run after every load unless the configuration replaces them.
pub fn default_queries(table_name: &str) -> Vec<String> {
    vec![
        format!("SELECT * FROM {}", table_name),
        format!("SELECT AVG(MC_GBP_Billion) FROM {}", table_name),
        format!("SELECT Name FROM {} LIMIT 5", table_name),
    ]
}

/// Result set of one statement, ready to print.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedResult {
    pub statement: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RenderedResult {
    /// Values of one column, by name.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }
}

impl fmt::Display for RenderedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numeric: Vec<bool> = (0..self.columns.len())
            .map(|i| {
                self.rows
                    .iter()
                    .any(|r| matches!(r[i], Value::Integer(_) | Value::Real(_)))
            })
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|r| r.iter().map(render_value).collect::<Vec<_>>());
        writeln!(f, "{} :", self.statement)?;
        write!(f, "{}", bordered_table(self.columns.as_slice(), rows, &numeric))
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => format_float(*r),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

/// Open an already loaded database read-only. A missing file is a
/// configuration problem, not an empty result.
pub fn open_report_database(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        return Err(EtlError::Config(format!(
            "database {} does not exist; run the ETL first",
            path.display()
        )));
    }
    Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(|e| {
        EtlError::Query {
            statement: format!("open {}", path.display()),
            reason: e.to_string(),
        }
    })
}

/// Run one read-only statement. Anything SQLite says might write is refused
/// before it executes.
#[instrument(level = "info", skip(conn))]
pub fn run_query(statement: &str, conn: &Connection) -> Result<RenderedResult> {
    let fail = |reason: String| EtlError::Query {
        statement: statement.to_string(),
        reason,
    };

    let mut stmt = conn.prepare(statement).map_err(|e| fail(e.to_string()))?;
    if !stmt.readonly() {
        return Err(fail("statement is not read-only".into()));
    }
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([]).map_err(|e| fail(e.to_string()))?;
    while let Some(row) = cursor.next().map_err(|e| fail(e.to_string()))? {
        let values = (0..columns.len())
            .map(|i| row.get::<_, Value>(i))
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| fail(e.to_string()))?;
        rows.push(values);
    }
    debug!(rows = rows.len(), "query complete");

    Ok(RenderedResult {
        statement: statement.to_string(),
        columns,
        rows,
    })
}
