// src/report.rs

use prettytable::{format, Cell, Row, Table};

use crate::types::{EnrichedTable, RankedEntityTable, NAME_COLUMN, USD_COLUMN};

/// Shortest round-trip form, always with a decimal point (`80.0`).
pub fn format_float(value: f64) -> String {
    format!("{:?}", value)
}

pub(crate) fn format_metric(value: Option<f64>) -> String {
    value.map(format_float).unwrap_or_default()
}

/// Box-drawn table with a title row. Cells in `right_aligned` columns are
/// right aligned.
pub fn bordered_table<H, R>(headers: &[H], rows: R, right_aligned: &[bool]) -> Table
where
    H: AsRef<str>,
    R: IntoIterator<Item = Vec<String>>,
{
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(Row::new(
        headers
            .iter()
            .map(|h| Cell::new(h.as_ref()).style_spec("b"))
            .collect(),
    ));
    for values in rows {
        let cells = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                if right_aligned.get(i).copied().unwrap_or(false) {
                    Cell::new(v).style_spec("r")
                } else {
                    Cell::new(v)
                }
            })
            .collect();
        table.add_row(Row::new(cells));
    }
    table
}

/// Extracted table with its 0-based row index, for operator inspection.
pub fn ranked_table(table: &RankedEntityTable) -> Table {
    let rows = table.rows().iter().enumerate().map(|(i, r)| {
        vec![i.to_string(), r.name.clone(), format_metric(r.mc_usd_billions)]
    });
    bordered_table(&["", NAME_COLUMN, USD_COLUMN], rows, &[true, false, true])
}

pub fn enriched_table(table: &EnrichedTable) -> Table {
    let mut headers = vec![""];
    headers.extend(EnrichedTable::columns());
    let mut align = vec![true, false];
    align.resize(headers.len(), true);

    let rows = table.rows().iter().enumerate().map(|(i, r)| {
        let mut values = vec![i.to_string(), r.name.clone()];
        values.extend(r.metrics().map(format_metric));
        values
    });
    bordered_table(headers.as_slice(), rows, &align)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnrichedRow, RankedEntity};

    #[test]
    fn floats_keep_a_decimal_point() {
        assert_eq!(format_float(80.0), "80.0");
        assert_eq!(format_float(35910.71), "35910.71");
        assert_eq!(format_metric(None), "");
    }

    #[test]
    fn renders_headers_and_values() {
        let ranked = RankedEntityTable::new(vec![RankedEntity::new("Bank A", Some(100.0))]).unwrap();
        let text = ranked_table(&ranked).to_string();
        assert!(text.contains("MC_USD_Billions"));
        assert!(text.contains("Bank A"));
        assert!(text.contains("100.0"));

        let enriched = EnrichedTable::new(vec![EnrichedRow::new(
            "Bank A",
            Some(100.0),
            [Some(80.0), Some(93.0), None],
        )]);
        let text = enriched_table(&enriched).to_string();
        assert!(text.contains("MC_INR_Billion"));
        assert!(text.contains("93.0"));
        assert!(text.contains('┃') || text.contains('│'));
    }
}
