// src/extract/mod.rs

pub mod rules;

pub use rules::{ExtractionRules, FieldRule, Pick};

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::{info, instrument, warn};

use crate::error::{EtlError, Result};
use crate::types::{RankedEntity, RankedEntityTable};

/// Leading non-negative number, optionally with thousands separators.
static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9][0-9,]*(?:\.[0-9]+)?").expect("valid number regex"));

/// Parse the ranked table out of `html` according to `rules`.
///
/// Rows without data cells (headers, separators) are skipped. A row whose
/// metric does not parse is kept with a null metric.
#[instrument(level = "info", skip(html, rules), fields(bytes = html.len()))]
pub fn extract(html: &str, rules: &ExtractionRules) -> Result<RankedEntityTable> {
    let compiled = rules.compile()?;
    let doc = Html::parse_document(html);

    let body = doc.select(&compiled.table).next().ok_or_else(|| {
        EtlError::Parse(format!(
            "no element matches table selector `{}`",
            rules.table
        ))
    })?;

    let rows = body
        .select(&compiled.row)
        .enumerate()
        .filter_map(|(i, row)| {
            let cells: Vec<ElementRef<'_>> = row.select(&compiled.cell).collect();
            (!cells.is_empty()).then_some((i + 1, cells))
        })
        .map(|(row_no, cells)| {
            let name = compiled.name.read(row_no, &cells)?.ok_or_else(|| {
                EtlError::Parse(format!("row {}: name rule matched no text", row_no))
            })?;
            let raw_metric = compiled.metric.read(row_no, &cells)?;
            let metric = raw_metric.as_deref().and_then(parse_metric);
            if metric.is_none() {
                warn!(row = row_no, name = %name, raw = ?raw_metric, "metric not numeric; keeping row with null");
            }
            Ok(RankedEntity::new(name, metric))
        })
        .collect::<Result<Vec<_>>>()?;

    let table = RankedEntityTable::new(rows)?;
    info!(rows = table.len(), "extracted ranked table");
    Ok(table)
}

/// Leading numeric token of `raw`, commas removed.
pub fn parse_metric(raw: &str) -> Option<f64> {
    let token = LEADING_NUMBER.find(raw.trim())?.as_str().replace(',', "");
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
<h2>By market capitalization</h2>
<table class="wikitable">
<tbody>
<tr><th>Rank</th><th>Bank name</th><th>Market cap<br>(US$ billion)</th></tr>
<tr><td>1</td><td><span class="flagicon"><a href="/wiki/United_States" title="United States">US</a></span> <a href="/wiki/JPMorgan_Chase" title="JPMorgan Chase">JPMorgan Chase</a>
</td><td>432.92
</td></tr>
<tr><td>2</td><td><span class="flagicon"><a href="/wiki/United_States" title="United States">US</a></span> <a href="/wiki/Bank_of_America" title="Bank of America">Bank of America</a>
</td><td>231.52
</td></tr>
<tr><td>3</td><td><span class="flagicon"><a href="/wiki/China" title="China">CN</a></span> <a href="/wiki/ICBC" title="Industrial and Commercial Bank of China">Industrial and Commercial Bank of China</a>
</td><td>1,194.56[a]
</td></tr>
<tr><td>4</td><td><span class="flagicon"><a href="/wiki/UK" title="UK">UK</a></span> <a href="/wiki/HSBC" title="HSBC">HSBC</a>
</td><td>n/a
</td></tr>
</tbody>
</table>
<table><tbody><tr><td>other</td><td>table</td><td>1</td></tr></tbody></table>
</body></html>
"#;

    #[test]
    fn extracts_rows_in_document_order() {
        let table = extract(PAGE, &ExtractionRules::default()).unwrap();
        let got: Vec<(&str, Option<f64>)> = table
            .rows()
            .iter()
            .map(|r| (r.name.as_str(), r.mc_usd_billions))
            .collect();
        assert_eq!(
            got,
            vec![
                ("JPMorgan Chase", Some(432.92)),
                ("Bank of America", Some(231.52)),
                ("Industrial and Commercial Bank of China", Some(1194.56)),
                ("HSBC", None),
            ]
        );
    }

    #[test]
    fn no_table_body_is_parse_error() {
        let err = extract("<html><body><p>moved</p></body></html>", &ExtractionRules::default())
            .unwrap_err();
        assert!(matches!(err, EtlError::Parse(_)), "{err}");
    }

    #[test]
    fn implicit_tbody_still_matches() {
        let html = "<table><tr><td>1</td><td><a title=\"A\">A</a></td><td>12.5</td></tr></table>";
        let table = extract(html, &ExtractionRules::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].mc_usd_billions, Some(12.5));
    }

    #[test]
    fn missing_column_fails_loudly() {
        let html = "<table><tbody><tr><td>1</td><td><a title=\"A\">A</a></td></tr></tbody></table>";
        let err = extract(html, &ExtractionRules::default()).unwrap_err();
        assert!(err.to_string().contains("column 3"), "{err}");
    }

    #[test]
    fn name_selector_without_match_fails() {
        let html = "<table><tbody><tr><td>1</td><td>plain text</td><td>10</td></tr></tbody></table>";
        let err = extract(html, &ExtractionRules::default()).unwrap_err();
        assert!(err.to_string().contains("name rule"), "{err}");
    }

    #[test]
    fn all_unparseable_is_data_quality_error() {
        let html = "<table><tbody>\
            <tr><td>1</td><td><a title=\"A\">A</a></td><td>-</td></tr>\
            <tr><td>2</td><td><a title=\"B\">B</a></td><td>?</td></tr>\
            </tbody></table>";
        let err = extract(html, &ExtractionRules::default()).unwrap_err();
        assert!(matches!(err, EtlError::DataQuality(_)), "{err}");
    }

    #[test]
    fn header_only_table_is_data_quality_error() {
        let html = "<table><tbody><tr><th>Name</th></tr></tbody></table>";
        let err = extract(html, &ExtractionRules::default()).unwrap_err();
        assert!(matches!(err, EtlError::DataQuality(_)), "{err}");
    }

    #[test]
    fn attribute_rules() {
        let rules = ExtractionRules {
            name: FieldRule {
                column: 1,
                selector: Some("a".into()),
                pick: Pick::First,
                attr: Some("title".into()),
            },
            metric: FieldRule {
                column: 2,
                selector: Some("span.cap".into()),
                pick: Pick::First,
                attr: Some("data-value".into()),
            },
            ..ExtractionRules::default()
        };
        let html = r#"<table><tbody><tr>
            <td><a title="Full Name">Short</a></td>
            <td><span class="cap" data-value="12.5">12.5 bn</span></td>
        </tr></tbody></table>"#;
        let table = extract(html, &rules).unwrap();
        assert_eq!(table.rows(), &[RankedEntity::new("Full Name", Some(12.5))]);
    }

    #[test]
    fn metric_tokens() {
        assert_eq!(parse_metric(" 432.92\n"), Some(432.92));
        assert_eq!(parse_metric("2,000"), Some(2000.0));
        assert_eq!(parse_metric("17.5[3]"), Some(17.5));
        assert_eq!(parse_metric("-3.0"), None);
        assert_eq!(parse_metric("approx 3"), None);
        assert_eq!(parse_metric(""), None);
    }
}
