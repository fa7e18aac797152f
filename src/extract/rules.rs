// src/extract/rules.rs

use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, Result};

/// The extraction contract: where each field of a ranked row lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionRules {
    /// First element matching this selector is the table body.
    pub table: String,
    pub row: String,
    pub cell: String,
    pub name: FieldRule,
    pub metric: FieldRule,
}

impl Default for ExtractionRules {
    /// Layout of the "By market capitalization" table on Wikipedia's
    /// list of largest banks. The HTML parser inserts an implicit `<tbody>`
    /// into every `<table>`, so the `tbody` selector also matches markup
    /// that never spells one out.
    fn default() -> Self {
        Self {
            table: "tbody".into(),
            row: "tr".into(),
            cell: "td".into(),
            name: FieldRule {
                column: 2,
                selector: Some("a[title]".into()),
                pick: Pick::Last,
                attr: None,
            },
            metric: FieldRule {
                column: 3,
                selector: None,
                pick: Pick::First,
                attr: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldRule {
    /// 1-based cell position within the row.
    pub column: usize,
    /// Element inside the cell to read; the cell itself when absent.
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub pick: Pick,
    /// Read this attribute instead of the element text.
    #[serde(default)]
    pub attr: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pick {
    #[default]
    First,
    Last,
}

pub(crate) struct CompiledRules {
    pub table: Selector,
    pub row: Selector,
    pub cell: Selector,
    pub name: CompiledField,
    pub metric: CompiledField,
}

pub(crate) struct CompiledField {
    label: &'static str,
    column: usize,
    selector: Option<Selector>,
    pick: Pick,
    attr: Option<String>,
}

impl ExtractionRules {
    pub(crate) fn compile(&self) -> Result<CompiledRules> {
        Ok(CompiledRules {
            table: parse_selector("table", &self.table)?,
            row: parse_selector("row", &self.row)?,
            cell: parse_selector("cell", &self.cell)?,
            name: self.name.compile("name")?,
            metric: self.metric.compile("metric")?,
        })
    }
}

impl FieldRule {
    fn compile(&self, label: &'static str) -> Result<CompiledField> {
        if self.column == 0 {
            return Err(EtlError::Parse(format!(
                "{} rule: columns are 1-based, got 0",
                label
            )));
        }
        let selector = self
            .selector
            .as_deref()
            .map(|s| parse_selector(label, s))
            .transpose()?;
        Ok(CompiledField {
            label,
            column: self.column,
            selector,
            pick: self.pick,
            attr: self.attr.clone(),
        })
    }
}

fn parse_selector(label: &str, css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| EtlError::Parse(format!("invalid {} selector `{}`: {:?}", label, css, e)))
}

impl CompiledField {
    /// Trimmed value of this field for one row. `Ok(None)` when the cell
    /// exists but the selector matches nothing or the value is blank.
    /// A missing cell is markup drift and fails.
    pub fn read(&self, row_no: usize, cells: &[ElementRef<'_>]) -> Result<Option<String>> {
        let cell = cells.get(self.column - 1).ok_or_else(|| {
            EtlError::Parse(format!(
                "row {}: {} expects column {} but the row has {} cells",
                row_no,
                self.label,
                self.column,
                cells.len()
            ))
        })?;

        let target = match &self.selector {
            None => Some(*cell),
            Some(sel) => match self.pick {
                Pick::First => cell.select(sel).next(),
                Pick::Last => cell.select(sel).last(),
            },
        };
        let Some(el) = target else {
            return Ok(None);
        };

        let raw = match &self.attr {
            Some(attr) => el.value().attr(attr).unwrap_or_default().to_string(),
            None => el.text().collect::<String>(),
        };
        let value = raw.trim();
        Ok((!value.is_empty()).then(|| value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_overrides_merge_with_defaults() {
        let yaml = r#"
table: "table.wikitable > tbody"
name:
  column: 1
  selector: a
  attr: title
"#;
        let rules: ExtractionRules = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rules.table, "table.wikitable > tbody");
        assert_eq!(rules.name.column, 1);
        assert_eq!(rules.name.pick, Pick::First);
        assert_eq!(rules.name.attr.as_deref(), Some("title"));
        assert_eq!(rules.metric, ExtractionRules::default().metric);
    }

    #[test]
    fn zero_column_is_rejected() {
        let mut rules = ExtractionRules::default();
        rules.metric.column = 0;
        assert!(matches!(rules.compile(), Err(EtlError::Parse(_))));
    }

    #[test]
    fn bad_selector_is_rejected() {
        let rules = ExtractionRules {
            row: "tr[".into(),
            ..ExtractionRules::default()
        };
        let err = rules.compile().err().unwrap();
        assert!(err.to_string().contains("row selector"));
    }
}
