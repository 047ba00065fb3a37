//! Column-semantics-driven row cleaning.
//!
//! Takes raw string cells plus the keyword classification from
//! [`crate::columns`] and produces typed values. Unparsable cells become
//! nulls — a malformed spreadsheet can degrade data, never crash a load.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    columns::{ColumnClass, classify},
    value::{Value, parse_boolean_token, parse_numeric_token, parse_temporal},
};

/// Text tokens treated as null after trimming, case-insensitively.
const NULL_TEXT_TOKENS: &[&str] = &["nan", "none"];

/// A cleaned, typed row keyed by normalized column identifier.
///
/// Backed by a `BTreeMap`, so iteration order is always sorted by column
/// name regardless of insertion order — the property the row fingerprint
/// relies on. Columns classified as date/numeric/boolean hold values of
/// that type or null, never raw strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanedRow(BTreeMap<String, Option<Value>>);

impl CleanedRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Option<Value>) {
        self.0.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Option<Value>> {
        self.0.get(column)
    }

    /// Sorted-by-column iteration.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Option<Value>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Option<Value>)> for CleanedRow {
    fn from_iter<T: IntoIterator<Item = (String, Option<Value>)>>(iter: T) -> Self {
        CleanedRow(iter.into_iter().collect())
    }
}

/// Cleans one raw cell according to its column's class.
///
/// Every conversion failure is an explicit fall-to-null branch; this never
/// returns an error and never panics.
pub fn clean_cell(class: ColumnClass, raw: &str) -> Option<Value> {
    match class {
        // Service cells are loader-owned; carry them through verbatim.
        ColumnClass::Service => {
            if raw.is_empty() {
                None
            } else {
                Some(Value::Text(raw.to_string()))
            }
        }
        ColumnClass::Date => {
            if raw.trim().is_empty() {
                return None;
            }
            parse_temporal(raw).ok()
        }
        ColumnClass::Numeric => {
            if raw.trim().is_empty() {
                return None;
            }
            parse_numeric_token(raw).ok().map(Value::Numeric)
        }
        ColumnClass::Boolean => {
            if raw.trim().is_empty() {
                return None;
            }
            parse_boolean_token(raw).ok().map(Value::Boolean)
        }
        ColumnClass::Text => {
            let trimmed = raw.trim();
            if trimmed.is_empty()
                || NULL_TEXT_TOKENS
                    .iter()
                    .any(|token| trimmed.eq_ignore_ascii_case(token))
            {
                None
            } else {
                Some(Value::Text(trimmed.to_string()))
            }
        }
    }
}

/// Cleans one raw row against its normalized headers.
///
/// A row shorter than the header count is padded with nulls for the missing
/// trailing columns; excess cells are dropped.
pub fn clean_row(headers: &[String], cells: &[String]) -> CleanedRow {
    headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let value = match cells.get(idx) {
                Some(raw) => clean_cell(classify(header), raw),
                None => None,
            };
            (header.clone(), value)
        })
        .collect()
}
