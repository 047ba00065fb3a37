//! SQL type inference and staging-table schema persistence.
//!
//! [`infer_sql_type`] is the offline half of the system: it runs once per
//! column over a representative sample and decides the minimal SQL type for
//! the staging DDL. The per-run load path never re-derives types.
//!
//! Candidate types are evaluated in strict precedence order — boolean,
//! integer, numeric, date/timestamp, text — returning the first that matches
//! every sampled value. A conversion failure in one candidate silently falls
//! through to the next; malformed samples can only ever degrade to TEXT.

use std::{fs::File, io::BufReader, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    columns::unique_headers,
    value::{parse_day_first_date, parse_day_first_datetime, parse_integer_token, parse_numeric_token},
};

/// Date-shaped prefilter: `D.M.Y` with `.`/`/`/`-` separators and an
/// optional `HH:MM` suffix. Cheap to test before attempting a real parse.
const DATE_PATTERN: &str = r"^\d{1,2}[./-]\d{1,2}[./-]\d{2,4}(\s\d{1,2}:\d{2}(:\d{2})?)?$";

/// Pattern checks are capped at this many samples.
const DATE_PATTERN_SAMPLE_CAP: usize = 50;
/// Full parses are capped at this many samples.
const DATE_PARSE_SAMPLE_CAP: usize = 20;

/// Tokens that make an entire sample BOOLEAN, case-insensitively.
const BOOLEAN_SAMPLE_TOKENS: &[&str] = &["true", "false", "да", "нет", "yes", "no", "+", "-"];

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(DATE_PATTERN).expect("date pattern is valid"))
}

/// SQL type tag for one staging column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlType {
    Boolean,
    Integer,
    Numeric,
    Date,
    Timestamp,
    Text,
}

impl SqlType {
    /// DDL spelling for the target relation.
    pub fn ddl_token(self) -> &'static str {
        match self {
            SqlType::Boolean => "BOOLEAN",
            SqlType::Integer => "INTEGER",
            SqlType::Numeric => "NUMERIC(10,2)",
            SqlType::Date => "DATE",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Text => "TEXT",
        }
    }
}

/// Infers the minimal SQL type that fits every non-empty sampled value.
pub fn infer_sql_type<S: AsRef<str>>(samples: &[S]) -> SqlType {
    let sample: Vec<&str> = samples
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .collect();
    if sample.is_empty() {
        return SqlType::Text;
    }

    if sample.iter().all(|s| {
        let lowered = s.to_lowercase();
        BOOLEAN_SAMPLE_TOKENS.contains(&lowered.as_str())
    }) {
        return SqlType::Boolean;
    }

    if sample.iter().all(|s| parse_integer_token(s).is_ok()) {
        return SqlType::Integer;
    }

    if sample.iter().all(|s| parse_numeric_token(s).is_ok()) {
        return SqlType::Numeric;
    }

    if let Some(temporal) = infer_temporal(&sample) {
        return temporal;
    }

    SqlType::Text
}

/// The date/timestamp candidate, checked against a capped prefix of the
/// sample for performance: a regex prefilter over the first 50 values, then
/// a day-first parse of the first 20.
fn infer_temporal(sample: &[&str]) -> Option<SqlType> {
    let pattern_checked = sample.iter().take(DATE_PATTERN_SAMPLE_CAP);
    if !pattern_checked.clone().all(|s| date_pattern().is_match(s)) {
        return None;
    }

    let parse_checked: Vec<&str> = sample.iter().take(DATE_PARSE_SAMPLE_CAP).copied().collect();
    let all_parse = parse_checked
        .iter()
        .all(|s| parse_day_first_datetime(s).is_ok() || parse_day_first_date(s).is_ok());
    if !all_parse {
        return None;
    }

    if parse_checked.iter().any(|s| s.contains(':')) {
        Some(SqlType::Timestamp)
    } else {
        Some(SqlType::Date)
    }
}

/// One inferred staging column: the raw header it came from, its normalized
/// identifier, and its SQL type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub original: String,
    pub name: String,
    pub sql_type: SqlType,
}

/// Inferred schema for one staging table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Builds a schema from a raw grid: headers are normalized and
    /// uniquified, then each column's values are sampled for inference.
    /// Rows shorter than the header count simply contribute no sample for
    /// the missing trailing columns.
    pub fn infer(table: &str, headers: &[String], rows: &[Vec<String>]) -> Self {
        let names = unique_headers(headers);
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let samples: Vec<&str> = rows
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .map(|cell| cell.as_str())
                    .collect();
                ColumnDef {
                    original: headers[idx].clone(),
                    name,
                    sql_type: infer_sql_type(&samples),
                }
            })
            .collect();
        TableSchema {
            table: table.to_string(),
            columns,
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing schema YAML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema = serde_yaml::from_reader(reader).context("Parsing schema YAML")?;
        Ok(schema)
    }

    /// Renders the staging DDL for this table. `row_hash` carries the UNIQUE
    /// constraint that backstops concurrent loaders.
    pub fn render_ddl(&self) -> String {
        let mut ddl = String::new();
        ddl.push_str(&format!(
            "CREATE TABLE IF NOT EXISTS staging.{} (\n",
            self.table
        ));
        ddl.push_str("    id SERIAL PRIMARY KEY,\n");
        ddl.push_str("    source_row_id INTEGER,\n");
        for column in &self.columns {
            ddl.push_str(&format!(
                "    {:<30} {},\n",
                column.name,
                column.sql_type.ddl_token()
            ));
        }
        ddl.push_str("    row_hash TEXT NOT NULL UNIQUE,\n");
        ddl.push_str("    imported_at TIMESTAMP DEFAULT NOW()\n");
        ddl.push_str(");\n");
        ddl
    }
}

/// Renders the full staging DDL script for a set of inferred schemas.
pub fn render_ddl_script(schemas: &[TableSchema]) -> String {
    let tables = schemas
        .iter()
        .map(|schema| format!("-- staging.{}\n{}", schema.table, schema.render_ddl()))
        .join("\n");
    format!("CREATE SCHEMA IF NOT EXISTS staging;\n\n{tables}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(values: &[&str]) -> SqlType {
        infer_sql_type(values)
    }

    #[test]
    fn precedence_integer_before_numeric() {
        assert_eq!(infer(&["1", "2", "3"]), SqlType::Integer);
        assert_eq!(infer(&["1.5", "2,3"]), SqlType::Numeric);
        assert_eq!(infer(&["1", "2.5"]), SqlType::Numeric);
    }

    #[test]
    fn boolean_tokens_win_over_everything() {
        assert_eq!(infer(&["true", "false"]), SqlType::Boolean);
        assert_eq!(infer(&["Да", "нет"]), SqlType::Boolean);
        assert_eq!(infer(&["+", "-"]), SqlType::Boolean);
        // A stray non-token breaks the candidate.
        assert_eq!(infer(&["true", "maybe"]), SqlType::Text);
    }

    #[test]
    fn integers_allow_thousands_spaces() {
        assert_eq!(infer(&["1 000", "2\u{a0}500", "-3"]), SqlType::Integer);
    }

    #[test]
    fn dates_and_timestamps_detected_day_first() {
        assert_eq!(infer(&["01.02.2023", "05.03.2024"]), SqlType::Date);
        assert_eq!(infer(&["01/02/2023", "05/03/2024"]), SqlType::Date);
        assert_eq!(
            infer(&["01.02.2023 10:30", "05.03.2024 11:45"]),
            SqlType::Timestamp
        );
        // One value with a time component promotes the whole column.
        assert_eq!(
            infer(&["01.02.2023", "05.03.2024 11:45"]),
            SqlType::Timestamp
        );
        // Pattern-shaped but unparsable values fall through to TEXT.
        assert_eq!(infer(&["45.45.2023"]), SqlType::Text);
    }

    #[test]
    fn empty_and_missing_samples_default_to_text() {
        assert_eq!(infer(&[] as &[&str]), SqlType::Text);
        assert_eq!(infer(&["", "  ", ""]), SqlType::Text);
        assert_eq!(infer(&["abc", "def"]), SqlType::Text);
    }

    #[test]
    fn empties_are_dropped_before_analysis() {
        assert_eq!(infer(&["", "5", "", "7"]), SqlType::Integer);
    }

    #[test]
    fn infer_table_schema_normalizes_headers() {
        let headers = vec!["Дата".to_string(), "Сумма".to_string(), "Клиент".to_string()];
        let rows = vec![
            vec!["01.02.2023".to_string(), "1 000,50".to_string(), "Иванов".to_string()],
            vec!["02.02.2023".to_string(), "200".to_string(), "Петров".to_string()],
        ];
        let schema = TableSchema::infer("sales_cur", &headers, &rows);
        assert_eq!(schema.columns.len(), 3);
        assert_eq!(schema.columns[0].name, "data");
        assert_eq!(schema.columns[0].sql_type, SqlType::Date);
        assert_eq!(schema.columns[1].name, "summa");
        assert_eq!(schema.columns[1].sql_type, SqlType::Numeric);
        assert_eq!(schema.columns[2].name, "klient");
        assert_eq!(schema.columns[2].sql_type, SqlType::Text);
    }

    #[test]
    fn short_rows_contribute_no_samples_for_missing_columns() {
        let headers = vec!["a".to_string(), "b".to_string()];
        let rows = vec![vec!["1".to_string()]];
        let schema = TableSchema::infer("t", &headers, &rows);
        assert_eq!(schema.columns[1].sql_type, SqlType::Text);
    }

    #[test]
    fn ddl_includes_service_columns_and_hash_constraint() {
        let schema = TableSchema {
            table: "sales_cur".to_string(),
            columns: vec![ColumnDef {
                original: "Сумма".to_string(),
                name: "summa".to_string(),
                sql_type: SqlType::Numeric,
            }],
        };
        let ddl = schema.render_ddl();
        assert!(ddl.contains("CREATE TABLE IF NOT EXISTS staging.sales_cur"));
        assert!(ddl.contains("id SERIAL PRIMARY KEY"));
        assert!(ddl.contains("source_row_id INTEGER"));
        assert!(ddl.contains("NUMERIC(10,2)"));
        assert!(ddl.contains("row_hash TEXT NOT NULL UNIQUE"));
        assert!(ddl.contains("imported_at TIMESTAMP DEFAULT NOW()"));

        let script = render_ddl_script(&[schema]);
        assert!(script.starts_with("CREATE SCHEMA IF NOT EXISTS staging;"));
    }
}
