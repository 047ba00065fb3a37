mod common;

use common::TestWorkspace;
use proptest::prelude::*;
use sheetstage::{
    columns::unique_headers,
    schema::{SqlType, TableSchema, infer_sql_type, render_ddl_script},
};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[test]
fn type_precedence_matches_the_contract() {
    assert_eq!(infer_sql_type(&["1", "2", "3"]), SqlType::Integer);
    assert_eq!(infer_sql_type(&["1.5", "2,3"]), SqlType::Numeric);
    assert_eq!(infer_sql_type(&["true", "false"]), SqlType::Boolean);
    assert_eq!(
        infer_sql_type(&["01.02.2023", "05.03.2024"]),
        SqlType::Date
    );
    assert_eq!(infer_sql_type(&["abc", "def"]), SqlType::Text);
}

#[test]
fn inference_survives_malformed_samples() {
    // Nothing here should panic, whatever the garbage.
    for sample in [
        vec!["99999999999999999999999999"],
        vec!["-"],
        vec!["...."],
        vec!["12.13.14.15"],
        vec!["\u{0}"],
    ] {
        let _ = infer_sql_type(&sample);
    }
    // Integer overflowing i64 still fits NUMERIC.
    assert_eq!(
        infer_sql_type(&["99999999999999999999999999"]),
        SqlType::Numeric
    );
}

#[test]
fn schema_yaml_round_trips() {
    let workspace = TestWorkspace::new();
    let headers = strings(&["Дата", "Сумма", "Клиент", "Клиент"]);
    let rows = vec![
        strings(&["01.02.2023", "1 000,50", "Иванов", "x"]),
        strings(&["05.03.2024", "200", "Петров", "y"]),
    ];
    let schema = TableSchema::infer("sales_hst", &headers, &rows);

    let path = workspace.path().join("sales_hst.yaml");
    schema.save(&path).expect("save schema");
    let loaded = TableSchema::load(&path).expect("load schema");

    assert_eq!(loaded.table, "sales_hst");
    assert_eq!(
        loaded.column_names(),
        vec!["data", "summa", "klient", "klient_1"]
    );
    assert_eq!(loaded.columns[0].sql_type, SqlType::Date);
    assert_eq!(loaded.columns[0].original, "Дата");
    assert_eq!(loaded.columns[1].sql_type, SqlType::Numeric);
}

#[test]
fn ddl_script_covers_every_table() {
    let first = TableSchema::infer(
        "sales_cur",
        &strings(&["Сумма"]),
        &[strings(&["100"])],
    );
    let second = TableSchema::infer(
        "expenses_cur",
        &strings(&["Комментарий"]),
        &[strings(&["text"])],
    );
    let script = render_ddl_script(&[first, second]);

    assert!(script.starts_with("CREATE SCHEMA IF NOT EXISTS staging;"));
    assert!(script.contains("CREATE TABLE IF NOT EXISTS staging.sales_cur"));
    assert!(script.contains("CREATE TABLE IF NOT EXISTS staging.expenses_cur"));
    assert!(script.contains("row_hash TEXT NOT NULL UNIQUE"));
}

proptest! {
    /// Whatever the raw headers — any script, any duplication — the
    /// normalized header set is pairwise distinct and every identifier is
    /// machine-safe.
    #[test]
    fn normalized_headers_are_distinct_and_safe(raw in proptest::collection::vec(".{0,24}", 0..12)) {
        let headers = unique_headers(&raw);
        prop_assert_eq!(headers.len(), raw.len());

        let mut seen = std::collections::HashSet::new();
        for header in &headers {
            prop_assert!(seen.insert(header.clone()), "duplicate identifier {}", header);
            prop_assert!(!header.is_empty());
            prop_assert!(!header.starts_with(|c: char| c.is_ascii_digit()));
            prop_assert!(
                header.chars().all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_')),
                "unsafe identifier {}",
                header
            );
        }
    }
}
