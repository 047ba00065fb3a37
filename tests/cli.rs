mod common;

use std::fs;

use assert_cmd::Command;
use common::TestWorkspace;
use predicates::str::contains;

fn workspace_with_sales() -> (TestWorkspace, std::path::PathBuf) {
    let workspace = TestWorkspace::new();
    workspace.write_sheet(
        "book1",
        "sales",
        "Клиент,Сумма,Дата\nИванов,\"1 000,50\",01.02.2023\nПетров,200,05.03.2024\n",
    );
    let config_path = workspace.write_config(
        r#"  current_sales:
    spreadsheet_id: book1
    table: sales_cur
    sheet_identifiers: ["sales"]
"#,
    );
    (workspace, config_path)
}

#[test]
fn probe_writes_ddl_and_schema_yaml() {
    let (workspace, config_path) = workspace_with_sales();
    let ddl_path = workspace.path().join("inferred_schema.sql");
    let schema_dir = workspace.path().join("schemas");

    Command::cargo_bin("sheetstage")
        .expect("binary exists")
        .args([
            "probe",
            "-c",
            config_path.to_str().unwrap(),
            "--ddl",
            ddl_path.to_str().unwrap(),
            "--schema-dir",
            schema_dir.to_str().unwrap(),
        ])
        .assert()
        .success();

    let ddl = fs::read_to_string(&ddl_path).expect("read ddl");
    assert!(ddl.starts_with("CREATE SCHEMA IF NOT EXISTS staging;"));
    assert!(ddl.contains("CREATE TABLE IF NOT EXISTS staging.sales_cur"));
    assert!(ddl.contains("NUMERIC(10,2)"));
    assert!(ddl.contains("DATE"));
    assert!(ddl.contains("row_hash TEXT NOT NULL UNIQUE"));

    assert!(schema_dir.join("sales_cur.yaml").exists());
}

#[test]
fn sync_is_idempotent_across_invocations() {
    let (workspace, config_path) = workspace_with_sales();

    Command::cargo_bin("sheetstage")
        .expect("binary exists")
        .args(["sync", "-c", config_path.to_str().unwrap()])
        .assert()
        .success()
        .stderr(contains("Loaded 2 new row(s) from 'current_sales'"));

    Command::cargo_bin("sheetstage")
        .expect("binary exists")
        .args(["sync", "-c", config_path.to_str().unwrap()])
        .assert()
        .success()
        .stderr(contains("Loaded 0 new row(s) from 'current_sales'"));
}

#[test]
fn counts_reports_staging_tables() {
    let (workspace, config_path) = workspace_with_sales();

    Command::cargo_bin("sheetstage")
        .expect("binary exists")
        .args(["sync", "-c", config_path.to_str().unwrap()])
        .assert()
        .success();

    Command::cargo_bin("sheetstage")
        .expect("binary exists")
        .args(["counts", "-c", config_path.to_str().unwrap()])
        .assert()
        .success()
        .stderr(contains("staging.sales_cur: 2 row(s)"));
}

#[test]
fn sync_reports_failing_sources_without_dropping_the_rest() {
    let workspace = TestWorkspace::new();
    workspace.write_sheet("book1", "sales", "Клиент\nИванов\n");
    let config_path = workspace.write_config(
        r#"  broken:
    spreadsheet_id: missing_book
    table: expenses_cur
    sheet_identifiers: ["absent"]
  good:
    spreadsheet_id: book1
    table: sales_cur
    sheet_identifiers: ["sales"]
"#,
    );

    Command::cargo_bin("sheetstage")
        .expect("binary exists")
        .args(["sync", "-c", config_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("Loaded 1 new row(s) from 'good'"))
        .stderr(contains("1 source(s) failed: broken"));

    // The good source's rows landed despite the failure.
    assert!(workspace.staging_dir().join("sales_cur.csv").exists());
}

#[test]
fn sync_restricts_to_selected_sources() {
    let workspace = TestWorkspace::new();
    workspace.write_sheet("book1", "sales", "Клиент\nИванов\n");
    workspace.write_sheet("book1", "costs", "Сумма\n100\n");
    let config_path = workspace.write_config(
        r#"  sales:
    spreadsheet_id: book1
    table: sales_cur
    sheet_identifiers: ["sales"]
  costs:
    spreadsheet_id: book1
    table: expenses_cur
    sheet_identifiers: ["costs"]
"#,
    );

    Command::cargo_bin("sheetstage")
        .expect("binary exists")
        .args([
            "sync",
            "-c",
            config_path.to_str().unwrap(),
            "--source",
            "sales",
        ])
        .assert()
        .success();

    assert!(workspace.staging_dir().join("sales_cur.csv").exists());
    assert!(!workspace.staging_dir().join("expenses_cur.csv").exists());
}
