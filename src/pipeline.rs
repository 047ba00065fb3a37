//! Per-source sync orchestration: read, normalize, clean, hash, load.
//!
//! One run walks the configured sources sequentially. Each source reads its
//! sheets, concatenates them under a unified column set, cleans every row,
//! and hands the result to the incremental loader. A failure in one source
//! is recorded and the run moves on; only shared setup (config, staging
//! directory) is fatal.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::{Result, bail};
use itertools::Itertools;
use log::{info, warn};

use crate::{
    cleaner::{CleanedRow, clean_row},
    cli::SyncArgs,
    columns::{ColumnClass, classify, unique_headers},
    config::{Config, SourceSpec},
    grid::{CellRange, SheetRequest, SheetSource, align_row},
    loader::load_incremental,
    store::{CsvStore, StagingStore},
    value::Value,
};

/// Outcome of one run across all selected sources.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Rows appended per successfully processed source.
    pub loaded: BTreeMap<String, usize>,
    /// Sources skipped because they are not configured yet.
    pub skipped: Vec<String>,
    /// Sources that failed, with the failure rendered for reporting.
    pub failed: BTreeMap<String, String>,
}

pub fn execute(args: &SyncArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let sheets = crate::grid::CsvSheetSource::new(&config.sheets_dir);
    let mut store = CsvStore::new(&config.staging_dir)?;

    let summary = run(&config, &sheets, &mut store, &args.source, args.batch_size);

    let total: usize = summary.loaded.values().sum();
    info!(
        "Run complete: {total} row(s) appended across {} source(s), {} skipped",
        summary.loaded.len(),
        summary.skipped.len()
    );
    if !summary.failed.is_empty() {
        bail!(
            "{} source(s) failed: {}",
            summary.failed.len(),
            summary.failed.keys().join(", ")
        );
    }
    Ok(())
}

/// Processes every configured source, isolating per-source failures.
/// `only` restricts the run to the named sources when non-empty.
pub fn run(
    config: &Config,
    sheets: &dyn SheetSource,
    store: &mut dyn StagingStore,
    only: &[String],
    batch_size: usize,
) -> RunSummary {
    let mut summary = RunSummary::default();
    for (name, source) in &config.sources {
        if !only.is_empty() && !only.iter().any(|s| s == name) {
            continue;
        }
        if !source.is_configured() {
            info!("Skipping '{name}' (not configured)");
            summary.skipped.push(name.clone());
            continue;
        }
        match process_source(source, sheets, store, batch_size) {
            Ok(count) => {
                info!(
                    "Loaded {count} new row(s) from '{name}' into staging.{}",
                    source.table
                );
                summary.loaded.insert(name.clone(), count);
            }
            Err(err) => {
                warn!(
                    "Source '{name}' (table staging.{}) failed: {err:#}",
                    source.table
                );
                summary.failed.insert(name.clone(), format!("{err:#}"));
            }
        }
    }
    summary
}

fn process_source(
    source: &SourceSpec,
    sheets: &dyn SheetSource,
    store: &mut dyn StagingStore,
    batch_size: usize,
) -> Result<usize> {
    let mut frames: Vec<(Vec<String>, Vec<Vec<String>>)> = Vec::new();
    for sheet in &source.sheet_identifiers {
        let range = match source.range_for(sheet) {
            Some(raw) => Some(raw.parse::<CellRange>()?),
            None => None,
        };
        let request = SheetRequest {
            spreadsheet_id: &source.spreadsheet_id,
            sheet,
            addressing: source.addressing(),
            range,
            encoding: source.input_encoding.as_deref(),
        };
        let grid = sheets.read_grid(&request)?;
        if grid.len() < 2 {
            info!(
                "Sheet '{sheet}' of '{}' has no data rows",
                source.spreadsheet_id
            );
            continue;
        }
        let headers = unique_headers(&grid[0]);
        let width = headers.len();
        let rows = grid
            .into_iter()
            .skip(1)
            .map(|row| align_row(row, width))
            .collect();
        frames.push((headers, rows));
    }

    if frames.is_empty() {
        info!("No data in any sheet of '{}'", source.spreadsheet_id);
        return Ok(0);
    }

    let (headers, rows) = concat_frames(frames);
    let headers = apply_renames(&headers, source);

    let cleaned: Vec<CleanedRow> = rows
        .iter()
        .enumerate()
        .map(|(idx, cells)| {
            let mut row = clean_row(&headers, cells);
            // Sheet data starts at row 2; the counter runs on across sheets.
            row.insert("source_row_id", Some(Value::Integer(idx as i64 + 2)));
            row
        })
        .collect();

    load_incremental(store, &source.table, &cleaned, batch_size)
}

/// Concatenates per-sheet frames under the union of their columns, in
/// first-seen order. Cells for columns a sheet lacks come out empty.
fn concat_frames(frames: Vec<(Vec<String>, Vec<Vec<String>>)>) -> (Vec<String>, Vec<Vec<String>>) {
    let mut columns: Vec<String> = Vec::new();
    let mut known: HashSet<String> = HashSet::new();
    for (headers, _) in &frames {
        for header in headers {
            if known.insert(header.clone()) {
                columns.push(header.clone());
            }
        }
    }

    let mut rows = Vec::new();
    for (headers, frame_rows) in frames {
        let index: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| (header.as_str(), idx))
            .collect();
        for row in frame_rows {
            rows.push(
                columns
                    .iter()
                    .map(|column| {
                        index
                            .get(column.as_str())
                            .and_then(|idx| row.get(*idx))
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect(),
            );
        }
    }
    (columns, rows)
}

/// Applies the source's column naming policy: positional `col_N` names for
/// header-churning sheets, or the configured rename map (re-uniquified so
/// the header-set invariant survives bad rename targets).
fn apply_renames(headers: &[String], source: &SourceSpec) -> Vec<String> {
    if source.positional_columns {
        let mut position = 0usize;
        return headers
            .iter()
            .map(|header| {
                if classify(header) == ColumnClass::Service {
                    header.clone()
                } else {
                    position += 1;
                    format!("col_{position}")
                }
            })
            .collect();
    }
    if source.column_renames.is_empty() {
        return headers.to_vec();
    }
    let renamed: Vec<String> = headers
        .iter()
        .map(|header| {
            source
                .column_renames
                .get(header)
                .cloned()
                .unwrap_or_else(|| header.clone())
        })
        .collect();
    unique_headers(&renamed)
}
