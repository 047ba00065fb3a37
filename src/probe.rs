//! Schema discovery across configured sources.
//!
//! Samples the first sheet of each source, infers a staging schema, and
//! writes the combined DDL script (plus optional per-table YAML). This is
//! the offline half of the system: the per-run sync path consumes the
//! resulting DDL once at setup time and never re-derives types.

use std::fs;

use anyhow::{Context, Result, bail};
use log::{info, warn};

use crate::{
    cli::ProbeArgs,
    config::Config,
    grid::{CellRange, CsvSheetSource, SheetRequest, SheetSource},
    schema::{TableSchema, render_ddl_script},
};

pub fn execute(args: &ProbeArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let sheets = CsvSheetSource::new(&config.sheets_dir);

    let mut schemas = Vec::new();
    for (name, source) in &config.sources {
        if !args.source.is_empty() && !args.source.iter().any(|s| s == name) {
            continue;
        }
        if !source.is_configured() {
            info!("Skipping '{name}' (not configured)");
            continue;
        }

        // The first sheet is representative for the whole source.
        let sheet = &source.sheet_identifiers[0];
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
        let grid = match sheets.read_grid(&request) {
            Ok(grid) => grid,
            Err(err) => {
                warn!("Source '{name}' failed: {err:#}");
                continue;
            }
        };
        if grid.len() < 2 {
            info!("'{name}' has no data to sample");
            continue;
        }

        let headers = grid[0].clone();
        let rows = &grid[1..];
        let rows = if args.sample_rows > 0 && rows.len() > args.sample_rows {
            &rows[..args.sample_rows]
        } else {
            rows
        };
        let schema = TableSchema::infer(&source.table, &headers, rows);
        info!(
            "Inferred {} column(s) for staging.{}",
            schema.columns.len(),
            schema.table
        );

        if let Some(dir) = &args.schema_dir {
            fs::create_dir_all(dir)
                .with_context(|| format!("Creating schema directory {dir:?}"))?;
            let path = dir.join(format!("{}.yaml", schema.table));
            schema.save(&path)?;
        }
        schemas.push(schema);
    }

    if schemas.is_empty() {
        bail!("No configured source produced a schema");
    }

    let script = render_ddl_script(&schemas);
    fs::write(&args.ddl, &script)
        .with_context(|| format!("Writing DDL script to {:?}", args.ddl))?;
    info!(
        "Staging DDL for {} table(s) written to {:?}",
        schemas.len(),
        args.ddl
    );
    Ok(())
}
