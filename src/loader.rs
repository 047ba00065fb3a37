//! Incremental loading of cleaned rows into a staging table.
//!
//! Appends only rows whose content fingerprint is not already persisted.
//! The in-memory set-difference is an optimization that keeps write volume
//! down; the storage layer's uniqueness constraint on `row_hash` is the
//! actual duplicate-prevention guarantee under concurrent loaders.

use std::collections::HashSet;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::{
    cleaner::CleanedRow,
    hash::fingerprint,
    store::{StagedRow, StagingStore},
};

/// Default append batch size.
pub const DB_BATCH_SIZE: usize = 1000;

/// Loads `rows` into `table`, appending only rows not already present.
/// Returns the number of rows appended.
///
/// A failed existence check is treated as "no rows exist yet" — the load is
/// always attempted and the store's own constraint catches true duplicates.
/// A failed append is surfaced to the caller; rows durably appended before
/// the failure stay appended.
pub fn load_incremental(
    store: &mut dyn StagingStore,
    table: &str,
    rows: &[CleanedRow],
    batch_size: usize,
) -> Result<usize> {
    if rows.is_empty() {
        info!("No rows to load into '{table}'");
        return Ok(0);
    }

    let existing = store.existing_hashes(table).unwrap_or_else(|err| {
        debug!("Fingerprint lookup for '{table}' failed (treating table as empty): {err:#}");
        HashSet::new()
    });

    let mut seen = existing;
    let fresh: Vec<StagedRow> = rows
        .iter()
        .map(|row| StagedRow {
            row_hash: fingerprint(row),
            values: row.clone(),
        })
        .filter(|staged| seen.insert(staged.row_hash.clone()))
        .collect();

    if fresh.is_empty() {
        info!(
            "No new rows for '{table}' (all {} already present)",
            rows.len()
        );
        return Ok(0);
    }

    info!("Appending {} new row(s) to '{table}'", fresh.len());
    let mut appended = 0usize;
    for batch in fresh.chunks(batch_size.max(1)) {
        store.append(table, batch).with_context(|| {
            format!(
                "Appending batch to staging table '{table}' ({appended} row(s) were already appended)"
            )
        })?;
        appended += batch.len();
    }
    Ok(appended)
}
