//! The staging-store boundary and its backends.
//!
//! A staging table is an append-only ledger of cleaned rows keyed by their
//! content fingerprint. This module owns the [`StagingStore`] trait the
//! loader talks to, plus two backends: [`CsvStore`], a per-table CSV ledger
//! on disk, and [`MemoryStore`], an in-memory backend that models the
//! relational target's `row_hash` UNIQUE constraint strictly (and is what
//! the test suites load into).
//!
//! Neither backend ever updates or deletes; a staging table only grows.

use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::PathBuf,
};

use anyhow::{Context, Result, anyhow, bail};

use crate::{
    cleaner::CleanedRow,
    io_utils::{self, DEFAULT_DELIMITER},
};

/// One record bound for a staging table: the cleaned business values plus
/// the loader-owned fingerprint column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRow {
    pub row_hash: String,
    pub values: CleanedRow,
}

/// Append-only staging storage keyed by row fingerprint.
pub trait StagingStore {
    /// The fingerprint set already present in a table. A table that does
    /// not exist yet yields an empty set, not an error.
    fn existing_hashes(&self, table: &str) -> Result<HashSet<String>>;

    /// Appends one batch. Implementations must reject duplicate
    /// fingerprints they can observe rather than silently double-insert.
    fn append(&mut self, table: &str, batch: &[StagedRow]) -> Result<()>;

    /// Current number of persisted rows in a table.
    fn row_count(&self, table: &str) -> Result<u64>;
}

const HASH_COLUMN: &str = "row_hash";

/// Per-table append-only CSV ledger under a data directory.
///
/// Column layout is fixed at table creation from the first batch's sorted
/// column names; later batches must fit inside it (additive columns require
/// a new table). The relational target's UNIQUE constraint is the real
/// duplicate backstop; this backend rejects the duplicates it can see
/// within a batch.
pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Creating staging directory {root:?}"))?;
        Ok(Self { root })
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{table}.csv"))
    }

    fn read_header(&self, table: &str) -> Result<Option<Vec<String>>> {
        let path = self.table_path(table);
        if !path.exists() {
            return Ok(None);
        }
        let mut reader =
            io_utils::open_csv_reader_from_path(&path, DEFAULT_DELIMITER, false)?;
        let mut record = csv::ByteRecord::new();
        if reader.read_byte_record(&mut record)? {
            Ok(Some(io_utils::decode_record(&record, encoding_rs::UTF_8)?))
        } else {
            Ok(None)
        }
    }
}

fn header_for(batch: &[StagedRow]) -> Vec<String> {
    let mut header = vec!["source_row_id".to_string()];
    if let Some(first) = batch.first() {
        header.extend(
            first
                .values
                .iter()
                .filter(|(name, _)| name.as_str() != "source_row_id")
                .map(|(name, _)| name.clone()),
        );
    }
    header.push(HASH_COLUMN.to_string());
    header
}

impl StagingStore for CsvStore {
    fn existing_hashes(&self, table: &str) -> Result<HashSet<String>> {
        let header = match self.read_header(table)? {
            Some(header) => header,
            None => return Ok(HashSet::new()),
        };
        let hash_idx = header
            .iter()
            .position(|name| name == HASH_COLUMN)
            .ok_or_else(|| anyhow!("Staging table '{table}' has no {HASH_COLUMN} column"))?;

        let path = self.table_path(table);
        let mut reader = io_utils::open_csv_reader_from_path(&path, DEFAULT_DELIMITER, true)?;
        let mut hashes = HashSet::new();
        let mut record = csv::ByteRecord::new();
        while reader.read_byte_record(&mut record)? {
            if let Some(field) = record.get(hash_idx) {
                hashes.insert(io_utils::decode_bytes(field, encoding_rs::UTF_8)?);
            }
        }
        Ok(hashes)
    }

    fn append(&mut self, table: &str, batch: &[StagedRow]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut in_batch = HashSet::new();
        for row in batch {
            if !in_batch.insert(row.row_hash.as_str()) {
                bail!("Duplicate row_hash '{}' within one batch for '{table}'", row.row_hash);
            }
        }

        let existing_header = self.read_header(table)?;
        let header = match &existing_header {
            Some(header) => header.clone(),
            None => header_for(batch),
        };

        for row in batch {
            for (name, _) in row.values.iter() {
                if !header.contains(name) {
                    bail!("Column '{name}' is not part of staging table '{table}'");
                }
            }
        }

        let path = self.table_path(table);
        let mut writer = io_utils::open_csv_appender(&path, DEFAULT_DELIMITER)?;
        if existing_header.is_none() {
            writer
                .write_record(header.iter())
                .with_context(|| format!("Writing header for staging table '{table}'"))?;
        }

        for row in batch {
            let mut record = Vec::with_capacity(header.len());
            for column in &header {
                if column == HASH_COLUMN {
                    record.push(row.row_hash.clone());
                    continue;
                }
                let cell = match row.values.get(column) {
                    Some(Some(value)) => value.canonical(),
                    _ => String::new(),
                };
                record.push(cell);
            }
            writer
                .write_record(record.iter())
                .with_context(|| format!("Appending row to staging table '{table}'"))?;
        }
        writer
            .flush()
            .with_context(|| format!("Flushing staging table '{table}'"))?;
        Ok(())
    }

    fn row_count(&self, table: &str) -> Result<u64> {
        let path = self.table_path(table);
        if !path.exists() {
            return Ok(0);
        }
        let mut reader = io_utils::open_csv_reader_from_path(&path, DEFAULT_DELIMITER, true)?;
        let mut count = 0u64;
        let mut record = csv::ByteRecord::new();
        while reader.read_byte_record(&mut record)? {
            count += 1;
        }
        Ok(count)
    }
}

/// In-memory staging backend with strict fingerprint uniqueness.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, Vec<StagedRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, table: &str) -> &[StagedRow] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl StagingStore for MemoryStore {
    fn existing_hashes(&self, table: &str) -> Result<HashSet<String>> {
        Ok(self
            .tables
            .get(table)
            .map(|rows| rows.iter().map(|r| r.row_hash.clone()).collect())
            .unwrap_or_default())
    }

    fn append(&mut self, table: &str, batch: &[StagedRow]) -> Result<()> {
        let rows = self.tables.entry(table.to_string()).or_default();
        let mut present: HashSet<&str> = rows.iter().map(|r| r.row_hash.as_str()).collect();
        for row in batch {
            if !present.insert(row.row_hash.as_str()) {
                bail!(
                    "Unique constraint violation on {HASH_COLUMN} '{}' in '{table}'",
                    row.row_hash
                );
            }
        }
        rows.extend(batch.iter().cloned());
        Ok(())
    }

    fn row_count(&self, table: &str) -> Result<u64> {
        Ok(self.tables.get(table).map(|rows| rows.len() as u64).unwrap_or(0))
    }
}
