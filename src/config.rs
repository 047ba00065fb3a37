//! Run configuration: the source descriptors and data directories.
//!
//! Loaded once from YAML into an immutable [`Config`] value that is passed
//! into each component explicitly — there is no global configuration state.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::{
    columns::normalize_header,
    grid::SheetAddressing,
};

/// One spreadsheet source feeding one staging table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Opaque spreadsheet identifier at the source system.
    pub spreadsheet_id: String,
    /// Staging table this source lands in.
    pub table: String,
    /// Ordered sheet identifiers to ingest, concatenated in order.
    #[serde(default)]
    pub sheet_identifiers: Vec<String>,
    /// Optional per-sheet A1 cell-range restriction.
    #[serde(default)]
    pub ranges: BTreeMap<String, String>,
    /// Address sheets by stable numeric id instead of display name.
    #[serde(default)]
    pub use_gid: bool,
    /// Optional normalized-header renames applied after normalization.
    #[serde(default)]
    pub column_renames: BTreeMap<String, String>,
    /// Rename business columns positionally (`col_1`, `col_2`, …) instead
    /// of keeping header-derived names. For sheets whose headers churn.
    #[serde(default)]
    pub positional_columns: bool,
    /// Input encoding of the exported sheet files (defaults to utf-8).
    #[serde(default)]
    pub input_encoding: Option<String>,
}

impl SourceSpec {
    /// Whether this source is ready to ingest. An empty or still-placeholder
    /// spreadsheet id, or an empty sheet list, means "skip", not "fail".
    pub fn is_configured(&self) -> bool {
        !self.spreadsheet_id.is_empty()
            && !self.spreadsheet_id.starts_with('<')
            && !self.sheet_identifiers.is_empty()
    }

    pub fn addressing(&self) -> SheetAddressing {
        if self.use_gid {
            SheetAddressing::ById
        } else {
            SheetAddressing::ByName
        }
    }

    pub fn range_for(&self, sheet: &str) -> Option<&str> {
        self.ranges.get(sheet).map(String::as_str)
    }
}

/// Full run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding per-spreadsheet sheet exports.
    pub sheets_dir: PathBuf,
    /// Directory holding the staging ledger.
    pub staging_dir: PathBuf,
    /// Sources keyed by a human-readable name used in logs and summaries.
    #[serde(default)]
    pub sources: BTreeMap<String, SourceSpec>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Reading config file {path:?}"))?;
        let config: Config = serde_yaml::from_str(&raw)
            .with_context(|| format!("Parsing config file {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, source) in &self.sources {
            if source.table.is_empty() || normalize_header(&source.table) != source.table {
                bail!(
                    "Source '{name}' targets invalid table name '{}' (must be a normalized identifier)",
                    source.table
                );
            }
            for (sheet, range) in &source.ranges {
                range
                    .parse::<crate::grid::CellRange>()
                    .with_context(|| format!("Source '{name}', sheet '{sheet}'"))?;
            }
        }
        Ok(())
    }
}
