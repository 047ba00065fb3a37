//! The spreadsheet-source boundary: grids, cell ranges, and row alignment.
//!
//! A source hands this system a two-dimensional array of strings per sheet —
//! first row headers, the rest data. [`SheetSource`] abstracts where that
//! grid comes from; [`CsvSheetSource`] reads per-sheet CSV exports from a
//! directory tree (`<root>/<spreadsheet_id>/<sheet>.csv`), which is also how
//! the test suites feed fixtures in.
//!
//! Sheets can be addressed by stable numeric id or by display name; for the
//! CSV-backed source both resolve to a file stem, but the flag travels with
//! the request so API-backed implementations can honor it.

use std::{path::PathBuf, str::FromStr, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use regex::Regex;

use crate::io_utils::{self, DEFAULT_DELIMITER};

/// A raw sheet grid: rows of string cells, header row included.
pub type Grid = Vec<Vec<String>>;

/// How a sheet identifier should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetAddressing {
    /// Stable numeric sheet id.
    ById,
    /// Mutable display name.
    ByName,
}

/// An inclusive A1-style cell-range restriction such as `A2:F100`.
///
/// Row bounds may be omitted (`A2:F`) to leave the range open-ended on that
/// axis. Columns are letters, rows are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    start_col: usize,
    start_row: Option<usize>,
    end_col: usize,
    end_row: Option<usize>,
}

fn range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z]+)(\d*):([A-Za-z]+)(\d*)$").expect("range pattern is valid")
    })
}

fn column_index(letters: &str) -> usize {
    letters
        .chars()
        .fold(0usize, |acc, c| {
            acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1)
        })
        - 1
}

impl FromStr for CellRange {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let captures = range_pattern()
            .captures(raw.trim())
            .ok_or_else(|| anyhow!("Invalid cell range '{raw}' (expected e.g. A2:F100)"))?;
        let parse_row = |text: &str| -> Result<Option<usize>> {
            if text.is_empty() {
                return Ok(None);
            }
            let row: usize = text.parse()?;
            if row == 0 {
                return Err(anyhow!("Cell range rows are 1-based in '{raw}'"));
            }
            Ok(Some(row))
        };
        let range = CellRange {
            start_col: column_index(&captures[1]),
            start_row: parse_row(&captures[2])?,
            end_col: column_index(&captures[3]),
            end_row: parse_row(&captures[4])?,
        };
        if range.start_col > range.end_col {
            return Err(anyhow!("Cell range '{raw}' has reversed columns"));
        }
        if let (Some(start), Some(end)) = (range.start_row, range.end_row) {
            if start > end {
                return Err(anyhow!("Cell range '{raw}' has reversed rows"));
            }
        }
        Ok(range)
    }
}

impl CellRange {
    /// Restricts a grid to this range. Rows outside the grid are simply
    /// absent; short rows yield however many cells fall inside the columns.
    pub fn apply(&self, grid: &Grid) -> Grid {
        let first = self.start_row.map(|r| r - 1).unwrap_or(0);
        let last = self.end_row.unwrap_or(grid.len());
        grid.iter()
            .skip(first)
            .take(last.saturating_sub(first))
            .map(|row| {
                row.iter()
                    .skip(self.start_col)
                    .take(self.end_col - self.start_col + 1)
                    .cloned()
                    .collect()
            })
            .collect()
    }
}

/// Pads a row with empty cells up to `width`, or truncates past it, so every
/// data row aligns with the header count.
pub fn align_row(mut row: Vec<String>, width: usize) -> Vec<String> {
    if row.len() < width {
        row.resize(width, String::new());
    } else {
        row.truncate(width);
    }
    row
}

/// One sheet read: where it lives, how it is addressed, what to restrict to.
#[derive(Debug, Clone)]
pub struct SheetRequest<'a> {
    pub spreadsheet_id: &'a str,
    pub sheet: &'a str,
    pub addressing: SheetAddressing,
    pub range: Option<CellRange>,
    /// Encoding label for the exported sheet data (defaults to utf-8).
    pub encoding: Option<&'a str>,
}

/// Where sheet grids come from.
pub trait SheetSource {
    /// Reads the full grid of one sheet, optionally restricted to a cell
    /// range. An unreachable sheet is an error; an empty sheet is an empty
    /// grid.
    fn read_grid(&self, request: &SheetRequest<'_>) -> Result<Grid>;
}

/// Reads sheet grids from per-sheet CSV exports under a root directory.
pub struct CsvSheetSource {
    root: PathBuf,
}

impl CsvSheetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn sheet_path(&self, spreadsheet_id: &str, sheet: &str) -> PathBuf {
        self.root.join(spreadsheet_id).join(format!("{sheet}.csv"))
    }
}

impl SheetSource for CsvSheetSource {
    fn read_grid(&self, request: &SheetRequest<'_>) -> Result<Grid> {
        let encoding = io_utils::resolve_encoding(request.encoding)?;
        let path = self.sheet_path(request.spreadsheet_id, request.sheet);
        let context = || {
            format!(
                "Reading sheet '{}' of '{}'",
                request.sheet, request.spreadsheet_id
            )
        };
        let mut reader = io_utils::open_csv_reader_from_path(&path, DEFAULT_DELIMITER, false)
            .with_context(context)?;

        let mut grid = Grid::new();
        let mut record = csv::ByteRecord::new();
        while reader.read_byte_record(&mut record).with_context(context)? {
            grid.push(io_utils::decode_record(&record, encoding)?);
        }

        Ok(match &request.range {
            Some(range) => range.apply(&grid),
            None => grid,
        })
    }
}
