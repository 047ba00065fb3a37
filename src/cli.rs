use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::loader::DB_BATCH_SIZE;

#[derive(Debug, Parser)]
#[command(author, version, about = "Stage spreadsheet exports into an append-only, deduplicated landing zone", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sample configured sources and infer staging schemas into YAML and DDL
    Probe(ProbeArgs),
    /// Incrementally load configured sources into the staging store
    Sync(SyncArgs),
    /// Report row counts for the staging tables of configured sources
    Counts(CountsArgs),
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Configuration file describing sources and data directories
    #[arg(short, long, default_value = "sheetstage.yaml")]
    pub config: PathBuf,
    /// Destination for the generated staging DDL script
    #[arg(long, default_value = "inferred_schema.sql")]
    pub ddl: PathBuf,
    /// Directory to write per-table schema YAML files into
    #[arg(long = "schema-dir")]
    pub schema_dir: Option<PathBuf>,
    /// Number of data rows to sample per source (0 means all)
    #[arg(long, default_value_t = 2000)]
    pub sample_rows: usize,
    /// Restrict to specific configured sources (repeatable)
    #[arg(long = "source", action = clap::ArgAction::Append)]
    pub source: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Configuration file describing sources and data directories
    #[arg(short, long, default_value = "sheetstage.yaml")]
    pub config: PathBuf,
    /// Restrict to specific configured sources (repeatable)
    #[arg(long = "source", action = clap::ArgAction::Append)]
    pub source: Vec<String>,
    /// Rows per append batch
    #[arg(long = "batch-size", default_value_t = DB_BATCH_SIZE)]
    pub batch_size: usize,
}

#[derive(Debug, Args)]
pub struct CountsArgs {
    /// Configuration file describing sources and data directories
    #[arg(short, long, default_value = "sheetstage.yaml")]
    pub config: PathBuf,
}
