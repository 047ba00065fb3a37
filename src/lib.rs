pub mod cleaner;
pub mod cli;
pub mod columns;
pub mod config;
pub mod grid;
pub mod hash;
pub mod io_utils;
pub mod loader;
pub mod pipeline;
pub mod probe;
pub mod schema;
pub mod store;
pub mod value;

use std::{collections::BTreeSet, env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, info, warn};

use crate::{
    cli::{Cli, Commands, CountsArgs},
    config::Config,
    store::{CsvStore, StagingStore},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheetstage", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => probe::execute(&args),
        Commands::Sync(args) => pipeline::execute(&args),
        Commands::Counts(args) => handle_counts(&args),
    }
}

fn handle_counts(args: &CountsArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let store = CsvStore::new(&config.staging_dir)?;
    let tables: BTreeSet<&str> = config
        .sources
        .values()
        .map(|source| source.table.as_str())
        .collect();
    for table in tables {
        match store.row_count(table) {
            Ok(count) => info!("staging.{table}: {count} row(s)"),
            Err(err) => warn!("staging.{table}: {err:#}"),
        }
    }
    Ok(())
}
