//! `todolist` command-line entry point.
//!
//! # Responsibility
//! - Bootstrap logging and the SQLite-backed store once per process.
//! - Run one command and map failures to a non-zero exit code.

mod commands;
mod config;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use config::{AppConfig, Cli};
use log::info;
use std::io;
use std::process::ExitCode;
use todolist_core::db::open_db;
use todolist_core::{init_logging, SqliteItemRepository, StoreError, TaskStore};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<StoreError>() {
                Some(store_err) => eprintln!("error[{}]: {store_err}", store_err.error_code()),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::resolve(&cli)?;
    init_logging(config.log_level, &config.log_dir)
        .map_err(|err| anyhow!("failed to initialize logging: {err}"))?;

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }
    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open `{}`", config.db_path.display()))?;
    let store = TaskStore::open(SqliteItemRepository::try_new(conn)?)?;
    info!(
        "event=cli_start module=cli status=ok item_count={}",
        store.list().len()
    );

    commands::execute(
        &store,
        cli.command,
        &mut io::stdin().lock(),
        &mut io::stdout().lock(),
    )
}
