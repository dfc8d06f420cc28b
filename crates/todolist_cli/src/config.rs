//! Command-line arguments and runtime configuration.
//!
//! # Responsibility
//! - Parse flags and environment overrides into one `AppConfig`.
//! - Resolve default locations under the platform data directory.
//!
//! # Invariants
//! - `AppConfig::log_dir` is always absolute (core logging requires it).

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use todolist_core::{default_log_level, ItemId, LogLevel};

const APP_DIR_NAME: &str = "todolist";
const DB_FILE_NAME: &str = "todolist.sqlite3";
const LOG_DIR_NAME: &str = "logs";

#[derive(Debug, Parser)]
#[command(name = "todolist", version, about = "Keep a persistent to-do list")]
pub struct Cli {
    /// SQLite database file.
    #[arg(long, env = "TODOLIST_DB", global = true)]
    pub db: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, env = "TODOLIST_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Directory for rolling log files.
    #[arg(long, env = "TODOLIST_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Add a new item.
    Add { name: String },
    /// Rename an existing item.
    Rename { id: ItemId, name: String },
    /// Delete an item.
    Delete {
        id: ItemId,
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// List all items in creation order.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one item.
    Show {
        id: ItemId,
        #[arg(long)]
        json: bool,
    },
}

/// Fully resolved settings for one CLI run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_level: LogLevel,
    pub log_dir: PathBuf,
}

impl AppConfig {
    /// Resolves flags, falling back to `<data dir>/todolist/`.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let data_dir = || -> Result<PathBuf> {
            dirs::data_dir()
                .map(|dir| dir.join(APP_DIR_NAME))
                .ok_or_else(|| anyhow!("no platform data directory; pass --db and --log-dir"))
        };

        let db_path = match &cli.db {
            Some(path) => path.clone(),
            None => data_dir()?.join(DB_FILE_NAME),
        };
        let log_dir = match &cli.log_dir {
            Some(path) => absolutize(path)?,
            None => data_dir()?.join(LOG_DIR_NAME),
        };
        let log_level = match &cli.log_level {
            Some(level) => level
                .parse::<LogLevel>()
                .map_err(|err| anyhow!("{err}"))?,
            None => default_log_level(),
        };

        Ok(Self {
            db_path,
            log_level,
            log_dir,
        })
    }
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, Cli, Command};
    use clap::Parser;
    use std::path::PathBuf;
    use todolist_core::LogLevel;

    #[test]
    fn explicit_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "todolist",
            "--db",
            "/tmp/todo.sqlite3",
            "--log-level",
            "WARN",
            "--log-dir",
            "/tmp/todo-logs",
            "list",
        ])
        .unwrap();
        let config = AppConfig::resolve(&cli).unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/todo.sqlite3"));
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.log_dir, PathBuf::from("/tmp/todo-logs"));
        assert_eq!(cli.command, Command::List { json: false });
    }

    #[test]
    fn relative_log_dir_is_made_absolute() {
        let cli = Cli::try_parse_from([
            "todolist",
            "--db",
            "/tmp/todo.sqlite3",
            "--log-dir",
            "logs",
            "list",
        ])
        .unwrap();
        let config = AppConfig::resolve(&cli).unwrap();
        assert!(config.log_dir.is_absolute());
        assert!(config.log_dir.ends_with("logs"));
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let cli = Cli::try_parse_from([
            "todolist",
            "--db",
            "/tmp/todo.sqlite3",
            "--log-dir",
            "/tmp/todo-logs",
            "--log-level",
            "loud",
            "list",
        ])
        .unwrap();
        let err = AppConfig::resolve(&cli).unwrap_err();
        assert!(err.to_string().contains("unsupported log level"));
    }

    #[test]
    fn rename_requires_a_valid_id() {
        assert!(Cli::try_parse_from(["todolist", "rename", "not-a-uuid", "x"]).is_err());
    }
}
