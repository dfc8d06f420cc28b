//! Item database: connection setup and schema upgrades.
//!
//! The store only ever sees connections returned from [`open_db`] or
//! [`open_db_in_memory`], which are already at [`migrations::supported_version`].

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A schema step failed; nothing from the upgrade was committed.
    Migration {
        version: u32,
        step: &'static str,
        source: rusqlite::Error,
    },
    /// The file was last written by a newer todolist build.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Migration {
                version,
                step,
                source,
            } => write!(f, "schema step v{version} `{step}` failed: {source}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "item database is at schema v{found}, this build only understands up to v{supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
