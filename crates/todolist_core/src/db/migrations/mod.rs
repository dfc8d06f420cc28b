//! Ordered schema steps for the item database.
//!
//! # Invariants
//! - Step versions start at 1 and increase by exactly one.
//! - `PRAGMA user_version` holds the last applied step; all pending steps
//!   commit together or not at all.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "items",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        name: "retired_item_ids",
        sql: include_str!("0002_retired_ids.sql"),
    },
];

/// Schema version this build reads and writes.
pub fn supported_version() -> u32 {
    STEPS.len() as u32
}

/// Reads the version recorded in `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Brings `conn` up to [`supported_version`].
///
/// # Errors
/// - `SchemaTooNew` when the file is ahead of this build.
/// - `Migration` naming the first step that failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = schema_version(conn)?;
    let supported = supported_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }

    let mut pending = pending_steps(found).peekable();
    if pending.peek().is_none() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in pending {
        tx.execute_batch(step.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", step.version))
            .map_err(|source| DbError::Migration {
                version: step.version,
                step: step.name,
                source,
            })?;
        debug!(
            "event=db_migrate module=db status=applied version={} step={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        found, supported
    );
    Ok(())
}

fn pending_steps(found: u32) -> impl Iterator<Item = &'static SchemaStep> {
    STEPS.iter().filter(move |step| step.version > found)
}

#[cfg(test)]
mod tests {
    use super::{pending_steps, supported_version, STEPS};

    #[test]
    fn step_versions_are_contiguous_from_one() {
        for (index, step) in STEPS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "step `{}`", step.name);
        }
    }

    #[test]
    fn pending_steps_skip_applied_versions() {
        let from_empty: Vec<_> = pending_steps(0).map(|step| step.version).collect();
        assert_eq!(from_empty, (1..=supported_version()).collect::<Vec<_>>());

        let from_first: Vec<_> = pending_steps(1).map(|step| step.name).collect();
        assert_eq!(from_first, ["retired_item_ids"]);

        assert_eq!(pending_steps(supported_version()).count(), 0);
    }
}
