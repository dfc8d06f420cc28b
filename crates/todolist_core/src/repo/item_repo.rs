//! Item repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the four-operation durable storage contract used by the store.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Every contract operation applies fully or not at all.
//! - Write paths validate names before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it, using
//!   the same name rule as writes.
//! - Deleted ids are retired in the same transaction as the delete and can
//!   never be inserted again.

use crate::db::migrations::{schema_version, supported_version};
use crate::db::DbError;
use crate::model::item::{validate_name, ItemId, ItemRecord, ItemValidationError};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ITEM_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    created_at
FROM items";

const REQUIRED_TABLES: &[&str] = &["items", "retired_item_ids"];
const REQUIRED_ITEM_COLUMNS: &[&str] = &["uuid", "name", "created_at", "updated_at"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for item persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ItemValidationError),
    Db(DbError),
    NotFound(ItemId),
    /// Id is already live or was retired by a delete.
    DuplicateId(ItemId),
    InvalidData(String),
    /// Connection has not been migrated to the schema this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::DuplicateId(id) => write!(f, "item id already used: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable storage contract consumed by `TaskStore`.
///
/// Each method is a single unit of work: it either fully applies or returns
/// an error with no observable partial write.
pub trait ItemRepository {
    /// Persists a new item. Fails with `DuplicateId` if the id is live or retired.
    fn insert_item(&self, item: &ItemRecord) -> RepoResult<()>;
    /// Replaces the name of an existing item. Fails with `NotFound` otherwise.
    fn update_item_name(&self, id: ItemId, name: &str) -> RepoResult<()>;
    /// Removes an item and retires its id. Fails with `NotFound` otherwise.
    fn delete_item(&self, id: ItemId) -> RepoResult<()>;
    /// Reads every live item, ordered by `created_at ASC, uuid ASC`.
    fn fetch_all_items(&self) -> RepoResult<Vec<ItemRecord>>;
}

/// SQLite-backed item repository.
///
/// Owns its connection so one store instance can hold it for the process
/// lifetime and move it across threads.
pub struct SqliteItemRepository {
    conn: Connection,
}

impl SqliteItemRepository {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when `PRAGMA user_version` is not the latest.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   does not match what this binary writes.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self { conn })
    }

    /// Borrow the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn id_is_used(&self, id: ItemId) -> RepoResult<bool> {
        let used = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM items WHERE uuid = ?1)
                 OR EXISTS(SELECT 1 FROM retired_item_ids WHERE uuid = ?1);",
            [id.to_string()],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(used)
    }
}

impl ItemRepository for SqliteItemRepository {
    fn insert_item(&self, item: &ItemRecord) -> RepoResult<()> {
        validate_name(item.name())?;

        let tx = self.conn.unchecked_transaction()?;
        if self.id_is_used(item.id())? {
            return Err(RepoError::DuplicateId(item.id()));
        }
        tx.execute(
            "INSERT INTO items (
                uuid,
                name,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?3);",
            params![item.id().to_string(), item.name(), item.created_at()],
        )?;
        tx.commit()?;

        Ok(())
    }

    fn update_item_name(&self, id: ItemId, name: &str) -> RepoResult<()> {
        validate_name(name)?;

        let changed = self.conn.execute(
            "UPDATE items
             SET
                name = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![id.to_string(), name],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn delete_item(&self, id: ItemId) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute("DELETE FROM items WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        tx.execute(
            "INSERT OR IGNORE INTO retired_item_ids (uuid) VALUES (?1);",
            [id.to_string()],
        )?;
        tx.commit()?;

        Ok(())
    }

    fn fetch_all_items(&self) -> RepoResult<Vec<ItemRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} ORDER BY created_at ASC, uuid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();

        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }

        Ok(items)
    }
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<ItemRecord> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in items.uuid"))
    })?;

    let name: String = row.get("name")?;
    let created_at: i64 = row.get("created_at")?;

    ItemRecord::new(uuid, name, created_at)
        .map_err(|err| RepoError::InvalidData(format!("{err} (items.name for {uuid})")))
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = supported_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in REQUIRED_TABLES {
        let exists = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
                [table],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('items');")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    for &column in REQUIRED_ITEM_COLUMNS {
        if !columns.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: "items",
                column,
            });
        }
    }

    Ok(())
}
