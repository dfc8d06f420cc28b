//! Item store with a synchronized read cache.
//!
//! # Responsibility
//! - Provide create/update/delete entry points over an `ItemRepository`.
//! - Keep an in-memory, ordered snapshot of durable state for listing.
//!
//! # Invariants
//! - Durable write first, then a full re-fetch of the cache. The cache is
//!   never patched in place.
//! - On any failure the cache is left exactly as it was.
//! - A create or rename whose follow-up refresh fails is undone in storage
//!   before the error is returned.
//! - At most one mutating operation (or refresh) runs at a time per store;
//!   `list` never waits on durable I/O.
//! - The cache is ordered by `created_at ASC, id ASC`.
//! - `created_at` values handed out by one store are strictly increasing.

use crate::model::item::{validate_name, ItemId, ItemRecord, ItemValidationError};
use crate::repo::item_repo::{ItemRepository, RepoError};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure kinds surfaced to store callers. All are recoverable.
#[derive(Debug)]
pub enum StoreError {
    /// Name is empty.
    InvalidInput(ItemValidationError),
    /// No live item has this id.
    NotFound(ItemId),
    /// Durable storage could not be read or written.
    StorageUnavailable(RepoError),
}

impl StoreError {
    /// Stable machine-readable code used in log lines and CLI output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::StorageUnavailable(_) => "storage_unavailable",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "invalid input: {err}"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::StorageUnavailable(err) => write!(f, "storage unavailable: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::NotFound(_) => None,
            Self::StorageUnavailable(err) => Some(err),
        }
    }
}

impl From<ItemValidationError> for StoreError {
    fn from(value: ItemValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::InvalidInput(err),
            other => Self::StorageUnavailable(other),
        }
    }
}

struct Writer<R> {
    repo: R,
    /// Newest `created_at` seen in storage or handed out by `create`.
    last_created_at: i64,
}

/// Durable to-do list with a read-optimized snapshot.
///
/// Construct once at startup with [`TaskStore::open`] and share by
/// reference. The store is `Sync` whenever the repository is `Send`.
pub struct TaskStore<R: ItemRepository> {
    writer: Mutex<Writer<R>>,
    cache: RwLock<Arc<Vec<ItemRecord>>>,
}

impl<R: ItemRepository> TaskStore<R> {
    /// Wraps `repo` and loads the initial cache.
    ///
    /// # Errors
    /// - `StorageUnavailable` when the initial read fails.
    pub fn open(repo: R) -> StoreResult<Self> {
        let store = Self {
            writer: Mutex::new(Writer {
                repo,
                last_created_at: i64::MIN,
            }),
            cache: RwLock::new(Arc::new(Vec::new())),
        };
        store.refresh()?;
        Ok(store)
    }

    /// Returns the current ordered snapshot without touching storage.
    pub fn list(&self) -> Arc<Vec<ItemRecord>> {
        Arc::clone(&self.cache.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Looks up one item in the current snapshot.
    pub fn get(&self, id: ItemId) -> Option<ItemRecord> {
        self.list().iter().find(|item| item.id() == id).cloned()
    }

    /// Re-reads every item from storage and swaps the snapshot.
    ///
    /// # Errors
    /// - `StorageUnavailable` when storage cannot be read. The previous
    ///   snapshot stays in place.
    pub fn refresh(&self) -> StoreResult<()> {
        let mut writer = self.lock_writer();
        self.refresh_locked(&mut writer)
    }

    /// Creates one item named `name` and returns it.
    ///
    /// # Errors
    /// - `InvalidInput` for an empty name; storage is not touched.
    /// - `StorageUnavailable` when the insert or the follow-up refresh
    ///   fails. A committed insert is deleted again, so no item exists.
    pub fn create(&self, name: impl Into<String>) -> StoreResult<ItemRecord> {
        let started_at = Instant::now();
        let name = name.into();
        if let Err(err) = validate_name(&name) {
            return Err(log_failure("item_create", started_at, err.into()));
        }

        let mut writer = self.lock_writer();
        let created_at = next_created_at(now_epoch_ms(), writer.last_created_at);
        let record = ItemRecord::new(Uuid::new_v4(), name, created_at)?;

        writer
            .repo
            .insert_item(&record)
            .map_err(|err| log_failure("item_create", started_at, err.into()))?;
        writer.last_created_at = created_at;
        if let Err(err) = self.refresh_locked(&mut writer) {
            log_rollback("item_create", record.id(), writer.repo.delete_item(record.id()));
            return Err(log_failure("item_create", started_at, err));
        }

        info!(
            "event=item_create module=store status=ok item_id={} duration_ms={}",
            record.id(),
            started_at.elapsed().as_millis()
        );
        Ok(record)
    }

    /// Renames an existing item, keeping its id and creation time.
    ///
    /// # Errors
    /// - `InvalidInput` for an empty name; checked before the id lookup.
    /// - `NotFound` when no live item has `id`.
    /// - `StorageUnavailable` when the write or the follow-up refresh
    ///   fails. A committed rename is reverted to the cached name.
    pub fn update(&self, id: ItemId, new_name: &str) -> StoreResult<()> {
        let started_at = Instant::now();
        if let Err(err) = validate_name(new_name) {
            return Err(log_failure("item_update", started_at, err.into()));
        }

        let mut writer = self.lock_writer();
        // Snapshot is current here: every write refreshes under this lock.
        let previous_name = self.get(id).map(|item| item.name().to_string());
        writer
            .repo
            .update_item_name(id, new_name)
            .map_err(|err| log_failure("item_update", started_at, err.into()))?;
        if let Err(err) = self.refresh_locked(&mut writer) {
            if let Some(name) = previous_name {
                log_rollback("item_update", id, writer.repo.update_item_name(id, &name));
            }
            return Err(log_failure("item_update", started_at, err));
        }

        info!(
            "event=item_update module=store status=ok item_id={} duration_ms={}",
            id,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Deletes an item. Its id is retired and never handed out again.
    ///
    /// # Errors
    /// - `NotFound` when no live item has `id`.
    /// - `StorageUnavailable` when the write or the follow-up refresh
    ///   fails. A retired id cannot be restored, so a committed delete
    ///   stands; the stale record leaves the cache on the next refresh.
    pub fn delete(&self, id: ItemId) -> StoreResult<()> {
        let started_at = Instant::now();

        let mut writer = self.lock_writer();
        writer
            .repo
            .delete_item(id)
            .map_err(|err| log_failure("item_delete", started_at, err.into()))?;
        self.refresh_locked(&mut writer)
            .map_err(|err| log_failure("item_delete", started_at, err))?;

        info!(
            "event=item_delete module=store status=ok item_id={} duration_ms={}",
            id,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Consumes the store and hands back its repository.
    pub fn into_repository(self) -> R {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .repo
    }

    fn lock_writer(&self) -> MutexGuard<'_, Writer<R>> {
        // Cache is swap-only, so a panic mid-operation cannot leave it torn.
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh_locked(&self, writer: &mut Writer<R>) -> StoreResult<()> {
        let started_at = Instant::now();
        let mut items = match writer.repo.fetch_all_items() {
            Ok(items) => items,
            Err(err) => {
                return Err(log_failure(
                    "cache_refresh",
                    started_at,
                    StoreError::StorageUnavailable(err),
                ));
            }
        };
        items.sort_by_key(ItemRecord::sort_key);

        if let Some(newest) = items.last() {
            writer.last_created_at = writer.last_created_at.max(newest.created_at());
        }

        let count = items.len();
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(items);

        debug!(
            "event=cache_refresh module=store status=ok item_count={} duration_ms={}",
            count,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}

fn log_failure(event: &str, started_at: Instant, err: StoreError) -> StoreError {
    warn!(
        "event={} module=store status=error duration_ms={} error_code={} error={}",
        event,
        started_at.elapsed().as_millis(),
        err.error_code(),
        err
    );
    err
}

fn log_rollback(event: &str, id: ItemId, result: Result<(), RepoError>) {
    match result {
        Ok(()) => info!(
            "event={}_rollback module=store status=ok item_id={}",
            event, id
        ),
        Err(err) => warn!(
            "event={}_rollback module=store status=error item_id={} error={}",
            event, id, err
        ),
    }
}

fn next_created_at(now_ms: i64, last_created_at: i64) -> i64 {
    now_ms.max(last_created_at.saturating_add(1))
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}
