//! Shared store handle with explicit lifecycle and transaction scopes.
//!
//! # Responsibility
//! - Own one migrated SQLite connection for the process (or one test).
//! - Serialize access so concurrent request handlers can share the handle.
//! - Provide `read` and `write` transaction scopes for services.
//!
//! # Invariants
//! - `write` uses `BEGIN IMMEDIATE`, so a read-diff-write sequence inside one
//!   closure cannot interleave with another writer.
//! - A closure returning `Err` never commits; the transaction is rolled back
//!   when it is dropped.

use crate::db::{open_db, open_db_in_memory, DbError, DbResult};
use crate::error::CoreResult;
use log::debug;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Explicitly constructed storage handle passed into every service call.
///
/// `Store` is `Send + Sync`; wrap it in an `Arc` to share it between
/// request handlers.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (or creates) a store file and applies pending migrations.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens an isolated in-memory store.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps a connection returned by [`open_db`] or [`open_db_in_memory`].
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Closes the underlying connection, surfacing any close failure.
    pub fn close(self) -> DbResult<()> {
        let conn = self
            .conn
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        conn.close().map_err(|(_, err)| DbError::Sqlite(err))
    }

    /// Runs `f` inside a deferred read transaction.
    ///
    /// Every query issued by `f` observes the same committed snapshot.
    pub fn read<T>(&self, f: impl FnOnce(&Transaction<'_>) -> CoreResult<T>) -> CoreResult<T> {
        self.run(TransactionBehavior::Deferred, "read", f)
    }

    /// Runs `f` inside an immediate write transaction.
    ///
    /// Commits only when `f` returns `Ok`; any error rolls back every row
    /// change made by `f`.
    pub fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> CoreResult<T>) -> CoreResult<T> {
        self.run(TransactionBehavior::Immediate, "write", f)
    }

    /// Locks the raw connection for maintenance work outside the service
    /// layer, such as fixture setup in tests.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock only means another caller panicked mid-call; its
        // transaction was rolled back on unwind, so the connection is usable.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run<T>(
        &self,
        behavior: TransactionBehavior,
        scope: &'static str,
        f: impl FnOnce(&Transaction<'_>) -> CoreResult<T>,
    ) -> CoreResult<T> {
        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(behavior)
            .map_err(DbError::from)?;
        match f(&tx) {
            Ok(value) => {
                tx.commit().map_err(DbError::from)?;
                Ok(value)
            }
            Err(err) => {
                debug!(
                    "event=tx_rollback module=db status=error scope={scope} error_kind={}",
                    err.kind().as_str()
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Store;
    use crate::error::CoreError;

    #[test]
    fn store_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Store>();
    }

    #[test]
    fn failed_write_rolls_back_all_rows() {
        let store = Store::open_in_memory().unwrap();
        let result: Result<(), CoreError> = store.write(|tx| {
            tx.execute(
                "INSERT INTO tags (id, name) VALUES ('t-1', 'kept?');",
                [],
            )?;
            Err(CoreError::Validation("abort".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = store
            .lock()
            .query_row("SELECT COUNT(*) FROM tags;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn close_releases_connection() {
        let store = Store::open_in_memory().unwrap();
        store.close().unwrap();
    }
}
