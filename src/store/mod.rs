// ==========================================
// Warehouse Receipting - transactional store
// ==========================================
// Single-writer / multi-reader over one SQLite file.
// - with_write_tx: acquires the writer immediately (BEGIN IMMEDIATE),
//   commits on Ok, rolls back on Err. All-or-nothing.
// - with_read_tx: pooled read-only connections, parallel with the writer.
// Migrations are applied once at open.
// ==========================================

pub mod cancel;
pub mod migrate;

pub use cancel::CancelToken;

use crate::db;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Max idle read connections retained by the pool.
const READ_POOL_CAP: usize = 8;

/// Handle to the embedded store. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    writer: Arc<Mutex<Connection>>,
    readers: Arc<ReadPool>,
}

impl Store {
    /// Open (or create) the data file and apply pending migrations.
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let mut writer = db::open_writer(db_path)?;
        let applied = migrate::run(&mut writer)?;
        if applied > 0 {
            debug!(applied, db_path, "store migrated");
        }

        Ok(Self {
            writer: Arc::new(Mutex::new(writer)),
            readers: Arc::new(ReadPool::new(db_path)),
        })
    }

    /// Run `f` inside the single write transaction.
    ///
    /// The writer lock is taken up front and the transaction begins in
    /// IMMEDIATE mode, so there is no deferred upgrade. Any Err from `f`
    /// (or a cancellation observed before commit) rolls back the whole
    /// transaction.
    pub fn with_write_tx<T>(
        &self,
        cancel: &CancelToken,
        f: impl FnOnce(&Transaction<'_>) -> RepositoryResult<T>,
    ) -> RepositoryResult<T> {
        cancel.check()?;
        let mut guard = self.lock_writer()?;
        cancel.check()?;

        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let value = f(&tx)?; // Err drops tx => rollback
        cancel.check()?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(value)
    }

    /// Run `f` inside a read-only transaction on a pooled connection.
    /// Mutation attempts inside fail (`PRAGMA query_only`).
    pub fn with_read_tx<T>(
        &self,
        cancel: &CancelToken,
        f: impl FnOnce(&Connection) -> RepositoryResult<T>,
    ) -> RepositoryResult<T> {
        cancel.check()?;
        let conn = self.readers.acquire()?;

        let result = (|| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
            let value = f(&tx)?;
            tx.commit()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
            Ok(value)
        })();

        self.readers.release(conn);
        result
    }

    fn lock_writer(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

// ==========================================
// ReadPool - recycled read-only connections
// ==========================================
struct ReadPool {
    db_path: String,
    idle: Mutex<Vec<Connection>>,
}

impl ReadPool {
    fn new(db_path: &str) -> Self {
        Self {
            db_path: db_path.to_string(),
            idle: Mutex::new(Vec::new()),
        }
    }

    fn acquire(&self) -> RepositoryResult<Connection> {
        let recycled = self
            .idle
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?
            .pop();

        match recycled {
            Some(conn) => Ok(conn),
            None => Ok(db::open_reader(&self.db_path)?),
        }
    }

    fn release(&self, conn: Connection) {
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < READ_POOL_CAP {
                idle.push(conn);
            }
        }
        // Over cap (or poisoned lock): the connection just closes.
    }
}
