//! Live store handles.
//!
//! A handle owns the directory lock and one SQLite connection. Its label and
//! access mode are fixed at construction. The connection sits behind a
//! mutex so a shared handle can be used from several threads.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use rusqlite::{Connection, TransactionBehavior};

use crate::error::{Result, StoreError};
use crate::lock::LockFile;
use crate::options::StoreOptions;
use crate::schema;
use crate::tx::{ReadTx, RwTx};
use crate::types::{AccessMode, Label, Verbosity};

/// Name of the data file inside a store directory.
pub const DATA_FILE_NAME: &str = "data.db";

/// A live connection to a store.
///
/// Dropping a handle releases it; [`StoreHandle::close`] does the same but
/// reports errors. Either way the handle cannot be used again.
pub struct StoreHandle {
    // Field order matters: the connection closes before the lock is released.
    conn: Mutex<Connection>,
    lock: LockFile,
    path: PathBuf,
    label: Label,
    verbosity: Verbosity,
}

impl StoreHandle {
    pub(crate) fn open(opts: &StoreOptions) -> Result<Self> {
        prepare_dir(&opts.path)?;
        let lock = LockFile::acquire(&opts.path, opts.mode)?;
        let verbosity = opts.verbosity.unwrap_or(Verbosity::DEFAULT);

        let mut conn = Connection::open(opts.path.join(DATA_FILE_NAME))?;
        conn.busy_timeout(opts.busy_timeout)?;
        if opts.mode.is_exclusive() {
            let _: String =
                conn.pragma_update_and_check(None, "locking_mode", "EXCLUSIVE", |row| row.get(0))?;
        }
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        schema::prepare(&mut conn, &opts.path, opts.label, opts.mode)?;

        if verbosity >= Verbosity::Debug {
            tracing::debug!(
                path = %opts.path.display(),
                label = %opts.label,
                mode = %opts.mode,
                "opened store"
            );
        }

        Ok(Self {
            conn: Mutex::new(conn),
            lock,
            path: opts.path.clone(),
            label: opts.label,
            verbosity,
        })
    }

    /// Store directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schema domain of the store.
    pub fn label(&self) -> Label {
        self.label
    }

    /// Access mode, fixed at open time.
    pub fn mode(&self) -> AccessMode {
        self.lock.mode()
    }

    /// Effective diagnostic level.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Run `f` inside a read-only transaction.
    pub fn view<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&ReadTx<'_>) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        self.with_conn(|conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Deferred)
                .map_err(StoreError::from)?;
            let read = ReadTx::new(tx);
            let out = f(&read)?;
            read.finish()?;
            Ok(out)
        })
    }

    /// Run `f` inside a read-write transaction.
    ///
    /// The transaction commits if `f` returns `Ok` and rolls back otherwise.
    pub fn update<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&RwTx<'_>) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        self.with_conn(|conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(StoreError::from)?;
            let rw = RwTx::new(tx);
            let out = f(&rw)?;
            rw.commit()?;
            if self.verbosity >= Verbosity::Trace {
                tracing::trace!(path = %self.path.display(), "committed write transaction");
            }
            Ok(out)
        })
    }

    /// Close the handle, releasing its lock.
    pub fn close(self) -> Result<()> {
        let StoreHandle {
            conn,
            lock,
            path,
            label,
            verbosity,
        } = self;
        let mode = lock.mode();

        // A poisoned connection is still safe to close.
        let conn = conn.into_inner().unwrap_or_else(PoisonError::into_inner);
        let closed = conn.close().map_err(|(_, e)| StoreError::Database(e));
        drop(lock);

        if verbosity >= Verbosity::Debug {
            tracing::debug!(path = %path.display(), %label, %mode, "closed store");
        }
        closed
    }

    fn with_conn<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Connection) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        f(&mut conn)
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("path", &self.path)
            .field("label", &self.label)
            .field("mode", &self.mode())
            .finish()
    }
}

fn prepare_dir(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(StoreError::InvalidPath {
            path: path.to_path_buf(),
            reason: "empty path".to_string(),
        });
    }
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(StoreError::InvalidPath {
            path: path.to_path_buf(),
            reason: "not a directory".to_string(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            fs::create_dir_all(path)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
