//! Read-only and read-write transactions over the key-value table.

use std::ops::Deref;

use rusqlite::{params, OptionalExtension, Transaction};

use crate::dataset::Dataset;
use crate::error::{Result, StoreError};

/// A read-only transaction.
///
/// Obtained through [`StoreHandle::view`](crate::StoreHandle::view). It is
/// always rolled back when the view ends.
pub struct ReadTx<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> ReadTx<'conn> {
    pub(crate) fn new(tx: Transaction<'conn>) -> Self {
        Self { tx }
    }

    /// Get the value stored under `key`.
    pub fn get(&self, dataset: Dataset, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut stmt = self
            .tx
            .prepare_cached("SELECT value FROM kv WHERE dataset = ?1 AND key = ?2")?;
        Ok(stmt
            .query_row(params![dataset.name(), key], |row| row.get(0))
            .optional()?)
    }

    /// Check whether `key` exists.
    pub fn has(&self, dataset: Dataset, key: &[u8]) -> Result<bool> {
        let mut stmt = self
            .tx
            .prepare_cached("SELECT 1 FROM kv WHERE dataset = ?1 AND key = ?2")?;
        Ok(stmt.exists(params![dataset.name(), key])?)
    }

    /// Number of entries in a dataset.
    pub fn count(&self, dataset: Dataset) -> Result<u64> {
        let count: i64 = self.tx.query_row(
            "SELECT COUNT(*) FROM kv WHERE dataset = ?1",
            params![dataset.name()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Visit up to `max_count` entries with `key >= start`, in key order.
    ///
    /// Returns the number of entries visited. An error returned by `visit`
    /// stops the scan and is propagated.
    pub fn scan_range<F, E>(
        &self,
        dataset: Dataset,
        start: &[u8],
        max_count: usize,
        mut visit: F,
    ) -> std::result::Result<usize, E>
    where
        F: FnMut(&[u8], &[u8]) -> std::result::Result<(), E>,
        E: From<StoreError>,
    {
        if max_count == 0 {
            return Ok(0);
        }

        let limit = i64::try_from(max_count).unwrap_or(i64::MAX);
        let mut stmt = self
            .tx
            .prepare_cached(
                "SELECT key, value FROM kv
                 WHERE dataset = ?1 AND key >= ?2
                 ORDER BY key
                 LIMIT ?3",
            )
            .map_err(StoreError::from)?;
        let mut rows = stmt
            .query(params![dataset.name(), start, limit])
            .map_err(StoreError::from)?;

        let mut visited = 0;
        while let Some(row) = rows.next().map_err(StoreError::from)? {
            let key: Vec<u8> = row.get(0).map_err(StoreError::from)?;
            let value: Vec<u8> = row.get(1).map_err(StoreError::from)?;
            visit(&key, &value)?;
            visited += 1;
        }
        Ok(visited)
    }

    pub(crate) fn finish(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }
}

/// A read-write transaction.
///
/// Obtained through [`StoreHandle::update`](crate::StoreHandle::update).
/// Committed only if the update closure returns `Ok`. All read methods of
/// [`ReadTx`] are available through `Deref`.
pub struct RwTx<'conn> {
    read: ReadTx<'conn>,
}

impl<'conn> RwTx<'conn> {
    pub(crate) fn new(tx: Transaction<'conn>) -> Self {
        Self {
            read: ReadTx::new(tx),
        }
    }

    /// Insert or overwrite a value.
    pub fn put(&self, dataset: Dataset, key: &[u8], value: &[u8]) -> Result<()> {
        let mut stmt = self.read.tx.prepare_cached(
            "INSERT INTO kv (dataset, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT (dataset, key) DO UPDATE SET value = excluded.value",
        )?;
        stmt.execute(params![dataset.name(), key, value])?;
        Ok(())
    }

    /// Delete a key. Returns whether it existed.
    pub fn delete(&self, dataset: Dataset, key: &[u8]) -> Result<bool> {
        let mut stmt = self
            .read
            .tx
            .prepare_cached("DELETE FROM kv WHERE dataset = ?1 AND key = ?2")?;
        Ok(stmt.execute(params![dataset.name(), key])? > 0)
    }

    /// Remove every entry of a dataset. Returns the number removed.
    pub fn clear(&self, dataset: Dataset) -> Result<usize> {
        Ok(self
            .read
            .tx
            .execute("DELETE FROM kv WHERE dataset = ?1", params![dataset.name()])?)
    }

    pub(crate) fn commit(self) -> Result<()> {
        self.read.tx.commit()?;
        Ok(())
    }
}

impl<'conn> Deref for RwTx<'conn> {
    type Target = ReadTx<'conn>;

    fn deref(&self) -> &Self::Target {
        &self.read
    }
}
