//! Persisted migration status.
//!
//! An applied migration has an entry in the `Migration` dataset keyed by its
//! name. The value is the CBOR encoding of [`AppliedRecord`]. Absence of the
//! entry means the migration is pending.

use std::collections::BTreeMap;

use keel_store::{Dataset, Label, ReadTx, RwTx};
use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};
use crate::version::SchemaVersion;

/// What is stored for an applied migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedRecord {
    /// When the migration committed (Unix ms).
    pub applied_at: i64,
    /// Schema version of the build that applied it.
    pub schema_version: SchemaVersion,
}

impl AppliedRecord {
    pub fn encode(&self, name: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| MigrateError::InvalidRecord {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(buf)
    }

    pub fn decode(name: &str, bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| MigrateError::InvalidRecord {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Status of one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    pub name: String,
    pub label: Label,
    /// `Some` iff the migration has been applied.
    pub applied: Option<AppliedRecord>,
}

impl MigrationRecord {
    pub fn is_applied(&self) -> bool {
        self.applied.is_some()
    }
}

/// Read every applied record, keyed by migration name.
pub fn read_applied(tx: &ReadTx<'_>) -> Result<BTreeMap<String, AppliedRecord>> {
    let mut applied = BTreeMap::new();
    tx.scan_range(Dataset::MIGRATIONS, &[], usize::MAX, |key, value| {
        let name = std::str::from_utf8(key).map_err(|e| MigrateError::InvalidRecord {
            name: String::from_utf8_lossy(key).into_owned(),
            reason: e.to_string(),
        })?;
        applied.insert(name.to_string(), AppliedRecord::decode(name, value)?);
        Ok::<_, MigrateError>(())
    })?;
    Ok(applied)
}

/// Mark `name` as applied inside the caller's transaction.
pub fn mark_applied(tx: &RwTx<'_>, name: &str, record: &AppliedRecord) -> Result<()> {
    tx.put(Dataset::MIGRATIONS, name.as_bytes(), &record.encode(name)?)?;
    Ok(())
}
