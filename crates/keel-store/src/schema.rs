//! On-disk layout of the store file.
//!
//! The store keeps every dataset in one `kv` table. The layout is versioned
//! through SQLite's `user_version`; each layout step transforms version N to
//! N+1. This is the store's own physical layout, independent of the schema
//! migrations run by `keel-migrate` on top of it.
//!
//! A fresh store gets the base layout from whichever handle opens it first.
//! Steps past the base layout rewrite existing data and only run on
//! exclusive handles.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::dataset::Dataset;
use crate::error::{Result, StoreError};
use crate::types::{AccessMode, Label};

/// Current layout version.
pub const LAYOUT_VERSION: u32 = 1;

/// Layout created on an empty file. Any handle may apply it.
pub const BASE_LAYOUT_VERSION: u32 = 1;

/// `DbInfo` key holding the label the store was created for.
pub const LABEL_KEY: &[u8] = b"label";

/// Bring the layout up to date and bind the store to `label`.
///
/// Idempotent; safe to run from every handle on open.
pub fn prepare(conn: &mut Connection, path: &Path, label: Label, mode: AccessMode) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let current: u32 = tx.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current > LAYOUT_VERSION {
        return Err(StoreError::InvalidData(format!(
            "store layout version {} is newer than supported version {}",
            current, LAYOUT_VERSION
        )));
    }
    for version in (current + 1)..=LAYOUT_VERSION {
        check_layout_step(version, mode)?;
        apply_layout(&tx, version)?;
        tx.pragma_update(None, "user_version", version)?;
    }

    tx.execute(
        "INSERT OR IGNORE INTO kv (dataset, key, value) VALUES (?1, ?2, ?3)",
        params![Dataset::DATABASE_INFO.name(), LABEL_KEY, label.as_str().as_bytes()],
    )?;
    let stored: Option<Vec<u8>> = tx
        .query_row(
            "SELECT value FROM kv WHERE dataset = ?1 AND key = ?2",
            params![Dataset::DATABASE_INFO.name(), LABEL_KEY],
            |row| row.get(0),
        )
        .optional()?;
    tx.commit()?;

    match stored {
        Some(found) if found == label.as_str().as_bytes() => Ok(()),
        Some(found) => Err(StoreError::LabelMismatch {
            path: path.to_path_buf(),
            requested: label,
            found: String::from_utf8_lossy(&found).into_owned(),
        }),
        None => Err(StoreError::InvalidData("store label missing".to_string())),
    }
}

fn check_layout_step(version: u32, mode: AccessMode) -> Result<()> {
    if version > BASE_LAYOUT_VERSION && !mode.is_exclusive() {
        return Err(StoreError::InvalidData(format!(
            "store layout step to version {} requires an exclusive handle",
            version
        )));
    }
    Ok(())
}

fn apply_layout(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::InvalidData(format!(
            "unknown layout version: {}",
            version
        ))),
    }
}

/// Layout v1: a single ordered key-value table.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv (
            dataset TEXT NOT NULL,     -- dataset name
            key BLOB NOT NULL,         -- compared bytewise
            value BLOB NOT NULL,
            PRIMARY KEY (dataset, key)
        ) WITHOUT ROWID;
        "#,
    )?;
    Ok(())
}
