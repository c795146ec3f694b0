//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::{Path, PathBuf};

use keel_store::keys::{composite_key, encode_block_number};
use keel_store::{AccessMode, Dataset, Label, StoreError, StoreHandle, StoreOptions};
use tempfile::TempDir;

/// A temporary data directory holding one store.
///
/// The directory is removed when the fixture is dropped.
pub struct TestStore {
    dir: TempDir,
    label: Label,
}

impl TestStore {
    /// A fresh data directory for the chain label.
    pub fn new() -> Self {
        Self::with_label(Label::Chain)
    }

    pub fn with_label(label: Label) -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
            label,
        }
    }

    /// Root data directory.
    pub fn datadir(&self) -> &Path {
        self.dir.path()
    }

    /// Store directory: `<datadir>/<label>`.
    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join(self.label.as_str())
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn options(&self) -> StoreOptions {
        StoreOptions::new(self.store_path()).label(self.label)
    }

    /// Open a handle in `mode`.
    pub fn open(&self, mode: AccessMode) -> Result<StoreHandle, StoreError> {
        self.options().mode(mode).open()
    }

    /// Open a shared handle, panicking on failure.
    pub fn shared(&self) -> StoreHandle {
        self.open(AccessMode::Shared).expect("open shared handle")
    }

    /// Open an exclusive handle, panicking on failure.
    pub fn exclusive(&self) -> StoreHandle {
        self.open(AccessMode::Exclusive).expect("open exclusive handle")
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic 32-byte hash for block `number`.
pub fn block_hash(number: u64) -> [u8; 32] {
    *blake3::hash(&encode_block_number(number)).as_bytes()
}

/// Write `count` blocks starting at `from`: header, body and canonical entry.
///
/// Header values are 500 bytes and body values 64 bytes, both filled with
/// the low byte of the block number.
pub fn seed_blocks(handle: &StoreHandle, from: u64, count: u64) -> Result<(), StoreError> {
    handle.update(|tx| {
        for number in from..from + count {
            let hash = block_hash(number);
            let key = composite_key(number, &hash);
            tx.put(Dataset::HEADERS, &key, &[number as u8; 500])?;
            tx.put(Dataset::BLOCK_BODY, &key, &[number as u8; 64])?;
            tx.put(Dataset::HEADER_CANONICAL, &encode_block_number(number), &hash)?;
        }
        Ok(())
    })
}
