//! Error types for the store module.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{AccessMode, Label};

/// Errors that can occur while opening or using a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store path cannot hold a store.
    #[error("invalid store path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    /// Another handle holds a conflicting lock on the path.
    #[error("store at {path} is locked, cannot open in {mode} mode")]
    Locked { path: PathBuf, mode: AccessMode },

    /// The store was created for a different label.
    #[error("store at {path} belongs to label {found}, not {requested}")]
    LabelMismatch {
        path: PathBuf,
        requested: Label,
        found: String,
    },

    /// Unknown label name.
    #[error("unknown label: {0}")]
    UnknownLabel(String),

    /// Verbosity level out of range.
    #[error("invalid verbosity level: {0}")]
    InvalidVerbosity(i8),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Internal lock on the connection was poisoned by a panicking holder.
    #[error("connection poisoned: {0}")]
    Poisoned(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
