//! Error types for the migration module.

use keel_store::{Label, StoreError};
use thiserror::Error;

use crate::version::SchemaVersion;

/// Errors that can occur while inspecting or applying migrations.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Storage error while reading or writing migration metadata.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Migrations may only be applied through an exclusive handle.
    #[error("migrations for {label} require an exclusive handle")]
    NotExclusive { label: Label },

    /// The handle belongs to a different label than the catalog.
    #[error("catalog for {catalog} cannot run against a {handle} store")]
    LabelMismatch { catalog: Label, handle: Label },

    /// Two catalog entries share a name.
    #[error("duplicate migration name: {0}")]
    DuplicateName(String),

    /// The store was written by a newer schema than this build supports.
    #[error("cannot downgrade DB schema from {stored} to {supported}")]
    Downgrade {
        stored: SchemaVersion,
        supported: SchemaVersion,
    },

    /// A migration's transformation failed.
    #[error("migration {name} failed: {source}")]
    Failed {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// An applied record could not be encoded or decoded.
    #[error("invalid migration record for {name}: {reason}")]
    InvalidRecord { name: String, reason: String },
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
