//! Error types for the upgrade coordinator.

use keel_migrate::MigrateError;
use keel_store::StoreError;
use thiserror::Error;

/// Errors that abort an upgrade sequence.
///
/// Every variant is terminal: the coordinator never retries and never
/// returns a handle alongside an error.
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// A handle could not be opened (invalid path, lock contention, corruption).
    #[error("failed to open store: {0}")]
    Open(#[source] StoreError),

    /// A handle could not be closed cleanly.
    #[error("failed to close store: {0}")]
    Close(#[source] StoreError),

    /// Migration metadata could not be read.
    #[error("failed to inspect migrations: {0}")]
    Inspect(#[source] MigrateError),

    /// Applying migrations failed.
    #[error("failed to apply migrations: {0}")]
    Migrate(#[source] MigrateError),

    /// The diagnostic scan failed.
    #[error("diagnostic scan failed: {0}")]
    Diagnostics(#[source] StoreError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for coordinator operations.
pub type Result<T> = std::result::Result<T, UpgradeError>;
