//! The migration trait.
//!
//! A migration transforms data inside a single write transaction. The
//! migrator records it as applied in that same transaction, so a migration
//! is either fully applied and recorded or not applied at all.

use std::fmt;
use std::path::Path;

use keel_store::{Label, RwTx};

/// Context handed to a running migration.
#[derive(Debug, Clone, Copy)]
pub struct MigrationContext<'a> {
    /// Label of the store being migrated.
    pub label: Label,
    /// Data directory, for migrations that need scratch files.
    pub data_dir: &'a Path,
}

/// A named schema transformation.
///
/// Names must be unique within a catalog; they are the persisted identity of
/// the migration. Renaming a migration makes it pending again.
pub trait Migration: Send + Sync {
    /// Unique, stable name.
    fn name(&self) -> &str;

    /// Apply the transformation.
    fn up(&self, tx: &RwTx<'_>, ctx: &MigrationContext<'_>) -> anyhow::Result<()>;
}

impl fmt::Debug for dyn Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration").field("name", &self.name()).finish()
    }
}

type UpFn = dyn Fn(&RwTx<'_>, &MigrationContext<'_>) -> anyhow::Result<()> + Send + Sync;

/// A migration built from a closure.
///
/// ```rust
/// use keel_migrate::{Migration, MigrationFn};
/// use keel_store::Dataset;
///
/// let m = MigrationFn::new("drop_scratch", |tx, _ctx| {
///     tx.clear(Dataset::new("Scratch"))?;
///     Ok(())
/// });
/// assert_eq!(m.name(), "drop_scratch");
/// ```
pub struct MigrationFn {
    name: String,
    up: Box<UpFn>,
}

impl MigrationFn {
    pub fn new<F>(name: impl Into<String>, up: F) -> Self
    where
        F: Fn(&RwTx<'_>, &MigrationContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            up: Box::new(up),
        }
    }
}

impl Migration for MigrationFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn up(&self, tx: &RwTx<'_>, ctx: &MigrationContext<'_>) -> anyhow::Result<()> {
        (self.up)(tx, ctx)
    }
}
