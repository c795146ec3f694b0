//! Inspecting and applying a label's migration catalog.

use std::collections::HashSet;
use std::path::Path;

use keel_store::{Label, ReadTx, StoreHandle};

use crate::error::{MigrateError, Result};
use crate::migration::{Migration, MigrationContext};
use crate::record::{self, AppliedRecord, MigrationRecord};
use crate::version::{self, SchemaVersion};

/// Outcome of [`Migrator::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Names of the migrations applied by this call, in execution order.
    pub applied: Vec<String>,
    /// Schema version stamped by this call, if the store needed it.
    pub schema_version: Option<SchemaVersion>,
}

/// Runs one label's catalog against a store.
///
/// Catalog order is execution order. Each migration runs in its own write
/// transaction together with its applied record; a failure leaves earlier
/// migrations applied and the failing one and everything after it pending.
#[derive(Debug)]
pub struct Migrator<'a> {
    label: Label,
    migrations: &'a [Box<dyn Migration>],
    supported: SchemaVersion,
}

impl<'a> Migrator<'a> {
    pub fn new(label: Label, migrations: &'a [Box<dyn Migration>]) -> Self {
        Self {
            label,
            migrations,
            supported: SchemaVersion::SUPPORTED,
        }
    }

    /// Override the schema version this migrator writes and accepts.
    pub fn with_schema_version(mut self, supported: SchemaVersion) -> Self {
        self.supported = supported;
        self
    }

    pub fn label(&self) -> Label {
        self.label
    }

    /// Catalog names in execution order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.migrations.iter().map(|m| m.name())
    }

    /// Catalog entries without an applied record, in catalog order.
    pub fn pending(&self, tx: &ReadTx<'_>) -> Result<Vec<&'a dyn Migration>> {
        let applied = record::read_applied(tx)?;
        Ok(self
            .migrations
            .iter()
            .filter(|m| !applied.contains_key(m.name()))
            .map(|m| &**m)
            .collect())
    }

    /// Whether the store needs an exclusive pass: a catalog entry is still
    /// unapplied, or the stored schema version is missing or older than the
    /// supported one.
    ///
    /// Read-only; safe on a shared handle. A read failure is an error, never
    /// "nothing pending". A store stamped by a newer build is refused here.
    pub fn has_pending(&self, handle: &StoreHandle) -> Result<bool> {
        self.check_label(handle)?;
        handle.view(|tx| {
            let stored = version::read(tx)?;
            if let Some(stored) = stored {
                self.supported.check_stored(stored)?;
            }
            Ok(self.needs_stamp(stored) || !self.pending(tx)?.is_empty())
        })
    }

    /// Status of every catalog entry.
    pub fn records(&self, handle: &StoreHandle) -> Result<Vec<MigrationRecord>> {
        self.check_label(handle)?;
        let mut applied = handle.view(|tx| record::read_applied(tx))?;
        Ok(self
            .migrations
            .iter()
            .map(|m| MigrationRecord {
                name: m.name().to_string(),
                label: self.label,
                applied: applied.remove(m.name()),
            })
            .collect())
    }

    /// Apply every pending migration through an exclusive handle.
    ///
    /// The schema version is stamped in the same transaction as the last
    /// pending migration, or on its own when only the stamp is missing.
    pub fn apply(&self, handle: &StoreHandle, data_dir: &Path) -> Result<ApplyReport> {
        self.check_label(handle)?;
        self.check_unique_names()?;

        let (pending, stored) = handle.view(|tx| {
            Ok::<_, MigrateError>((self.pending(tx)?, version::read(tx)?))
        })?;
        if let Some(stored) = stored {
            self.supported.check_stored(stored)?;
        }
        let stamp = self.needs_stamp(stored);
        if pending.is_empty() && !stamp {
            return Ok(ApplyReport::default());
        }
        if !handle.mode().is_exclusive() {
            return Err(MigrateError::NotExclusive { label: self.label });
        }

        let ctx = MigrationContext {
            label: self.label,
            data_dir,
        };
        let mut report = ApplyReport::default();
        let last = pending.len().saturating_sub(1);

        for (i, migration) in pending.iter().enumerate() {
            let name = migration.name();
            tracing::info!(label = %self.label, name, "Apply migration");
            handle
                .update(|tx| {
                    migration
                        .up(tx, &ctx)
                        .map_err(|source| MigrateError::Failed {
                            name: name.to_string(),
                            source,
                        })?;
                    let record = AppliedRecord {
                        applied_at: now_millis(),
                        schema_version: self.supported,
                    };
                    record::mark_applied(tx, name, &record)?;
                    if stamp && i == last {
                        version::write(tx, self.supported)?;
                    }
                    Ok::<_, MigrateError>(())
                })
                .map_err(|e| {
                    tracing::warn!(label = %self.label, name, error = %e, "Migration failed");
                    e
                })?;
            tracing::info!(label = %self.label, name, "Applied migration");
            report.applied.push(name.to_string());
        }

        if stamp {
            if pending.is_empty() {
                handle.update(|tx| version::write(tx, self.supported))?;
            }
            tracing::info!(label = %self.label, version = %self.supported, "Updated DB schema");
            report.schema_version = Some(self.supported);
        }

        Ok(report)
    }

    /// A missing or older stored version gets rewritten. Newer patch levels
    /// are accepted and left alone.
    fn needs_stamp(&self, stored: Option<SchemaVersion>) -> bool {
        stored.map_or(true, |stored| stored < self.supported)
    }

    fn check_label(&self, handle: &StoreHandle) -> Result<()> {
        if handle.label() != self.label {
            return Err(MigrateError::LabelMismatch {
                catalog: self.label,
                handle: handle.label(),
            });
        }
        Ok(())
    }

    fn check_unique_names(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for name in self.names() {
            if !seen.insert(name) {
                return Err(MigrateError::DuplicateName(name.to_string()));
            }
        }
        Ok(())
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
