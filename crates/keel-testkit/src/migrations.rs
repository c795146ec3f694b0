//! Migrations that record their execution.
//!
//! A [`Journal`] is shared by every migration of a catalog and records the
//! order in which they ran. Failures can be armed per migration name and
//! disarmed later to simulate an operator fixing the cause and rerunning.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use keel_migrate::{Migration, MigrationContext};
use keel_store::{Dataset, Label, RwTx};

/// Dataset the recording migrations write a marker into.
pub const MARKERS: Dataset = Dataset::new("TestMarker");

#[derive(Debug, Default)]
struct JournalInner {
    ran: Vec<String>,
    failing: HashSet<String>,
}

/// Shared execution log and failure switchboard.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    inner: Arc<Mutex<JournalInner>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of migrations that completed, in execution order.
    pub fn ran(&self) -> Vec<String> {
        self.inner.lock().unwrap().ran.clone()
    }

    /// Make `name` fail until [`Journal::heal`] is called.
    pub fn break_migration(&self, name: &str) {
        self.inner.lock().unwrap().failing.insert(name.to_string());
    }

    /// Let `name` succeed again.
    pub fn heal(&self, name: &str) {
        self.inner.lock().unwrap().failing.remove(name);
    }

    /// Forget recorded runs.
    pub fn clear(&self) {
        self.inner.lock().unwrap().ran.clear();
    }

    fn is_broken(&self, name: &str) -> bool {
        self.inner.lock().unwrap().failing.contains(name)
    }

    fn record(&self, name: &str) {
        self.inner.lock().unwrap().ran.push(name.to_string());
    }
}

/// A migration that writes a marker and logs to a [`Journal`].
#[derive(Debug, Clone)]
pub struct RecordingMigration {
    name: String,
    journal: Journal,
}

impl RecordingMigration {
    pub fn new(name: impl Into<String>, journal: &Journal) -> Self {
        Self {
            name: name.into(),
            journal: journal.clone(),
        }
    }
}

impl Migration for RecordingMigration {
    fn name(&self) -> &str {
        &self.name
    }

    fn up(&self, tx: &RwTx<'_>, ctx: &MigrationContext<'_>) -> anyhow::Result<()> {
        tx.put(MARKERS, self.name.as_bytes(), ctx.label.as_str().as_bytes())?;
        if self.journal.is_broken(&self.name) {
            anyhow::bail!("migration {} is broken", self.name);
        }
        self.journal.record(&self.name);
        Ok(())
    }
}

/// Build a boxed catalog of recording migrations.
pub fn recording_catalog(names: &[&str], journal: &Journal) -> Vec<Box<dyn Migration>> {
    names
        .iter()
        .map(|name| Box::new(RecordingMigration::new(*name, journal)) as Box<dyn Migration>)
        .collect()
}

/// A registry with recording migrations registered for `label`.
pub fn recording_registry(label: Label, names: &[&str], journal: &Journal) -> keel_migrate::Registry {
    let mut registry = keel_migrate::Registry::new();
    for migration in recording_catalog(names, journal) {
        registry.push(label, migration);
    }
    registry
}
