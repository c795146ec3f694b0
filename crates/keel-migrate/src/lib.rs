//! # Keel Migrate
//!
//! Ordered schema migrations for Keel stores.
//!
//! ## Overview
//!
//! Each [`Label`](keel_store::Label) has a static, ordered catalog of
//! [`Migration`]s held in a [`Registry`]. A [`Migrator`] compares the catalog
//! with the applied records persisted in the store:
//!
//! - [`Migrator::has_pending`] - read-only check, works on shared handles
//! - [`Migrator::apply`] - runs pending migrations, requires an exclusive handle
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use keel_migrate::{MigrationFn, Registry};
//! use keel_store::{Dataset, Label, StoreOptions};
//!
//! let registry = Registry::new().register(
//!     Label::Chain,
//!     MigrationFn::new("clear_scratch", |tx, _ctx| {
//!         tx.clear(Dataset::new("Scratch"))?;
//!         Ok(())
//!     }),
//! );
//!
//! let handle = StoreOptions::new("data/chaindata").exclusive().open().unwrap();
//! let migrator = registry.migrator(Label::Chain);
//! if migrator.has_pending(&handle).unwrap() {
//!     migrator.apply(&handle, Path::new("data")).unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Per-migration atomicity**: a migration and its applied record commit together
//! - **No batch rollback**: a failure keeps earlier migrations applied, so a rerun resumes
//! - **Unique names**: names are the persisted identity and must not repeat
//! - **Version guard**: stores stamped by a newer schema are never migrated

pub mod error;
pub mod migration;
pub mod migrator;
pub mod record;
pub mod registry;
pub mod version;

pub use error::{MigrateError, Result};
pub use migration::{Migration, MigrationContext, MigrationFn};
pub use migrator::{ApplyReport, Migrator};
pub use record::{AppliedRecord, MigrationRecord};
pub use registry::Registry;
pub use version::SchemaVersion;
