//! # Keel
//!
//! Safe-upgrade coordinator for embedded key-value stores.
//!
//! ## Overview
//!
//! Schema migrations rewrite on-disk layout and must never race with other
//! handles on the same store. Keel opens a store through a fixed protocol:
//!
//! 1. Open the store in shared mode
//! 2. Check for pending migrations
//! 3. If any: close, reopen exclusive, apply, close, reopen shared
//!
//! The caller always ends up with a shared handle on a fully migrated store,
//! or with an error and no handle at all.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keel::{open_database, Config};
//! use keel::migrate::{MigrationFn, Registry};
//! use keel::store::{Dataset, Label};
//!
//! let registry = Registry::new().register(
//!     Label::Chain,
//!     MigrationFn::new("drop_scratch", |tx, _ctx| {
//!         tx.clear(Dataset::new("Scratch"))?;
//!         Ok(())
//!     }),
//! );
//!
//! let config = Config::new("./data");
//! let upgrade = open_database(&config, &registry).unwrap();
//! println!("applied: {:?}", upgrade.applied);
//! let handle = upgrade.into_handle();
//! ```
//!
//! ## Re-exports
//!
//! - `keel::store` - Store handles, transactions, key encoding
//! - `keel::migrate` - Migration trait, migrator and registry

pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod error;

// Re-export component crates
pub use keel_migrate as migrate;
pub use keel_store as store;

pub use config::Config;
pub use coordinator::{
    Coordinator, HandleFactory, StoreFactory, Upgrade, UpgradePlan, UpgradeState,
};
pub use diagnostics::{DiagnosticReport, DiagnosticScan};
pub use error::{Result, UpgradeError};

use keel_migrate::Registry;
use keel_store::StoreHandle;

/// Open the configured store, applying pending migrations first.
pub fn open_database(config: &Config, registry: &Registry) -> Result<Upgrade<StoreHandle>> {
    let factory = StoreFactory::new(config.store_options());
    let migrator = registry.migrator(config.label);

    tracing::info!(
        path = %config.resolved_store_path().display(),
        label = %config.label,
        apply_migrations = config.apply_migrations,
        "opening store"
    );

    let mut coordinator = Coordinator::new(&factory, &migrator, &config.datadir)
        .apply_migrations(config.apply_migrations);
    if let Some(scan) = config.diagnostics {
        coordinator = coordinator.probe(move |handle: &StoreHandle| {
            diagnostics::scan(handle, scan)
                .map(|_| ())
                .map_err(UpgradeError::Diagnostics)
        });
    }
    coordinator.run()
}
