//! Configuration for opening a store.
//!
//! All settings travel in a [`Config`] value passed to
//! [`open_database`](crate::open_database); there is no process-wide state.

use std::path::PathBuf;

use keel_store::{Label, StoreOptions, Verbosity};

use crate::diagnostics::DiagnosticScan;
use crate::error::{Result, UpgradeError};

/// Configuration for the upgrade coordinator.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root data directory; handed to migrations as scratch space.
    pub datadir: PathBuf,
    /// Explicit store directory. Defaults to `<datadir>/<label>`.
    pub store_path: Option<PathBuf>,
    /// Schema domain to open.
    pub label: Label,
    /// Store diagnostic level. `None` keeps the store default.
    pub verbosity: Option<Verbosity>,
    /// Whether to check for and apply pending migrations.
    pub apply_migrations: bool,
    /// Optional scan of stored blocks, run before the migration check.
    pub diagnostics: Option<DiagnosticScan>,
}

impl Config {
    /// Chain data under `datadir`, migrations enabled, no diagnostics.
    pub fn new(datadir: impl Into<PathBuf>) -> Self {
        Self {
            datadir: datadir.into(),
            store_path: None,
            label: Label::Chain,
            verbosity: None,
            apply_migrations: true,
            diagnostics: None,
        }
    }

    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    pub fn label(mut self, label: Label) -> Self {
        self.label = label;
        self
    }

    pub fn verbosity(mut self, verbosity: Option<Verbosity>) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set verbosity from a raw level where `-1` keeps the store default.
    pub fn verbosity_level(self, level: i8) -> Result<Self> {
        let verbosity =
            Verbosity::from_level(level).map_err(|e| UpgradeError::Config(e.to_string()))?;
        Ok(self.verbosity(verbosity))
    }

    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }

    pub fn diagnostics(mut self, scan: Option<DiagnosticScan>) -> Self {
        self.diagnostics = scan;
        self
    }

    /// The store directory after applying defaults.
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| self.datadir.join(self.label.as_str()))
    }

    /// Shared-mode open options for the configured store.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions::new(self.resolved_store_path())
            .label(self.label)
            .verbosity(self.verbosity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_store::AccessMode;

    #[test]
    fn test_default_store_path() {
        let config = Config::new("/var/lib/node");
        assert_eq!(
            config.resolved_store_path(),
            PathBuf::from("/var/lib/node/chaindata")
        );

        let config = Config::new("/var/lib/node").label(Label::TxPool);
        assert_eq!(
            config.resolved_store_path(),
            PathBuf::from("/var/lib/node/txpool")
        );
    }

    #[test]
    fn test_explicit_store_path_wins() {
        let config = Config::new("/data").store_path("/fast/chain");
        assert_eq!(config.resolved_store_path(), PathBuf::from("/fast/chain"));
    }

    #[test]
    fn test_verbosity_level() {
        let config = Config::new("/data").verbosity_level(-1).unwrap();
        assert_eq!(config.verbosity, None);

        let config = Config::new("/data").verbosity_level(6).unwrap();
        assert_eq!(config.verbosity, Some(Verbosity::Trace));

        assert!(matches!(
            Config::new("/data").verbosity_level(42),
            Err(UpgradeError::Config(_))
        ));
    }

    #[test]
    fn test_store_options_are_shared() {
        let opts = Config::new("/data")
            .label(Label::Sentry)
            .verbosity(Some(Verbosity::Debug))
            .store_options();
        assert_eq!(opts.mode, AccessMode::Shared);
        assert_eq!(opts.label, Label::Sentry);
        assert_eq!(opts.verbosity, Some(Verbosity::Debug));
    }
}
