//! Builder for opening store handles.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;
use crate::handle::StoreHandle;
use crate::types::{AccessMode, Label, Verbosity};

/// How long a write waits on SQLite's internal lock before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Options for opening a [`StoreHandle`].
///
/// ```rust,no_run
/// use keel_store::{Label, StoreOptions};
///
/// let handle = StoreOptions::new("data/chaindata")
///     .label(Label::Chain)
///     .exclusive()
///     .open()
///     .unwrap();
/// handle.close().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Store directory. Created if missing.
    pub path: PathBuf,
    /// Schema domain of the store.
    pub label: Label,
    /// Access mode of the handle.
    pub mode: AccessMode,
    /// Diagnostic level. `None` keeps [`Verbosity::DEFAULT`].
    pub verbosity: Option<Verbosity>,
    /// SQLite busy timeout for write contention between shared handles.
    pub busy_timeout: Duration,
}

impl StoreOptions {
    /// Options for a shared handle on the chain label.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            label: Label::Chain,
            mode: AccessMode::Shared,
            verbosity: None,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn label(mut self, label: Label) -> Self {
        self.label = label;
        self
    }

    pub fn mode(mut self, mode: AccessMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shorthand for `mode(AccessMode::Exclusive)`.
    pub fn exclusive(self) -> Self {
        self.mode(AccessMode::Exclusive)
    }

    pub fn verbosity(mut self, verbosity: Option<Verbosity>) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Open a handle with these options.
    pub fn open(&self) -> Result<StoreHandle> {
        StoreHandle::open(self)
    }
}
