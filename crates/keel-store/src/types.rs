//! Strong type definitions for store handles.
//!
//! Labels, access modes and verbosity levels are enums so that a handle's
//! identity is fixed when it is constructed.

use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// The schema domain a store belongs to.
///
/// Each label has its own migration catalog. A store directory is bound to
/// the label it was first created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Label {
    /// Chain data: headers, bodies, canonical markers.
    Chain,
    /// Transaction pool state.
    TxPool,
    /// Peer sentry state.
    Sentry,
    /// Consensus layer state.
    Consensus,
    /// Snapshot downloader state.
    Downloader,
}

impl Label {
    /// All known labels.
    pub const ALL: [Label; 5] = [
        Label::Chain,
        Label::TxPool,
        Label::Sentry,
        Label::Consensus,
        Label::Downloader,
    ];

    /// The stable string name of this label.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Label::Chain => "chaindata",
            Label::TxPool => "txpool",
            Label::Sentry => "sentry",
            Label::Consensus => "consensus",
            Label::Downloader => "downloader",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Label::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| StoreError::UnknownLabel(s.to_string()))
    }
}

/// How a handle holds the store.
///
/// The mode is chosen at open time and never changes for a live handle. To
/// go from shared to exclusive, close the handle and open a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Any number of shared handles may coexist.
    Shared,
    /// No other handle, shared or exclusive, may exist on the path.
    Exclusive,
}

impl AccessMode {
    /// Whether this is exclusive mode.
    pub const fn is_exclusive(&self) -> bool {
        matches!(self, AccessMode::Exclusive)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Shared => f.write_str("shared"),
            AccessMode::Exclusive => f.write_str("exclusive"),
        }
    }
}

/// Diagnostic level of the store engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i8)]
pub enum Verbosity {
    Fatal = 0,
    Error = 1,
    Warning = 2,
    Notice = 3,
    Verbose = 4,
    Debug = 5,
    Trace = 6,
    Extra = 7,
}

impl Verbosity {
    /// Level used when the caller does not override it.
    pub const DEFAULT: Verbosity = Verbosity::Notice;

    /// Sentinel meaning "keep the store default".
    pub const NO_OVERRIDE: i8 = -1;

    /// Interpret a raw level, treating [`Verbosity::NO_OVERRIDE`] as `None`.
    pub fn from_level(level: i8) -> Result<Option<Self>, StoreError> {
        if level == Self::NO_OVERRIDE {
            return Ok(None);
        }
        Verbosity::try_from(level).map(Some)
    }
}

impl TryFrom<i8> for Verbosity {
    type Error = StoreError;

    fn try_from(level: i8) -> Result<Self, StoreError> {
        Ok(match level {
            0 => Verbosity::Fatal,
            1 => Verbosity::Error,
            2 => Verbosity::Warning,
            3 => Verbosity::Notice,
            4 => Verbosity::Verbose,
            5 => Verbosity::Debug,
            6 => Verbosity::Trace,
            7 => Verbosity::Extra,
            other => return Err(StoreError::InvalidVerbosity(other)),
        })
    }
}
