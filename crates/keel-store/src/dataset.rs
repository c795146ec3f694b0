//! Named keyspaces inside a store.

use std::fmt;

/// A named keyspace. Keys within a dataset are ordered bytewise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dataset(&'static str);

impl Dataset {
    /// Block headers, keyed by `block_number ++ block_hash`.
    pub const HEADERS: Dataset = Dataset("Header");
    /// Block bodies, keyed by `block_number ++ block_hash`.
    pub const BLOCK_BODY: Dataset = Dataset("BlockBody");
    /// Canonical hash per block number.
    pub const HEADER_CANONICAL: Dataset = Dataset("CanonicalHeader");
    /// Applied migration records, keyed by migration name.
    pub const MIGRATIONS: Dataset = Dataset("Migration");
    /// Store-level metadata: label, schema version.
    pub const DATABASE_INFO: Dataset = Dataset("DbInfo");

    /// Define a dataset with a custom name.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The dataset name.
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
