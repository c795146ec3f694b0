//! Schema version stamped into the store after migrations run.
//!
//! The version lives in `DbInfo` under [`SCHEMA_VERSION_KEY`] as three
//! big-endian `u32`s. A build refuses to migrate a store stamped by a newer
//! major version, or by a newer minor version of the same major.

use std::fmt;

use keel_store::{Dataset, ReadTx, RwTx, StoreError};
use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// `DbInfo` key of the stored schema version.
pub const SCHEMA_VERSION_KEY: &[u8] = b"DBSchemaVersion";

/// A `major.minor.patch` schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SchemaVersion {
    /// Schema version this build writes.
    pub const SUPPORTED: SchemaVersion = SchemaVersion::new(1, 0, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Encode as 12 big-endian bytes.
    pub fn to_bytes(&self) -> [u8; 12] {
        let mut out = [0u8; 12];
        out[..4].copy_from_slice(&self.major.to_be_bytes());
        out[4..8].copy_from_slice(&self.minor.to_be_bytes());
        out[8..].copy_from_slice(&self.patch.to_be_bytes());
        out
    }

    /// Decode from 12 big-endian bytes.
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, StoreError> {
        if bytes.len() != 12 {
            return Err(StoreError::InvalidData(format!(
                "schema version must be 12 bytes, got {}",
                bytes.len()
            )));
        }
        let word = |i: usize| u32::from_be_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Ok(Self::new(word(0), word(4), word(8)))
    }

    /// Whether a store stamped with `stored` may be migrated by `self`.
    pub fn check_stored(&self, stored: SchemaVersion) -> Result<()> {
        let newer = stored.major > self.major
            || (stored.major == self.major && stored.minor > self.minor);
        if newer {
            return Err(MigrateError::Downgrade {
                stored,
                supported: *self,
            });
        }
        Ok(())
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Read the stored schema version, if any.
pub fn read(tx: &ReadTx<'_>) -> Result<Option<SchemaVersion>> {
    match tx.get(Dataset::DATABASE_INFO, SCHEMA_VERSION_KEY)? {
        Some(bytes) => Ok(Some(SchemaVersion::from_bytes(&bytes)?)),
        None => Ok(None),
    }
}

/// Stamp the store with `version`.
pub fn write(tx: &RwTx<'_>, version: SchemaVersion) -> Result<()> {
    tx.put(Dataset::DATABASE_INFO, SCHEMA_VERSION_KEY, &version.to_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_roundtrip() {
        let v = SchemaVersion::new(3, 14, 159);
        assert_eq!(SchemaVersion::from_bytes(&v.to_bytes()).unwrap(), v);
        assert!(SchemaVersion::from_bytes(&[0; 11]).is_err());
    }

    #[test]
    fn test_check_stored() {
        let supported = SchemaVersion::new(2, 3, 0);

        supported.check_stored(SchemaVersion::new(1, 9, 9)).unwrap();
        supported.check_stored(SchemaVersion::new(2, 3, 7)).unwrap();
        supported.check_stored(SchemaVersion::new(2, 2, 0)).unwrap();

        assert!(matches!(
            supported.check_stored(SchemaVersion::new(2, 4, 0)),
            Err(MigrateError::Downgrade { .. })
        ));
        assert!(matches!(
            supported.check_stored(SchemaVersion::new(3, 0, 0)),
            Err(MigrateError::Downgrade { .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(SchemaVersion::SUPPORTED.to_string(), "1.0.0");
    }
}
