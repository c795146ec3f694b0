//! # Keel Store
//!
//! Embedded, transactional key-value store used by Keel. A store is a
//! directory holding an SQLite data file and a lock file.
//!
//! ## Overview
//!
//! Handles are opened through [`StoreOptions`] in one of two access modes:
//!
//! - [`AccessMode::Shared`] - any number of shared handles may coexist
//! - [`AccessMode::Exclusive`] - no other handle may exist on the path
//!
//! The mode is fixed when the handle is opened. Conflicting opens fail
//! immediately with [`StoreError::Locked`] instead of blocking.
//!
//! ## Key Types
//!
//! - [`StoreOptions`] - Builder for opening handles
//! - [`StoreHandle`] - A live connection with `view`/`update` transactions
//! - [`ReadTx`] / [`RwTx`] - Transactions over named [`Dataset`]s
//! - [`Label`] - Schema domain a store belongs to
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keel_store::{keys, Dataset, Label, StoreOptions, StoreError};
//!
//! let handle = StoreOptions::new("data/chaindata").label(Label::Chain).open().unwrap();
//!
//! handle
//!     .update(|tx| tx.put(Dataset::HEADER_CANONICAL, &keys::encode_block_number(1), b"hash"))
//!     .unwrap();
//!
//! let n = handle
//!     .view(|tx| {
//!         tx.scan_range(Dataset::HEADER_CANONICAL, &[], 10, |_k, _v| Ok::<_, StoreError>(()))
//!     })
//!     .unwrap();
//! assert_eq!(n, 1);
//!
//! handle.close().unwrap();
//! ```

pub mod dataset;
pub mod error;
pub mod handle;
pub mod keys;
pub mod lock;
pub mod options;
pub mod schema;
pub mod tx;
pub mod types;

pub use dataset::Dataset;
pub use error::{Result, StoreError};
pub use handle::StoreHandle;
pub use options::StoreOptions;
pub use tx::{ReadTx, RwTx};
pub use types::{AccessMode, Label, Verbosity};
