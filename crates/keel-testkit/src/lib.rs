//! # Keel Testkit
//!
//! Testing utilities for Keel.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Temporary data directories and seeded block data
//! - **Recording migrations**: Migrations that log their execution and can be made to fail
//! - **Generators**: Proptest strategies for catalogs and labels
//!
//! ## Test Fixtures
//!
//! ```rust
//! use keel_testkit::{seed_blocks, TestStore};
//!
//! let store = TestStore::new();
//! let handle = store.shared();
//! seed_blocks(&handle, 1, 10).unwrap();
//! ```
//!
//! ## Recording Migrations
//!
//! ```rust
//! use keel_testkit::{recording_registry, Journal};
//! use keel_store::Label;
//!
//! let journal = Journal::new();
//! journal.break_migration("b");
//! let registry = recording_registry(Label::Chain, &["a", "b"], &journal);
//! ```

pub mod fixtures;
pub mod generators;
pub mod migrations;

pub use fixtures::{block_hash, seed_blocks, TestStore};
pub use migrations::{recording_catalog, recording_registry, Journal, RecordingMigration, MARKERS};
