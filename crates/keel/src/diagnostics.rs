//! Optional scan of stored block data.
//!
//! Walks headers, bodies and canonical markers from a starting block number
//! and emits one event per row. Disabled unless [`Config::diagnostics`] is
//! set.
//!
//! [`Config::diagnostics`]: crate::Config::diagnostics

use keel_store::keys::{decode_block_number, encode_block_number, split_composite};
use keel_store::{Dataset, Result, StoreError, StoreHandle};

/// Where to start scanning and how many rows to read per dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticScan {
    pub from_block: u64,
    pub amount: usize,
}

impl DiagnosticScan {
    pub fn new(from_block: u64, amount: usize) -> Self {
        Self { from_block, amount }
    }
}

/// A header row: block number, encoded header length, hash suffix of the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRow {
    pub number: u64,
    pub value_len: usize,
    pub hash: String,
}

/// A body row: block number and encoded body length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyRow {
    pub number: u64,
    pub value_len: usize,
}

/// A canonical row: block number and canonical hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRow {
    pub number: u64,
    pub hash: String,
}

/// Rows collected by [`scan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticReport {
    pub headers: Vec<HeaderRow>,
    pub bodies: Vec<BodyRow>,
    pub canonical: Vec<CanonicalRow>,
}

/// Scan the block datasets of `handle` in one read-only view.
pub fn scan(handle: &StoreHandle, scan: DiagnosticScan) -> Result<DiagnosticReport> {
    let start = encode_block_number(scan.from_block);

    handle.view(|tx| {
        let mut report = DiagnosticReport::default();

        tracing::info!(dataset = %Dataset::HEADERS, from = scan.from_block, "scan");
        tx.scan_range(Dataset::HEADERS, &start, scan.amount, |key, value| {
            let (number, suffix) = split_composite(key)?;
            let row = HeaderRow {
                number,
                value_len: value.len(),
                hash: hex::encode(suffix),
            };
            tracing::info!(number, len = row.value_len, hash = %row.hash, "header");
            report.headers.push(row);
            Ok::<_, StoreError>(())
        })?;

        tracing::info!(dataset = %Dataset::BLOCK_BODY, from = scan.from_block, "scan");
        tx.scan_range(Dataset::BLOCK_BODY, &start, scan.amount, |key, value| {
            let number = decode_block_number(key)?;
            tracing::info!(number, len = value.len(), "body");
            report.bodies.push(BodyRow {
                number,
                value_len: value.len(),
            });
            Ok::<_, StoreError>(())
        })?;

        tracing::info!(dataset = %Dataset::HEADER_CANONICAL, from = scan.from_block, "scan");
        tx.scan_range(Dataset::HEADER_CANONICAL, &start, scan.amount, |key, value| {
            let number = decode_block_number(key)?;
            let hash = hex::encode(value);
            tracing::info!(number, hash = %hash, "canonical");
            report.canonical.push(CanonicalRow { number, hash });
            Ok::<_, StoreError>(())
        })?;

        Ok(report)
    })
}
