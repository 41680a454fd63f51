//! Error taxonomy for the near-duplicate index.
//!
//! Mirrors the shape used by the sibling graph-database crate in this
//! lineage: one `thiserror`-derived enum, no stringly-typed catch-alls.

use thiserror::Error;

/// Errors produced by fingerprint construction, the index, or a Storage backend.
#[derive(Debug, Error)]
pub enum Error {
    /// Two fingerprints (or a fingerprint and an index) disagree on bit width.
    #[error("dimension mismatch: expected f={expected}, got f={actual}")]
    DimensionMismatch {
        /// The bit width the operation required.
        expected: u32,
        /// The bit width that was actually supplied.
        actual: u32,
    },

    /// A construction argument was malformed (e.g. a hex string that doesn't parse).
    #[error("bad input: {0}")]
    BadInput(String),

    /// A Storage backend failed to complete an operation, boxed from the
    /// backend's own error type (`redis::RedisError` for the remote
    /// backend; the in-memory backend never constructs this variant).
    #[error("storage failure: {0}")]
    Storage(#[from] redis::RedisError),
}

/// Crate-wide result alias, matching the convention of the sibling graph-database crate.
pub type Result<T> = std::result::Result<T, Error>;
