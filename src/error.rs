//! Error types for reader construction and byte generation.
//!
//! Retries are handled where they occur (the pool factory and the rekey
//! worker); only exhaustion is surfaced to callers. A running read has no
//! failure mode beyond `Internal`, which marks states that cannot be reached
//! under correct operation.

use thiserror::Error;

use crate::entropy::EntropyError;

/// Errors surfaced by reader construction and, in degenerate cases, by reads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RngError {
    /// The system entropy source refused or short-read a request.
    ///
    /// Counted against `max_init_retries` during pool construction and
    /// against `max_rekey_attempts` inside the rekey worker. Never surfaced
    /// from a running read.
    #[error(transparent)]
    EntropyUnavailable(#[from] EntropyError),

    /// The cipher primitive rejected the generated key or nonce.
    ///
    /// Treated identically to `EntropyUnavailable` for retry purposes.
    #[error("cipher construction failed: {0}")]
    CipherConstructionFailed(String),

    /// Every permitted factory attempt failed while filling a shard's pool.
    ///
    /// This is the only documented failure mode of reader construction. The
    /// message carries the last underlying error.
    #[error("generator pool initialization failed after {attempts} attempts: {cause}")]
    PoolInitExhausted {
        /// Factory attempts made for the failing shard.
        attempts: u32,
        /// Display form of the last underlying error.
        cause: String,
    },

    /// An invariant that cannot be violated under correct operation was
    /// observed violated (poisoned cipher slot, keystream counter refusal).
    #[error("internal invariant violated: {0}")]
    Internal(String),
}
