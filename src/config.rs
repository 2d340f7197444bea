//! Tunable parameters for generator instances and the shard pool.
//!
//! A `Config` is immutable once a reader is built and carries no secrets;
//! accessors hand out copies. Options are applied through
//! [`ReaderBuilder`](crate::ReaderBuilder), one setter per field, later calls
//! overwriting earlier ones.

use std::num::NonZeroUsize;
use std::thread::available_parallelism;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default output per key before a rekey is requested (1 GiB).
pub const DEFAULT_MAX_BYTES_PER_KEY: u64 = 1 << 30;

/// Default factory retries while filling a shard's pool.
pub const DEFAULT_MAX_INIT_RETRIES: u32 = 3;

/// Default attempts a rekey worker makes before giving up.
pub const DEFAULT_MAX_REKEY_ATTEMPTS: u32 = 5;

/// Default initial backoff between failed rekey attempts.
pub const DEFAULT_REKEY_BACKOFF: Duration = Duration::from_millis(100);

/// Default upper bound on rekey backoff.
pub const DEFAULT_MAX_REKEY_BACKOFF: Duration = Duration::from_secs(2);

/// Default initial capacity of the zero scratch buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 64;

/// Operational parameters for a reader and its generator instances.
///
/// Contains only non-secret, immutable settings; no runtime state or key
/// material. Copyable so inspection never aliases live reader state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Bytes emitted under one key before an asynchronous rekey is
    /// requested. Only consulted when `enable_key_rotation` is set.
    pub max_bytes_per_key: u64,

    /// Factory attempts per shard before pool construction fails.
    pub max_init_retries: u32,

    /// Attempts a rekey worker makes before leaving the old key in place.
    pub max_rekey_attempts: u32,

    /// Initial delay after a failed rekey attempt. Doubles per failure.
    pub rekey_backoff: Duration,

    /// Clamp on the exponential rekey backoff.
    pub max_rekey_backoff: Duration,

    /// Rotate the key after `max_bytes_per_key` output. Off by default;
    /// when off, usage is not counted at all.
    pub enable_key_rotation: bool,

    /// XOR the keystream against an all-zero scratch buffer instead of the
    /// caller's buffer in place. A compatibility knob; the in-place path is
    /// faster.
    pub use_zero_buffer: bool,

    /// Initial capacity of the zero scratch buffer. Only relevant when
    /// `use_zero_buffer` is set.
    pub default_buffer_size: usize,

    /// Number of independent generator pools. Zero is replaced by the
    /// logical CPU count at build time.
    pub shards: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_bytes_per_key: DEFAULT_MAX_BYTES_PER_KEY,
            max_init_retries: DEFAULT_MAX_INIT_RETRIES,
            max_rekey_attempts: DEFAULT_MAX_REKEY_ATTEMPTS,
            rekey_backoff: DEFAULT_REKEY_BACKOFF,
            max_rekey_backoff: DEFAULT_MAX_REKEY_BACKOFF,
            enable_key_rotation: false,
            use_zero_buffer: false,
            default_buffer_size: DEFAULT_BUFFER_SIZE,
            shards: logical_cpus(),
        }
    }
}

/// Logical CPU count, used as the default shard count.
pub(crate) fn logical_cpus() -> usize {
    available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}
