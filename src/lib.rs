//! # shardrand
//!
//! A pooled, sharded source of cryptographically secure random bytes built
//! on the XChaCha20 stream cipher.
//!
//! Every read borrows a generator instance from one of several independent
//! pools, XORs that instance's keystream into the caller's buffer, and puts
//! the instance back. Instances are never shared between concurrent callers,
//! so heavy multi-threaded use scales without contention on the operating
//! system's entropy device: entropy is consumed only to seed ciphers and,
//! optionally, to rotate their keys.
//!
//! ## Quick start
//!
//! ```
//! use std::io::Read;
//!
//! let mut buf = [0u8; 64];
//! shardrand::default_reader().read_exact(&mut buf)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Custom readers are assembled through the builder:
//!
//! ```
//! let reader = shardrand::Reader::builder()
//!     .enable_key_rotation(true)
//!     .max_bytes_per_key(1 << 24)
//!     .shards(4)
//!     .build()?;
//!
//! let mut buf = vec![0u8; 4096];
//! let n = reader.fill(&mut buf)?;
//! assert_eq!(n, 4096);
//! # Ok::<(), shardrand::RngError>(())
//! ```
//!
//! ## Key rotation
//!
//! With `enable_key_rotation` set, each instance counts the bytes emitted
//! under its current key. Crossing `max_bytes_per_key` spawns a background
//! worker that installs a freshly seeded cipher and wipes the old one;
//! reads never block on the rotation and keep serving from the old key
//! until the new one is published.
//!
//! ## Security properties
//!
//! - **XChaCha20 keystream output**: 32-byte keys and 24-byte nonces drawn
//!   from the OS entropy source per instance
//! - **Bounded output per key**: optional automatic rotation after a
//!   configurable byte budget
//! - **Memory hygiene**: key and nonce buffers are wiped via `zeroize` on
//!   every path; retired cipher state is zeroized on drop
//! - **Fail-fast construction**: every shard's factory is probed eagerly,
//!   so a broken entropy source surfaces at build time, not mid-read

mod cipher;
mod generator;
mod pool;

pub mod config;
pub mod entropy;
pub mod error;
pub mod metrics;
pub mod reader;

pub use config::Config;
pub use entropy::{EntropyError, EntropySource, SystemEntropy};
pub use error::RngError;
pub use metrics::ReaderMetrics;
pub use reader::{Reader, ReaderBuilder};

use std::sync::LazyLock;

/// Process-wide reader, built with default configuration on first use.
///
/// Cryptographic callers must never run without a working random source, so
/// a failure here ends the process rather than being deferred.
static DEFAULT_READER: LazyLock<Reader> = LazyLock::new(|| {
    Reader::new().unwrap_or_else(|err| panic!("shardrand: default reader initialization: {err}"))
});

/// The process-wide default reader.
///
/// Constructed with default configuration the first time it is touched and
/// shared by all callers afterwards; safe for concurrent use.
///
/// # Panics
/// On first use, if the system entropy source cannot produce a working
/// generator within the default retry budget.
pub fn default_reader() -> &'static Reader {
    &DEFAULT_READER
}
