//! The reader facade: shard selection, borrow, delegate, return.
//!
//! A `Reader` owns the shard pool and an immutable `Config` copy and is safe
//! for concurrent use through a shared reference. Shard choice uses the
//! thread-local non-cryptographic generator; it balances load and has no
//! bearing on output secrecy.

use std::io;
use std::sync::Arc;

use rand::Rng;

use crate::config::{Config, logical_cpus};
use crate::entropy::{EntropySource, SystemEntropy};
use crate::error::RngError;
use crate::metrics::{MetricsRecorder, ReaderMetrics};
use crate::pool::ShardPool;

/// A pooled source of cryptographically secure random bytes.
///
/// Each read borrows one generator instance from a randomly chosen shard,
/// fills the buffer from that instance's keystream, and returns the instance
/// to the same shard. Instances are never observed by two callers at once,
/// so reads from many threads proceed without shared mutable state.
///
/// ```
/// let reader = shardrand::Reader::new()?;
/// let mut buf = [0u8; 64];
/// let n = reader.fill(&mut buf)?;
/// assert_eq!(n, 64);
/// # Ok::<(), shardrand::RngError>(())
/// ```
pub struct Reader {
    config: Config,
    pool: ShardPool,
    metrics: Arc<MetricsRecorder>,
}

impl Reader {
    /// Construct a reader with default configuration.
    ///
    /// # Errors
    /// `PoolInitExhausted` if any shard's eager probe fails after
    /// `max_init_retries` attempts.
    pub fn new() -> Result<Self, RngError> {
        ReaderBuilder::new().build()
    }

    /// Start building a reader with custom options.
    pub fn builder() -> ReaderBuilder {
        ReaderBuilder::new()
    }

    /// Fill `dst` completely with random bytes, returning `dst.len()`.
    ///
    /// An empty `dst` returns `Ok(0)` without touching any pool. The call
    /// is not cancellable and completes in CPU time proportional to the
    /// buffer length.
    pub fn fill(&self, dst: &mut [u8]) -> Result<usize, RngError> {
        if dst.is_empty() {
            return Ok(0);
        }

        let shards = self.pool.shard_count();
        let shard = if shards > 1 {
            rand::thread_rng().gen_range(0..shards)
        } else {
            0
        };

        self.pool.with_generator(shard, |generator| generator.fill(dst))
    }

    /// A copy of the configuration in effect for this reader.
    ///
    /// Contains only non-secret, immutable parameters; inspecting it cannot
    /// race with or alter reader behavior.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Snapshot of this reader's operational counters.
    pub fn metrics(&self) -> ReaderMetrics {
        self.metrics.snapshot()
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &ShardPool {
        &self.pool
    }
}

impl io::Read for &Reader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Reader::fill(self, buf).map_err(io::Error::other)
    }
}

impl io::Read for Reader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self).read(buf)
    }
}

/// Builder-style options for [`Reader`] construction.
///
/// Setters overwrite one field each and may be called in any order; the
/// last call for a field wins. Unset fields keep their defaults.
///
/// ```
/// use std::time::Duration;
///
/// let reader = shardrand::Reader::builder()
///     .enable_key_rotation(true)
///     .max_bytes_per_key(1 << 20)
///     .rekey_backoff(Duration::from_millis(50))
///     .shards(2)
///     .build()?;
/// assert_eq!(reader.config().shards, 2);
/// # Ok::<(), shardrand::RngError>(())
/// ```
pub struct ReaderBuilder {
    config: Config,
    entropy: Option<Arc<dyn EntropySource>>,
}

impl ReaderBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            entropy: None,
        }
    }

    /// Output allowed under one key before rekeying is requested.
    pub fn max_bytes_per_key(mut self, bytes: u64) -> Self {
        self.config.max_bytes_per_key = bytes;
        self
    }

    /// Factory retries per shard during construction.
    pub fn max_init_retries(mut self, retries: u32) -> Self {
        self.config.max_init_retries = retries;
        self
    }

    /// Attempts a rekey worker makes before giving up.
    pub fn max_rekey_attempts(mut self, attempts: u32) -> Self {
        self.config.max_rekey_attempts = attempts;
        self
    }

    /// Initial backoff after a failed rekey attempt.
    pub fn rekey_backoff(mut self, backoff: std::time::Duration) -> Self {
        self.config.rekey_backoff = backoff;
        self
    }

    /// Clamp on the exponential rekey backoff.
    pub fn max_rekey_backoff(mut self, backoff: std::time::Duration) -> Self {
        self.config.max_rekey_backoff = backoff;
        self
    }

    /// Rotate keys automatically after `max_bytes_per_key` output.
    pub fn enable_key_rotation(mut self, enable: bool) -> Self {
        self.config.enable_key_rotation = enable;
        self
    }

    /// XOR against a zero scratch buffer instead of in place.
    pub fn use_zero_buffer(mut self, enable: bool) -> Self {
        self.config.use_zero_buffer = enable;
        self
    }

    /// Initial capacity of the zero scratch buffer.
    pub fn default_buffer_size(mut self, size: usize) -> Self {
        self.config.default_buffer_size = size;
        self
    }

    /// Number of independent pools. Zero selects the logical CPU count.
    pub fn shards(mut self, shards: usize) -> Self {
        self.config.shards = shards;
        self
    }

    /// Replace the system entropy source.
    ///
    /// Exists so the retry and rekey discipline can be exercised against
    /// instrumented sources; production readers keep the default.
    pub fn entropy_source(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = Some(entropy);
        self
    }

    /// Build the reader, probing every shard's factory once.
    ///
    /// # Errors
    /// `PoolInitExhausted` if a shard cannot produce a working generator
    /// within `max_init_retries` attempts.
    pub fn build(self) -> Result<Reader, RngError> {
        let mut config = self.config;
        if config.shards == 0 {
            config.shards = logical_cpus();
        }

        let entropy = self
            .entropy
            .unwrap_or_else(|| Arc::new(SystemEntropy::new()));
        let metrics = Arc::new(MetricsRecorder::default());
        let pool = ShardPool::new(config, entropy, Arc::clone(&metrics))?;

        Ok(Reader {
            config,
            pool,
            metrics,
        })
    }
}

impl Default for ReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
