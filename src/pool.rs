//! Sharded pools of idle generator instances.
//!
//! Each shard is an independent LIFO cache guarded by its own lock, so
//! concurrent readers that land on different shards never contend. A cache
//! miss invokes the factory, which retries cipher construction up to
//! `max_init_retries` times before reporting exhaustion. Construction probes
//! every shard's factory once, so a broken entropy source fails the reader
//! eagerly instead of at first use.

use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::entropy::EntropySource;
use crate::error::RngError;
use crate::generator::Generator;
use crate::metrics::MetricsRecorder;

/// Fixed array of independent generator pools.
pub(crate) struct ShardPool {
    shards: Vec<Mutex<Vec<Generator>>>,
    config: Config,
    entropy: Arc<dyn EntropySource>,
    metrics: Arc<MetricsRecorder>,
}

impl ShardPool {
    /// Allocate `config.shards` pools and eagerly probe each factory once.
    ///
    /// The probe instance is parked in its shard, so the first read reuses
    /// it rather than paying for another construction.
    pub(crate) fn new(
        config: Config,
        entropy: Arc<dyn EntropySource>,
        metrics: Arc<MetricsRecorder>,
    ) -> Result<Self, RngError> {
        let mut shards = Vec::with_capacity(config.shards);
        for _ in 0..config.shards {
            shards.push(Mutex::new(Vec::new()));
        }

        let pool = Self {
            shards,
            config,
            entropy,
            metrics,
        };

        for shard in 0..pool.shards.len() {
            let probe = pool.build_generator()?;
            pool.put(shard, probe);
        }

        Ok(pool)
    }

    pub(crate) fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Borrow a generator from `shard`, run `f`, and return the generator
    /// to the same shard whether `f` succeeded or failed.
    pub(crate) fn with_generator(
        &self,
        shard: usize,
        f: impl FnOnce(&mut Generator) -> Result<usize, RngError>,
    ) -> Result<usize, RngError> {
        let mut generator = self.take(shard)?;
        let result = f(&mut generator);
        self.put(shard, generator);
        result
    }

    /// Pop an idle instance or build a fresh one on underflow.
    pub(crate) fn take(&self, shard: usize) -> Result<Generator, RngError> {
        let idle = match self.shards[shard].lock() {
            Ok(mut cache) => cache.pop(),
            Err(_) => None,
        };

        match idle {
            Some(generator) => Ok(generator),
            None => self.build_generator(),
        }
    }

    pub(crate) fn put(&self, shard: usize, generator: Generator) {
        // A poisoned shard lock sheds the instance instead of the caller;
        // the factory rebuilds on the next underflow.
        if let Ok(mut cache) = self.shards[shard].lock() {
            cache.push(generator);
        }
    }

    /// Run the generator factory with the configured retry budget.
    fn build_generator(&self) -> Result<Generator, RngError> {
        let mut cause = String::from("no construction attempts were permitted");

        for _ in 0..self.config.max_init_retries {
            match Generator::new(
                self.config,
                Arc::clone(&self.entropy),
                Arc::clone(&self.metrics),
            ) {
                Ok(generator) => {
                    self.metrics.record_generator_created();
                    return Ok(generator);
                }
                Err(err) => cause = err.to_string(),
            }
        }

        Err(RngError::PoolInitExhausted {
            attempts: self.config.max_init_retries,
            cause,
        })
    }

    #[cfg(test)]
    pub(crate) fn idle_per_shard(&self) -> Vec<usize> {
        self.shards
            .iter()
            .map(|shard| shard.lock().map(|cache| cache.len()).unwrap_or(0))
            .collect()
    }
}
