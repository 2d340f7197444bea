//! Generator instances: one XChaCha20 stream each, with asynchronous,
//! non-blocking key rotation.
//!
//! A generator is owned by exactly one caller between pool borrow and
//! return, so the scratch state needs no synchronization. The cipher slot is
//! the one piece shared with a background rekey worker: a guarded swap cell
//! with a single writer, where the reader holds the guard only for the
//! duration of one keystream application and the worker only for a pointer
//! sized replace.
//!
//! # Rotation
//!
//! With key rotation enabled, each read adds its length to an atomic usage
//! counter. The first read that pushes usage past `max_bytes_per_key` wins a
//! compare-and-swap on the `rekeying` latch and spawns a detached worker
//! thread; every other crossing loses the swap and does nothing. The worker
//! retries cipher construction with exponential, jittered backoff, installs
//! the fresh cipher, resets usage, and drops the old cipher, whose key
//! schedule and buffered keystream are wiped on drop (`chacha20`'s `zeroize`
//! feature). Rekey failure is never fatal: the instance keeps producing
//! output under the old key, visible only as usage climbing past the
//! threshold.

use std::cmp;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chacha20::XChaCha20;
use chacha20::cipher::StreamCipher;

use crate::cipher::make_cipher;
use crate::config::{Config, DEFAULT_MAX_REKEY_BACKOFF};
use crate::entropy::EntropySource;
use crate::error::RngError;
use crate::metrics::MetricsRecorder;

/// State shared between a generator and its in-flight rekey worker.
pub(crate) struct CipherState {
    /// Active cipher. Single writer (the rekey worker), uncontended for
    /// readers outside the brief swap window.
    slot: Mutex<XChaCha20>,

    /// Bytes emitted under the current key. Reset to zero after the fresh
    /// cipher is published.
    usage: AtomicU64,

    /// Single-flight latch: swapped false to true by the read that crosses
    /// the usage threshold, cleared on every worker exit path.
    rekeying: AtomicBool,
}

/// One pooled generator: an active cipher plus per-caller scratch state.
pub(crate) struct Generator {
    state: Arc<CipherState>,

    /// All-zero plaintext for the zero-buffer path. Never written after
    /// creation; grown on demand, capacity kept across reads.
    zero: Vec<u8>,

    config: Config,
    entropy: Arc<dyn EntropySource>,
    metrics: Arc<MetricsRecorder>,
}

impl Generator {
    /// Build a generator with a freshly seeded cipher.
    pub(crate) fn new(
        config: Config,
        entropy: Arc<dyn EntropySource>,
        metrics: Arc<MetricsRecorder>,
    ) -> Result<Self, RngError> {
        let cipher = make_cipher(entropy.as_ref())?;

        let zero = if config.use_zero_buffer {
            vec![0u8; config.default_buffer_size]
        } else {
            Vec::new()
        };

        Ok(Self {
            state: Arc::new(CipherState {
                slot: Mutex::new(cipher),
                usage: AtomicU64::new(0),
                rekeying: AtomicBool::new(false),
            }),
            zero,
            config,
            entropy,
            metrics,
        })
    }

    /// Fill `dst` with keystream bytes.
    ///
    /// An empty `dst` returns `Ok(0)` without touching cipher state. A
    /// non-empty `dst` always comes back completely filled: the keystream
    /// is XORed against the zero scratch buffer into `dst`, or against
    /// `dst` in place, depending on `use_zero_buffer`. Both modes advance
    /// the keystream by exactly `dst.len()` bytes.
    pub(crate) fn fill(&mut self, dst: &mut [u8]) -> Result<usize, RngError> {
        let n = dst.len();
        if n == 0 {
            return Ok(0);
        }

        {
            let mut cipher = self
                .state
                .slot
                .lock()
                .map_err(|_| RngError::Internal("cipher slot lock poisoned".into()))?;

            if self.config.use_zero_buffer {
                if self.zero.len() < n {
                    self.zero.resize(n, 0);
                }
                cipher
                    .apply_keystream_b2b(&self.zero[..n], dst)
                    .map_err(|_| RngError::Internal("keystream refused by cipher".into()))?;
            } else {
                cipher
                    .try_apply_keystream(dst)
                    .map_err(|_| RngError::Internal("keystream refused by cipher".into()))?;
            }
        }

        if self.config.enable_key_rotation {
            let used = self.state.usage.fetch_add(n as u64, Ordering::AcqRel) + n as u64;
            if used > self.config.max_bytes_per_key
                && self
                    .state
                    .rekeying
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
                    .is_ok()
            {
                self.spawn_rekey();
            }
        }

        self.metrics.record_read(n as u64);
        Ok(n)
    }

    /// Launch the detached rekey worker. Caller must have won the
    /// `rekeying` latch.
    fn spawn_rekey(&self) {
        let state = Arc::clone(&self.state);
        let entropy = Arc::clone(&self.entropy);
        let metrics = Arc::clone(&self.metrics);
        let config = self.config;

        let spawned = thread::Builder::new()
            .name("rekey-worker".into())
            .spawn(move || rekey_worker(state, config, entropy, metrics));

        // The worker normally clears the latch; if the thread never started,
        // clear it here so a later crossing can try again.
        if spawned.is_err() {
            self.state.rekeying.store(false, Ordering::Release);
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &CipherState {
        &self.state
    }
}

#[cfg(test)]
impl CipherState {
    pub(crate) fn usage(&self) -> u64 {
        self.usage.load(Ordering::Acquire)
    }

    pub(crate) fn rekey_in_flight(&self) -> bool {
        self.rekeying.load(Ordering::Acquire)
    }
}

/// Clears the single-flight latch on every worker exit path.
struct RekeyLatch<'a>(&'a AtomicBool);

impl Drop for RekeyLatch<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Background rotation of a generator's cipher.
///
/// Per attempt: build a fresh cipher; on success swap it into the slot,
/// publish the usage reset, and drop the old cipher (its state is wiped on
/// drop). On failure sleep `base + (rnd mod base)` with `rnd` drawn
/// best-effort from the entropy source, then double `base` up to the clamp.
/// Exhaustion leaves the old cipher serving reads.
fn rekey_worker(
    state: Arc<CipherState>,
    config: Config,
    entropy: Arc<dyn EntropySource>,
    metrics: Arc<MetricsRecorder>,
) {
    let _latch = RekeyLatch(&state.rekeying);

    let mut base = config.rekey_backoff;
    let max_backoff = if config.max_rekey_backoff.is_zero() {
        DEFAULT_MAX_REKEY_BACKOFF
    } else {
        config.max_rekey_backoff
    };

    for _ in 0..config.max_rekey_attempts {
        match make_cipher(entropy.as_ref()) {
            Ok(fresh) => {
                let old = {
                    let Ok(mut slot) = state.slot.lock() else {
                        return;
                    };
                    mem::replace(&mut *slot, fresh)
                };

                // Publish the reset only after the fresh cipher is visible.
                state.usage.store(0, Ordering::Release);

                // Old key schedule and buffered keystream are zeroized here.
                drop(old);

                metrics.record_rekey_completed();
                return;
            }
            Err(_) => {
                metrics.record_rekey_failure();
                thread::sleep(jittered(base, entropy.as_ref()));
                base = cmp::min(base.saturating_mul(2), max_backoff);
            }
        }
    }
}

/// `base` plus a uniform jitter in `[0, base)` drawn from the entropy
/// source; plain `base` if the draw fails or `base` is zero.
fn jittered(base: Duration, entropy: &dyn EntropySource) -> Duration {
    let base_nanos = cmp::min(base.as_nanos(), u64::MAX as u128) as u64;
    if base_nanos == 0 {
        return base;
    }

    let mut raw = [0u8; 8];
    match entropy.fill(&mut raw) {
        Ok(()) => base + Duration::from_nanos(u64::from_be_bytes(raw) % base_nanos),
        Err(_) => base,
    }
}
