//! Instrumented entropy sources shared across the integration suites.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use shardrand::{EntropyError, EntropySource, SystemEntropy};

/// XChaCha20 key length; a fill of this size marks one cipher construction.
pub const KEY_LEN: usize = 32;

/// Delegates to the system source while counting key-sized draws, which
/// correspond one-to-one with cipher factory runs.
pub struct CountingEntropy {
    inner: SystemEntropy,
    key_draws: AtomicU64,
}

impl CountingEntropy {
    pub fn new() -> Self {
        Self {
            inner: SystemEntropy::new(),
            key_draws: AtomicU64::new(0),
        }
    }

    pub fn key_draws(&self) -> u64 {
        self.key_draws.load(Ordering::SeqCst)
    }
}

impl EntropySource for CountingEntropy {
    fn fill(&self, dst: &mut [u8]) -> Result<(), EntropyError> {
        if dst.len() == KEY_LEN {
            self.key_draws.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.fill(dst)
    }
}

/// Refuses every fill and counts the refusals.
pub struct FailingEntropy {
    attempts: AtomicU64,
}

impl FailingEntropy {
    pub fn new() -> Self {
        Self {
            attempts: AtomicU64::new(0),
        }
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl EntropySource for FailingEntropy {
    fn fill(&self, _dst: &mut [u8]) -> Result<(), EntropyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(EntropyError("instrumented refusal".into()))
    }
}

/// Works until `break_now` is called, then refuses key-sized draws.
///
/// Lets a reader construct normally and then starves its rekey workers.
pub struct BreakableEntropy {
    inner: SystemEntropy,
    broken: AtomicBool,
}

impl BreakableEntropy {
    pub fn new() -> Self {
        Self {
            inner: SystemEntropy::new(),
            broken: AtomicBool::new(false),
        }
    }

    pub fn break_now(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }
}

impl EntropySource for BreakableEntropy {
    fn fill(&self, dst: &mut [u8]) -> Result<(), EntropyError> {
        if dst.len() == KEY_LEN && self.broken.load(Ordering::SeqCst) {
            return Err(EntropyError("instrumented starvation".into()));
        }
        self.inner.fill(dst)
    }
}

/// Blocks every key-sized draw after the first until the gate opens.
///
/// The first draw seeds the reader's single generator; the second is the
/// in-flight rekey worker, which the test holds in place to prove only one
/// worker ever runs at a time. The block is bounded so a failing test
/// cannot hang the suite.
pub struct GateEntropy {
    inner: SystemEntropy,
    open: AtomicBool,
    key_draws: AtomicU64,
}

impl GateEntropy {
    pub fn new() -> Self {
        Self {
            inner: SystemEntropy::new(),
            open: AtomicBool::new(false),
            key_draws: AtomicU64::new(0),
        }
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    pub fn key_draws(&self) -> u64 {
        self.key_draws.load(Ordering::SeqCst)
    }
}

impl EntropySource for GateEntropy {
    fn fill(&self, dst: &mut [u8]) -> Result<(), EntropyError> {
        if dst.len() == KEY_LEN {
            let draw = self.key_draws.fetch_add(1, Ordering::SeqCst);
            if draw > 0 {
                let deadline = Instant::now() + Duration::from_secs(5);
                while !self.open.load(Ordering::SeqCst) && Instant::now() < deadline {
                    thread::sleep(Duration::from_millis(1));
                }
            }
        }
        self.inner.fill(dst)
    }
}
