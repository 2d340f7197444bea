//! Entropy source abstraction over the operating system's random device.
//!
//! Production code always runs on [`SystemEntropy`]; the trait exists so the
//! initialization and rekey retry discipline can be exercised against
//! failing or instrumented sources in tests.

use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

/// The entropy source refused or short-read a fill request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("entropy source unavailable: {0}")]
pub struct EntropyError(pub String);

/// A source of uniformly random bytes.
///
/// Implementations must either fill `dst` completely or return an error;
/// partial fills reported as success are not permitted.
pub trait EntropySource: Send + Sync {
    /// Fill `dst` entirely with random bytes.
    fn fill(&self, dst: &mut [u8]) -> Result<(), EntropyError>;
}

/// The process-wide system entropy source.
///
/// Backed by `ring`'s `SystemRandom`, which fills completely or fails, so a
/// short read can never be observed as success. Safe for concurrent use; on
/// platforms where the OS device can block briefly (early-boot entropy
/// starvation), the blocking happens inside the fill call.
#[derive(Debug)]
pub struct SystemEntropy {
    rng: SystemRandom,
}

impl SystemEntropy {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Default for SystemEntropy {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropySource for SystemEntropy {
    fn fill(&self, dst: &mut [u8]) -> Result<(), EntropyError> {
        self.rng
            .fill(dst)
            .map_err(|_| EntropyError("operating system refused the fill request".into()))
    }
}
