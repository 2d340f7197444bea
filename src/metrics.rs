//! Observability counters for a reader and its generator pool.
//!
//! Counters are relaxed atomics updated on the read and rekey paths and are
//! snapshotted into a plain struct for inspection, logging, or export.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of a reader's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderMetrics {
    /// Completed non-empty reads.
    pub reads: u64,

    /// Total random bytes handed to callers.
    pub bytes_generated: u64,

    /// Generator instances built by the pool factories, eager probes
    /// included.
    pub generators_created: u64,

    /// Key rotations that installed a fresh cipher.
    pub rekeys_completed: u64,

    /// Individual failed rekey attempts (each retried attempt counts).
    pub rekey_failures: u64,
}

/// Shared atomic counters behind [`ReaderMetrics`] snapshots.
#[derive(Debug, Default)]
pub(crate) struct MetricsRecorder {
    reads: AtomicU64,
    bytes_generated: AtomicU64,
    generators_created: AtomicU64,
    rekeys_completed: AtomicU64,
    rekey_failures: AtomicU64,
}

impl MetricsRecorder {
    pub(crate) fn record_read(&self, bytes: u64) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.bytes_generated.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_generator_created(&self) {
        self.generators_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rekey_completed(&self) {
        self.rekeys_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rekey_failure(&self) {
        self.rekey_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ReaderMetrics {
        ReaderMetrics {
            reads: self.reads.load(Ordering::Relaxed),
            bytes_generated: self.bytes_generated.load(Ordering::Relaxed),
            generators_created: self.generators_created.load(Ordering::Relaxed),
            rekeys_completed: self.rekeys_completed.load(Ordering::Relaxed),
            rekey_failures: self.rekey_failures.load(Ordering::Relaxed),
        }
    }
}
