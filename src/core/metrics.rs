//! Per-chain metrics for observability
//!
//! Provides counters for monitoring one destination chain: how many entries
//! entered it, how they were grouped into batches, and how many were lost.

use std::sync::atomic::{AtomicU64, Ordering};

/// Why the batcher closed a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// The batch reached the destination's batch size
    SizeLimit,
    /// The quiet period elapsed without a new arrival
    QuietPeriod,
    /// Upstream closed and the remainder was emitted
    Shutdown,
}

/// Metrics for one pipeline chain
///
/// # Example
///
/// ```
/// use rust_log_pipeline::{ChainMetrics, FlushReason};
///
/// let metrics = ChainMetrics::new();
///
/// metrics.record_enqueued();
/// metrics.record_flush(FlushReason::QuietPeriod);
/// metrics.record_delivered(1);
///
/// assert_eq!(metrics.entries_enqueued(), 1);
/// assert_eq!(metrics.timeout_flushes(), 1);
/// assert_eq!(metrics.entries_delivered(), 1);
/// ```
#[derive(Debug)]
pub struct ChainMetrics {
    /// Entries accepted by the ingress queue
    entries_enqueued: AtomicU64,

    /// Entries dropped because a downstream stage had already terminated
    entries_discarded: AtomicU64,

    /// Batches the destination accepted
    batches_delivered: AtomicU64,

    /// Entries inside accepted batches
    entries_delivered: AtomicU64,

    size_flushes: AtomicU64,
    timeout_flushes: AtomicU64,
    final_flushes: AtomicU64,

    /// Failed `write` calls (at most one per chain, the chain faults after it)
    write_failures: AtomicU64,
}

impl ChainMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            entries_enqueued: AtomicU64::new(0),
            entries_discarded: AtomicU64::new(0),
            batches_delivered: AtomicU64::new(0),
            entries_delivered: AtomicU64::new(0),
            size_flushes: AtomicU64::new(0),
            timeout_flushes: AtomicU64::new(0),
            final_flushes: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn entries_enqueued(&self) -> u64 {
        self.entries_enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn entries_discarded(&self) -> u64 {
        self.entries_discarded.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn batches_delivered(&self) -> u64 {
        self.batches_delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn entries_delivered(&self) -> u64 {
        self.entries_delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn size_flushes(&self) -> u64 {
        self.size_flushes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn timeout_flushes(&self) -> u64 {
        self.timeout_flushes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn final_flushes(&self) -> u64 {
        self.final_flushes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_enqueued(&self) -> u64 {
        self.entries_enqueued.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_discarded(&self, count: usize) -> u64 {
        self.entries_discarded
            .fetch_add(count as u64, Ordering::Relaxed)
    }

    /// Record a batch the destination accepted
    #[inline]
    pub fn record_delivered(&self, entries: usize) {
        self.batches_delivered.fetch_add(1, Ordering::Relaxed);
        self.entries_delivered
            .fetch_add(entries as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_flush(&self, reason: FlushReason) {
        let counter = match reason {
            FlushReason::SizeLimit => &self.size_flushes,
            FlushReason::QuietPeriod => &self.timeout_flushes,
            FlushReason::Shutdown => &self.final_flushes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Undo a `record_flush` whose batch never left the batcher
    #[inline]
    pub fn retract_flush(&self, reason: FlushReason) {
        let counter = match reason {
            FlushReason::SizeLimit => &self.size_flushes,
            FlushReason::QuietPeriod => &self.timeout_flushes,
            FlushReason::Shutdown => &self.final_flushes,
        };
        counter.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_write_failure(&self) -> u64 {
        self.write_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Entries that were accepted but never reached the destination
    pub fn entries_pending(&self) -> u64 {
        self.entries_enqueued()
            .saturating_sub(self.entries_delivered())
            .saturating_sub(self.entries_discarded())
    }
}

impl Default for ChainMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ChainMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            entries_enqueued: AtomicU64::new(self.entries_enqueued()),
            entries_discarded: AtomicU64::new(self.entries_discarded()),
            batches_delivered: AtomicU64::new(self.batches_delivered()),
            entries_delivered: AtomicU64::new(self.entries_delivered()),
            size_flushes: AtomicU64::new(self.size_flushes()),
            timeout_flushes: AtomicU64::new(self.timeout_flushes()),
            final_flushes: AtomicU64::new(self.final_flushes()),
            write_failures: AtomicU64::new(self.write_failures()),
        }
    }
}
