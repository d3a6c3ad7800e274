//! Ingress queue: the unbounded FIFO in front of each chain

use crate::core::{ChainMetrics, LogEntry, LoggerError, Result};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;

/// Producer side of a chain's input queue.
///
/// Any number of threads may `post` concurrently; each producer's entries keep
/// their relative order. Closing drops the only sender, so the batcher still
/// drains everything already queued before it observes the disconnect.
pub struct IngressQueue {
    destination: String,
    sender: RwLock<Option<Sender<LogEntry>>>,
    metrics: Arc<ChainMetrics>,
}

impl IngressQueue {
    pub fn new(destination: impl Into<String>, metrics: Arc<ChainMetrics>) -> (Self, Receiver<LogEntry>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let queue = Self {
            destination: destination.into(),
            sender: RwLock::new(Some(sender)),
            metrics,
        };
        (queue, receiver)
    }

    /// Enqueue an entry without blocking.
    ///
    /// Fails with `ChainClosed` once [`close`](Self::close) has run. If the
    /// batcher already stopped (downstream fault or cancellation) the entry is
    /// discarded and counted, and the call still succeeds.
    pub fn post(&self, entry: LogEntry) -> Result<()> {
        let guard = self.sender.read();
        let sender = guard
            .as_ref()
            .ok_or_else(|| LoggerError::chain_closed(&self.destination))?;

        match sender.send(entry) {
            Ok(()) => {
                self.metrics.record_enqueued();
            }
            Err(_) => {
                let discarded = self.metrics.record_discarded(1);
                if discarded == 0 {
                    tracing::warn!(
                        destination = %self.destination,
                        "chain stopped accepting entries, discarding"
                    );
                }
            }
        }
        Ok(())
    }

    /// Stop accepting entries. Returns `false` if already closed.
    pub fn close(&self) -> bool {
        self.sender.write().take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }
}
