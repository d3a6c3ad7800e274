//! Debounced batcher
//!
//! Owns the open batch and its deadline on a single thread, so arrivals and
//! the quiet-period timer never race. The timer is the `default(timeout)` arm
//! of `select!`, re-armed from the most recent arrival on every iteration.

use super::Handoff;
use crate::core::{BatchPolicy, CancellationToken, ChainMetrics, FlushReason, LogEntry};
use crossbeam_channel::{select, Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;

enum Event {
    Arrived(LogEntry),
    QuietPeriodElapsed,
    UpstreamClosed,
    Cancelled,
}

/// How the batcher loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatcherExit {
    /// Upstream closed; the remainder was emitted and `Completed` sent
    Drained,
    /// The cancellation signal fired; the open batch was dropped
    Cancelled,
    /// The dispatcher is gone; nothing more can be delivered
    DownstreamGone,
}

pub struct Batcher {
    destination: String,
    policy: BatchPolicy,
    input: Receiver<LogEntry>,
    output: Sender<Handoff>,
    cancel: CancellationToken,
    metrics: Arc<ChainMetrics>,
    batch: Vec<LogEntry>,
    deadline: Option<Instant>,
}

impl Batcher {
    pub fn new(
        destination: impl Into<String>,
        policy: BatchPolicy,
        input: Receiver<LogEntry>,
        output: Sender<Handoff>,
        cancel: CancellationToken,
        metrics: Arc<ChainMetrics>,
    ) -> Self {
        Self {
            destination: destination.into(),
            policy,
            input,
            output,
            cancel,
            metrics,
            batch: Vec::with_capacity(policy.batch_size),
            deadline: None,
        }
    }

    pub fn run(mut self) -> BatcherExit {
        tracing::debug!(
            destination = %self.destination,
            batch_size = self.policy.batch_size,
            flush_timeout_ms = self.policy.flush_timeout_ms(),
            "batcher started"
        );

        let exit = self.run_loop();

        tracing::debug!(destination = %self.destination, ?exit, "batcher stopped");
        exit
    }

    fn run_loop(&mut self) -> BatcherExit {
        loop {
            if self.cancel.is_cancelled() {
                return self.abandon();
            }

            match self.next_event() {
                Event::Arrived(entry) => {
                    self.batch.push(entry);
                    if self.batch.len() >= self.policy.batch_size {
                        if !self.emit(FlushReason::SizeLimit) {
                            return BatcherExit::DownstreamGone;
                        }
                    } else {
                        // An unrepresentable deadline means "never": only size or shutdown flush.
                        self.deadline = Instant::now().checked_add(self.policy.flush_timeout);
                    }
                }
                Event::QuietPeriodElapsed => {
                    if !self.emit(FlushReason::QuietPeriod) {
                        return BatcherExit::DownstreamGone;
                    }
                }
                Event::UpstreamClosed => {
                    if !self.emit(FlushReason::Shutdown) {
                        return BatcherExit::DownstreamGone;
                    }
                    if self.output.send(Handoff::Completed).is_err() {
                        return BatcherExit::DownstreamGone;
                    }
                    return BatcherExit::Drained;
                }
                Event::Cancelled => return self.abandon(),
            }
        }
    }

    fn next_event(&self) -> Event {
        let cancel = self.cancel.signal();
        match self.deadline {
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                select! {
                    recv(self.input) -> msg => msg.map_or(Event::UpstreamClosed, Event::Arrived),
                    recv(cancel) -> _ => Event::Cancelled,
                    default(wait) => Event::QuietPeriodElapsed,
                }
            }
            None => select! {
                recv(self.input) -> msg => msg.map_or(Event::UpstreamClosed, Event::Arrived),
                recv(cancel) -> _ => Event::Cancelled,
            },
        }
    }

    /// Close the open batch and hand it downstream.
    ///
    /// Returns `false` when the dispatcher has stopped receiving.
    fn emit(&mut self, reason: FlushReason) -> bool {
        self.deadline = None;
        if self.batch.is_empty() {
            return true;
        }

        let batch = std::mem::replace(
            &mut self.batch,
            Vec::with_capacity(self.policy.batch_size),
        );
        let len = batch.len();

        // Counted before the send so the dispatcher never delivers an uncounted batch
        self.metrics.record_flush(reason);
        match self.output.send(Handoff::Batch(batch)) {
            Ok(()) => true,
            Err(_) => {
                self.metrics.retract_flush(reason);
                self.metrics.record_discarded(len);
                tracing::warn!(
                    destination = %self.destination,
                    discarded = len,
                    "dispatcher stopped, dropping batch"
                );
                false
            }
        }
    }

    fn abandon(&mut self) -> BatcherExit {
        let dropped = self.batch.len() + self.input.len();
        if dropped > 0 {
            self.metrics.record_discarded(dropped);
            tracing::debug!(
                destination = %self.destination,
                discarded = dropped,
                "cancelled with entries still buffered"
            );
        }
        self.batch.clear();
        BatcherExit::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;
    use crossbeam_channel::{unbounded, Receiver};
    use std::thread;
    use std::time::Duration;

    struct Harness {
        input: Sender<LogEntry>,
        output: Receiver<Handoff>,
        cancel: CancellationToken,
        metrics: Arc<ChainMetrics>,
        handle: thread::JoinHandle<BatcherExit>,
    }

    fn start(policy: BatchPolicy) -> Harness {
        let (input, input_rx) = unbounded();
        let (output_tx, output) = unbounded();
        let cancel = CancellationToken::new();
        let metrics = Arc::new(ChainMetrics::new());
        let batcher = Batcher::new(
            "test",
            policy,
            input_rx,
            output_tx,
            cancel.clone(),
            Arc::clone(&metrics),
        );
        let handle = thread::spawn(move || batcher.run());
        Harness {
            input,
            output,
            cancel,
            metrics,
            handle,
        }
    }

    fn entry(message: &str) -> LogEntry {
        LogEntry::new(LogLevel::Info, message)
    }

    fn messages(handoff: Handoff) -> Vec<String> {
        match handoff {
            Handoff::Batch(batch) => batch.iter().map(|e| e.message().to_string()).collect(),
            Handoff::Completed => panic!("expected a batch, got completion"),
        }
    }

    #[test]
    fn test_size_flush_then_quiet_period_flush() {
        let h = start(BatchPolicy::new(3, Duration::from_millis(100)));
        for m in ["a", "b", "c", "d"] {
            h.input.send(entry(m)).unwrap();
        }

        let first = h.output.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(messages(first), vec!["a", "b", "c"]);

        let second = h.output.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(messages(second), vec!["d"]);
        assert_eq!(h.metrics.size_flushes(), 1);
        assert_eq!(h.metrics.timeout_flushes(), 1);

        drop(h.input);
        assert!(matches!(h.output.recv().unwrap(), Handoff::Completed));
        assert_eq!(h.handle.join().unwrap(), BatcherExit::Drained);
    }

    #[test]
    fn test_quiet_period_is_not_immediate() {
        let h = start(BatchPolicy::new(100, Duration::from_millis(200)));
        h.input.send(entry("solo")).unwrap();

        assert!(h.output.recv_timeout(Duration::from_millis(50)).is_err());
        let batch = h.output.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(messages(batch), vec!["solo"]);

        drop(h.input);
        h.handle.join().unwrap();
    }

    #[test]
    fn test_shutdown_emits_remainder_before_completion() {
        let h = start(BatchPolicy::new(10, Duration::from_secs(60)));
        h.input.send(entry("x")).unwrap();
        h.input.send(entry("y")).unwrap();
        drop(h.input);

        assert_eq!(messages(h.output.recv().unwrap()), vec!["x", "y"]);
        assert!(matches!(h.output.recv().unwrap(), Handoff::Completed));
        assert_eq!(h.handle.join().unwrap(), BatcherExit::Drained);
        assert_eq!(h.metrics.final_flushes(), 1);
    }

    #[test]
    fn test_cancel_drops_open_batch() {
        let h = start(BatchPolicy::new(10, Duration::from_secs(60)));
        h.input.send(entry("pending")).unwrap();
        thread::sleep(Duration::from_millis(50));
        h.cancel.cancel();

        assert_eq!(h.handle.join().unwrap(), BatcherExit::Cancelled);
        assert!(h.output.try_recv().is_err());
        assert_eq!(h.metrics.entries_discarded(), 1);
    }

    #[test]
    fn test_flush_is_counted_before_handoff() {
        let h = start(BatchPolicy::immediate());
        for round in 1..=200u64 {
            h.input.send(entry("tick")).unwrap();
            let batch = h.output.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(messages(batch), vec!["tick"]);
            assert_eq!(h.metrics.size_flushes(), round);
        }

        drop(h.input);
        assert_eq!(h.handle.join().unwrap(), BatcherExit::Drained);
    }

    #[test]
    fn test_downstream_gone_stops_batcher() {
        let h = start(BatchPolicy::immediate());
        drop(h.output);
        h.input.send(entry("nowhere")).unwrap();

        assert_eq!(h.handle.join().unwrap(), BatcherExit::DownstreamGone);
        assert_eq!(h.metrics.entries_discarded(), 1);
        assert_eq!(h.metrics.size_flushes(), 0);
    }

    #[test]
    fn test_huge_timeout_never_fires() {
        let h = start(BatchPolicy::new(5, Duration::MAX));
        h.input.send(entry("held")).unwrap();
        assert!(h.output.recv_timeout(Duration::from_millis(100)).is_err());

        drop(h.input);
        assert_eq!(messages(h.output.recv().unwrap()), vec!["held"]);
    }
}
