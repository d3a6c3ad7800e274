//! Serial dispatcher: one batch at a time into the destination

use super::Handoff;
use crate::core::{
    CancellationToken, ChainFault, ChainMetrics, ChainState, Destination, FaultKind, LogEntry,
    LoggerError,
};
use crossbeam_channel::{select, Receiver};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Drives a destination through its whole lifecycle on the calling thread.
///
/// `initialize` runs first; batches are then written strictly one after the
/// other until the batcher signals completion, a write fails, or the chain is
/// cancelled. `finalize` runs exactly once on every one of those paths.
pub struct Dispatcher {
    chain: usize,
    destination: Box<dyn Destination>,
    name: String,
    input: Receiver<Handoff>,
    cancel: CancellationToken,
    metrics: Arc<ChainMetrics>,
}

impl Dispatcher {
    pub fn new(
        chain: usize,
        destination: Box<dyn Destination>,
        input: Receiver<Handoff>,
        cancel: CancellationToken,
        metrics: Arc<ChainMetrics>,
    ) -> Self {
        let name = destination.name().to_string();
        Self {
            chain,
            destination,
            name,
            input,
            cancel,
            metrics,
        }
    }

    pub fn run(mut self) -> ChainState {
        tracing::debug!(chain = self.chain, destination = %self.name, "dispatcher started");

        let state = match self.initialize() {
            Ok(()) => self.dispatch_loop(),
            Err(fault) => ChainState::Faulted(fault),
        };

        // Stop the batcher from queueing more work for a terminated chain.
        drop(self.input);

        let finalized = catch_unwind(AssertUnwindSafe(|| self.destination.finalize()));
        match finalized {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(destination = %self.name, error = %e, "finalize failed");
            }
            Err(payload) => {
                tracing::error!(
                    destination = %self.name,
                    panic = %panic_message(payload.as_ref()),
                    "finalize panicked"
                );
            }
        }

        match &state {
            ChainState::Faulted(fault) => {
                tracing::error!(chain = self.chain, destination = %self.name, %fault, "chain faulted");
            }
            other => {
                tracing::debug!(chain = self.chain, destination = %self.name, state = ?other, "dispatcher stopped");
            }
        }
        state
    }

    fn initialize(&mut self) -> Result<(), ChainFault> {
        match catch_unwind(AssertUnwindSafe(|| self.destination.initialize())) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(self.fault(FaultKind::Setup, e)),
            Err(payload) => Err(self.panic_fault("initialize", payload)),
        }
    }

    fn dispatch_loop(&mut self) -> ChainState {
        loop {
            let handoff = select! {
                recv(self.input) -> msg => msg,
                recv(self.cancel.signal()) -> _ => return ChainState::Cancelled,
            };

            match handoff {
                Ok(Handoff::Batch(batch)) => {
                    if self.cancel.is_cancelled() {
                        self.metrics.record_discarded(batch.len());
                        return ChainState::Cancelled;
                    }
                    if let Err(fault) = self.deliver(&batch) {
                        return ChainState::Faulted(fault);
                    }
                }
                Ok(Handoff::Completed) => return ChainState::Completed,
                Err(_) if self.cancel.is_cancelled() => return ChainState::Cancelled,
                Err(_) => {
                    return ChainState::Faulted(self.fault(
                        FaultKind::UpstreamTerminated,
                        LoggerError::other("batcher stopped without signalling completion"),
                    ));
                }
            }
        }
    }

    fn deliver(&mut self, batch: &[LogEntry]) -> Result<(), ChainFault> {
        let cancel = &self.cancel;
        let destination = &mut self.destination;
        let written = catch_unwind(AssertUnwindSafe(|| destination.write(batch, cancel)));

        match written {
            Ok(Ok(())) => {
                self.metrics.record_delivered(batch.len());
                Ok(())
            }
            Ok(Err(e)) => {
                self.metrics.record_write_failure();
                self.metrics.record_discarded(batch.len());
                Err(self.fault(FaultKind::Write, e))
            }
            Err(payload) => {
                self.metrics.record_write_failure();
                self.metrics.record_discarded(batch.len());
                Err(self.panic_fault("write", payload))
            }
        }
    }

    fn fault(&self, kind: FaultKind, error: LoggerError) -> ChainFault {
        ChainFault::new(self.chain, self.name.clone(), kind, Arc::new(error))
    }

    fn panic_fault(&self, operation: &str, payload: Box<dyn Any + Send>) -> ChainFault {
        let message = format!("{} panicked: {}", operation, panic_message(payload.as_ref()));
        self.fault(FaultKind::Panicked, LoggerError::other(message))
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BatchPolicy, LogLevel, Result};
    use crate::destinations::MemoryDestination;
    use crossbeam_channel::unbounded;
    use std::thread;
    use std::time::Duration;

    struct Flaky {
        fail_on: usize,
        calls: usize,
    }

    impl Destination for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn batch_policy(&self) -> BatchPolicy {
            BatchPolicy::immediate()
        }

        fn write(&mut self, _batch: &[LogEntry], _cancel: &CancellationToken) -> Result<()> {
            self.calls += 1;
            if self.calls == self.fail_on {
                return Err(LoggerError::write("flaky", "disk full"));
            }
            Ok(())
        }
    }

    fn batch(messages: &[&str]) -> Handoff {
        Handoff::Batch(
            messages
                .iter()
                .map(|m| LogEntry::new(LogLevel::Info, m))
                .collect(),
        )
    }

    #[test]
    fn test_drains_batches_in_order_then_completes() {
        let memory = MemoryDestination::new(BatchPolicy::default());
        let (tx, rx) = unbounded();
        tx.send(batch(&["a", "b"])).unwrap();
        tx.send(batch(&["c"])).unwrap();
        tx.send(Handoff::Completed).unwrap();

        let metrics = Arc::new(ChainMetrics::new());
        let dispatcher = Dispatcher::new(
            0,
            Box::new(memory.clone()),
            rx,
            CancellationToken::new(),
            Arc::clone(&metrics),
        );

        assert!(matches!(dispatcher.run(), ChainState::Completed));
        assert_eq!(memory.batch_sizes(), vec![2, 1]);
        assert_eq!(memory.messages(), vec!["a", "b", "c"]);
        assert_eq!(memory.initialize_count(), 1);
        assert_eq!(memory.finalize_count(), 1);
        assert_eq!(metrics.batches_delivered(), 2);
    }

    #[test]
    fn test_write_failure_faults_chain() {
        let (tx, rx) = unbounded();
        for m in ["1", "2", "3"] {
            tx.send(batch(&[m])).unwrap();
        }

        let metrics = Arc::new(ChainMetrics::new());
        let dispatcher = Dispatcher::new(
            4,
            Box::new(Flaky { fail_on: 2, calls: 0 }),
            rx,
            CancellationToken::new(),
            Arc::clone(&metrics),
        );

        match dispatcher.run() {
            ChainState::Faulted(fault) => {
                assert_eq!(fault.chain, 4);
                assert_eq!(fault.kind, FaultKind::Write);
                assert!(fault.error.to_string().contains("disk full"));
            }
            other => panic!("expected fault, got {:?}", other),
        }
        assert_eq!(metrics.batches_delivered(), 1);
        assert_eq!(metrics.write_failures(), 1);
        // Receiver dropped: the batcher can no longer hand off work
        assert!(tx.send(Handoff::Completed).is_err());
    }

    #[test]
    fn test_setup_failure_still_finalizes() {
        let memory = MemoryDestination::new(BatchPolicy::default()).failing_setup("no such host");
        let (_tx, rx) = unbounded();
        let dispatcher = Dispatcher::new(
            0,
            Box::new(memory.clone()),
            rx,
            CancellationToken::new(),
            Arc::new(ChainMetrics::new()),
        );

        match dispatcher.run() {
            ChainState::Faulted(fault) => assert_eq!(fault.kind, FaultKind::Setup),
            other => panic!("expected setup fault, got {:?}", other),
        }
        assert_eq!(memory.finalize_count(), 1);
    }

    #[test]
    fn test_upstream_disconnect_without_completion_is_a_fault() {
        let (tx, rx) = unbounded::<Handoff>();
        drop(tx);
        let dispatcher = Dispatcher::new(
            0,
            Box::new(MemoryDestination::new(BatchPolicy::default())),
            rx,
            CancellationToken::new(),
            Arc::new(ChainMetrics::new()),
        );

        match dispatcher.run() {
            ChainState::Faulted(fault) => assert_eq!(fault.kind, FaultKind::UpstreamTerminated),
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_cancel_unblocks_idle_dispatcher() {
        let memory = MemoryDestination::new(BatchPolicy::default());
        let (_tx, rx) = unbounded();
        let cancel = CancellationToken::new();
        let dispatcher = Dispatcher::new(
            0,
            Box::new(memory.clone()),
            rx,
            cancel.clone(),
            Arc::new(ChainMetrics::new()),
        );

        let handle = thread::spawn(move || dispatcher.run());
        thread::sleep(Duration::from_millis(20));
        cancel.cancel();

        assert!(matches!(handle.join().unwrap(), ChainState::Cancelled));
        assert_eq!(memory.finalize_count(), 1);
    }

    #[test]
    fn test_write_panic_is_isolated() {
        struct Panicky;
        impl Destination for Panicky {
            fn name(&self) -> &str {
                "panicky"
            }
            fn batch_policy(&self) -> BatchPolicy {
                BatchPolicy::immediate()
            }
            fn write(&mut self, _batch: &[LogEntry], _cancel: &CancellationToken) -> Result<()> {
                panic!("index out of bounds")
            }
        }

        let (tx, rx) = unbounded();
        tx.send(batch(&["boom"])).unwrap();
        let dispatcher = Dispatcher::new(
            0,
            Box::new(Panicky),
            rx,
            CancellationToken::new(),
            Arc::new(ChainMetrics::new()),
        );

        match dispatcher.run() {
            ChainState::Faulted(fault) => {
                assert_eq!(fault.kind, FaultKind::Panicked);
                assert!(fault.error.to_string().contains("index out of bounds"));
            }
            other => panic!("expected panic fault, got {:?}", other),
        }
    }
}
