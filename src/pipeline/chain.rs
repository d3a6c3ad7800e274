//! One destination's full ingress -> batcher -> dispatcher chain

use super::{Batcher, BatcherExit, Dispatcher, IngressQueue};
use crate::core::{
    BatchPolicy, CancellationToken, ChainFault, ChainMetrics, ChainState, Destination, FaultKind,
    LogEntry, LoggerError, Result,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

struct Workers {
    batcher: JoinHandle<BatcherExit>,
    dispatcher: JoinHandle<ChainState>,
}

pub struct Chain {
    index: usize,
    name: String,
    ingress: IngressQueue,
    metrics: Arc<ChainMetrics>,
    workers: Mutex<Option<Workers>>,
}

impl Chain {
    /// Start the batcher and dispatcher threads for `destination`.
    ///
    /// `policy` must already be validated.
    pub fn spawn(
        index: usize,
        destination: Box<dyn Destination>,
        policy: BatchPolicy,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let name = destination.name().to_string();
        let metrics = Arc::new(ChainMetrics::new());
        let (ingress, entries) = IngressQueue::new(name.clone(), Arc::clone(&metrics));
        let (handoff_tx, handoff_rx) = crossbeam_channel::unbounded();

        let dispatcher = Dispatcher::new(
            index,
            destination,
            handoff_rx,
            cancel.clone(),
            Arc::clone(&metrics),
        );
        let dispatcher = thread::Builder::new()
            .name(format!("log-dispatch-{}", name))
            .spawn(move || dispatcher.run())
            .map_err(|e| {
                LoggerError::io_operation("spawning dispatcher thread", name.clone(), e)
            })?;

        let batcher = Batcher::new(
            name.clone(),
            policy,
            entries,
            handoff_tx,
            cancel.clone(),
            Arc::clone(&metrics),
        );
        // On failure the batcher is dropped with its sender, so the dispatcher
        // records an upstream fault, finalizes and exits by itself.
        let batcher = thread::Builder::new()
            .name(format!("log-batch-{}", name))
            .spawn(move || batcher.run())
            .map_err(|e| LoggerError::io_operation("spawning batcher thread", name.clone(), e))?;

        Ok(Self {
            index,
            name,
            ingress,
            metrics,
            workers: Mutex::new(Some(Workers {
                batcher,
                dispatcher,
            })),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<ChainMetrics> {
        &self.metrics
    }

    pub fn post(&self, entry: LogEntry) -> Result<()> {
        self.ingress.post(entry)
    }

    /// Stop accepting entries; queued ones still drain downstream.
    pub fn close(&self) -> bool {
        self.ingress.close()
    }

    /// Wait for both worker threads and return the dispatcher's terminal state.
    ///
    /// Returns `None` if the chain was already joined.
    pub fn join(&self) -> Option<ChainState> {
        let workers = self.workers.lock().take()?;

        let state = match workers.dispatcher.join() {
            Ok(state) => state,
            Err(payload) => {
                let message = super::dispatcher::panic_message(payload.as_ref());
                ChainState::Faulted(ChainFault::new(
                    self.index,
                    self.name.clone(),
                    FaultKind::Panicked,
                    Arc::new(LoggerError::other(format!("dispatcher panicked: {}", message))),
                ))
            }
        };

        if workers.batcher.join().is_err() {
            tracing::error!(destination = %self.name, "batcher thread panicked");
        }

        Some(state)
    }
}
