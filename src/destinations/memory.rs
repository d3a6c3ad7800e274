//! In-memory destination that records every batch it receives

use crate::core::{BatchPolicy, CancellationToken, Destination, LogEntry, LoggerError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Recorded {
    batches: Mutex<Vec<Vec<LogEntry>>>,
    initialized: AtomicUsize,
    finalized: AtomicUsize,
    writes: AtomicUsize,
}

/// Destination that keeps batches in memory.
///
/// Clones share the same record, so a test can hand one clone to the logger
/// and inspect the other:
///
/// ```
/// use rust_log_pipeline::destinations::MemoryDestination;
/// use rust_log_pipeline::{BatchPolicy, Logger};
///
/// let memory = MemoryDestination::new(BatchPolicy::default());
/// let logger = Logger::builder().destination(memory.clone()).build().unwrap();
///
/// logger.info("hello").unwrap();
/// logger.dispose().unwrap();
///
/// assert_eq!(memory.messages(), vec!["hello"]);
/// assert_eq!(memory.finalize_count(), 1);
/// ```
#[derive(Clone)]
pub struct MemoryDestination {
    name: String,
    policy: BatchPolicy,
    setup_error: Option<String>,
    write_error: Option<String>,
    write_delay: Option<Duration>,
    recorded: Arc<Recorded>,
}

impl MemoryDestination {
    pub fn new(policy: BatchPolicy) -> Self {
        Self {
            name: "memory".to_string(),
            policy,
            setup_error: None,
            write_error: None,
            write_delay: None,
            recorded: Arc::new(Recorded::default()),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make `initialize` fail with the given message
    #[must_use]
    pub fn failing_setup(mut self, message: impl Into<String>) -> Self {
        self.setup_error = Some(message.into());
        self
    }

    /// Make every `write` fail with the given message
    #[must_use]
    pub fn failing_writes(mut self, message: impl Into<String>) -> Self {
        self.write_error = Some(message.into());
        self
    }

    /// Hold each `write` for `delay`, returning early with an error on cancel
    #[must_use]
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    pub fn batches(&self) -> Vec<Vec<LogEntry>> {
        self.recorded.batches.lock().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.recorded.batches.lock().iter().map(Vec::len).collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.recorded
            .batches
            .lock()
            .iter()
            .flatten()
            .map(|entry| entry.message().to_string())
            .collect()
    }

    pub fn initialize_count(&self) -> usize {
        self.recorded.initialized.load(Ordering::SeqCst)
    }

    pub fn finalize_count(&self) -> usize {
        self.recorded.finalized.load(Ordering::SeqCst)
    }

    /// Number of `write` calls, including failed ones
    pub fn write_count(&self) -> usize {
        self.recorded.writes.load(Ordering::SeqCst)
    }
}

impl Destination for MemoryDestination {
    fn name(&self) -> &str {
        &self.name
    }

    fn batch_policy(&self) -> BatchPolicy {
        self.policy
    }

    fn initialize(&mut self) -> Result<()> {
        self.recorded.initialized.fetch_add(1, Ordering::SeqCst);
        match &self.setup_error {
            Some(message) => Err(LoggerError::setup(&self.name, message)),
            None => Ok(()),
        }
    }

    fn write(&mut self, batch: &[LogEntry], cancel: &CancellationToken) -> Result<()> {
        self.recorded.writes.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.write_delay {
            if cancel.wait_timeout(delay) {
                return Err(LoggerError::write(&self.name, "cancelled mid-write"));
            }
        }
        if let Some(message) = &self.write_error {
            return Err(LoggerError::write(&self.name, message));
        }

        self.recorded.batches.lock().push(batch.to_vec());
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.recorded.finalized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
