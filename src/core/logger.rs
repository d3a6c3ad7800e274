//! Pipeline supervisor: fan-out, cancellation and shutdown

use super::{
    batch_policy::BatchPolicy,
    cancellation::CancellationToken,
    destination::Destination,
    error::{LoggerError, Result},
    fault::ShutdownOutcome,
    log_entry::LogEntry,
    log_level::LogLevel,
    metrics::ChainMetrics,
    notification::{CancelledCallback, FailureCallback, Notifier},
};
use crate::pipeline::Chain;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

/// Fans every entry out to one independent chain per destination.
///
/// Each chain batches entries by size or quiet period and writes them to its
/// destination one batch at a time. `dispose` (or dropping the logger) closes
/// every chain, waits for all of them to drain, and reports the combined
/// outcome exactly once.
///
/// # Example
///
/// ```
/// use rust_log_pipeline::prelude::*;
/// use std::time::Duration;
///
/// let memory = MemoryDestination::new(BatchPolicy::new(3, Duration::from_secs(1)));
/// let logger = Logger::builder().destination(memory.clone()).build()?;
///
/// for i in 0..4 {
///     logger.info(format!("request {}", i))?;
/// }
/// logger.dispose()?;
///
/// assert_eq!(memory.batch_sizes(), vec![3, 1]);
/// # Ok::<(), LoggerError>(())
/// ```
pub struct Logger {
    chains: Vec<Chain>,
    cancel: CancellationToken,
    disposed: AtomicBool,
    phase: Mutex<ShutdownPhase>,
    /// Signalled once the first shutdown has cached its outcome
    shutdown_done: Condvar,
    notifier: Notifier,
}

enum ShutdownPhase {
    Running,
    Draining,
    Done(ShutdownOutcome),
}

impl Logger {
    /// Create a logger with one chain per destination and no notification callbacks
    pub fn new(destinations: Vec<Box<dyn Destination>>) -> Result<Self> {
        Self::with_notifier(destinations, Notifier::default())
    }

    fn with_notifier(destinations: Vec<Box<dyn Destination>>, notifier: Notifier) -> Result<Self> {
        if destinations.is_empty() {
            return Err(LoggerError::config(
                "Logger",
                "at least one destination is required",
            ));
        }

        // Validate everything before any thread starts
        let policies = destinations
            .iter()
            .map(|destination| -> Result<BatchPolicy> {
                let policy = destination.batch_policy();
                policy.validate().map_err(|_| {
                    LoggerError::config(
                        format!("destination '{}'", destination.name()),
                        format!("batch_size must be at least 1, got {}", policy.batch_size),
                    )
                })?;
                Ok(policy)
            })
            .collect::<Result<Vec<BatchPolicy>>>()?;

        let cancel = CancellationToken::new();
        let mut chains = Vec::with_capacity(destinations.len());

        for (index, (destination, policy)) in destinations.into_iter().zip(policies).enumerate() {
            match Chain::spawn(index, destination, policy, &cancel) {
                Ok(chain) => chains.push(chain),
                Err(e) => {
                    cancel.cancel();
                    for chain in &chains {
                        chain.close();
                        chain.join();
                    }
                    return Err(e);
                }
            }
        }

        tracing::debug!(destinations = chains.len(), "log pipeline started");

        Ok(Self {
            chains,
            cancel,
            disposed: AtomicBool::new(false),
            phase: Mutex::new(ShutdownPhase::Running),
            shutdown_done: Condvar::new(),
            notifier,
        })
    }

    /// Post one entry to every chain.
    ///
    /// Never blocks. Fails with [`LoggerError::Disposed`] once shutdown has
    /// begun; a chain closed concurrently with this call yields
    /// [`LoggerError::ChainClosed`].
    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(LoggerError::Disposed);
        }

        let entry = LogEntry::new(level, message);
        let (last, rest) = self
            .chains
            .split_last()
            .ok_or_else(|| LoggerError::other("logger has no chains"))?;

        let mut first_error = None;
        for chain in rest {
            if let Err(e) = chain.post(entry.clone()) {
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = last.post(entry) {
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    #[inline]
    pub fn trace(&self, message: impl AsRef<str>) -> Result<()> {
        self.log(LogLevel::Trace, message)
    }

    #[inline]
    pub fn debug(&self, message: impl AsRef<str>) -> Result<()> {
        self.log(LogLevel::Debug, message)
    }

    #[inline]
    pub fn info(&self, message: impl AsRef<str>) -> Result<()> {
        self.log(LogLevel::Info, message)
    }

    #[inline]
    pub fn warn(&self, message: impl AsRef<str>) -> Result<()> {
        self.log(LogLevel::Warn, message)
    }

    #[inline]
    pub fn error(&self, message: impl AsRef<str>) -> Result<()> {
        self.log(LogLevel::Error, message)
    }

    #[inline]
    pub fn fatal(&self, message: impl AsRef<str>) -> Result<()> {
        self.log(LogLevel::Fatal, message)
    }

    /// Abort now.
    ///
    /// Every stage stops as soon as it observes the signal: buffered entries
    /// are discarded, no new batch is dispatched, and writers that honour the
    /// token return early. Call [`dispose`](Self::dispose) afterwards to join
    /// the workers; it reports [`LoggerError::Cancelled`].
    pub fn cancel(&self) {
        if self.cancel.cancel() {
            tracing::debug!("log pipeline cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// The shared signal handed to every stage and destination
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn destination_count(&self) -> usize {
        self.chains.len()
    }

    /// Snapshot of each chain's counters, keyed by destination name
    pub fn metrics(&self) -> Vec<(String, ChainMetrics)> {
        self.chains
            .iter()
            .map(|chain| (chain.name().to_string(), ChainMetrics::clone(chain.metrics())))
            .collect()
    }

    /// Close all chains, wait for them to finish, and classify the result.
    ///
    /// Idempotent: only the first call does the work and fires notifications;
    /// concurrent callers block until the outcome is known, and every call
    /// returns the same outcome. Callbacks run after the outcome is cached, so
    /// a callback may call back into this logger.
    pub fn shutdown(&self) -> ShutdownOutcome {
        {
            let mut phase = self.phase.lock();
            loop {
                match &*phase {
                    ShutdownPhase::Done(outcome) => return outcome.clone(),
                    ShutdownPhase::Running => break,
                    ShutdownPhase::Draining => {}
                }
                self.shutdown_done.wait(&mut phase);
            }
            *phase = ShutdownPhase::Draining;
        }

        self.disposed.store(true, Ordering::Release);

        for chain in &self.chains {
            chain.close();
        }

        let states = self
            .chains
            .iter()
            .filter_map(|chain| chain.join())
            .collect();

        let outcome = ShutdownOutcome::classify(states, self.cancel.is_cancelled());
        match &outcome {
            ShutdownOutcome::Completed => tracing::debug!("log pipeline drained"),
            ShutdownOutcome::Cancelled => tracing::debug!("log pipeline shut down after cancel"),
            ShutdownOutcome::Faulted(faults) => {
                tracing::warn!(faulted = faults.len(), "log pipeline shut down with faults")
            }
        }

        *self.phase.lock() = ShutdownPhase::Done(outcome.clone());
        self.shutdown_done.notify_all();

        self.notifier.notify(&outcome);
        outcome
    }

    /// [`shutdown`](Self::shutdown), with the outcome as a `Result`
    pub fn dispose(&self) -> Result<()> {
        self.shutdown().into_result()
    }

    /// Create a builder for Logger
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        // Scoped teardown; a no-op if already disposed
        let _ = self.shutdown();
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use rust_log_pipeline::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::builder()
///     .destination(MemoryDestination::new(BatchPolicy::default()))
///     .on_failure(Arc::new(|faults: &[ChainFault]| {
///         for fault in faults {
///             eprintln!("log destination failed: {}", fault);
///         }
///     }))
///     .on_cancelled(Arc::new(|| eprintln!("logging aborted")))
///     .build()
///     .unwrap();
/// # logger.dispose().unwrap();
/// ```
pub struct LoggerBuilder {
    destinations: Vec<Box<dyn Destination>>,
    notifier: Notifier,
}

impl LoggerBuilder {
    /// Create a new builder with no destinations
    pub fn new() -> Self {
        Self {
            destinations: Vec::new(),
            notifier: Notifier::default(),
        }
    }

    /// Add a destination; each one gets its own chain
    #[must_use = "builder methods return a new value"]
    pub fn destination<D: Destination + 'static>(mut self, destination: D) -> Self {
        self.destinations.push(Box::new(destination));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn boxed_destination(mut self, destination: Box<dyn Destination>) -> Self {
        self.destinations.push(destination);
        self
    }

    /// Set a callback for faulted chains
    ///
    /// Invoked once, during the first shutdown, with one fault per faulted
    /// chain. Not invoked when the shutdown reports cancellation.
    #[must_use = "builder methods return a new value"]
    pub fn on_failure(mut self, callback: FailureCallback) -> Self {
        self.notifier.on_failure = Some(callback);
        self
    }

    /// Set a callback for a shutdown that observed cancellation
    #[must_use = "builder methods return a new value"]
    pub fn on_cancelled(mut self, callback: CancelledCallback) -> Self {
        self.notifier.on_cancelled = Some(callback);
        self
    }

    /// Build the Logger and start every chain
    ///
    /// Fails with [`LoggerError::InvalidConfiguration`] when no destination
    /// was added or a destination declares a zero batch size.
    pub fn build(self) -> Result<Logger> {
        Logger::with_notifier(self.destinations, self.notifier)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
