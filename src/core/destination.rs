//! Destination trait for batch log output

use super::{
    batch_policy::BatchPolicy, cancellation::CancellationToken, error::Result,
    log_entry::LogEntry,
};

/// An external sink that receives batches of log entries.
///
/// Each destination is moved into its own chain and driven by exactly one
/// dispatcher thread: `initialize` once when the chain starts, `write` once
/// per batch (never concurrently), and `finalize` exactly once when the chain
/// reaches a terminal state, whether it completed, faulted or was cancelled.
///
/// # Example
///
/// ```
/// use rust_log_pipeline::{BatchPolicy, CancellationToken, Destination, LogEntry, Result};
///
/// struct Stdout;
///
/// impl Destination for Stdout {
///     fn name(&self) -> &str {
///         "stdout"
///     }
///
///     fn batch_policy(&self) -> BatchPolicy {
///         BatchPolicy::default()
///     }
///
///     fn write(&mut self, batch: &[LogEntry], _cancel: &CancellationToken) -> Result<()> {
///         for entry in batch {
///             println!("{} {}", entry.level(), entry.message());
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Destination: Send {
    fn name(&self) -> &str;

    /// Batch size and quiet-period timeout for this destination's chain
    fn batch_policy(&self) -> BatchPolicy;

    /// Acquire resources. An error faults the chain; `finalize` still runs.
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Deliver one non-empty batch, in the order entries were logged.
    ///
    /// Long-running writers should poll `cancel` and give up once it fires.
    /// An error faults the chain; the batch is not retried.
    fn write(&mut self, batch: &[LogEntry], cancel: &CancellationToken) -> Result<()>;

    /// Release resources. Errors are logged, not propagated.
    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}
