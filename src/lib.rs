//! # Rust Log Pipeline
//!
//! An in-process, multi-destination asynchronous log pipeline.
//!
//! Every logged entry is fanned out to one independent chain per
//! destination. Each chain batches entries (closing a batch when it is full
//! or after a quiet period with no new arrivals) and writes the batches to
//! its destination strictly one at a time.
//!
//! ## Features
//!
//! - **Non-blocking**: `log` only enqueues, from any number of threads
//! - **Batched delivery**: per-destination batch size and quiet-period timeout
//! - **Isolated destinations**: one failing or slow destination never affects another
//! - **Deterministic teardown**: `initialize`/`finalize` run exactly once per destination,
//!   and shutdown reports faults or cancellation in one place

pub mod core;
pub mod destinations;
pub mod macros;
pub mod pipeline;

pub mod prelude {
    #[cfg(feature = "console")]
    pub use crate::destinations::ConsoleDestination;
    #[cfg(feature = "file")]
    pub use crate::destinations::{FileDestination, LineFormat};
    pub use crate::destinations::MemoryDestination;
    pub use crate::core::{
        BatchPolicy, CancellationToken, CancelledCallback, ChainFault, ChainMetrics, Destination,
        FailureCallback, FaultKind, LogEntry, LogLevel, Logger, LoggerBuilder, LoggerError,
        Result, ShutdownOutcome,
    };
}

pub use crate::core::{
    BatchPolicy, CancellationToken, CancelledCallback, ChainFault, ChainMetrics, ChainState,
    Destination, FailureCallback, FaultKind, FlushReason, LogEntry, LogLevel, Logger,
    LoggerBuilder, LoggerError, Result, ShutdownOutcome,
};
