//! Core logger types and traits

pub mod batch_policy;
pub mod cancellation;
pub mod destination;
pub mod error;
pub mod fault;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod notification;

pub use batch_policy::BatchPolicy;
pub use cancellation::CancellationToken;
pub use destination::Destination;
pub use error::{LoggerError, Result};
pub use fault::{ChainFault, ChainState, FaultKind, ShutdownOutcome};
pub use log_entry::LogEntry;
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder};
pub use metrics::{ChainMetrics, FlushReason};
pub use notification::{CancelledCallback, FailureCallback};
