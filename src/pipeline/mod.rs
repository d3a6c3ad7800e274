//! Per-destination pipeline stages
//!
//! Every destination gets its own chain: an [`IngressQueue`] feeding a
//! [`Batcher`] thread, which hands closed batches to a [`Dispatcher`] thread.
//! Terminal states travel downstream: closing the ingress lets the batcher
//! drain and send [`Handoff::Completed`]; a batcher that stops any other way
//! drops its sender, which the dispatcher records as a fault.

pub mod batcher;
pub mod chain;
pub mod dispatcher;
pub mod ingress;

pub use batcher::{Batcher, BatcherExit};
pub use chain::Chain;
pub use dispatcher::Dispatcher;
pub use ingress::IngressQueue;

use crate::core::LogEntry;

/// Message from a batcher to its dispatcher
#[derive(Debug)]
pub enum Handoff {
    /// A closed, non-empty batch in emission order
    Batch(Vec<LogEntry>),
    /// Upstream drained; no more batches will follow
    Completed,
}
