//! Per-chain terminal outcomes and their aggregation at shutdown

use super::error::{LoggerError, Result};
use std::fmt;
use std::sync::Arc;

/// Stage of a chain that produced a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// `Destination::initialize` returned an error
    Setup,
    /// `Destination::write` returned an error
    Write,
    /// A stage or destination call panicked
    Panicked,
    /// The batcher stopped without signalling completion
    UpstreamTerminated,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FaultKind::Setup => "setup",
            FaultKind::Write => "write",
            FaultKind::Panicked => "panic",
            FaultKind::UpstreamTerminated => "upstream terminated",
        })
    }
}

/// A fault recorded for one chain
#[derive(Debug, Clone)]
pub struct ChainFault {
    pub chain: usize,
    pub destination: String,
    pub kind: FaultKind,
    pub error: Arc<LoggerError>,
}

impl ChainFault {
    pub fn new(
        chain: usize,
        destination: impl Into<String>,
        kind: FaultKind,
        error: Arc<LoggerError>,
    ) -> Self {
        Self {
            chain,
            destination: destination.into(),
            kind,
            error,
        }
    }
}

impl fmt::Display for ChainFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chain #{} ({}) {} fault: {}",
            self.chain, self.destination, self.kind, self.error
        )
    }
}

/// Terminal state reached by a chain's dispatcher
#[derive(Debug, Clone)]
pub enum ChainState {
    Completed,
    Faulted(ChainFault),
    Cancelled,
}

/// Combined result of a logger shutdown
#[derive(Debug, Clone, Default)]
pub enum ShutdownOutcome {
    /// Every chain drained and completed
    #[default]
    Completed,
    /// The cancellation signal was raised; takes precedence over faults
    Cancelled,
    /// At least one chain faulted, one entry per faulted chain
    Faulted(Vec<ChainFault>),
}

impl ShutdownOutcome {
    /// Classify the terminal states of all chains.
    ///
    /// Cancellation wins over faults whenever the signal was raised before
    /// classification.
    pub fn classify(states: Vec<ChainState>, cancelled: bool) -> Self {
        if cancelled {
            return ShutdownOutcome::Cancelled;
        }

        let faults: Vec<ChainFault> = states
            .into_iter()
            .filter_map(|state| match state {
                ChainState::Faulted(fault) => Some(fault),
                _ => None,
            })
            .collect();

        if faults.is_empty() {
            ShutdownOutcome::Completed
        } else {
            ShutdownOutcome::Faulted(faults)
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ShutdownOutcome::Completed)
    }

    pub fn faults(&self) -> &[ChainFault] {
        match self {
            ShutdownOutcome::Faulted(faults) => faults,
            _ => &[],
        }
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            ShutdownOutcome::Completed => Ok(()),
            ShutdownOutcome::Cancelled => Err(LoggerError::Cancelled),
            ShutdownOutcome::Faulted(faults) => Err(LoggerError::ChainsFaulted { faults }),
        }
    }
}
