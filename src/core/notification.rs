//! Shutdown notifications
//!
//! Callbacks registered on the builder and fired at most once, by the first
//! `dispose` of a logger. Subscribing is optional: the same outcome is always
//! returned from `dispose` as a value.

use super::fault::{ChainFault, ShutdownOutcome};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Called with one fault per faulted chain
pub type FailureCallback = Arc<dyn Fn(&[ChainFault]) + Send + Sync>;

/// Called when shutdown observed the cancellation signal
pub type CancelledCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Default)]
pub(crate) struct Notifier {
    pub(crate) on_failure: Option<FailureCallback>,
    pub(crate) on_cancelled: Option<CancelledCallback>,
}

impl Notifier {
    pub(crate) fn notify(&self, outcome: &ShutdownOutcome) {
        let delivered = match outcome {
            ShutdownOutcome::Completed => return,
            ShutdownOutcome::Cancelled => match &self.on_cancelled {
                Some(callback) => catch_unwind(AssertUnwindSafe(|| callback())),
                None => return,
            },
            ShutdownOutcome::Faulted(faults) => match &self.on_failure {
                Some(callback) => catch_unwind(AssertUnwindSafe(|| callback(faults))),
                None => return,
            },
        };

        if delivered.is_err() {
            tracing::error!("shutdown notification callback panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::LoggerError;
    use crate::core::fault::FaultKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_routes_by_outcome() {
        let failures = Arc::new(AtomicUsize::new(0));
        let cancels = Arc::new(AtomicUsize::new(0));

        let failures_clone = Arc::clone(&failures);
        let cancels_clone = Arc::clone(&cancels);
        let notifier = Notifier {
            on_failure: Some(Arc::new(move |faults: &[ChainFault]| {
                failures_clone.fetch_add(faults.len(), Ordering::SeqCst);
            })),
            on_cancelled: Some(Arc::new(move || {
                cancels_clone.fetch_add(1, Ordering::SeqCst);
            })),
        };

        notifier.notify(&ShutdownOutcome::Completed);
        notifier.notify(&ShutdownOutcome::Cancelled);
        notifier.notify(&ShutdownOutcome::Faulted(vec![ChainFault::new(
            0,
            "db",
            FaultKind::Write,
            Arc::new(LoggerError::write("db", "down")),
        )]));

        assert_eq!(cancels.load(Ordering::SeqCst), 1);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_panic_is_contained() {
        let notifier = Notifier {
            on_failure: None,
            on_cancelled: Some(Arc::new(|| panic!("listener bug"))),
        };
        notifier.notify(&ShutdownOutcome::Cancelled);
    }

    #[test]
    fn test_unsubscribed_outcomes_are_swallowed() {
        Notifier::default().notify(&ShutdownOutcome::Cancelled);
        Notifier::default().notify(&ShutdownOutcome::Faulted(Vec::new()));
    }
}
