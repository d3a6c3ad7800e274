//! Shared cancellation signal
//!
//! The token pairs an atomic flag with a channel whose only sender is dropped
//! on cancellation. A disconnected receiver is ready forever, so every stage
//! blocked in `select!` on [`CancellationToken::signal`] wakes at once.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Inner {
    cancelled: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

/// Cloneable handle to one cancellation signal
///
/// # Example
///
/// ```
/// use rust_log_pipeline::CancellationToken;
/// use std::time::Duration;
///
/// let token = CancellationToken::new();
/// let worker = token.clone();
///
/// token.cancel();
/// assert!(worker.is_cancelled());
/// assert!(worker.wait_timeout(Duration::from_secs(10)));
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                signal,
            }),
        }
    }

    /// Raise the signal. Returns `true` only for the call that raised it.
    pub fn cancel(&self) -> bool {
        let first = !self.inner.cancelled.swap(true, Ordering::AcqRel);
        drop(self.inner.trigger.lock().take());
        first
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Receiver that becomes ready (disconnected) once cancelled.
    ///
    /// Never yields a value; use it as an arm of `crossbeam_channel::select!`.
    pub fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }

    /// Sleep for up to `timeout`, waking early on cancellation.
    ///
    /// Returns `true` if the token is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        match self.inner.signal.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => self.is_cancelled(),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
