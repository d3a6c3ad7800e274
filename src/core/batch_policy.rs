//! Batching parameters declared by every destination

use super::error::{LoggerError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a chain groups entries before handing them to its destination.
///
/// A batch closes as soon as it holds `batch_size` entries, or once
/// `flush_timeout` passes without a new arrival (the timer restarts on every
/// entry). A zero timeout flushes eagerly; `batch_size = 1` delivers every
/// entry on its own.
///
/// In configuration text the timeout is written in milliseconds:
///
/// ```
/// use rust_log_pipeline::BatchPolicy;
/// use std::time::Duration;
///
/// let policy: BatchPolicy =
///     serde_json::from_str(r#"{ "batch_size": 64, "flush_timeout_ms": 250 }"#).unwrap();
/// assert_eq!(policy.flush_timeout, Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPolicy {
    pub batch_size: usize,
    #[serde(rename = "flush_timeout_ms", with = "millis")]
    pub flush_timeout: Duration,
}

impl BatchPolicy {
    pub const DEFAULT_BATCH_SIZE: usize = 50;
    pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_millis(100);

    pub const fn new(batch_size: usize, flush_timeout: Duration) -> Self {
        Self {
            batch_size,
            flush_timeout,
        }
    }

    /// One entry per batch, no waiting
    pub const fn immediate() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Quiet period in whole milliseconds, saturating at `u64::MAX`
    pub fn flush_timeout_ms(&self) -> u64 {
        saturating_millis(self.flush_timeout)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(LoggerError::config(
                "BatchPolicy",
                "batch_size must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BATCH_SIZE, Self::DEFAULT_FLUSH_TIMEOUT)
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(super::saturating_millis(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
