//! Logging macros for ergonomic log message formatting.
//!
//! These macros forward `format!`-style arguments to [`Logger::log`] and
//! return its `Result`, so a disposed logger is still reported to the caller.
//!
//! [`Logger::log`]: crate::Logger::log
//!
//! # Examples
//!
//! ```
//! use rust_log_pipeline::prelude::*;
//! use rust_log_pipeline::info;
//!
//! let logger = Logger::builder()
//!     .destination(MemoryDestination::new(BatchPolicy::default()))
//!     .build()?;
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port)?;
//! # Ok::<(), LoggerError>(())
//! ```

/// Log a message at an explicit level.
///
/// ```
/// # use rust_log_pipeline::prelude::*;
/// # let logger = Logger::builder().destination(MemoryDestination::new(BatchPolicy::default())).build().unwrap();
/// use rust_log_pipeline::log;
/// log!(logger, LogLevel::Error, "Error code: {}", 500).unwrap();
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+))
    };
}

#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{BatchPolicy, LogLevel, Logger, LoggerError};
    use crate::destinations::MemoryDestination;

    fn logger() -> (Logger, MemoryDestination) {
        let memory = MemoryDestination::new(BatchPolicy::default());
        let logger = Logger::builder()
            .destination(memory.clone())
            .build()
            .expect("build");
        (logger, memory)
    }

    #[test]
    fn test_level_macros_format_arguments() {
        let (logger, memory) = logger();

        log!(logger, LogLevel::Info, "Formatted: {}", 42).unwrap();
        trace!(logger, "Value: {}", 10).unwrap();
        debug!(logger, "Count: {}", 5).unwrap();
        info!(logger, "Items: {}", 100).unwrap();
        warn!(logger, "Retry {} of {}", 1, 3).unwrap();
        error!(logger, "Code: {}", 500).unwrap();
        fatal!(logger, "Critical failure: {}", "system").unwrap();
        logger.dispose().unwrap();

        assert_eq!(
            memory.messages(),
            vec![
                "Formatted: 42",
                "Value: 10",
                "Count: 5",
                "Items: 100",
                "Retry 1 of 3",
                "Code: 500",
                "Critical failure: system",
            ]
        );
    }

    #[test]
    fn test_macro_reports_disposed_logger() {
        let (logger, _memory) = logger();
        logger.dispose().unwrap();

        assert!(matches!(info!(logger, "late {}", 1), Err(LoggerError::Disposed)));
    }
}
