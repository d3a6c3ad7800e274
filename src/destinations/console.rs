//! Console destination implementation

use crate::core::{BatchPolicy, CancellationToken, Destination, LogEntry, Result};
use colored::Colorize;
use std::io::Write;

pub struct ConsoleDestination {
    use_colors: bool,
    policy: BatchPolicy,
}

impl ConsoleDestination {
    pub fn new() -> Self {
        Self {
            use_colors: true,
            policy: BatchPolicy::default(),
        }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self {
            use_colors,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_batch_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Format one entry as a single text line
    fn format_line(&self, entry: &LogEntry) -> String {
        let level_str = if self.use_colors {
            format!("{:5}", entry.level().to_str())
                .color(entry.level().color_code())
                .to_string()
        } else {
            format!("{:5}", entry.level().to_str())
        };

        format!(
            "[{}] [{}] {}",
            entry.timestamp().format("%Y-%m-%d %H:%M:%S%.3f"),
            level_str,
            entry.escaped_message()
        )
    }
}

impl Default for ConsoleDestination {
    fn default() -> Self {
        Self::new()
    }
}

impl Destination for ConsoleDestination {
    fn name(&self) -> &str {
        "console"
    }

    fn batch_policy(&self) -> BatchPolicy {
        self.policy
    }

    fn write(&mut self, batch: &[LogEntry], _cancel: &CancellationToken) -> Result<()> {
        // Lock both streams once per batch; Error and Fatal go to stderr
        let mut stdout = std::io::stdout().lock();
        let mut stderr = std::io::stderr().lock();

        for entry in batch {
            let line = self.format_line(entry);
            if entry.level().is_severe() {
                writeln!(stderr, "{}", line)?;
            } else {
                writeln!(stdout, "{}", line)?;
            }
        }

        stdout.flush()?;
        stderr.flush()?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;

    #[test]
    fn test_plain_line_format() {
        let console = ConsoleDestination::with_colors(false);
        let line = console.format_line(&LogEntry::new(LogLevel::Warn, "low disk"));
        assert!(line.contains("[WARN ] low disk"));
    }

    #[test]
    fn test_writes_batch() {
        let mut console = ConsoleDestination::with_colors(false);
        let batch = vec![
            LogEntry::new(LogLevel::Info, "to stdout"),
            LogEntry::new(LogLevel::Error, "to stderr"),
        ];
        assert!(console.write(&batch, &CancellationToken::new()).is_ok());
    }
}
