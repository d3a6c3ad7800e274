//! File destination implementation
//!
//! The file is opened and exclusively locked in `initialize`, so two chains
//! (or two processes) never interleave writes into the same log. Each batch
//! is written and flushed as a unit; `finalize` flushes and releases the lock.

use crate::core::{BatchPolicy, CancellationToken, Destination, LogEntry, LoggerError, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Line layout for a file destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineFormat {
    /// `[timestamp] [LEVEL] message`
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

pub struct FileDestination {
    name: String,
    path: PathBuf,
    format: LineFormat,
    policy: BatchPolicy,
    writer: Option<BufWriter<File>>,
}

impl FileDestination {
    /// Create a destination named `file:<path>`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: format!("file:{}", path.display()),
            path,
            format: LineFormat::default(),
            policy: BatchPolicy::default(),
            writer: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LineFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_batch_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }

    fn format_line(&self, entry: &LogEntry) -> Result<String> {
        match self.format {
            LineFormat::Text => Ok(format!(
                "[{}] [{:5}] {}",
                entry.timestamp().format("%Y-%m-%d %H:%M:%S%.3f"),
                entry.level().to_str(),
                entry.escaped_message()
            )),
            LineFormat::Json => Ok(serde_json::to_string(entry)?),
        }
    }
}

impl Destination for FileDestination {
    fn name(&self) -> &str {
        &self.name
    }

    fn batch_policy(&self) -> BatchPolicy {
        self.policy
    }

    fn initialize(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation("creating log directory", self.path_str(), e)
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LoggerError::io_operation("opening log file", self.path_str(), e))?;

        file.try_lock_exclusive().map_err(|e| {
            LoggerError::setup(
                self.path_str(),
                format!("log file is locked by another writer: {}", e),
            )
        })?;

        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn write(&mut self, batch: &[LogEntry], _cancel: &CancellationToken) -> Result<()> {
        let mut buffer = String::new();
        for entry in batch {
            buffer.push_str(&self.format_line(entry)?);
            buffer.push('\n');
        }

        let path = self.path_str();
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::write(&path, "file not initialized"))?;

        writer
            .write_all(buffer.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|e| LoggerError::io_operation("writing log batch", path, e))
    }

    fn finalize(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            let file = writer
                .into_inner()
                .map_err(|e| LoggerError::IoError(e.into_error()))?;
            FileExt::unlock(&file)?;
        }
        Ok(())
    }
}
