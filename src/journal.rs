//! Append-only event log.
//!
//! Every line has the form `YYYY/MM/DD HH:MM:SS - <message>` in local time
//! and is flushed as soon as it is written, so the last decision before a
//! reboot is never lost in a buffer. Lines are mirrored to `tracing`.

use crate::error::Result;
use chrono::{DateTime, Local, TimeZone};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

/// Timestamp layout of the event log.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Format one log line, without the trailing newline.
pub fn format_line<Tz>(timestamp: &DateTime<Tz>, message: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{} - {}", timestamp.format(TIMESTAMP_FORMAT), message)
}

/// Shared, line-flushed log sink.
pub struct EventLog {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl EventLog {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self::from_writer(file))
    }

    /// Log into any writer, e.g. an in-memory buffer.
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Append one timestamped line and flush it.
    pub fn record(&self, message: impl AsRef<str>) -> Result<()> {
        let message = message.as_ref();
        info!("{}", message);

        let line = format_line(&Local::now(), message);
        let mut writer = match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    /// Like [`record`](Self::record), but a failed write is only reported to `tracing`.
    pub fn note(&self, message: impl AsRef<str>) {
        if let Err(e) = self.record(message) {
            warn!("Failed to write event log: {}", e);
        }
    }

    /// Flush and close the sink.
    pub fn close(self) -> Result<()> {
        let mut writer = match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        writer.flush()?;
        Ok(())
    }
}
