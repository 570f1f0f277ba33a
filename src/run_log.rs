//! Per-run logging.
//!
//! Every organizer run owns a [`RunLog`]. Each entry is forwarded to `tracing`
//! for the console, kept in memory for callers and tests, and, when the run
//! was given a log directory, appended to a human-readable
//! `file_sort_<stamp>.log` file. Live runs additionally write their records
//! as `operations_<stamp>.csv` through [`write_operation_csv`].

use crate::file_organizer::FileRecord;
use serde::Serialize;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::Level;

/// A single line of the run log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: Level,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} - {}", self.timestamp, self.level, self.message)
    }
}

/// Log sink for one organizer run.
#[derive(Debug, Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
}

impl RunLog {
    /// A log that is only kept in memory (and forwarded to `tracing`).
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens `<dir>/file_sort_<stamp>.log` for appending, creating `dir` if needed.
    pub fn create(dir: &Path, stamp: &str) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("file_sort_{}.log", stamp));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            entries: Vec::new(),
            writer: Some(BufWriter::new(file)),
            path: Some(path),
        })
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.record(Level::INFO, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.record(Level::WARN, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.record(Level::ERROR, message.into());
    }

    fn record(&mut self, level: Level, message: String) {
        if level == Level::ERROR {
            tracing::error!(target: "smartsort::run", "{}", message);
        } else if level == Level::WARN {
            tracing::warn!(target: "smartsort::run", "{}", message);
        } else {
            tracing::info!(target: "smartsort::run", "{}", message);
        }

        let entry = LogEntry {
            timestamp: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string(),
            level,
            message,
        };

        if let Some(writer) = self.writer.as_mut()
            && let Err(e) = writeln!(writer, "{}", entry)
        {
            tracing::warn!("Could not write run log, continuing in memory only: {}", e);
            self.writer = None;
        }

        self.entries.push(entry);
    }

    /// Flushes the log file, if any. Failures are reported, not returned.
    pub fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut()
            && let Err(e) = writer.flush()
        {
            tracing::warn!("Could not flush run log: {}", e);
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Messages without timestamps, in order.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.message.as_str())
    }

    /// Path of the log file, when the run writes one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// File name stamp shared by the text and CSV logs of one run.
pub fn run_stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S_%3f").to_string()
}

#[derive(Serialize)]
struct CsvRow<'a> {
    timestamp: &'a str,
    source: String,
    target: String,
    category: &'a str,
    status: String,
}

impl<'a> From<&'a FileRecord> for CsvRow<'a> {
    fn from(record: &'a FileRecord) -> Self {
        Self {
            timestamp: &record.timestamp,
            source: record.source.to_string_lossy().to_string(),
            target: record
                .target
                .as_ref()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default(),
            category: &record.category,
            status: record.outcome.status(),
        }
    }
}

/// Writes `<dir>/operations_<stamp>.csv` with one row per record.
///
/// Columns: `timestamp,source,target,category,status`.
pub fn write_operation_csv<'a, I>(dir: &Path, stamp: &str, records: I) -> Result<PathBuf, csv::Error>
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("operations_{}.csv", stamp));
    let mut writer = csv::Writer::from_path(&path)?;
    for record in records {
        writer.serialize(CsvRow::from(record))?;
    }
    writer.flush()?;
    Ok(path)
}
