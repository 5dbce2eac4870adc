//! Event Journal
//!
//! Append-only JSONL record of fired events. Two runs with the same seed and
//! config produce byte-identical journals.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use super::queue::FiredEvent;

/// Writes fired events to a JSONL file
pub struct EventJournal {
    writer: Option<BufWriter<File>>,
    entry_count: u64,
}

impl EventJournal {
    /// Create a journal writing to the specified path
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            entry_count: 0,
        })
    }

    /// Create a journal that discards entries
    pub fn null() -> Self {
        Self {
            writer: None,
            entry_count: 0,
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Append one fired event
    pub fn log(&mut self, event: &FiredEvent) -> std::io::Result<()> {
        self.entry_count += 1;
        if let Some(ref mut writer) = self.writer {
            let json = serde_json::to_string(event)?;
            writeln!(writer, "{}", json)?;
        }
        Ok(())
    }

    pub fn log_batch(&mut self, events: &[FiredEvent]) -> std::io::Result<()> {
        for event in events {
            self.log(event)?;
        }
        Ok(())
    }

    /// Flush the buffer to disk
    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for EventJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventJournal")
            .field("writing", &self.writer.is_some())
            .field("entry_count", &self.entry_count)
            .finish()
    }
}

impl Drop for EventJournal {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!("failed to flush event journal: {}", e);
        }
    }
}
