//! Log sinks receiving diagnostics and live subprocess output.
//!
//! # Separation of Concerns
//!
//! - **Sinks (this module)**: product output. The executor writes every line the
//!   tool prints, plus the command line and failure messages, as it happens.
//! - **Tracing (`logging`)**: developer diagnostics, filtered by `RUST_LOG`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::warn;

/// Receives text lines. Implementations must tolerate calls from reader threads.
pub trait LogSink: Send + Sync {
    fn line(&self, line: &str);
}

/// Collects lines in memory; mostly useful for tests and for embedding callers.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// All lines joined with `\n`.
    pub fn contents(&self) -> String {
        self.lines().join("\n")
    }
}

impl LogSink for MemorySink {
    fn line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

/// Appends lines to a file, flushing after each one for live observation.
pub struct FileSink {
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create log dir {}", parent.display()))?;
        }
        let file = File::options()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl LogSink for FileSink {
    fn line(&self, line: &str) {
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        if let Err(e) = writeln!(writer, "{line}") {
            warn!(err = %e, "failed to write to log file");
        } else if let Err(e) = writer.flush() {
            warn!(err = %e, "failed to flush log file");
        }
    }
}

/// Prints lines to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn line(&self, line: &str) {
        println!("{line}");
    }
}

/// Fans each line out to several sinks.
#[derive(Default)]
pub struct TeeSink {
    sinks: Vec<Box<dyn LogSink>>,
}

impl TeeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl LogSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl LogSink for TeeSink {
    fn line(&self, line: &str) {
        for sink in &self.sinks {
            sink.line(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sink_appends_lines() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("logs").join("build.log");
        let sink = FileSink::create(&path).expect("create");
        sink.line("first");
        sink.line("second");
        drop(sink);
        let contents = std::fs::read_to_string(&path).expect("read");
        assert_eq!(contents, "first\nsecond\n");
    }

    #[test]
    fn tee_reaches_every_sink() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("tee.log");
        let tee = TeeSink::new()
            .with(FileSink::create(&path).expect("create"))
            .with(MemorySink::new());
        tee.line("hello");
        drop(tee);
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "hello\n");
    }

    #[test]
    fn memory_sink_joins_lines() {
        let sink = MemorySink::new();
        sink.line("a");
        sink.line("b");
        assert_eq!(sink.contents(), "a\nb");
    }
}
