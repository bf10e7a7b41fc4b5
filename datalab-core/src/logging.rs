//! Injected log sinks.
//!
//! Components emit through the `tracing` macros, but every public entry point
//! runs under the `Dispatch` held by its [`LogSink`]. Nothing here installs a
//! process-wide subscriber, so two loaders in one process can log to two
//! different places.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::dispatcher::{self, Dispatch};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// Handle to the subscriber a component logs into.
#[derive(Clone)]
pub struct LogSink {
    dispatch: Dispatch,
}

impl LogSink {
    /// Human-readable lines on stderr, filtered at `level`.
    pub fn stderr(level: Level) -> Self {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_max_level(level)
            .with_target(false)
            .finish();
        Self {
            dispatch: Dispatch::new(subscriber),
        }
    }

    /// Capture formatted lines in memory. Returns the sink and a handle to read
    /// the captured lines back.
    pub fn memory(level: Level, max_lines: usize) -> (Self, LogBuffer) {
        let store = Arc::new(Mutex::new(LogStore::new(max_lines)));
        let subscriber = tracing_subscriber::fmt()
            .with_writer(LogMakeWriter::new(store.clone()))
            .with_max_level(level)
            .with_ansi(false)
            .with_target(false)
            .without_time()
            .finish();
        let sink = Self {
            dispatch: Dispatch::new(subscriber),
        };
        (sink, LogBuffer { store })
    }

    /// Discard everything.
    pub fn silent() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    /// Run `f` with this sink as the current default subscriber.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::stderr(Level::INFO)
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink").finish_non_exhaustive()
    }
}

/// Parse a level name (`error`, `warn`, `info`, `debug`, `trace`), case-insensitive.
pub fn parse_level(name: &str) -> Option<Level> {
    name.trim().parse::<Level>().ok()
}

/// Bounded ring of captured log lines.
pub struct LogStore {
    lines: VecDeque<String>,
    max_lines: usize,
}

impl LogStore {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines: max_lines.max(1),
        }
    }

    pub fn push_line(&mut self, line: impl Into<String>) {
        let line = line.into();
        if line.is_empty() {
            return;
        }
        self.lines.push_back(line);
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

/// Read side of [`LogSink::memory`].
#[derive(Clone)]
pub struct LogBuffer {
    store: Arc<Mutex<LogStore>>,
}

impl LogBuffer {
    pub fn lines(&self) -> Vec<String> {
        self.store.lock().snapshot()
    }

    /// True if any captured line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.store.lock().lines.iter().any(|l| l.contains(needle))
    }

    /// Number of captured lines at the given level.
    pub fn count_level(&self, level: Level) -> usize {
        let tag = level.as_str();
        self.store
            .lock()
            .lines
            .iter()
            .filter(|l| l.split_whitespace().next() == Some(tag))
            .count()
    }
}

#[derive(Clone)]
struct LogMakeWriter {
    store: Arc<Mutex<LogStore>>,
}

impl LogMakeWriter {
    fn new(store: Arc<Mutex<LogStore>>) -> Self {
        Self { store }
    }
}

impl<'a> MakeWriter<'a> for LogMakeWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            store: self.store.clone(),
            partial: String::new(),
        }
    }
}

struct LogWriter {
    store: Arc<Mutex<LogStore>>,
    partial: String,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.partial.push_str(&String::from_utf8_lossy(buf));
        while let Some(idx) = self.partial.find('\n') {
            let line = self.partial[..idx].trim_end_matches('\r').to_string();
            self.partial.drain(..=idx);
            self.store.lock().push_line(line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let line = self.partial.trim().to_string();
        if !line.is_empty() {
            self.store.lock().push_line(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_captures_scoped_events() {
        let (sink, buffer) = LogSink::memory(Level::INFO, 16);
        sink.scope(|| {
            tracing::info!(symbol = "SPY", "fetching");
            tracing::error!("boom");
        });

        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        assert!(buffer.contains("fetching"));
        assert!(buffer.contains("symbol=\"SPY\""));
        assert_eq!(buffer.count_level(Level::ERROR), 1);
    }

    #[test]
    fn events_outside_scope_are_not_captured() {
        let (_sink, buffer) = LogSink::memory(Level::INFO, 16);
        tracing::error!("not mine");
        assert!(buffer.lines().is_empty());
    }

    #[test]
    fn level_filter_applies() {
        let (sink, buffer) = LogSink::memory(Level::WARN, 16);
        sink.scope(|| {
            tracing::info!("quiet");
            tracing::warn!("loud");
        });
        assert_eq!(buffer.lines().len(), 1);
        assert!(buffer.contains("loud"));
    }

    #[test]
    fn store_is_bounded() {
        let mut store = LogStore::new(2);
        store.push_line("a");
        store.push_line("b");
        store.push_line("c");
        assert_eq!(store.snapshot(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn parse_level_accepts_common_names() {
        assert_eq!(parse_level("info"), Some(Level::INFO));
        assert_eq!(parse_level("WARN"), Some(Level::WARN));
        assert_eq!(parse_level("loud"), None);
    }
}
