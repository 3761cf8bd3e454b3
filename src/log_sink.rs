//! Log entries flowing from managers and workers to the console panel.
//!
//! Each entry travels as one channel message, so entries from different
//! threads never interleave and every producer's entries keep their order.
//! Every entry is mirrored to `tracing` at the matching level.

use std::collections::VecDeque;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};

use time::OffsetDateTime;

/// Severity shown in the console panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        };
        f.write_str(label)
    }
}

/// One console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub at: OffsetDateTime,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc()),
        }
    }

    /// `HH:MM:SS` prefix used by the console panel.
    pub fn clock(&self) -> String {
        format!(
            "{:02}:{:02}:{:02}",
            self.at.hour(),
            self.at.minute(),
            self.at.second()
        )
    }
}

/// Cloneable sending half handed to every component that logs.
#[derive(Debug, Clone)]
pub struct LogSink {
    tx: Sender<LogEntry>,
}

impl LogSink {
    /// Create a sink and the receiver the console drains.
    pub fn channel() -> (Self, Receiver<LogEntry>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry::new(level, message);
        match entry.level {
            LogLevel::Info | LogLevel::Success => tracing::info!("{}", entry.message),
            LogLevel::Warning => tracing::warn!("{}", entry.message),
            LogLevel::Error => tracing::error!("{}", entry.message),
        }
        // The console is gone during shutdown; tracing already has the line.
        let _ = self.tx.send(entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(LogLevel::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(LogLevel::Error, message);
    }
}

/// Bounded console backlog owned by the UI thread.
#[derive(Debug)]
pub struct ConsoleLog {
    rx: Receiver<LogEntry>,
    lines: VecDeque<LogEntry>,
    max_lines: usize,
}

impl ConsoleLog {
    pub fn new(rx: Receiver<LogEntry>, max_lines: usize) -> Self {
        Self {
            rx,
            lines: VecDeque::new(),
            max_lines: max_lines.max(1),
        }
    }

    /// Move every pending entry into the backlog. Returns how many arrived.
    pub fn drain(&mut self) -> usize {
        let mut received = 0;
        while let Ok(entry) = self.rx.try_recv() {
            self.lines.push_back(entry);
            received += 1;
        }
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
        received
    }

    pub fn lines(&self) -> impl Iterator<Item = &LogEntry> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn entries_from_many_threads_arrive_whole_and_in_order() {
        let (sink, rx) = LogSink::channel();
        let mut console = ConsoleLog::new(rx, 10_000);
        let handles = (0..4)
            .map(|worker| {
                let sink = sink.clone();
                thread::spawn(move || {
                    for n in 0..200 {
                        sink.info(format!("worker-{worker} line-{n:03}"));
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(console.drain(), 800);
        for worker in 0..4 {
            let prefix = format!("worker-{worker} ");
            let own = console
                .lines()
                .filter(|entry| entry.message.starts_with(&prefix))
                .map(|entry| entry.message.clone())
                .collect::<Vec<_>>();
            let expected = (0..200)
                .map(|n| format!("worker-{worker} line-{n:03}"))
                .collect::<Vec<_>>();
            assert_eq!(own, expected);
        }
    }

    #[test]
    fn console_keeps_only_newest_lines() {
        let (sink, rx) = LogSink::channel();
        let mut console = ConsoleLog::new(rx, 3);
        for n in 0..5 {
            sink.warning(format!("{n}"));
        }
        console.drain();
        let kept = console.lines().map(|e| e.message.as_str()).collect::<Vec<_>>();
        assert_eq!(kept, ["2", "3", "4"]);
        assert!(console.lines().all(|e| e.level == LogLevel::Warning));
    }

    #[test]
    fn emitting_after_console_dropped_does_not_panic() {
        let (sink, rx) = LogSink::channel();
        drop(rx);
        sink.error("nobody listening");
    }
}
