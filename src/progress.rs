//! Progress derivation and the bounded progress log.
//!
//! Progress is a pure function of ledger state plus the run-level completed
//! flag; it advances only on step completion, never fractionally while a
//! step runs, so no per-step cost weighting is needed.

use std::collections::VecDeque;

use crate::steps::StepLedger;

/// Default number of log lines retained by a run.
pub const DEFAULT_LOG_LINES: usize = 10;

/// Completion fraction in `[0, 1]` for a pipeline run.
///
/// When `completed` is set the result is exactly `1.0` regardless of
/// per-step state — a pipeline can be declared complete even if some steps
/// were skipped or never reported. An empty ledger yields `0.0`.
pub fn progress(ledger: &StepLedger, completed: bool) -> f64 {
    if completed {
        return 1.0;
    }
    if ledger.is_empty() {
        return 0.0;
    }
    ledger.terminal_count() as f64 / ledger.len() as f64
}

/// Bounded, insertion-ordered buffer of free-text progress lines.
///
/// Appends evict from the head once the buffer exceeds its capacity, so the
/// buffer always holds the most recent lines in original relative order.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    max_lines: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_LINES)
    }
}

impl LogBuffer {
    /// Create a buffer holding at most `max_lines` lines. Non-positive
    /// capacities fall back to the default.
    pub fn new(max_lines: usize) -> Self {
        let max_lines = if max_lines == 0 { DEFAULT_LOG_LINES } else { max_lines };
        Self {
            lines: VecDeque::with_capacity(max_lines),
            max_lines,
        }
    }

    /// Append a line at the tail, evicting from the head past capacity.
    pub fn append(&mut self, line: impl Into<String>) {
        self.lines.push_back(line.into());
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }

    /// Change the capacity. A non-positive value is ignored and the
    /// previous capacity is preserved; the capacity never becomes zero.
    pub fn set_max(&mut self, max_lines: usize) {
        if max_lines == 0 {
            return;
        }
        self.max_lines = max_lines;
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }

    /// Empty the buffer without changing its capacity.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Current capacity.
    #[inline]
    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines in insertion order, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }
}
