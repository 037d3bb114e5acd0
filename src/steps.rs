//! Step ledger
//!
//! This module provides the authoritative record of pipeline step progress.
//! A ledger owns a fixed-length, ordered sequence of steps and applies
//! lifecycle events from the execution engine in receipt order.
//!
//! # Design Principles
//!
//! - **Forward-Only**: a step never returns to `Pending` or `Running` once
//!   it has reached a terminal status
//! - **At-Least-Once Tolerant**: repeated `complete` events overwrite end
//!   time and error (last write wins) instead of being rejected
//! - **No Faults**: out-of-range indices are tolerated as no-ops; the
//!   ledger never panics on a malformed event
//!
//! The last-write-wins overwrite of an already-terminal step (including
//! `Complete` over `Failed`) is kept for parity with engines that redeliver
//! events. Rejecting late overwrites is the stricter alternative if the
//! engine ever guarantees exactly-once delivery.

use std::time::{Duration, Instant};
use strum::Display;
use tracing::debug;

/// Lifecycle status of a single pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum StepStatus {
    /// Not yet reported by the engine
    #[strum(serialize = "pending")]
    Pending,
    /// Currently executing
    #[strum(serialize = "running")]
    Running,
    /// Finished successfully (terminal)
    #[strum(serialize = "ok")]
    Complete,
    /// Finished with an error (terminal)
    #[strum(serialize = "failed")]
    Failed,
    /// Bypassed, e.g. an optional component that was not selected (terminal)
    #[strum(serialize = "skipped")]
    Skipped,
}

impl StepStatus {
    /// Returns true if this status is terminal (Complete, Failed or Skipped).
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Skipped)
    }
}

/// One named unit of work within a pipeline.
#[derive(Debug, Clone)]
pub struct Step {
    /// Stable machine identifier, unique within a pipeline
    pub name: String,
    /// Human-readable label
    pub description: String,
    /// Current lifecycle status
    pub status: StepStatus,
    /// Set when the engine reports the step started
    pub started_at: Option<Instant>,
    /// Set when the engine reports the step finished
    pub ended_at: Option<Instant>,
    /// Failure detail; set only when status is `Failed`
    pub error: Option<String>,
}

impl Step {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            status: StepStatus::Pending,
            started_at: None,
            ended_at: None,
            error: None,
        }
    }

    /// Wall-clock duration of the step. Defined only when both timestamps
    /// are set; zero otherwise.
    pub fn duration(&self) -> Duration {
        match (self.started_at, self.ended_at) {
            (Some(started), Some(ended)) => ended.saturating_duration_since(started),
            _ => Duration::ZERO,
        }
    }
}

/// Ordered, fixed-length record of pipeline step progress.
///
/// The step sequence is fixed at construction time; lifecycle events
/// address steps by index. Events are applied in receipt order and are
/// never reordered or coalesced.
#[derive(Debug, Clone, Default)]
pub struct StepLedger {
    steps: Vec<Step>,
    failed: bool,
    failure: Option<String>,
}

impl StepLedger {
    /// Create a ledger over a fixed step sequence.
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            failed: false,
            failure: None,
        }
    }

    /// Number of steps in the pipeline.
    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The step at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// All steps, in pipeline order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// True once any step has reported a failure.
    #[inline]
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// The first failure reported, if any.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Number of steps in a terminal status.
    pub fn terminal_count(&self) -> usize {
        self.steps.iter().filter(|s| s.status.is_terminal()).count()
    }

    /// Mark the step at `index` as running and record its start time.
    ///
    /// Out-of-range indices are ignored: the engine may report steps by a
    /// generation this ledger does not know about. A step that already
    /// reached a terminal status is left untouched.
    pub fn start(&mut self, index: usize) {
        let Some(step) = self.steps.get_mut(index) else {
            debug!(index, len = self.steps.len(), "ignoring start for unknown step index");
            return;
        };
        if step.status.is_terminal() {
            debug!(index, status = %step.status, "ignoring start for terminal step");
            return;
        }
        step.status = StepStatus::Running;
        step.started_at = Some(Instant::now());
    }

    /// Mark the step at `index` as finished.
    ///
    /// With no error the step becomes `Complete`; with an error it becomes
    /// `Failed` and the ledger-wide failure is recorded. An error on an
    /// out-of-range index still records the ledger-wide failure so a
    /// failure report is never silently dropped, even when step bookkeeping
    /// is inconsistent with the engine's. Re-completion of an
    /// already-terminal step overwrites its end time and error.
    pub fn complete(&mut self, index: usize, error: Option<String>) {
        if let Some(step) = self.steps.get_mut(index) {
            step.ended_at = Some(Instant::now());
            match &error {
                Some(err) => {
                    step.status = StepStatus::Failed;
                    step.error = Some(err.clone());
                }
                None => {
                    step.status = StepStatus::Complete;
                    step.error = None;
                }
            }
        } else {
            debug!(index, len = self.steps.len(), "ignoring completion for unknown step index");
        }
        if let Some(err) = error {
            self.failed = true;
            if self.failure.is_none() {
                self.failure = Some(err);
            }
        }
    }

    /// Mark the step at `index` as skipped. Out-of-range indices are ignored.
    pub fn mark_skipped(&mut self, index: usize) {
        let Some(step) = self.steps.get_mut(index) else {
            debug!(index, len = self.steps.len(), "ignoring skip for unknown step index");
            return;
        };
        step.status = StepStatus::Skipped;
    }
}
