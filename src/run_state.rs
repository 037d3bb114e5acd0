//! Run state
//!
//! Aggregates the step ledger, the progress log and the run-level phase for
//! one pipeline execution. A `RunState` is created fresh when the operator
//! enters the progressing screen and discarded when they leave it; nothing
//! survives across runs.
//!
//! All mutation goes through [`RunState::apply`], a value-in/value-out
//! event-application function over the closed [`EngineEvent`] sum type, so
//! behavior is testable without a live terminal or engine. The phase is one
//! explicit enum rather than independent completed/failed/cancelled flags:
//! exactly one terminal phase can ever be reached, once.

use tracing::{debug, info};

use crate::events::{EngineEvent, RunReport};
use crate::pipeline::PipelineKind;
use crate::progress::{progress, LogBuffer};
use crate::steps::StepLedger;

/// Substituted for missing failure detail; the error surface never renders
/// blank.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Run-level lifecycle phase.
///
/// `Running` is the only non-terminal phase. Once any terminal phase is
/// reached the run accepts no further step or result events and cancel
/// requests are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// Lifecycle events are being accepted
    Running,
    /// The engine declared the pipeline finished (terminal)
    Completed,
    /// A step reported a failure (terminal)
    Failed,
    /// A cancel request was accepted before any other terminal phase (terminal)
    Cancelled,
}

impl RunPhase {
    /// Returns true for Completed, Failed or Cancelled.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// State of one pipeline execution.
#[derive(Debug, Clone)]
pub struct RunState {
    kind: PipelineKind,
    ledger: StepLedger,
    /// Last step index touched by a lifecycle event
    current_step: usize,
    phase: RunPhase,
    /// First failure encountered, from a step or the engine's final result
    failure: Option<String>,
    /// Engine verdict from the final result event
    engine_success: Option<bool>,
    report: Option<RunReport>,
    log: LogBuffer,
    /// Spinner frame counter; cosmetic only
    ticks: u64,
}

impl RunState {
    /// Create a fresh run over the given ledger with the default log
    /// capacity.
    pub fn new(kind: PipelineKind, ledger: StepLedger) -> Self {
        Self::with_log_capacity(kind, ledger, crate::progress::DEFAULT_LOG_LINES)
    }

    /// Create a fresh run with an explicit log capacity.
    pub fn with_log_capacity(kind: PipelineKind, ledger: StepLedger, log_lines: usize) -> Self {
        Self {
            kind,
            ledger,
            current_step: 0,
            phase: RunPhase::Running,
            failure: None,
            engine_success: None,
            report: None,
            log: LogBuffer::new(log_lines),
            ticks: 0,
        }
    }

    /// Apply one engine event, in arrival order, yielding the next state.
    ///
    /// Never panics: late or malformed events degrade to no-ops.
    pub fn apply(mut self, event: EngineEvent) -> Self {
        match event {
            EngineEvent::StepStarted { index } => {
                if self.phase.is_terminal() {
                    debug!(index, phase = ?self.phase, "ignoring step start after terminal phase");
                    return self;
                }
                self.ledger.start(index);
                self.current_step = index;
            }
            EngineEvent::StepCompleted { index, error } => {
                if self.phase.is_terminal() {
                    debug!(index, phase = ?self.phase, "ignoring step completion after terminal phase");
                    return self;
                }
                self.ledger.complete(index, error);
                self.current_step = index;
                if self.ledger.failed() {
                    self.failure = self.ledger.failure().map(str::to_string);
                    self.phase = RunPhase::Failed;
                    info!(pipeline = %self.kind, step = index, "run failed");
                }
            }
            EngineEvent::LogLine { text } => {
                self.log.append(text);
            }
            EngineEvent::PipelineResult { success, report } => {
                if self.phase.is_terminal() {
                    debug!(phase = ?self.phase, "ignoring pipeline result after terminal phase");
                    return self;
                }
                if !success && self.failure.is_none() {
                    self.failure = report.message.clone();
                }
                self.engine_success = Some(success);
                self.report = Some(report);
                self.phase = RunPhase::Completed;
                info!(pipeline = %self.kind, success, "run completed");
            }
            EngineEvent::CancelRequested => {
                if self.phase.is_terminal() {
                    debug!(phase = ?self.phase, "cancel rejected after terminal phase");
                    return self;
                }
                self.phase = RunPhase::Cancelled;
                info!(pipeline = %self.kind, "run cancelled");
            }
            EngineEvent::Tick => {
                // Spinner animation only; ledger and phase stay untouched.
                self.ticks = self.ticks.wrapping_add(1);
            }
        }
        self
    }

    /// Pipeline flavor this run executes.
    #[inline]
    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    #[inline]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Completion fraction in `[0, 1]`; exactly `1.0` once the engine
    /// declared the pipeline complete.
    pub fn progress(&self) -> f64 {
        progress(&self.ledger, self.phase == RunPhase::Completed)
    }

    pub fn ledger(&self) -> &StepLedger {
        &self.ledger
    }

    pub fn log(&self) -> &LogBuffer {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut LogBuffer {
        &mut self.log
    }

    #[inline]
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Engine verdict, once the final result arrived.
    #[inline]
    pub fn engine_success(&self) -> Option<bool> {
        self.engine_success
    }

    pub fn report(&self) -> Option<&RunReport> {
        self.report.as_ref()
    }

    /// True when the run finished and neither a step nor the engine
    /// reported a failure.
    pub fn succeeded(&self) -> bool {
        self.phase == RunPhase::Completed && self.engine_success.unwrap_or(true)
    }

    /// The captured failure, with the fixed sentinel substituted when no
    /// detail was reported.
    pub fn failure_message(&self) -> String {
        self.failure.clone().unwrap_or_else(|| UNKNOWN_ERROR.to_string())
    }

    /// True if any failure was captured, from a step or the engine verdict.
    pub fn has_failure(&self) -> bool {
        self.phase == RunPhase::Failed || self.engine_success == Some(false)
    }

    /// Description of the step the failure surfaced at, resolved from the
    /// ledger at the current index; empty when out of range.
    pub fn failed_step_description(&self) -> String {
        self.ledger
            .get(self.current_step)
            .map(|step| step.description.clone())
            .unwrap_or_default()
    }

    /// Spinner frame counter advanced by `Tick` events.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::{Step, StepStatus};

    fn run(n: usize) -> RunState {
        let ledger = StepLedger::new(
            (0..n)
                .map(|i| Step::new(format!("step-{i}"), format!("Step {i}")))
                .collect(),
        );
        RunState::new(PipelineKind::Install, ledger)
    }

    #[test]
    fn test_fresh_run_is_running_with_zero_progress() {
        let run = run(5);
        assert_eq!(run.phase(), RunPhase::Running);
        assert_eq!(run.progress(), 0.0);
        assert!(!run.is_terminal());
    }

    #[test]
    fn test_step_failure_moves_phase_to_failed() {
        let run = run(5)
            .apply(EngineEvent::StepStarted { index: 0 })
            .apply(EngineEvent::StepCompleted { index: 0, error: None })
            .apply(EngineEvent::StepStarted { index: 1 })
            .apply(EngineEvent::StepCompleted {
                index: 1,
                error: Some("dkms build failed".to_string()),
            });
        assert_eq!(run.phase(), RunPhase::Failed);
        assert_eq!(run.failure_message(), "dkms build failed");
        assert_eq!(run.failed_step_description(), "Step 1");
        assert!((run.progress() - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_events_after_terminal_phase_are_ignored() {
        let run = run(3)
            .apply(EngineEvent::StepCompleted {
                index: 0,
                error: Some("boom".to_string()),
            })
            .apply(EngineEvent::StepStarted { index: 1 })
            .apply(EngineEvent::StepCompleted { index: 1, error: None })
            .apply(EngineEvent::PipelineResult {
                success: true,
                report: RunReport::default(),
            });
        assert_eq!(run.phase(), RunPhase::Failed);
        assert_eq!(run.ledger().get(1).unwrap().status, StepStatus::Pending);
        assert!(run.report().is_none());
    }

    #[test]
    fn test_cancel_accepted_only_while_running() {
        let cancelled = run(3).apply(EngineEvent::CancelRequested);
        assert_eq!(cancelled.phase(), RunPhase::Cancelled);

        let failed = run(3)
            .apply(EngineEvent::StepCompleted {
                index: 0,
                error: Some("boom".to_string()),
            })
            .apply(EngineEvent::CancelRequested);
        assert_eq!(failed.phase(), RunPhase::Failed);
    }

    #[test]
    fn test_pipeline_result_forces_full_progress() {
        let run = run(5)
            .apply(EngineEvent::StepCompleted { index: 0, error: None })
            .apply(EngineEvent::PipelineResult {
                success: true,
                report: RunReport {
                    reboot_required: true,
                    ..RunReport::default()
                },
            });
        assert_eq!(run.phase(), RunPhase::Completed);
        assert_eq!(run.progress(), 1.0);
        assert!(run.succeeded());
        assert!(run.report().unwrap().reboot_required);
    }

    #[test]
    fn test_engine_reported_failure_without_step_errors() {
        let run = run(5).apply(EngineEvent::PipelineResult {
            success: false,
            report: RunReport::default(),
        });
        assert_eq!(run.phase(), RunPhase::Completed);
        assert!(!run.succeeded());
        assert!(run.has_failure());
        // No detail anywhere; the sentinel substitutes
        assert_eq!(run.failure_message(), UNKNOWN_ERROR);
    }

    #[test]
    fn test_engine_failure_message_is_captured() {
        let run = run(2).apply(EngineEvent::PipelineResult {
            success: false,
            report: RunReport {
                message: Some("post-install verification failed".to_string()),
                ..RunReport::default()
            },
        });
        assert_eq!(run.failure_message(), "post-install verification failed");
    }

    #[test]
    fn test_log_lines_are_buffered() {
        let mut run = run(2);
        run.log_mut().set_max(3);
        let run = ["a", "b", "c", "d"].into_iter().fold(run, |state, text| {
            state.apply(EngineEvent::LogLine { text: text.to_string() })
        });
        let lines: Vec<&str> = run.log().lines().collect();
        assert_eq!(lines, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_tick_is_cosmetic() {
        let before = run(3).apply(EngineEvent::StepStarted { index: 0 });
        let after = before.clone().apply(EngineEvent::Tick).apply(EngineEvent::Tick);
        assert_eq!(after.ticks(), before.ticks() + 2);
        assert_eq!(after.phase(), before.phase());
        assert_eq!(after.progress(), before.progress());
        assert_eq!(
            after.ledger().get(0).unwrap().status,
            before.ledger().get(0).unwrap().status
        );
    }

    #[test]
    fn test_failed_step_description_out_of_range_is_empty() {
        let run = run(2).apply(EngineEvent::StepCompleted {
            index: 99,
            error: Some("ghost step".to_string()),
        });
        assert_eq!(run.phase(), RunPhase::Failed);
        assert_eq!(run.failed_step_description(), "");
        assert_eq!(run.failure_message(), "ghost step");
    }
}
