//! Event routing
//!
//! The boundary where the two inbound streams meet the state holders:
//! engine lifecycle events mutate the current run, terminal key events
//! become typed navigation requests. The router also owns the run
//! lifecycle — a fresh `RunState` is created when a progressing screen is
//! entered and discarded when it is left — so no state leaks across runs.
//!
//! The caller is responsible for serializing both streams into single
//! calls on one thread; the router itself holds no locks.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::debug;

use crate::events::EngineEvent;
use crate::navigator::{CarryPayload, FailurePayload, NavEvent, Screen, ScreenNavigator};
use crate::pipeline::PipelineKind;
use crate::progress::DEFAULT_LOG_LINES;
use crate::run_state::{RunPhase, RunState};

/// What the session loop should do after a key was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Keep running
    Handled,
    /// The operator asked to leave the wizard
    Quit,
}

/// Routes engine and terminal events to the run state and the navigator.
#[derive(Debug)]
pub struct EventRouter {
    navigator: ScreenNavigator,
    run: Option<RunState>,
    log_lines: usize,
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRouter {
    pub fn new() -> Self {
        Self::with_log_lines(DEFAULT_LOG_LINES)
    }

    /// Router whose runs keep `log_lines` progress lines.
    pub fn with_log_lines(log_lines: usize) -> Self {
        Self {
            navigator: ScreenNavigator::new(),
            run: None,
            log_lines,
        }
    }

    #[inline]
    pub fn screen(&self) -> Screen {
        self.navigator.current()
    }

    pub fn navigator(&self) -> &ScreenNavigator {
        &self.navigator
    }

    /// The in-flight run, while a progressing screen is active.
    pub fn run(&self) -> Option<&RunState> {
        self.run.as_ref()
    }

    /// Apply a navigation request, managing the run lifecycle around the
    /// transition: entering a progressing screen instantiates a fresh run
    /// for the chosen pipeline, leaving one discards it.
    pub fn navigate(&mut self, event: NavEvent) -> Screen {
        let next = self.navigator.apply(event);
        match next {
            Screen::Installing if self.run.is_none() => {
                let ledger =
                    PipelineKind::Install.build_ledger(self.navigator.selection());
                self.run = Some(RunState::with_log_capacity(
                    PipelineKind::Install,
                    ledger,
                    self.log_lines,
                ));
            }
            Screen::Uninstalling if self.run.is_none() => {
                let ledger = PipelineKind::Uninstall.build_ledger(None);
                self.run = Some(RunState::with_log_capacity(
                    PipelineKind::Uninstall,
                    ledger,
                    self.log_lines,
                ));
            }
            screen if !screen.is_progressing() => {
                self.run = None;
            }
            _ => {}
        }
        next
    }

    /// Apply one engine lifecycle event to the current run. Events arriving
    /// outside a run (a worker still draining after exit) are dropped.
    pub fn dispatch_engine(&mut self, event: EngineEvent) {
        match self.run.take() {
            Some(run) => self.run = Some(run.apply(event)),
            None => debug!(?event, "dropping engine event with no active run"),
        }
    }

    /// Forward a cancel request to the run; the run decides acceptance
    /// (pre-terminal only).
    pub fn request_cancel(&mut self) {
        self.dispatch_engine(EngineEvent::CancelRequested);
    }

    /// The operator asked to leave the progressing screen and view the
    /// result. Valid only once the run reached a terminal phase; rejected
    /// as a no-op otherwise.
    pub fn request_exit(&mut self) -> Screen {
        let Some(run) = &self.run else {
            return self.screen();
        };
        let event = match run.phase() {
            RunPhase::Running => {
                debug!("exit rejected: run still in progress");
                return self.screen();
            }
            RunPhase::Cancelled => NavEvent::RunCancelled,
            RunPhase::Completed if !run.has_failure() => {
                NavEvent::RunSucceeded(run.report().cloned().unwrap_or_default())
            }
            // Failed phase, or a completed run whose engine verdict was
            // failure (no individual step may have carried an error).
            _ => NavEvent::RunFailed(FailurePayload {
                error: run.failure_message(),
                step_description: run.failed_step_description(),
            }),
        };
        self.navigate(event)
    }

    /// Map a terminal key event to a navigation or run request.
    ///
    /// Enter continues (or views the result from a progressing screen),
    /// Esc goes back (or requests cancellation mid-run), `u` enters the
    /// uninstall flow from the welcome screen, `r` restarts from a
    /// terminal screen, `q`/Ctrl-C quits.
    pub fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.kind != KeyEventKind::Press {
            return KeyOutcome::Handled;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return KeyOutcome::Quit;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') => return KeyOutcome::Quit,
            KeyCode::Enter => {
                if self.screen().is_progressing() {
                    self.request_exit();
                } else {
                    self.navigate(NavEvent::Continue);
                }
            }
            KeyCode::Esc | KeyCode::Backspace => {
                if self.screen().is_progressing() {
                    self.request_cancel();
                } else {
                    self.navigate(NavEvent::Back);
                }
            }
            KeyCode::Char('u') | KeyCode::Char('U') => {
                self.navigate(NavEvent::BeginUninstall);
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.navigate(NavEvent::Restart);
            }
            _ => {}
        }
        KeyOutcome::Handled
    }

    /// Payload carried into the current screen.
    pub fn payload(&self) -> &CarryPayload {
        self.navigator.payload()
    }
}
