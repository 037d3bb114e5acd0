//! Screen navigation state machine
//!
//! Wizard screens form a closed set and every transition is triggered by a
//! named, typed event — screens never call each other directly. The
//! transition function is total: an event that a screen does not recognize
//! leaves the current screen unchanged.
//!
//! # Screen Flow
//!
//! ```text
//! Welcome ⇄ Detecting ⇄ Selecting ⇄ Confirming → Installing → InstallComplete
//!    |                                                │      ↘ InstallFailed
//!    |                                                ↘ Aborted
//!    ↓
//! UninstallConfirming → Uninstalling → UninstallComplete
//!                              │      ↘ UninstallFailed
//!                              ↘ Aborted
//! ```
//!
//! The pre-execution screens chain forward/backward on continue/back; the
//! terminal screens of each flavor are reachable only from that flavor's
//! progressing screen, via the run-outcome events.

use strum::Display;
use tracing::debug;

use crate::device::{DeviceSummary, DriverSelection};
use crate::events::RunReport;

/// Closed set of wizard screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Screen {
    /// Entry point; choose install or uninstall
    #[strum(serialize = "welcome")]
    Welcome,
    /// Hardware detection in progress
    #[strum(serialize = "detecting")]
    Detecting,
    /// Driver/component selection for the detected device
    #[strum(serialize = "selecting")]
    Selecting,
    /// Review the selection before executing
    #[strum(serialize = "confirming")]
    Confirming,
    /// Install pipeline executing
    #[strum(serialize = "installing")]
    Installing,
    /// Install finished successfully
    #[strum(serialize = "install-complete")]
    InstallComplete,
    /// Install failed
    #[strum(serialize = "install-failed")]
    InstallFailed,
    /// Review before removing the installed driver
    #[strum(serialize = "uninstall-confirming")]
    UninstallConfirming,
    /// Uninstall pipeline executing
    #[strum(serialize = "uninstalling")]
    Uninstalling,
    /// Uninstall finished successfully
    #[strum(serialize = "uninstall-complete")]
    UninstallComplete,
    /// Uninstall failed
    #[strum(serialize = "uninstall-failed")]
    UninstallFailed,
    /// A cancel request was accepted mid-run
    #[strum(serialize = "aborted")]
    Aborted,
}

impl Screen {
    /// True for the screens where a pipeline is executing.
    #[inline]
    pub const fn is_progressing(self) -> bool {
        matches!(self, Self::Installing | Self::Uninstalling)
    }

    /// True for the end-of-flow screens.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::InstallComplete
                | Self::InstallFailed
                | Self::UninstallComplete
                | Self::UninstallFailed
                | Self::Aborted
        )
    }
}

/// Failure detail carried into a failed screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailurePayload {
    /// Captured error message (never blank; a sentinel substitutes)
    pub error: String,
    /// Description of the step the failure surfaced at; empty if unknown
    pub step_description: String,
}

/// Data the exited screen passes forward to the entered screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CarryPayload {
    #[default]
    None,
    /// Detected device, into Selecting
    Device(DeviceSummary),
    /// Operator's choices, into Confirming and the install run
    Selection(DriverSelection),
    /// Failure detail, into a failed screen
    Failure(FailurePayload),
    /// Run result metadata, into a complete screen
    Outcome(RunReport),
}

/// Typed transition requests. Anything else a screen wants to express must
/// become one of these; there are no string-driven transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum NavEvent {
    /// Advance along the pre-execution chain
    Continue,
    /// Step back along the pre-execution chain
    Back,
    /// Enter the uninstall flow from the welcome screen
    BeginUninstall,
    /// Detection finished; carries the detected device into Selecting
    DetectionFinished(DeviceSummary),
    /// The operator confirmed a selection; carries it into Confirming
    SelectionConfirmed(DriverSelection),
    /// The run finished successfully; carries result metadata
    RunSucceeded(RunReport),
    /// The run failed; carries the captured failure
    RunFailed(FailurePayload),
    /// A cancel request was accepted mid-run
    RunCancelled,
    /// Start over from a terminal screen
    Restart,
}

impl Default for Screen {
    fn default() -> Self {
        Self::Welcome
    }
}

/// Finite-state machine over the wizard screens.
#[derive(Debug, Clone, Default)]
pub struct ScreenNavigator {
    current: Screen,
    payload: CarryPayload,
}

impl ScreenNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn current(&self) -> Screen {
        self.current
    }

    /// Payload carried into the current screen.
    pub fn payload(&self) -> &CarryPayload {
        &self.payload
    }

    /// The selection payload, when one is being carried.
    pub fn selection(&self) -> Option<&DriverSelection> {
        match &self.payload {
            CarryPayload::Selection(selection) => Some(selection),
            _ => None,
        }
    }

    /// Apply one typed transition event and return the resulting screen.
    ///
    /// Total over `(screen, event)`: unrecognized events are no-ops that
    /// leave the current screen and payload unchanged.
    pub fn apply(&mut self, event: NavEvent) -> Screen {
        use Screen::*;
        let (next, payload) = match (self.current, event) {
            // Forward chain
            (Welcome, NavEvent::Continue) => (Detecting, CarryPayload::None),
            (Detecting, NavEvent::DetectionFinished(device)) => {
                (Selecting, CarryPayload::Device(device))
            }
            (Selecting, NavEvent::SelectionConfirmed(selection)) => {
                (Confirming, CarryPayload::Selection(selection))
            }
            // Entering the progressing screen keeps the selection so the
            // run can be built from it.
            (Confirming, NavEvent::Continue) => (Installing, self.payload.clone()),

            // Backward chain
            (Detecting, NavEvent::Back) => (Welcome, CarryPayload::None),
            (Selecting, NavEvent::Back) => (Detecting, CarryPayload::None),
            (Confirming, NavEvent::Back) => (Selecting, CarryPayload::None),
            (UninstallConfirming, NavEvent::Back) => (Welcome, CarryPayload::None),

            // Uninstall flow
            (Welcome, NavEvent::BeginUninstall) => (UninstallConfirming, CarryPayload::None),
            (UninstallConfirming, NavEvent::Continue) => (Uninstalling, CarryPayload::None),

            // Run outcomes, only from the matching progressing screen
            (Installing, NavEvent::RunSucceeded(report)) => {
                (InstallComplete, CarryPayload::Outcome(report))
            }
            (Installing, NavEvent::RunFailed(failure)) => {
                (InstallFailed, CarryPayload::Failure(failure))
            }
            (Uninstalling, NavEvent::RunSucceeded(report)) => {
                (UninstallComplete, CarryPayload::Outcome(report))
            }
            (Uninstalling, NavEvent::RunFailed(failure)) => {
                (UninstallFailed, CarryPayload::Failure(failure))
            }
            (Installing | Uninstalling, NavEvent::RunCancelled) => {
                (Aborted, CarryPayload::None)
            }

            // Terminal screens can only restart
            (screen, NavEvent::Restart) if screen.is_terminal() => {
                (Welcome, CarryPayload::None)
            }

            // Everything else is a no-op
            (screen, event) => {
                debug!(screen = %screen, ?event, "ignoring navigation event");
                return self.current;
            }
        };
        debug!(from = %self.current, to = %next, "screen transition");
        self.current = next;
        self.payload = payload;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DriverComponent;

    fn device() -> DeviceSummary {
        DeviceSummary {
            vendor: "NVIDIA".to_string(),
            model: "GeForce RTX 4070".to_string(),
            bus_id: "0000:01:00.0".to_string(),
            current_module: None,
        }
    }

    fn selection() -> DriverSelection {
        DriverSelection::new(device(), "550.90").with_component(DriverComponent::Firmware)
    }

    #[test]
    fn test_forward_chain_to_installing() {
        let mut nav = ScreenNavigator::new();
        assert_eq!(nav.apply(NavEvent::Continue), Screen::Detecting);
        assert_eq!(
            nav.apply(NavEvent::DetectionFinished(device())),
            Screen::Selecting
        );
        assert_eq!(nav.payload(), &CarryPayload::Device(device()));
        assert_eq!(
            nav.apply(NavEvent::SelectionConfirmed(selection())),
            Screen::Confirming
        );
        assert_eq!(nav.apply(NavEvent::Continue), Screen::Installing);
        // Selection carried into the progressing screen
        assert_eq!(nav.selection(), Some(&selection()));
    }

    #[test]
    fn test_backward_chain() {
        let mut nav = ScreenNavigator::new();
        nav.apply(NavEvent::Continue);
        nav.apply(NavEvent::DetectionFinished(device()));
        nav.apply(NavEvent::SelectionConfirmed(selection()));
        assert_eq!(nav.apply(NavEvent::Back), Screen::Selecting);
        assert_eq!(nav.apply(NavEvent::Back), Screen::Detecting);
        assert_eq!(nav.apply(NavEvent::Back), Screen::Welcome);
    }

    #[test]
    fn test_uninstall_flow() {
        let mut nav = ScreenNavigator::new();
        assert_eq!(nav.apply(NavEvent::BeginUninstall), Screen::UninstallConfirming);
        assert_eq!(nav.apply(NavEvent::Continue), Screen::Uninstalling);
        assert_eq!(
            nav.apply(NavEvent::RunSucceeded(RunReport::default())),
            Screen::UninstallComplete
        );
    }

    #[test]
    fn test_failure_payload_carried_into_failed_screen() {
        let mut nav = ScreenNavigator::new();
        nav.apply(NavEvent::Continue);
        nav.apply(NavEvent::DetectionFinished(device()));
        nav.apply(NavEvent::SelectionConfirmed(selection()));
        nav.apply(NavEvent::Continue);
        let failure = FailurePayload {
            error: "dkms build failed".to_string(),
            step_description: "Building kernel module".to_string(),
        };
        assert_eq!(
            nav.apply(NavEvent::RunFailed(failure.clone())),
            Screen::InstallFailed
        );
        assert_eq!(nav.payload(), &CarryPayload::Failure(failure));
    }

    #[test]
    fn test_cancel_acknowledgment_is_distinct() {
        let mut nav = ScreenNavigator::new();
        nav.apply(NavEvent::BeginUninstall);
        nav.apply(NavEvent::Continue);
        assert_eq!(nav.apply(NavEvent::RunCancelled), Screen::Aborted);
        assert_ne!(nav.current(), Screen::UninstallComplete);
        assert_ne!(nav.current(), Screen::UninstallFailed);
    }

    #[test]
    fn test_unrecognized_events_are_no_ops() {
        let mut nav = ScreenNavigator::new();
        // Run outcomes mean nothing outside a progressing screen
        assert_eq!(
            nav.apply(NavEvent::RunSucceeded(RunReport::default())),
            Screen::Welcome
        );
        assert_eq!(nav.apply(NavEvent::Back), Screen::Welcome);
        assert_eq!(nav.apply(NavEvent::RunCancelled), Screen::Welcome);
        assert_eq!(nav.payload(), &CarryPayload::None);
    }

    #[test]
    fn test_terminal_screens_only_reachable_from_progressing() {
        let mut nav = ScreenNavigator::new();
        nav.apply(NavEvent::Continue);
        // InstallFailed is not reachable from Detecting
        let failure = FailurePayload {
            error: "x".to_string(),
            step_description: String::new(),
        };
        assert_eq!(nav.apply(NavEvent::RunFailed(failure)), Screen::Detecting);
    }

    #[test]
    fn test_restart_from_terminal_screen() {
        let mut nav = ScreenNavigator::new();
        nav.apply(NavEvent::BeginUninstall);
        nav.apply(NavEvent::Continue);
        nav.apply(NavEvent::RunFailed(FailurePayload {
            error: "x".to_string(),
            step_description: String::new(),
        }));
        assert_eq!(nav.apply(NavEvent::Restart), Screen::Welcome);
        assert_eq!(nav.payload(), &CarryPayload::None);
    }

    #[test]
    fn test_restart_is_no_op_mid_flow() {
        let mut nav = ScreenNavigator::new();
        nav.apply(NavEvent::Continue);
        assert_eq!(nav.apply(NavEvent::Restart), Screen::Detecting);
    }
}
