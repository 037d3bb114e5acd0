//! Engine event vocabulary
//!
//! The execution engine reports a run's lifecycle as a closed set of typed
//! events; the core reacts to nothing else. Events are serializable so a
//! run can be driven from a recorded plan (see the `engine` module).

use serde::{Deserialize, Serialize};

/// Result metadata the engine produces when a pipeline finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Packages installed during the run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub installed: Vec<String>,
    /// Packages removed during the run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<String>,
    /// Whether a reboot is required for the change to take effect
    #[serde(default)]
    pub reboot_required: bool,
    /// Free-text summary from the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One lifecycle event from the execution engine.
///
/// Applied to a run in strict arrival order; see `RunState::apply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EngineEvent {
    /// Step `index` began executing
    StepStarted { index: usize },
    /// Step `index` finished; an error means the step failed
    StepCompleted {
        index: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Free-text progress line for the operator
    LogLine { text: String },
    /// The whole pipeline finished; the engine is the authority on success
    PipelineResult {
        success: bool,
        #[serde(default)]
        report: RunReport,
    },
    /// The operator asked to cancel the run
    CancelRequested,
    /// Periodic timer tick; drives spinner animation only
    Tick,
}
