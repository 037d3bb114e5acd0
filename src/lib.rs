//! driverwiz library
//!
//! Core state machinery for a terminal wizard that detects, installs and
//! uninstalls a system device driver. The library tracks pipeline step
//! progress, derives completion, buffers progress logs and drives screen
//! navigation through typed events; the actual detection and
//! package-manager work happens in an external engine consumed only as
//! events.

pub mod cli;
pub mod device;
pub mod engine;
pub mod error;
pub mod events;
pub mod navigator;
pub mod pipeline;
pub mod progress;
pub mod router;
pub mod run_state;
pub mod steps;

// Re-export main types for convenience
pub use device::{DeviceSummary, DriverComponent, DriverSelection};
pub use engine::{DriverEngine, EngineHandle, EnginePlan, PlanEvent, ScriptedEngine};
pub use error::{DriverWizError, Result};
pub use events::{EngineEvent, RunReport};
pub use navigator::{CarryPayload, FailurePayload, NavEvent, Screen, ScreenNavigator};
pub use pipeline::{install_steps, uninstall_steps, PipelineKind};
pub use progress::{progress, LogBuffer, DEFAULT_LOG_LINES};
pub use router::{EventRouter, KeyOutcome};
pub use run_state::{RunPhase, RunState, UNKNOWN_ERROR};
pub use steps::{Step, StepLedger, StepStatus};
