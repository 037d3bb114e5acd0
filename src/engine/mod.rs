//! Execution engine boundary
//!
//! The real package-manager backend lives outside this crate; the wizard
//! only consumes its lifecycle events. This module defines the boundary —
//! a [`DriverEngine`] spawns one pipeline run on a worker thread and
//! reports over an mpsc channel — plus [`ScriptedEngine`], which replays a
//! recorded event plan. The scripted engine backs the demo binary and the
//! integration tests.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::device::DriverSelection;
use crate::error::{DriverWizError, Result};
use crate::events::{EngineEvent, RunReport};
use crate::pipeline::PipelineKind;

/// Spawns pipeline runs and reports their lifecycle as events.
pub trait DriverEngine {
    /// Start one run of the given pipeline flavor. The returned handle
    /// yields events until the run finishes or is cancelled.
    fn spawn(
        &self,
        kind: PipelineKind,
        selection: Option<&DriverSelection>,
    ) -> Result<EngineHandle>;
}

/// Handle to one in-flight engine run.
///
/// Events arrive on a channel drained by the session loop; the cancel flag
/// is a single-shot, best-effort request the worker observes between
/// events.
pub struct EngineHandle {
    events: Receiver<EngineEvent>,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Next pending event, if any. Returns `None` both when the channel is
    /// empty and when the worker has hung up.
    pub fn try_recv(&self) -> Option<EngineEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// True once the worker thread has finished. Events it sent before
    /// finishing may still be pending on the channel.
    pub fn is_finished(&self) -> bool {
        self.worker
            .as_ref()
            .map(JoinHandle::is_finished)
            .unwrap_or(true)
    }

    /// Ask the worker to stop emitting events. Best effort; events already
    /// queued may still arrive and must be tolerated by the consumer.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Wait for the worker to finish.
    pub fn join(mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// One entry in a recorded engine plan: an event plus an optional delay
/// before it is emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEvent {
    #[serde(flatten)]
    pub event: EngineEvent,
    /// Milliseconds to wait before emitting this event
    #[serde(default)]
    pub delay_ms: u64,
}

impl From<EngineEvent> for PlanEvent {
    fn from(event: EngineEvent) -> Self {
        Self { event, delay_ms: 0 }
    }
}

/// A recorded sequence of engine events, loadable from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnginePlan {
    pub events: Vec<PlanEvent>,
}

impl EnginePlan {
    /// Load and validate a plan from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let plan: Self = serde_json::from_str(&contents)?;
        plan.validate()?;
        Ok(plan)
    }

    /// A plan must contain at least one event. A plan whose last event is
    /// not a pipeline result will leave the run spinning forever; that is
    /// legal (cancel plans do it on purpose) but worth a warning.
    pub fn validate(&self) -> Result<()> {
        if self.events.is_empty() {
            return Err(DriverWizError::plan("plan contains no events"));
        }
        match self.events.last().map(|p| &p.event) {
            Some(EngineEvent::PipelineResult { .. }) | Some(EngineEvent::CancelRequested) => {}
            _ => warn!("engine plan does not end with a pipeline result"),
        }
        Ok(())
    }

    /// Built-in demo plan: every step of an `n`-step pipeline starts and
    /// completes in order, then the pipeline reports success.
    pub fn demo(kind: PipelineKind, step_count: usize) -> Self {
        let mut events: Vec<PlanEvent> = Vec::with_capacity(step_count * 2 + 2);
        for index in 0..step_count {
            events.push(PlanEvent {
                event: EngineEvent::StepStarted { index },
                delay_ms: 150,
            });
            events.push(PlanEvent {
                event: EngineEvent::StepCompleted { index, error: None },
                delay_ms: 300,
            });
        }
        let report = match kind {
            PipelineKind::Install => RunReport {
                installed: vec!["driver-core".to_string(), "driver-utils".to_string()],
                reboot_required: true,
                ..RunReport::default()
            },
            PipelineKind::Uninstall => RunReport {
                removed: vec!["driver-core".to_string(), "driver-utils".to_string()],
                reboot_required: true,
                ..RunReport::default()
            },
        };
        events.push(PlanEvent {
            event: EngineEvent::LogLine {
                text: format!("{kind} finished"),
            },
            delay_ms: 100,
        });
        events.push(PlanEvent {
            event: EngineEvent::PipelineResult {
                success: true,
                report,
            },
            delay_ms: 100,
        });
        Self { events }
    }
}

/// Engine that replays a recorded plan on a worker thread.
#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    plan: Option<EnginePlan>,
}

impl ScriptedEngine {
    /// Replay the given plan for every spawned run.
    pub fn new(plan: EnginePlan) -> Self {
        Self { plan: Some(plan) }
    }

    /// Generate a successful demo plan sized to each spawned pipeline.
    pub fn demo() -> Self {
        Self { plan: None }
    }

    /// Load the plan from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(EnginePlan::load_from_file(path)?))
    }
}

impl DriverEngine for ScriptedEngine {
    fn spawn(
        &self,
        kind: PipelineKind,
        selection: Option<&DriverSelection>,
    ) -> Result<EngineHandle> {
        let plan = match &self.plan {
            Some(plan) => plan.clone(),
            None => {
                let step_count = kind.build_ledger(selection).len();
                EnginePlan::demo(kind, step_count)
            }
        };
        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_flag = Arc::clone(&cancel);
        let worker = thread::spawn(move || {
            for planned in plan.events {
                if cancel_flag.load(Ordering::Relaxed) {
                    debug!("engine worker observed cancel, stopping");
                    break;
                }
                if planned.delay_ms > 0 {
                    thread::sleep(Duration::from_millis(planned.delay_ms));
                }
                // Receiver gone means the session ended; just stop.
                if tx.send(planned.event).is_err() {
                    break;
                }
            }
        });
        Ok(EngineHandle {
            events: rx,
            cancel,
            worker: Some(worker),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant_plan(events: Vec<EngineEvent>) -> EnginePlan {
        EnginePlan {
            events: events.into_iter().map(PlanEvent::from).collect(),
        }
    }

    #[test]
    fn test_empty_plan_is_invalid() {
        let plan = EnginePlan::default();
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_demo_plan_is_valid_and_complete() {
        let plan = EnginePlan::demo(PipelineKind::Uninstall, 5);
        plan.validate().expect("demo plan should validate");
        assert!(matches!(
            plan.events.last().unwrap().event,
            EngineEvent::PipelineResult { success: true, .. }
        ));
        // 5 starts + 5 completes + log + result
        assert_eq!(plan.events.len(), 12);
    }

    #[test]
    fn test_scripted_engine_replays_plan_in_order() {
        let events = vec![
            EngineEvent::StepStarted { index: 0 },
            EngineEvent::StepCompleted { index: 0, error: None },
            EngineEvent::PipelineResult {
                success: true,
                report: RunReport::default(),
            },
        ];
        let engine = ScriptedEngine::new(instant_plan(events.clone()));
        let handle = engine
            .spawn(PipelineKind::Install, None)
            .expect("spawn should succeed");

        let mut received = Vec::new();
        loop {
            match handle.try_recv() {
                Some(event) => received.push(event),
                None if handle.is_finished() => break,
                None => thread::sleep(Duration::from_millis(5)),
            }
        }
        handle.join();
        assert_eq!(received, events);
    }

    #[test]
    fn test_cancel_stops_the_worker() {
        let mut events = Vec::new();
        for index in 0..50 {
            events.push(PlanEvent {
                event: EngineEvent::StepStarted { index },
                delay_ms: 20,
            });
        }
        let engine = ScriptedEngine::new(EnginePlan { events });
        let handle = engine
            .spawn(PipelineKind::Install, None)
            .expect("spawn should succeed");
        handle.request_cancel();

        let mut count = 0;
        loop {
            match handle.try_recv() {
                Some(_) => count += 1,
                None if handle.is_finished() => break,
                None => thread::sleep(Duration::from_millis(5)),
            }
        }
        handle.join();
        // The worker stopped well short of the full plan
        assert!(count < 50, "worker emitted {count} events after cancel");
    }

    #[test]
    fn test_plan_file_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("plan.json");
        let plan = EnginePlan::demo(PipelineKind::Install, 3);
        std::fs::write(&path, serde_json::to_string_pretty(&plan).expect("serialize"))
            .expect("write plan");
        let loaded = EnginePlan::load_from_file(&path).expect("load plan");
        assert_eq!(plan, loaded);
    }

    #[test]
    fn test_plan_file_missing_is_io_error() {
        let err = EnginePlan::load_from_file(Path::new("/nonexistent/plan.json")).unwrap_err();
        assert!(matches!(err, DriverWizError::Io(_)));
    }
}
