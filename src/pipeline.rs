//! Pipeline construction
//!
//! Builds the fixed step sequence for one install or uninstall run. The
//! base sequences are constant; the install pipeline additionally gains one
//! dynamically generated step per optional component the operator selected.
//! The resulting sequence length never changes after construction — the
//! engine addresses steps by index for the lifetime of the run.

use strum::Display;

use crate::device::DriverSelection;
use crate::steps::{Step, StepLedger};

/// Which flavor of pipeline a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PipelineKind {
    #[strum(serialize = "install")]
    Install,
    #[strum(serialize = "uninstall")]
    Uninstall,
}

/// Base install sequence, in execution order.
const INSTALL_STEPS: &[(&str, &str)] = &[
    ("unload-conflicting", "Unloading conflicting modules"),
    ("configure-repository", "Configuring driver repository"),
    ("install-core", "Installing driver package"),
    ("build-module", "Building kernel module"),
    ("update-initramfs", "Regenerating initramfs"),
];

/// Base uninstall sequence, in execution order.
const UNINSTALL_STEPS: &[(&str, &str)] = &[
    ("stop-services", "Stopping driver services"),
    ("unload-module", "Unloading kernel module"),
    ("remove-packages", "Removing driver packages"),
    ("restore-defaults", "Restoring default configuration"),
    ("update-initramfs", "Regenerating initramfs"),
];

/// Build the step sequence for an install run.
///
/// The base sequence is followed by one step per selected optional
/// component, named `component-<id>`.
pub fn install_steps(selection: &DriverSelection) -> Vec<Step> {
    let mut steps: Vec<Step> = INSTALL_STEPS
        .iter()
        .map(|(name, description)| Step::new(*name, *description))
        .collect();
    for component in &selection.components {
        steps.push(Step::new(
            format!("component-{component}"),
            component.description(),
        ));
    }
    steps
}

/// Build the step sequence for an uninstall run.
pub fn uninstall_steps() -> Vec<Step> {
    UNINSTALL_STEPS
        .iter()
        .map(|(name, description)| Step::new(*name, *description))
        .collect()
}

impl PipelineKind {
    /// Build a fresh ledger for one run of this pipeline flavor.
    ///
    /// Install runs require the operator's selection; for uninstall runs it
    /// is ignored.
    pub fn build_ledger(self, selection: Option<&DriverSelection>) -> StepLedger {
        let steps = match (self, selection) {
            (Self::Install, Some(selection)) => install_steps(selection),
            (Self::Install, None) => INSTALL_STEPS
                .iter()
                .map(|(name, description)| Step::new(*name, *description))
                .collect(),
            (Self::Uninstall, _) => uninstall_steps(),
        };
        StepLedger::new(steps)
    }
}
