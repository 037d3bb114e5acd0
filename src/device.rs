//! Detected-device and driver-selection payload types.
//!
//! These are the facts the detection engine hands to the wizard and the
//! choices the operator makes on the selection screen. Detection itself
//! lives outside this crate; the wizard only carries the results between
//! screens.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString};

/// Summary of a detected device, as reported by the detection engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    /// Vendor name (e.g., "NVIDIA")
    pub vendor: String,
    /// Device model string
    pub model: String,
    /// Bus address (e.g., "0000:01:00.0")
    pub bus_id: String,
    /// Kernel module currently bound to the device, if any
    pub current_module: Option<String>,
}

impl fmt::Display for DeviceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}]", self.vendor, self.model, self.bus_id)
    }
}

/// Optional driver components the operator may select.
///
/// Each selected component adds one dynamically generated step to the
/// install pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum DriverComponent {
    /// Device firmware blobs
    Firmware,
    /// Graphical settings/control utility
    ControlCenter,
    /// 32-bit compatibility libraries
    Compat32,
    /// Development headers for building against the driver
    Headers,
}

impl DriverComponent {
    /// Human-readable label used for the component's pipeline step.
    pub fn description(self) -> &'static str {
        match self {
            Self::Firmware => "Installing device firmware",
            Self::ControlCenter => "Installing control center",
            Self::Compat32 => "Installing 32-bit compatibility libraries",
            Self::Headers => "Installing development headers",
        }
    }
}

/// The operator's choices, carried from the selection screen into
/// confirmation and used to build the install pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverSelection {
    /// The device the driver targets
    pub device: DeviceSummary,
    /// Chosen driver package version
    pub driver_version: String,
    /// Optional components to install alongside the core driver
    pub components: Vec<DriverComponent>,
}

impl DriverSelection {
    pub fn new(device: DeviceSummary, driver_version: impl Into<String>) -> Self {
        Self {
            device,
            driver_version: driver_version.into(),
            components: Vec::new(),
        }
    }

    /// Add an optional component, ignoring duplicates.
    pub fn with_component(mut self, component: DriverComponent) -> Self {
        if !self.components.contains(&component) {
            self.components.push(component);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn sample_device() -> DeviceSummary {
        DeviceSummary {
            vendor: "NVIDIA".to_string(),
            model: "GeForce RTX 4070".to_string(),
            bus_id: "0000:01:00.0".to_string(),
            current_module: Some("nouveau".to_string()),
        }
    }

    #[test]
    fn test_device_display() {
        let dev = sample_device();
        assert_eq!(dev.to_string(), "NVIDIA GeForce RTX 4070 [0000:01:00.0]");
    }

    #[test]
    fn test_component_string_roundtrip() {
        for component in DriverComponent::iter() {
            let s = component.to_string();
            let parsed: DriverComponent = s.parse().expect("should parse");
            assert_eq!(component, parsed);
        }
    }

    #[test]
    fn test_selection_deduplicates_components() {
        let selection = DriverSelection::new(sample_device(), "550.90")
            .with_component(DriverComponent::Firmware)
            .with_component(DriverComponent::Firmware)
            .with_component(DriverComponent::Compat32);
        assert_eq!(
            selection.components,
            vec![DriverComponent::Firmware, DriverComponent::Compat32]
        );
    }

    #[test]
    fn test_selection_serde_roundtrip() {
        let selection = DriverSelection::new(sample_device(), "550.90")
            .with_component(DriverComponent::Headers);
        let json = serde_json::to_string(&selection).expect("serialize");
        let back: DriverSelection = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(selection, back);
    }
}
