//! Physical device selection
//!
//! A device is usable when it supports the swapchain extension and its queue
//! families yield a complete `QueueAssignment`. Among usable devices the one
//! whose name matches the configured device name wins, then the first
//! discrete GPU, then the first usable device.

use lumen_3d_engine::lumen3d::device::{QueueAssignment, QueueFamilyInfo};
use lumen_3d_engine::{engine_info, engine_warn};

/// What the selector needs to know about one enumerated physical device
#[derive(Debug, Clone)]
pub struct PhysicalDeviceCandidate {
    pub name: String,
    pub discrete: bool,
    pub swapchain_supported: bool,
    pub families: Vec<QueueFamilyInfo>,
}

impl PhysicalDeviceCandidate {
    fn assignment(&self) -> Option<QueueAssignment> {
        if !self.swapchain_supported {
            return None;
        }
        QueueAssignment::resolve(&self.families).ok()
    }
}

/// Index of the chosen candidate and its queue assignment
pub fn select_physical_device(
    candidates: &[PhysicalDeviceCandidate],
    preferred_name: &str,
) -> Option<(usize, QueueAssignment)> {
    let usable: Vec<(usize, QueueAssignment)> = candidates
        .iter()
        .enumerate()
        .filter_map(|(i, candidate)| candidate.assignment().map(|assignment| (i, assignment)))
        .collect();

    if !preferred_name.is_empty() {
        if let Some(&found) = usable.iter().find(|(i, _)| candidates[*i].name == preferred_name) {
            engine_info!("lumen3d::vulkan", "Using configured device '{}'", preferred_name);
            return Some(found);
        }
        engine_warn!(
            "lumen3d::vulkan",
            "Configured device '{}' not found or unusable, falling back",
            preferred_name
        );
    }

    usable
        .iter()
        .find(|(i, _)| candidates[*i].discrete)
        .or_else(|| usable.first())
        .copied()
}

#[cfg(test)]
#[path = "physical_device_tests.rs"]
mod tests;
