//! Point lights uploaded to the light buffer

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use crate::engine_warn;

/// Lights uploaded per frame; the rest are dropped
pub const MAX_LIGHTS: usize = 1024;

/// GPU layout of one point light (32 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct PointLight {
    pub position: [f32; 3],
    pub radius: f32,
    pub color: [f32; 3],
    pub intensity: f32,
}

impl PointLight {
    pub fn new(position: Vec3, radius: f32, color: Vec3, intensity: f32) -> Self {
        Self {
            position: position.to_array(),
            radius,
            color: color.to_array(),
            intensity,
        }
    }
}

/// The first `MAX_LIGHTS` lights, warning when some are dropped
pub fn clamp_lights(lights: &[PointLight]) -> &[PointLight] {
    if lights.len() > MAX_LIGHTS {
        engine_warn!(
            "lumen3d::Renderer",
            "{} lights submitted, only the first {} are uploaded",
            lights.len(), MAX_LIGHTS
        );
        &lights[..MAX_LIGHTS]
    } else {
        lights
    }
}

#[cfg(test)]
#[path = "light_tests.rs"]
mod tests;
