//! Camera - view and projection supplied by the caller

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use crate::device::Extent2D;

/// Passive camera: the caller computes both matrices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    view: Mat4,
    projection: Mat4,
}

impl Camera {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self { view, projection }
    }

    /// Right-handed perspective camera looking from `eye` at `target`
    pub fn look_at(eye: Vec3, target: Vec3, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            view: Mat4::look_at_rh(eye, target, Vec3::Y),
            projection: Mat4::perspective_rh(fov_y, aspect, near, far),
        }
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// World-space eye position
    pub fn position(&self) -> Vec3 {
        self.view.inverse().w_axis.truncate()
    }

    /// GPU layout for a render target of `extent`
    pub fn uniform(&self, extent: Extent2D) -> CameraUniform {
        let position = self.position();
        CameraUniform {
            view: self.view,
            projection: self.projection,
            inverse_projection: self.projection.inverse(),
            view_projection: self.view_projection(),
            position: Vec4::new(position.x, position.y, position.z, 1.0),
            screen_size: Vec4::new(
                extent.width as f32,
                extent.height as f32,
                1.0 / extent.width.max(1) as f32,
                1.0 / extent.height.max(1) as f32,
            ),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY)
    }
}

/// Camera block read by every pass (set 0)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub view: Mat4,
    pub projection: Mat4,
    /// Used by the frustum dispatch to unproject tile corners
    pub inverse_projection: Mat4,
    pub view_projection: Mat4,
    pub position: Vec4,
    /// Width, height, 1/width, 1/height
    pub screen_size: Vec4,
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
