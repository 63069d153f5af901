//! Render and compute passes
//!
//! Each pass owns its pipeline objects and one command buffer per frame slot.
//! Passes are rebuilt by `Renderer::recreate()` and recorded and submitted by
//! `Renderer::draw()` in `PassKind::ORDER`.

pub mod pass_core;
pub mod shaders;
pub mod depth;
pub mod culling;
pub mod deferred;
pub mod forward;

pub use pass_core::{draw_models, PassCore};
pub use shaders::ShaderLibrary;
pub use depth::DepthPass;
pub use culling::CullingPass;
pub use deferred::DeferredPass;
pub use forward::ForwardPass;

use std::sync::Arc;
use crate::error::Lumen3dResult;
use crate::config::Configuration;
use crate::device::{Extent2D, GraphicsDevice};
use crate::frame::{AttachmentSet, ClusterGrid, FrameSync, PassTopology};
use crate::scene::Model;
use crate::swapchain::Swapchain;

/// Renderer state a pass is built from
pub struct PassContext<'a> {
    pub device: &'a Arc<dyn GraphicsDevice>,
    pub config: &'a Configuration,
    pub frame_count: usize,
    pub attachments: &'a AttachmentSet,
    pub swapchain: &'a Swapchain,
    pub shaders: &'a ShaderLibrary,
    pub grid: ClusterGrid,
}

/// Per-frame inputs of `record`
pub struct RecordContext<'a> {
    pub device: &'a dyn GraphicsDevice,
    pub frame: usize,
    /// Topology generation; a different value forces re-encoding
    pub version: u64,
    /// Swapchain image the forward pass renders to
    pub image_index: u32,
    pub extent: Extent2D,
    pub attachments: &'a AttachmentSet,
    pub models: &'a [&'a dyn Model],
}

/// Common surface of the four passes
pub trait FramePass {
    fn core(&self) -> &PassCore;

    /// Encode the command buffer of `ctx.frame`, unless it already holds
    /// this version; returns whether anything was encoded
    fn record(&mut self, ctx: &RecordContext) -> Lumen3dResult<bool>;

    fn enabled(&self) -> bool {
        self.core().enabled()
    }

    fn submit(
        &self,
        device: &dyn GraphicsDevice,
        frame: usize,
        sync: &FrameSync,
        topology: &PassTopology,
    ) -> Lumen3dResult<()> {
        self.core().submit(device, frame, sync, topology)
    }
}

#[cfg(test)]
mod test_support;
