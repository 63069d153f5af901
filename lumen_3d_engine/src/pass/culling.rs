//! Light culling pass
//!
//! Runs on the compute queue. Building the pass also dispatches the frustum
//! kernel once and waits for it: the per-tile (or per-cluster) frusta only
//! depend on the projection and the grid, so they are computed at
//! configuration time and read every frame after. The renderer dispatches
//! it again when the camera projection changes.

use std::sync::Arc;
use crate::config::CullingMode;
use crate::error::{Lumen3dError, Lumen3dResult};
use crate::device::{
    CommandBuffer, ComputePipelineDesc, GraphicsDevice, Pipeline, PipelineBindPoint, PipelineLayout,
    QueueKind, SubmitInfo, FENCE_TIMEOUT_NS,
};
use crate::frame::{AttachmentSet, ClusterGrid, PassKind};
use crate::pass::shaders::{culling_shader, frustum_shader};
use crate::pass::{FramePass, PassContext, PassCore, RecordContext, ShaderLibrary};
use crate::resource::Owned;
use crate::{engine_debug, engine_trace};

pub struct CullingPass {
    core: PassCore,
    mode: CullingMode,
    grid: ClusterGrid,
}

impl CullingPass {
    pub fn disabled() -> Self {
        Self { core: PassCore::disabled(PassKind::Culling), mode: CullingMode::Disabled, grid: ClusterGrid { x: 1, y: 1, z: 1 } }
    }

    pub fn new(ctx: &PassContext) -> Lumen3dResult<Self> {
        let device = ctx.device;
        let mode = ctx.config.culling_mode;
        let shader_name = culling_shader(mode)
            .ok_or_else(|| Lumen3dError::InvalidResource("culling pass with culling disabled".to_string()))?;
        let layouts = ctx.attachments.layouts();
        let mut core = PassCore::disabled(PassKind::Culling);

        core.create_layout(device, &[layouts.camera.handle(), layouts.light.handle()])?;

        let shader = ctx.shaders.load(device, shader_name)?;
        let pipeline = device.create_compute_pipeline(&ComputePipelineDesc {
            layout: core.layout(),
            shader: shader.handle(),
        })?;
        core.set_pipeline(Owned::new(device, pipeline));
        core.allocate_command_buffers(device, ctx.frame_count)?;

        let pass = Self { core, mode, grid: ctx.grid };
        pass.compute_frusta(device, ctx.shaders, ctx.attachments, 0)?;
        engine_debug!(
            "lumen3d::CullingPass",
            "{:?} culling built for {} slots, grid {}x{}x{}",
            mode, ctx.frame_count, ctx.grid.x, ctx.grid.y, ctx.grid.z
        );
        Ok(pass)
    }

    /// Dispatch the frustum kernel with the camera and light sets of `slot`
    /// and wait for it
    ///
    /// The frustum buffer is shared by every slot: no frame may be in flight.
    pub fn compute_frusta(
        &self,
        device: &Arc<dyn GraphicsDevice>,
        shaders: &ShaderLibrary,
        attachments: &AttachmentSet,
        slot: usize,
    ) -> Lumen3dResult<()> {
        let Some(frustum_name) = frustum_shader(self.mode) else {
            return Ok(());
        };
        let frustum = shaders.load(device, frustum_name)?;
        let pipeline = Owned::new(
            device,
            device.create_compute_pipeline(&ComputePipelineDesc {
                layout: self.core.layout(),
                shader: frustum.handle(),
            })?,
        );
        let fence = Owned::new(device, device.create_fence(false)?);
        let command_buffer = Owned::new(device, device.allocate_command_buffer(QueueKind::Compute)?);

        device.begin_command_buffer(command_buffer.handle())?;
        dispatch(device.as_ref(), command_buffer.handle(), pipeline.handle(), self.core.layout(), attachments, slot, self.grid);
        device.end_command_buffer(command_buffer.handle())?;
        device.queue_submit(
            QueueKind::Compute,
            &SubmitInfo {
                command_buffers: vec![command_buffer.handle()],
                waits: Vec::new(),
                signals: Vec::new(),
                fence: fence.handle(),
            },
        )?;
        device.wait_for_fences(&[fence.handle()], FENCE_TIMEOUT_NS)?;
        engine_trace!("lumen3d::CullingPass", "Frusta computed for a {:?} grid from slot {}", self.grid, slot);
        Ok(())
    }

    pub fn grid(&self) -> ClusterGrid {
        self.grid
    }
}

/// Bind camera and light sets of `slot` and dispatch one group per grid cell
fn dispatch(
    device: &dyn GraphicsDevice,
    command_buffer: CommandBuffer,
    pipeline: Pipeline,
    layout: PipelineLayout,
    attachments: &AttachmentSet,
    slot: usize,
    grid: ClusterGrid,
) {
    device.cmd_bind_pipeline(command_buffer, PipelineBindPoint::Compute, pipeline);
    device.cmd_bind_descriptor_sets(
        command_buffer,
        PipelineBindPoint::Compute,
        layout,
        0,
        &[attachments.camera_set(slot), attachments.light_set(slot)],
    );
    device.cmd_dispatch(command_buffer, grid.x, grid.y, grid.z);
}

impl FramePass for CullingPass {
    fn core(&self) -> &PassCore {
        &self.core
    }

    fn record(&mut self, ctx: &RecordContext) -> Lumen3dResult<bool> {
        if !self.core.enabled() || !self.core.needs_record(ctx.frame, ctx.version, 0) {
            return Ok(false);
        }
        let device = ctx.device;
        let command_buffer = self.core.begin(device, ctx.frame)?;
        dispatch(device, command_buffer, self.core.pipeline(), self.core.layout(), ctx.attachments, ctx.frame, self.grid);
        device.end_command_buffer(command_buffer)?;

        self.core.mark_recorded(ctx.frame, ctx.version, 0);
        Ok(true)
    }
}

#[cfg(test)]
#[path = "culling_tests.rs"]
mod tests;
