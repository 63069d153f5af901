//! State shared by every pass
//!
//! A pass is disabled when its first command buffer is null; this is the only
//! switch the renderer and the dependency table look at. Field order is drop
//! order: command buffers, framebuffers, pipeline, render pass, layout.

use std::sync::Arc;
use crate::error::Lumen3dResult;
use crate::device::{
    ClearValue, CommandBuffer, DescriptorSetLayout, Extent2D, Fence, Framebuffer, FramebufferDesc,
    GraphicsDevice, ImageView, Pipeline, PipelineBindPoint, PipelineLayout, Rect2D, RenderPass,
    SemaphoreWait, SubmitInfo, Viewport,
};
use crate::frame::{FrameSync, PassKind, PassTopology};
use crate::resource::{Owned, MAX_FRAMES_IN_FLIGHT};
use crate::scene::Model;

/// What a command buffer was last recorded against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RecordKey {
    version: u64,
    image: u32,
}

pub struct PassCore {
    kind: PassKind,
    command_buffers: [Owned<CommandBuffer>; MAX_FRAMES_IN_FLIGHT],
    framebuffers: Vec<Owned<Framebuffer>>,
    pipeline: Owned<Pipeline>,
    render_pass: Owned<RenderPass>,
    layout: Owned<PipelineLayout>,
    recorded: [Option<RecordKey>; MAX_FRAMES_IN_FLIGHT],
}

impl PassCore {
    /// Core holding nothing
    pub fn disabled(kind: PassKind) -> Self {
        Self {
            kind,
            command_buffers: Default::default(),
            framebuffers: Vec::new(),
            pipeline: Owned::null(),
            render_pass: Owned::null(),
            layout: Owned::null(),
            recorded: [None; MAX_FRAMES_IN_FLIGHT],
        }
    }

    pub fn kind(&self) -> PassKind {
        self.kind
    }

    pub fn enabled(&self) -> bool {
        !self.command_buffers[0].is_null()
    }

    // ===== CONSTRUCTION =====

    pub fn create_layout(&mut self, device: &Arc<dyn GraphicsDevice>, sets: &[DescriptorSetLayout]) -> Lumen3dResult<()> {
        let layout = device.create_pipeline_layout(sets)?;
        self.layout = Owned::new(device, layout);
        Ok(())
    }

    pub fn set_render_pass(&mut self, render_pass: Owned<RenderPass>) {
        self.render_pass = render_pass;
    }

    pub fn set_pipeline(&mut self, pipeline: Owned<Pipeline>) {
        self.pipeline = pipeline;
    }

    /// Append a framebuffer over `attachments` for this pass's render pass
    pub fn add_framebuffer(
        &mut self,
        device: &Arc<dyn GraphicsDevice>,
        attachments: Vec<ImageView>,
        extent: Extent2D,
    ) -> Lumen3dResult<()> {
        let framebuffer = device.create_framebuffer(&FramebufferDesc {
            render_pass: self.render_pass.handle(),
            attachments,
            extent,
        })?;
        self.framebuffers.push(Owned::new(device, framebuffer));
        Ok(())
    }

    /// One command buffer per live frame slot, on this pass's queue
    pub fn allocate_command_buffers(&mut self, device: &Arc<dyn GraphicsDevice>, frame_count: usize) -> Lumen3dResult<()> {
        for slot in 0..frame_count.min(MAX_FRAMES_IN_FLIGHT) {
            let command_buffer = device.allocate_command_buffer(self.kind.queue())?;
            self.command_buffers[slot] = Owned::new(device, command_buffer);
        }
        Ok(())
    }

    // ===== ACCESSORS =====

    pub fn command_buffer(&self, slot: usize) -> CommandBuffer {
        self.command_buffers.get(slot).map(Owned::handle).unwrap_or_default()
    }

    pub fn live_command_buffers(&self) -> usize {
        self.command_buffers.iter().filter(|cb| !cb.is_null()).count()
    }

    pub fn framebuffer(&self, index: usize) -> Framebuffer {
        self.framebuffers.get(index).map(Owned::handle).unwrap_or_default()
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn pipeline(&self) -> Pipeline {
        self.pipeline.handle()
    }

    pub fn render_pass(&self) -> RenderPass {
        self.render_pass.handle()
    }

    pub fn layout(&self) -> PipelineLayout {
        self.layout.handle()
    }

    // ===== RECORDING =====

    /// Whether `frame` must be re-encoded for `version` and `image`
    pub fn needs_record(&self, frame: usize, version: u64, image: u32) -> bool {
        self.recorded.get(frame).map_or(false, |key| *key != Some(RecordKey { version, image }))
    }

    pub fn mark_recorded(&mut self, frame: usize, version: u64, image: u32) {
        if let Some(key) = self.recorded.get_mut(frame) {
            *key = Some(RecordKey { version, image });
        }
    }

    /// Reset and begin the command buffer of `frame`
    pub fn begin(&self, device: &dyn GraphicsDevice, frame: usize) -> Lumen3dResult<CommandBuffer> {
        let command_buffer = self.command_buffer(frame);
        device.reset_command_buffer(command_buffer)?;
        device.begin_command_buffer(command_buffer)?;
        Ok(command_buffer)
    }

    /// Begin the render pass on `framebuffer`, bind the pipeline and cover `extent`
    pub fn begin_graphics(
        &self,
        device: &dyn GraphicsDevice,
        command_buffer: CommandBuffer,
        framebuffer: usize,
        extent: Extent2D,
        clears: &[ClearValue],
    ) {
        device.cmd_begin_render_pass(
            command_buffer,
            self.render_pass.handle(),
            self.framebuffer(framebuffer),
            extent,
            clears,
        );
        device.cmd_bind_pipeline(command_buffer, PipelineBindPoint::Graphics, self.pipeline.handle());
        device.cmd_set_viewport(command_buffer, Viewport::full(extent));
        device.cmd_set_scissor(command_buffer, Rect2D::full(extent));
    }

    // ===== SUBMISSION =====

    /// Submit the command buffer of `frame` with the waits and signals the
    /// dependency table gives this pass; disabled passes submit nothing
    pub fn submit(
        &self,
        device: &dyn GraphicsDevice,
        frame: usize,
        sync: &FrameSync,
        topology: &PassTopology,
    ) -> Lumen3dResult<()> {
        if !self.enabled() {
            return Ok(());
        }
        let waits = topology
            .waits(self.kind)
            .into_iter()
            .map(|(kind, stage)| SemaphoreWait { semaphore: sync.semaphore(kind, frame), stage })
            .collect();
        let signals = topology
            .signals(self.kind)
            .into_iter()
            .map(|kind| sync.semaphore(kind, frame))
            .collect();
        let fence = match self.kind {
            PassKind::Forward => sync.fence(frame),
            _ => Fence::NULL,
        };
        device.queue_submit(
            self.kind.queue(),
            &SubmitInfo {
                command_buffers: vec![self.command_buffer(frame)],
                waits,
                signals,
                fence,
            },
        )
    }
}

/// Bind and draw every mesh of `models`
///
/// Transforms go to set 1. Materials go to `material_set` when the pipeline
/// reads them.
pub fn draw_models(
    device: &dyn GraphicsDevice,
    command_buffer: CommandBuffer,
    layout: PipelineLayout,
    frame: usize,
    models: &[&dyn Model],
    material_set: Option<u32>,
) {
    for model in models {
        let transform = model.transform_binding(frame);
        device.cmd_bind_descriptor_sets(command_buffer, PipelineBindPoint::Graphics, layout, 1, &[transform.set]);
        device.cmd_bind_vertex_buffer(command_buffer, model.vertex_buffer(), 0);
        device.cmd_bind_index_buffer(command_buffer, model.index_buffer(), 0, model.index_type());
        for mesh in model.meshes() {
            if let Some(set) = material_set {
                device.cmd_bind_descriptor_sets(command_buffer, PipelineBindPoint::Graphics, layout, set, &[mesh.material_set]);
            }
            device.cmd_draw_indexed(command_buffer, mesh.index_count, mesh.first_index, mesh.vertex_offset);
        }
    }
}
