//! Depth pre-pass
//!
//! Lays down scene depth before shading so later passes test against it
//! instead of overdrawing. Leaves the depth image in its read-only layout
//! for the culling and shading passes.

use crate::error::{Lumen3dError, Lumen3dResult};
use crate::device::{
    AttachmentDesc, ClearValue, CompareOp, CullMode, DepthState, GraphicsPipelineDesc, ImageLayout,
    LoadOp, PipelineBindPoint, RenderPassDesc, StoreOp,
};
use crate::frame::{AttachmentRole, PassKind};
use crate::pass::shaders::DEPTH_VERTEX;
use crate::pass::{draw_models, FramePass, PassContext, PassCore, RecordContext};
use crate::resource::Owned;
use crate::scene::Vertex;
use crate::engine_debug;

pub struct DepthPass {
    core: PassCore,
}

impl DepthPass {
    pub fn disabled() -> Self {
        Self { core: PassCore::disabled(PassKind::Depth) }
    }

    pub fn new(ctx: &PassContext) -> Lumen3dResult<Self> {
        let device = ctx.device;
        let layouts = ctx.attachments.layouts();
        let format = ctx
            .attachments
            .depth_format()
            .ok_or_else(|| Lumen3dError::InvalidResource("depth pass without a depth attachment".to_string()))?;
        let mut core = PassCore::disabled(PassKind::Depth);

        core.create_layout(device, &[layouts.camera.handle(), layouts.transform.handle()])?;

        let render_pass = device.create_render_pass(&RenderPassDesc {
            attachments: vec![AttachmentDesc {
                format,
                samples: ctx.config.sample_count,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                initial_layout: ImageLayout::Undefined,
                final_layout: ImageLayout::DepthStencilReadOnly,
            }],
            color_refs: Vec::new(),
            resolve_refs: Vec::new(),
            depth_ref: Some((0, ImageLayout::DepthStencilAttachment)),
        })?;
        core.set_render_pass(Owned::new(device, render_pass));

        let vertex = ctx.shaders.load(device, DEPTH_VERTEX)?;
        let pipeline = device.create_graphics_pipeline(&GraphicsPipelineDesc {
            layout: core.layout(),
            render_pass: core.render_pass(),
            vertex_shader: vertex.handle(),
            fragment_shader: None,
            vertex_layout: Vertex::layout(),
            samples: ctx.config.sample_count,
            depth: DepthState { test: true, write: true, compare: CompareOp::Less },
            cull_mode: CullMode::Back,
            color_attachment_count: 0,
        })?;
        core.set_pipeline(Owned::new(device, pipeline));

        let extent = ctx.attachments.extent();
        for slot in 0..ctx.frame_count {
            core.add_framebuffer(device, vec![ctx.attachments.view(AttachmentRole::Depth, slot)], extent)?;
        }
        core.allocate_command_buffers(device, ctx.frame_count)?;

        engine_debug!("lumen3d::DepthPass", "Depth pre-pass built for {} slots ({:?})", ctx.frame_count, format);
        Ok(Self { core })
    }
}

impl FramePass for DepthPass {
    fn core(&self) -> &PassCore {
        &self.core
    }

    fn record(&mut self, ctx: &RecordContext) -> Lumen3dResult<bool> {
        if !self.core.enabled() || !self.core.needs_record(ctx.frame, ctx.version, 0) {
            return Ok(false);
        }
        let device = ctx.device;
        let command_buffer = self.core.begin(device, ctx.frame)?;
        self.core.begin_graphics(
            device,
            command_buffer,
            ctx.frame,
            ctx.extent,
            &[ClearValue::DepthStencil { depth: 1.0, stencil: 0 }],
        );
        device.cmd_bind_descriptor_sets(
            command_buffer,
            PipelineBindPoint::Graphics,
            self.core.layout(),
            0,
            &[ctx.attachments.camera_set(ctx.frame)],
        );
        draw_models(device, command_buffer, self.core.layout(), ctx.frame, ctx.models, None);
        device.cmd_end_render_pass(command_buffer);
        device.end_command_buffer(command_buffer)?;

        self.core.mark_recorded(ctx.frame, ctx.version, 0);
        Ok(true)
    }
}

#[cfg(test)]
#[path = "depth_tests.rs"]
mod tests;
