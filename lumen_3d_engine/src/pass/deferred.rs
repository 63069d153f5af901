//! G-buffer pass
//!
//! Writes albedo, normal and position for every visible surface. The images
//! end in `ShaderReadOnly` so the composite pass samples them.

use crate::error::{Lumen3dError, Lumen3dResult};
use crate::device::{
    AttachmentDesc, ClearValue, CompareOp, CullMode, DepthState, GraphicsPipelineDesc, ImageLayout,
    LoadOp, PipelineBindPoint, RenderPassDesc, StoreOp,
};
use crate::frame::{AttachmentRole, PassKind};
use crate::pass::shaders::{GBUFFER_FRAGMENT, GBUFFER_VERTEX};
use crate::pass::{draw_models, FramePass, PassContext, PassCore, RecordContext};
use crate::resource::Owned;
use crate::scene::Vertex;
use crate::engine_debug;

const GBUFFER_ROLES: [AttachmentRole; 3] = [AttachmentRole::Albedo, AttachmentRole::Normal, AttachmentRole::Position];

pub struct DeferredPass {
    core: PassCore,
    depth: bool,
}

impl DeferredPass {
    pub fn disabled() -> Self {
        Self { core: PassCore::disabled(PassKind::Deferred), depth: false }
    }

    pub fn new(ctx: &PassContext) -> Lumen3dResult<Self> {
        let device = ctx.device;
        let layouts = ctx.attachments.layouts();
        let formats = ctx
            .attachments
            .gbuffer_formats()
            .ok_or_else(|| Lumen3dError::InvalidResource("deferred pass without a G-buffer".to_string()))?;
        let depth_format = ctx.attachments.depth_format();
        let prepass = ctx.config.depth_prepass_enabled();
        let samples = ctx.config.sample_count;
        let mut core = PassCore::disabled(PassKind::Deferred);

        core.create_layout(
            device,
            &[layouts.camera.handle(), layouts.transform.handle(), layouts.material.handle()],
        )?;

        let mut attachments: Vec<AttachmentDesc> = formats
            .iter()
            .map(|format| AttachmentDesc {
                format: *format,
                samples,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                initial_layout: ImageLayout::Undefined,
                final_layout: ImageLayout::ShaderReadOnly,
            })
            .collect();
        if let Some(format) = depth_format {
            // Depth written by the pre-pass is reused as is
            let (load_op, initial_layout) = if prepass {
                (LoadOp::Load, ImageLayout::DepthStencilReadOnly)
            } else {
                (LoadOp::Clear, ImageLayout::Undefined)
            };
            attachments.push(AttachmentDesc {
                format,
                samples,
                load_op,
                store_op: StoreOp::Store,
                initial_layout,
                final_layout: ImageLayout::DepthStencilReadOnly,
            });
        }
        let render_pass = device.create_render_pass(&RenderPassDesc {
            attachments,
            color_refs: vec![0, 1, 2],
            resolve_refs: Vec::new(),
            depth_ref: depth_format.map(|_| {
                let layout = if prepass { ImageLayout::DepthStencilReadOnly } else { ImageLayout::DepthStencilAttachment };
                (3, layout)
            }),
        })?;
        core.set_render_pass(Owned::new(device, render_pass));

        let depth = match (depth_format.is_some(), prepass) {
            (true, true) => DepthState { test: true, write: false, compare: CompareOp::LessOrEqual },
            (true, false) => DepthState { test: true, write: true, compare: CompareOp::Less },
            (false, _) => DepthState::DISABLED,
        };
        let vertex = ctx.shaders.load(device, GBUFFER_VERTEX)?;
        let fragment = ctx.shaders.load(device, GBUFFER_FRAGMENT)?;
        let pipeline = device.create_graphics_pipeline(&GraphicsPipelineDesc {
            layout: core.layout(),
            render_pass: core.render_pass(),
            vertex_shader: vertex.handle(),
            fragment_shader: Some(fragment.handle()),
            vertex_layout: Vertex::layout(),
            samples,
            depth,
            cull_mode: CullMode::Back,
            color_attachment_count: 3,
        })?;
        core.set_pipeline(Owned::new(device, pipeline));

        let extent = ctx.attachments.extent();
        for slot in 0..ctx.frame_count {
            let mut views: Vec<_> = GBUFFER_ROLES.iter().map(|role| ctx.attachments.view(*role, slot)).collect();
            if depth_format.is_some() {
                views.push(ctx.attachments.view(AttachmentRole::Depth, slot));
            }
            core.add_framebuffer(device, views, extent)?;
        }
        core.allocate_command_buffers(device, ctx.frame_count)?;

        engine_debug!(
            "lumen3d::DeferredPass",
            "G-buffer pass built for {} slots ({:?}, depth {:?})",
            ctx.frame_count, formats, depth_format
        );
        Ok(Self { core, depth: depth_format.is_some() })
    }
}

impl FramePass for DeferredPass {
    fn core(&self) -> &PassCore {
        &self.core
    }

    fn record(&mut self, ctx: &RecordContext) -> Lumen3dResult<bool> {
        if !self.core.enabled() || !self.core.needs_record(ctx.frame, ctx.version, 0) {
            return Ok(false);
        }
        let device = ctx.device;
        let mut clears = vec![ClearValue::Color([0.0; 4]); 3];
        if self.depth {
            clears.push(ClearValue::DepthStencil { depth: 1.0, stencil: 0 });
        }

        let command_buffer = self.core.begin(device, ctx.frame)?;
        self.core.begin_graphics(device, command_buffer, ctx.frame, ctx.extent, &clears);
        device.cmd_bind_descriptor_sets(
            command_buffer,
            PipelineBindPoint::Graphics,
            self.core.layout(),
            0,
            &[ctx.attachments.camera_set(ctx.frame)],
        );
        draw_models(device, command_buffer, self.core.layout(), ctx.frame, ctx.models, Some(2));
        device.cmd_end_render_pass(command_buffer);
        device.end_command_buffer(command_buffer)?;

        self.core.mark_recorded(ctx.frame, ctx.version, 0);
        Ok(true)
    }
}

#[cfg(test)]
#[path = "deferred_tests.rs"]
mod tests;
