//! Forward / composite pass
//!
//! Final pass of every frame, rendering into the acquired swapchain image
//! (through a multisampled target resolved into it when MSAA is on).
//!
//! In forward mode it shades the scene geometry directly. In deferred mode it
//! draws a fullscreen triangle that composites the G-buffer. Both variants
//! read the light set; the shader variant picks how (see `forward_shaders`).
//!
//! Framebuffers exist per (frame slot, swapchain image), so the command
//! buffer of a slot is re-encoded whenever the acquired image changes.

use crate::error::Lumen3dResult;
use crate::config::RenderMode;
use crate::device::{
    AttachmentDesc, ClearValue, CompareOp, CullMode, DepthState, GraphicsPipelineDesc, ImageLayout,
    LoadOp, PipelineBindPoint, RenderPassDesc, StoreOp, VertexLayout,
};
use crate::frame::{AttachmentRole, PassKind};
use crate::pass::shaders::forward_shaders;
use crate::pass::{draw_models, FramePass, PassContext, PassCore, RecordContext};
use crate::resource::Owned;
use crate::scene::Vertex;
use crate::engine_debug;

const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

pub struct ForwardPass {
    core: PassCore,
    render_mode: RenderMode,
    image_count: usize,
    /// One clear value per render pass attachment
    clears: Vec<ClearValue>,
}

impl ForwardPass {
    pub fn disabled() -> Self {
        Self {
            core: PassCore::disabled(PassKind::Forward),
            render_mode: RenderMode::Forward,
            image_count: 0,
            clears: Vec::new(),
        }
    }

    pub fn new(ctx: &PassContext) -> Lumen3dResult<Self> {
        let device = ctx.device;
        let config = ctx.config;
        let layouts = ctx.attachments.layouts();
        let samples = config.sample_count;
        let msaa = config.msaa_enabled();
        let prepass = config.depth_prepass_enabled();
        let color_format = ctx.swapchain.format().format;
        // The composite reads depth through the G-buffer, never as an attachment
        let depth_format = match config.render_mode {
            RenderMode::Forward => ctx.attachments.depth_format(),
            RenderMode::Deferred => None,
        };
        let mut core = PassCore::disabled(PassKind::Forward);

        match config.render_mode {
            RenderMode::Forward => core.create_layout(
                device,
                &[
                    layouts.camera.handle(),
                    layouts.transform.handle(),
                    layouts.material.handle(),
                    layouts.light.handle(),
                ],
            )?,
            RenderMode::Deferred => core.create_layout(
                device,
                &[layouts.camera.handle(), layouts.light.handle(), layouts.gbuffer.handle()],
            )?,
        }

        // Attachment 0 is the color target, then depth, then the resolve target
        let mut attachments = vec![AttachmentDesc {
            format: color_format,
            samples,
            load_op: LoadOp::Clear,
            store_op: if msaa { StoreOp::DontCare } else { StoreOp::Store },
            initial_layout: ImageLayout::Undefined,
            final_layout: if msaa { ImageLayout::ColorAttachment } else { ImageLayout::PresentSrc },
        }];
        let mut clears = vec![ClearValue::Color(CLEAR_COLOR)];
        let mut depth_ref = None;
        if let Some(format) = depth_format {
            let (load_op, initial_layout, layout) = if prepass {
                (LoadOp::Load, ImageLayout::DepthStencilReadOnly, ImageLayout::DepthStencilReadOnly)
            } else {
                (LoadOp::Clear, ImageLayout::Undefined, ImageLayout::DepthStencilAttachment)
            };
            depth_ref = Some((attachments.len() as u32, layout));
            attachments.push(AttachmentDesc {
                format,
                samples,
                load_op,
                store_op: StoreOp::DontCare,
                initial_layout,
                final_layout: layout,
            });
            clears.push(ClearValue::DepthStencil { depth: 1.0, stencil: 0 });
        }
        let mut resolve_refs = Vec::new();
        if msaa {
            resolve_refs.push(attachments.len() as u32);
            attachments.push(AttachmentDesc {
                format: color_format,
                samples: 1,
                load_op: LoadOp::DontCare,
                store_op: StoreOp::Store,
                initial_layout: ImageLayout::Undefined,
                final_layout: ImageLayout::PresentSrc,
            });
            clears.push(ClearValue::Color(CLEAR_COLOR));
        }
        let render_pass = device.create_render_pass(&RenderPassDesc {
            attachments,
            color_refs: vec![0],
            resolve_refs,
            depth_ref,
        })?;
        core.set_render_pass(Owned::new(device, render_pass));

        let (vertex_name, fragment_name) = forward_shaders(config.render_mode, config.culling_mode, msaa);
        let vertex = ctx.shaders.load(device, vertex_name)?;
        let fragment = ctx.shaders.load(device, fragment_name)?;
        let (vertex_layout, cull_mode) = match config.render_mode {
            RenderMode::Forward => (Vertex::layout(), CullMode::Back),
            RenderMode::Deferred => (VertexLayout::default(), CullMode::None),
        };
        let depth = match (depth_format.is_some(), prepass) {
            (true, true) => DepthState { test: true, write: false, compare: CompareOp::LessOrEqual },
            (true, false) => DepthState { test: true, write: true, compare: CompareOp::Less },
            (false, _) => DepthState::DISABLED,
        };
        let pipeline = device.create_graphics_pipeline(&GraphicsPipelineDesc {
            layout: core.layout(),
            render_pass: core.render_pass(),
            vertex_shader: vertex.handle(),
            fragment_shader: Some(fragment.handle()),
            vertex_layout,
            samples,
            depth,
            cull_mode,
            color_attachment_count: 1,
        })?;
        core.set_pipeline(Owned::new(device, pipeline));

        let extent = ctx.swapchain.extent();
        let image_count = ctx.swapchain.image_count();
        for slot in 0..ctx.frame_count {
            for image in 0..image_count {
                let swapchain_view = ctx.swapchain.view(image);
                let mut views = Vec::with_capacity(3);
                views.push(if msaa { ctx.attachments.view(AttachmentRole::MsaaColor, slot) } else { swapchain_view });
                if depth_format.is_some() {
                    views.push(ctx.attachments.view(AttachmentRole::Depth, slot));
                }
                if msaa {
                    views.push(swapchain_view);
                }
                core.add_framebuffer(device, views, extent)?;
            }
        }
        core.allocate_command_buffers(device, ctx.frame_count)?;

        engine_debug!(
            "lumen3d::ForwardPass",
            "{:?} final pass built: {} + {}, {} framebuffers",
            config.render_mode, vertex_name, fragment_name, core.framebuffer_count()
        );
        Ok(Self { core, render_mode: config.render_mode, image_count, clears })
    }

    /// Framebuffer of (`frame`, `image`)
    pub fn framebuffer_index(&self, frame: usize, image: u32) -> usize {
        frame * self.image_count + image as usize
    }
}

impl FramePass for ForwardPass {
    fn core(&self) -> &PassCore {
        &self.core
    }

    fn record(&mut self, ctx: &RecordContext) -> Lumen3dResult<bool> {
        if !self.core.enabled() || !self.core.needs_record(ctx.frame, ctx.version, ctx.image_index) {
            return Ok(false);
        }
        let device = ctx.device;
        let layout = self.core.layout();
        let command_buffer = self.core.begin(device, ctx.frame)?;
        self.core.begin_graphics(
            device,
            command_buffer,
            self.framebuffer_index(ctx.frame, ctx.image_index),
            ctx.extent,
            &self.clears,
        );
        match self.render_mode {
            RenderMode::Forward => {
                device.cmd_bind_descriptor_sets(
                    command_buffer,
                    PipelineBindPoint::Graphics,
                    layout,
                    0,
                    &[ctx.attachments.camera_set(ctx.frame)],
                );
                device.cmd_bind_descriptor_sets(
                    command_buffer,
                    PipelineBindPoint::Graphics,
                    layout,
                    3,
                    &[ctx.attachments.light_set(ctx.frame)],
                );
                draw_models(device, command_buffer, layout, ctx.frame, ctx.models, Some(2));
            }
            RenderMode::Deferred => {
                device.cmd_bind_descriptor_sets(
                    command_buffer,
                    PipelineBindPoint::Graphics,
                    layout,
                    0,
                    &[
                        ctx.attachments.camera_set(ctx.frame),
                        ctx.attachments.light_set(ctx.frame),
                        ctx.attachments.gbuffer_set(ctx.frame),
                    ],
                );
                device.cmd_draw(command_buffer, 3, 0);
            }
        }
        device.cmd_end_render_pass(command_buffer);
        device.end_command_buffer(command_buffer)?;

        self.core.mark_recorded(ctx.frame, ctx.version, ctx.image_index);
        Ok(true)
    }
}

#[cfg(test)]
#[path = "forward_tests.rs"]
mod tests;
