//! GraphicsDevice trait - logical device, queues and object factory
//!
//! All methods take `&self`: backends keep their mutable bookkeeping
//! (allocator, handle maps) behind interior locks so one device can be
//! shared through `Arc<dyn GraphicsDevice>` by every component.
//!
//! Destroy methods accept null handles and ignore them.

use std::path::Path;
use crate::error::Lumen3dResult;
use crate::device::{
    BufferDesc, BufferHandle, ClearValue, CommandBuffer, ComputePipelineDesc, DescriptorBinding,
    DescriptorSet, DescriptorSetLayout, DescriptorWrite, Extent2D, Fence, Format, FormatFeatures,
    Framebuffer, FramebufferDesc, GraphicsPipelineDesc, ImageAspect, ImageDesc, ImageHandle,
    ImageView, IndexType, MemoryHandle, Pipeline, PipelineBindPoint, PipelineLayout,
    QueueAssignment, QueueKind, Rect2D, RenderPass, RenderPassDesc, Sampler, SamplerDesc,
    Semaphore, ShaderModule, SubmitInfo, Viewport,
};

/// Timeout used for every frame fence wait (one second)
pub const FENCE_TIMEOUT_NS: u64 = 1_000_000_000;

/// Logical graphics device
pub trait GraphicsDevice: Send + Sync {
    // ===== QUERIES =====

    /// Queue families chosen at device creation
    fn queue_assignment(&self) -> QueueAssignment;

    /// Features of `format` for optimally tiled images
    fn format_features(&self, format: Format) -> FormatFeatures;

    /// Features of `format` when used in a buffer
    fn buffer_format_features(&self, format: Format) -> FormatFeatures;

    // ===== SYNCHRONIZATION =====

    fn create_semaphore(&self) -> Lumen3dResult<Semaphore>;
    fn destroy_semaphore(&self, semaphore: Semaphore);

    fn create_fence(&self, signaled: bool) -> Lumen3dResult<Fence>;
    fn destroy_fence(&self, fence: Fence);

    /// Block until every fence is signaled
    ///
    /// Returns `Lumen3dError::FenceTimeout` if `timeout_ns` elapses first.
    fn wait_for_fences(&self, fences: &[Fence], timeout_ns: u64) -> Lumen3dResult<()>;

    fn reset_fences(&self, fences: &[Fence]) -> Lumen3dResult<()>;

    /// Block until the device has no pending work
    fn wait_idle(&self) -> Lumen3dResult<()>;

    // ===== IMAGES, BUFFERS, MEMORY =====

    /// Create an image and bind freshly allocated memory to it
    fn create_image(&self, desc: &ImageDesc) -> Lumen3dResult<(ImageHandle, MemoryHandle)>;
    fn destroy_image(&self, image: ImageHandle);

    fn create_image_view(&self, image: ImageHandle, format: Format, aspect: ImageAspect) -> Lumen3dResult<ImageView>;
    fn destroy_image_view(&self, view: ImageView);

    /// Create a buffer and bind freshly allocated memory to it
    fn create_buffer(&self, desc: &BufferDesc) -> Lumen3dResult<(BufferHandle, MemoryHandle)>;
    fn destroy_buffer(&self, buffer: BufferHandle);

    fn free_memory(&self, memory: MemoryHandle);

    /// Copy `data` into host-visible (coherent) memory at `offset`
    fn write_memory(&self, memory: MemoryHandle, offset: u64, data: &[u8]) -> Lumen3dResult<()>;

    fn create_sampler(&self, desc: &SamplerDesc) -> Lumen3dResult<Sampler>;
    fn destroy_sampler(&self, sampler: Sampler);

    // ===== DESCRIPTORS =====

    fn create_descriptor_set_layout(&self, bindings: &[DescriptorBinding]) -> Lumen3dResult<DescriptorSetLayout>;
    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayout);

    /// Allocate a set from the fixed-capacity pool and write its bindings
    ///
    /// Returns `Lumen3dError::DescriptorPoolExhausted` when the pool is full.
    fn allocate_descriptor_set(
        &self,
        layout: DescriptorSetLayout,
        writes: &[DescriptorWrite],
    ) -> Lumen3dResult<DescriptorSet>;
    fn free_descriptor_set(&self, set: DescriptorSet);

    // ===== SHADERS AND PIPELINES =====

    /// Load a pre-compiled shader binary
    ///
    /// Returns `Lumen3dError::ShaderNotFound` when the file does not exist.
    fn load_shader(&self, path: &Path) -> Lumen3dResult<ShaderModule>;
    fn destroy_shader(&self, shader: ShaderModule);

    fn create_pipeline_layout(&self, set_layouts: &[DescriptorSetLayout]) -> Lumen3dResult<PipelineLayout>;
    fn destroy_pipeline_layout(&self, layout: PipelineLayout);

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Lumen3dResult<RenderPass>;
    fn destroy_render_pass(&self, render_pass: RenderPass);

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Lumen3dResult<Framebuffer>;
    fn destroy_framebuffer(&self, framebuffer: Framebuffer);

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Lumen3dResult<Pipeline>;
    fn create_compute_pipeline(&self, desc: &ComputePipelineDesc) -> Lumen3dResult<Pipeline>;
    fn destroy_pipeline(&self, pipeline: Pipeline);

    // ===== COMMAND BUFFERS =====

    /// Allocate a primary command buffer from the pool of `queue`'s family
    fn allocate_command_buffer(&self, queue: QueueKind) -> Lumen3dResult<CommandBuffer>;
    fn free_command_buffer(&self, command_buffer: CommandBuffer);

    fn reset_command_buffer(&self, command_buffer: CommandBuffer) -> Lumen3dResult<()>;
    fn begin_command_buffer(&self, command_buffer: CommandBuffer) -> Lumen3dResult<()>;
    fn end_command_buffer(&self, command_buffer: CommandBuffer) -> Lumen3dResult<()>;

    // ===== COMMAND ENCODING =====

    fn cmd_begin_render_pass(
        &self,
        command_buffer: CommandBuffer,
        render_pass: RenderPass,
        framebuffer: Framebuffer,
        extent: Extent2D,
        clear_values: &[ClearValue],
    );
    fn cmd_end_render_pass(&self, command_buffer: CommandBuffer);

    fn cmd_bind_pipeline(&self, command_buffer: CommandBuffer, bind_point: PipelineBindPoint, pipeline: Pipeline);
    fn cmd_set_viewport(&self, command_buffer: CommandBuffer, viewport: Viewport);
    fn cmd_set_scissor(&self, command_buffer: CommandBuffer, scissor: Rect2D);

    fn cmd_bind_descriptor_sets(
        &self,
        command_buffer: CommandBuffer,
        bind_point: PipelineBindPoint,
        layout: PipelineLayout,
        first_set: u32,
        sets: &[DescriptorSet],
    );

    fn cmd_bind_vertex_buffer(&self, command_buffer: CommandBuffer, buffer: BufferHandle, offset: u64);
    fn cmd_bind_index_buffer(&self, command_buffer: CommandBuffer, buffer: BufferHandle, offset: u64, index_type: IndexType);

    fn cmd_draw(&self, command_buffer: CommandBuffer, vertex_count: u32, first_vertex: u32);
    fn cmd_draw_indexed(&self, command_buffer: CommandBuffer, index_count: u32, first_index: u32, vertex_offset: i32);
    fn cmd_dispatch(&self, command_buffer: CommandBuffer, x: u32, y: u32, z: u32);

    // ===== SUBMISSION =====

    fn queue_submit(&self, queue: QueueKind, submit: &SubmitInfo) -> Lumen3dResult<()>;
}
