//! Mock GraphicsDevice for unit tests (no GPU required)
//!
//! Hands out unique non-null handles, tracks which objects are alive, records
//! every command encoded into each command buffer as a string, and keeps the
//! submissions and host memory writes so tests can assert on them.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Lumen3dError, Lumen3dResult};
use crate::device::{
    BufferDesc, BufferHandle, ClearValue, CommandBuffer, ComputePipelineDesc, DescriptorBinding,
    DescriptorSet, DescriptorSetLayout, DescriptorWrite, Extent2D, Fence, Format, FormatFeatures,
    Framebuffer, FramebufferDesc, GraphicsDevice, GraphicsPipelineDesc, ImageAspect, ImageDesc,
    ImageHandle, ImageView, IndexType, MemoryHandle, Pipeline, PipelineBindPoint, PipelineLayout,
    QueueAssignment, QueueKind, QueueSlot, Rect2D, RenderPass, RenderPassDesc, Sampler,
    SamplerDesc, Semaphore, ShaderModule, SubmitInfo, Viewport,
};
use crate::engine_bail;

// ============================================================================
// Object bookkeeping
// ============================================================================

/// Kind of a live mock object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockObjectKind {
    Semaphore,
    Fence,
    Image,
    ImageView,
    Buffer,
    Memory,
    Sampler,
    DescriptorSetLayout,
    DescriptorSet,
    Shader,
    PipelineLayout,
    RenderPass,
    Framebuffer,
    Pipeline,
    CommandBuffer,
}

/// One queue submission as seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockSubmission {
    pub queue: QueueKind,
    pub info: SubmitInfo,
}

#[derive(Default)]
struct MockDeviceState {
    live: FxHashMap<u64, MockObjectKind>,
    /// "create <kind> <handle>" / "destroy <kind> <handle>" in call order
    events: Vec<String>,
    /// Destroys of unknown or already destroyed handles
    misuse: Vec<String>,
    commands: FxHashMap<u64, Vec<String>>,
    begin_counts: FxHashMap<u64, usize>,
    command_buffer_queues: FxHashMap<u64, QueueKind>,
    submissions: Vec<MockSubmission>,
    memory: FxHashMap<u64, Vec<u8>>,
    image_descs: FxHashMap<u64, ImageDesc>,
    buffer_descs: FxHashMap<u64, BufferDesc>,
    render_passes: FxHashMap<u64, RenderPassDesc>,
    framebuffers: FxHashMap<u64, FramebufferDesc>,
    pipeline_layouts: FxHashMap<u64, Vec<DescriptorSetLayout>>,
    descriptor_writes: FxHashMap<u64, Vec<DescriptorWrite>>,
    graphics_pipelines: FxHashMap<u64, GraphicsPipelineDesc>,
    shaders: FxHashMap<u64, PathBuf>,
    fence_waits: Vec<Vec<Fence>>,
    fence_resets: Vec<Vec<Fence>>,
    missing_shaders: FxHashSet<String>,
    unsupported_formats: FxHashSet<Format>,
    descriptor_capacity: Option<usize>,
    fence_timeout: bool,
    idle_waits: usize,
}

/// Mock device that tracks created objects without a GPU
pub struct MockGraphicsDevice {
    next_handle: AtomicU64,
    queues: QueueAssignment,
    state: Mutex<MockDeviceState>,
}

impl MockGraphicsDevice {
    /// Mock device with a single universal queue family
    pub fn new() -> Self {
        let slot = QueueSlot { family: 0, index: 0 };
        Self::with_queues(QueueAssignment { graphics: slot, compute: slot, present: slot })
    }

    pub fn with_queues(queues: QueueAssignment) -> Self {
        Self {
            next_handle: AtomicU64::new(1),
            queues,
            state: Mutex::new(MockDeviceState::default()),
        }
    }

    fn next(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    fn create(&self, kind: MockObjectKind) -> u64 {
        let handle = self.next();
        let mut state = self.state.lock().unwrap();
        state.live.insert(handle, kind);
        state.events.push(format!("create {:?} {}", kind, handle));
        handle
    }

    fn destroy(&self, kind: MockObjectKind, handle: u64) {
        if handle == 0 {
            return;
        }
        let mut state = self.state.lock().unwrap();
        match state.live.remove(&handle) {
            Some(live_kind) if live_kind == kind => {
                state.events.push(format!("destroy {:?} {}", kind, handle));
                state.commands.remove(&handle);
                state.memory.remove(&handle);
            }
            Some(live_kind) => {
                state.live.insert(handle, live_kind);
                state.misuse.push(format!("destroy {:?} {} (is {:?})", kind, handle, live_kind));
            }
            None => state.misuse.push(format!("destroy {:?} {} (not live)", kind, handle)),
        }
    }

    fn record(&self, command_buffer: CommandBuffer, command: String) {
        let mut state = self.state.lock().unwrap();
        state.commands.entry(command_buffer.0).or_default().push(command);
    }

    // ===== CONFIGURATION =====

    /// Make `load_shader` fail for any path ending with `file_name`
    pub fn set_missing_shader(&self, file_name: &str) {
        self.state.lock().unwrap().missing_shaders.insert(file_name.to_string());
    }

    /// Report no features at all for `format`
    pub fn set_unsupported_format(&self, format: Format) {
        self.state.lock().unwrap().unsupported_formats.insert(format);
    }

    /// Limit the number of simultaneously allocated descriptor sets
    pub fn set_descriptor_capacity(&self, capacity: usize) {
        self.state.lock().unwrap().descriptor_capacity = Some(capacity);
    }

    /// Make every subsequent fence wait time out
    pub fn set_fence_timeout(&self, timeout: bool) {
        self.state.lock().unwrap().fence_timeout = timeout;
    }

    // ===== INSPECTION =====

    pub fn is_live(&self, handle: u64) -> bool {
        self.state.lock().unwrap().live.contains_key(&handle)
    }

    pub fn live_count(&self, kind: MockObjectKind) -> usize {
        self.state.lock().unwrap().live.values().filter(|k| **k == kind).count()
    }

    pub fn total_live(&self) -> usize {
        self.state.lock().unwrap().live.len()
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.lock().unwrap().events.clear();
    }

    pub fn misuse(&self) -> Vec<String> {
        self.state.lock().unwrap().misuse.clone()
    }

    /// Position of an event in the event log
    pub fn event_position(&self, event: &str) -> Option<usize> {
        self.state.lock().unwrap().events.iter().position(|e| e == event)
    }

    pub fn commands(&self, command_buffer: CommandBuffer) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .commands
            .get(&command_buffer.0)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of times recording was started on `command_buffer`
    pub fn begin_count(&self, command_buffer: CommandBuffer) -> usize {
        self.state.lock().unwrap().begin_counts.get(&command_buffer.0).copied().unwrap_or(0)
    }

    pub fn command_buffer_queue(&self, command_buffer: CommandBuffer) -> Option<QueueKind> {
        self.state.lock().unwrap().command_buffer_queues.get(&command_buffer.0).copied()
    }

    pub fn submissions(&self) -> Vec<MockSubmission> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn clear_submissions(&self) {
        self.state.lock().unwrap().submissions.clear();
    }

    pub fn memory_contents(&self, memory: MemoryHandle) -> Vec<u8> {
        self.state.lock().unwrap().memory.get(&memory.0).cloned().unwrap_or_default()
    }

    pub fn image_desc(&self, image: ImageHandle) -> Option<ImageDesc> {
        self.state.lock().unwrap().image_descs.get(&image.0).cloned()
    }

    pub fn buffer_desc(&self, buffer: BufferHandle) -> Option<BufferDesc> {
        self.state.lock().unwrap().buffer_descs.get(&buffer.0).cloned()
    }

    pub fn render_pass_desc(&self, render_pass: RenderPass) -> Option<RenderPassDesc> {
        self.state.lock().unwrap().render_passes.get(&render_pass.0).cloned()
    }

    pub fn framebuffer_desc(&self, framebuffer: Framebuffer) -> Option<FramebufferDesc> {
        self.state.lock().unwrap().framebuffers.get(&framebuffer.0).cloned()
    }

    pub fn pipeline_layout_sets(&self, layout: PipelineLayout) -> Option<Vec<DescriptorSetLayout>> {
        self.state.lock().unwrap().pipeline_layouts.get(&layout.0).cloned()
    }

    pub fn descriptor_writes(&self, set: DescriptorSet) -> Option<Vec<DescriptorWrite>> {
        self.state.lock().unwrap().descriptor_writes.get(&set.0).cloned()
    }

    pub fn graphics_pipeline_desc(&self, pipeline: Pipeline) -> Option<GraphicsPipelineDesc> {
        self.state.lock().unwrap().graphics_pipelines.get(&pipeline.0).cloned()
    }

    /// File names of the shaders currently loaded
    pub fn loaded_shaders(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut names: Vec<String> = state
            .shaders
            .values()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        names
    }

    pub fn fence_waits(&self) -> Vec<Vec<Fence>> {
        self.state.lock().unwrap().fence_waits.clone()
    }

    pub fn fence_resets(&self) -> Vec<Vec<Fence>> {
        self.state.lock().unwrap().fence_resets.clone()
    }

    pub fn idle_waits(&self) -> usize {
        self.state.lock().unwrap().idle_waits
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn queue_assignment(&self) -> QueueAssignment {
        self.queues
    }

    fn format_features(&self, format: Format) -> FormatFeatures {
        if self.state.lock().unwrap().unsupported_formats.contains(&format) {
            FormatFeatures::empty()
        } else {
            FormatFeatures::all()
        }
    }

    fn buffer_format_features(&self, format: Format) -> FormatFeatures {
        self.format_features(format)
    }

    fn create_semaphore(&self) -> Lumen3dResult<Semaphore> {
        Ok(Semaphore(self.create(MockObjectKind::Semaphore)))
    }

    fn destroy_semaphore(&self, semaphore: Semaphore) {
        self.destroy(MockObjectKind::Semaphore, semaphore.0);
    }

    fn create_fence(&self, _signaled: bool) -> Lumen3dResult<Fence> {
        Ok(Fence(self.create(MockObjectKind::Fence)))
    }

    fn destroy_fence(&self, fence: Fence) {
        self.destroy(MockObjectKind::Fence, fence.0);
    }

    fn wait_for_fences(&self, fences: &[Fence], _timeout_ns: u64) -> Lumen3dResult<()> {
        let mut state = self.state.lock().unwrap();
        state.fence_waits.push(fences.to_vec());
        if state.fence_timeout {
            return Err(Lumen3dError::FenceTimeout);
        }
        Ok(())
    }

    fn reset_fences(&self, fences: &[Fence]) -> Lumen3dResult<()> {
        self.state.lock().unwrap().fence_resets.push(fences.to_vec());
        Ok(())
    }

    fn wait_idle(&self) -> Lumen3dResult<()> {
        self.state.lock().unwrap().idle_waits += 1;
        Ok(())
    }

    fn create_image(&self, desc: &ImageDesc) -> Lumen3dResult<(ImageHandle, MemoryHandle)> {
        if desc.extent.width == 0 || desc.extent.height == 0 {
            engine_bail!("lumen3d::mock", "create_image: zero extent {:?}", desc.extent);
        }
        let image = self.create(MockObjectKind::Image);
        let memory = self.create(MockObjectKind::Memory);
        self.state.lock().unwrap().image_descs.insert(image, desc.clone());
        Ok((ImageHandle(image), MemoryHandle(memory)))
    }

    fn destroy_image(&self, image: ImageHandle) {
        self.destroy(MockObjectKind::Image, image.0);
    }

    fn create_image_view(&self, image: ImageHandle, _format: Format, _aspect: ImageAspect) -> Lumen3dResult<ImageView> {
        if image.is_null() {
            return Err(Lumen3dError::InvalidResource("create_image_view: null image".to_string()));
        }
        Ok(ImageView(self.create(MockObjectKind::ImageView)))
    }

    fn destroy_image_view(&self, view: ImageView) {
        self.destroy(MockObjectKind::ImageView, view.0);
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Lumen3dResult<(BufferHandle, MemoryHandle)> {
        if desc.size == 0 {
            engine_bail!("lumen3d::mock", "create_buffer: zero size");
        }
        let buffer = self.create(MockObjectKind::Buffer);
        let memory = self.create(MockObjectKind::Memory);
        self.state.lock().unwrap().buffer_descs.insert(buffer, desc.clone());
        Ok((BufferHandle(buffer), MemoryHandle(memory)))
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        self.destroy(MockObjectKind::Buffer, buffer.0);
    }

    fn free_memory(&self, memory: MemoryHandle) {
        self.destroy(MockObjectKind::Memory, memory.0);
    }

    fn write_memory(&self, memory: MemoryHandle, offset: u64, data: &[u8]) -> Lumen3dResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.live.get(&memory.0) != Some(&MockObjectKind::Memory) {
            return Err(Lumen3dError::InvalidResource(format!("write_memory: {:?} is not live", memory)));
        }
        let bytes = state.memory.entry(memory.0).or_default();
        let end = offset as usize + data.len();
        if bytes.len() < end {
            bytes.resize(end, 0);
        }
        bytes[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn create_sampler(&self, _desc: &SamplerDesc) -> Lumen3dResult<Sampler> {
        Ok(Sampler(self.create(MockObjectKind::Sampler)))
    }

    fn destroy_sampler(&self, sampler: Sampler) {
        self.destroy(MockObjectKind::Sampler, sampler.0);
    }

    fn create_descriptor_set_layout(&self, _bindings: &[DescriptorBinding]) -> Lumen3dResult<DescriptorSetLayout> {
        Ok(DescriptorSetLayout(self.create(MockObjectKind::DescriptorSetLayout)))
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayout) {
        self.destroy(MockObjectKind::DescriptorSetLayout, layout.0);
    }

    fn allocate_descriptor_set(
        &self,
        layout: DescriptorSetLayout,
        writes: &[DescriptorWrite],
    ) -> Lumen3dResult<DescriptorSet> {
        if layout.is_null() {
            return Err(Lumen3dError::InvalidResource("allocate_descriptor_set: null layout".to_string()));
        }
        let capacity = self.state.lock().unwrap().descriptor_capacity;
        if let Some(capacity) = capacity {
            if self.live_count(MockObjectKind::DescriptorSet) >= capacity {
                return Err(Lumen3dError::DescriptorPoolExhausted);
            }
        }
        let set = self.create(MockObjectKind::DescriptorSet);
        self.state.lock().unwrap().descriptor_writes.insert(set, writes.to_vec());
        Ok(DescriptorSet(set))
    }

    fn free_descriptor_set(&self, set: DescriptorSet) {
        self.destroy(MockObjectKind::DescriptorSet, set.0);
    }

    fn load_shader(&self, path: &Path) -> Lumen3dResult<ShaderModule> {
        let missing = {
            let state = self.state.lock().unwrap();
            state.missing_shaders.iter().any(|name| path.ends_with(name))
        };
        if missing {
            return Err(Lumen3dError::ShaderNotFound(path.display().to_string()));
        }
        let shader = self.create(MockObjectKind::Shader);
        self.state.lock().unwrap().shaders.insert(shader, path.to_path_buf());
        Ok(ShaderModule(shader))
    }

    fn destroy_shader(&self, shader: ShaderModule) {
        self.state.lock().unwrap().shaders.remove(&shader.0);
        self.destroy(MockObjectKind::Shader, shader.0);
    }

    fn create_pipeline_layout(&self, set_layouts: &[DescriptorSetLayout]) -> Lumen3dResult<PipelineLayout> {
        let layout = self.create(MockObjectKind::PipelineLayout);
        self.state.lock().unwrap().pipeline_layouts.insert(layout, set_layouts.to_vec());
        Ok(PipelineLayout(layout))
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayout) {
        self.destroy(MockObjectKind::PipelineLayout, layout.0);
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Lumen3dResult<RenderPass> {
        let render_pass = self.create(MockObjectKind::RenderPass);
        self.state.lock().unwrap().render_passes.insert(render_pass, desc.clone());
        Ok(RenderPass(render_pass))
    }

    fn destroy_render_pass(&self, render_pass: RenderPass) {
        self.destroy(MockObjectKind::RenderPass, render_pass.0);
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Lumen3dResult<Framebuffer> {
        if desc.attachments.iter().any(|view| view.is_null()) {
            engine_bail!("lumen3d::mock", "create_framebuffer: null attachment in {:?}", desc.attachments);
        }
        if !self.is_live(desc.render_pass.0) {
            engine_bail!("lumen3d::mock", "create_framebuffer: render pass {:?} is not live", desc.render_pass);
        }
        let framebuffer = self.create(MockObjectKind::Framebuffer);
        self.state.lock().unwrap().framebuffers.insert(framebuffer, desc.clone());
        Ok(Framebuffer(framebuffer))
    }

    fn destroy_framebuffer(&self, framebuffer: Framebuffer) {
        self.destroy(MockObjectKind::Framebuffer, framebuffer.0);
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Lumen3dResult<Pipeline> {
        let pipeline = self.create(MockObjectKind::Pipeline);
        self.state.lock().unwrap().graphics_pipelines.insert(pipeline, desc.clone());
        Ok(Pipeline(pipeline))
    }

    fn create_compute_pipeline(&self, _desc: &ComputePipelineDesc) -> Lumen3dResult<Pipeline> {
        Ok(Pipeline(self.create(MockObjectKind::Pipeline)))
    }

    fn destroy_pipeline(&self, pipeline: Pipeline) {
        self.destroy(MockObjectKind::Pipeline, pipeline.0);
    }

    fn allocate_command_buffer(&self, queue: QueueKind) -> Lumen3dResult<CommandBuffer> {
        let command_buffer = self.create(MockObjectKind::CommandBuffer);
        self.state.lock().unwrap().command_buffer_queues.insert(command_buffer, queue);
        Ok(CommandBuffer(command_buffer))
    }

    fn free_command_buffer(&self, command_buffer: CommandBuffer) {
        self.destroy(MockObjectKind::CommandBuffer, command_buffer.0);
    }

    fn reset_command_buffer(&self, command_buffer: CommandBuffer) -> Lumen3dResult<()> {
        self.state.lock().unwrap().commands.remove(&command_buffer.0);
        Ok(())
    }

    fn begin_command_buffer(&self, command_buffer: CommandBuffer) -> Lumen3dResult<()> {
        *self.state.lock().unwrap().begin_counts.entry(command_buffer.0).or_default() += 1;
        self.record(command_buffer, "begin".to_string());
        Ok(())
    }

    fn end_command_buffer(&self, command_buffer: CommandBuffer) -> Lumen3dResult<()> {
        self.record(command_buffer, "end".to_string());
        Ok(())
    }

    fn cmd_begin_render_pass(
        &self,
        command_buffer: CommandBuffer,
        render_pass: RenderPass,
        framebuffer: Framebuffer,
        extent: Extent2D,
        clear_values: &[ClearValue],
    ) {
        self.record(
            command_buffer,
            format!(
                "begin_render_pass {} {} {}x{} clears={}",
                render_pass.0, framebuffer.0, extent.width, extent.height, clear_values.len()
            ),
        );
    }

    fn cmd_end_render_pass(&self, command_buffer: CommandBuffer) {
        self.record(command_buffer, "end_render_pass".to_string());
    }

    fn cmd_bind_pipeline(&self, command_buffer: CommandBuffer, bind_point: PipelineBindPoint, pipeline: Pipeline) {
        self.record(command_buffer, format!("bind_pipeline {:?} {}", bind_point, pipeline.0));
    }

    fn cmd_set_viewport(&self, command_buffer: CommandBuffer, viewport: Viewport) {
        self.record(command_buffer, format!("set_viewport {}x{}", viewport.width, viewport.height));
    }

    fn cmd_set_scissor(&self, command_buffer: CommandBuffer, scissor: Rect2D) {
        self.record(command_buffer, format!("set_scissor {}x{}", scissor.width, scissor.height));
    }

    fn cmd_bind_descriptor_sets(
        &self,
        command_buffer: CommandBuffer,
        bind_point: PipelineBindPoint,
        _layout: PipelineLayout,
        first_set: u32,
        sets: &[DescriptorSet],
    ) {
        let raw: Vec<u64> = sets.iter().map(|s| s.0).collect();
        self.record(
            command_buffer,
            format!("bind_descriptor_sets {:?} first={} {:?}", bind_point, first_set, raw),
        );
    }

    fn cmd_bind_vertex_buffer(&self, command_buffer: CommandBuffer, buffer: BufferHandle, offset: u64) {
        self.record(command_buffer, format!("bind_vertex_buffer {} {}", buffer.0, offset));
    }

    fn cmd_bind_index_buffer(&self, command_buffer: CommandBuffer, buffer: BufferHandle, offset: u64, index_type: IndexType) {
        self.record(command_buffer, format!("bind_index_buffer {} {} {:?}", buffer.0, offset, index_type));
    }

    fn cmd_draw(&self, command_buffer: CommandBuffer, vertex_count: u32, first_vertex: u32) {
        self.record(command_buffer, format!("draw {} {}", vertex_count, first_vertex));
    }

    fn cmd_draw_indexed(&self, command_buffer: CommandBuffer, index_count: u32, first_index: u32, vertex_offset: i32) {
        self.record(command_buffer, format!("draw_indexed {} {} {}", index_count, first_index, vertex_offset));
    }

    fn cmd_dispatch(&self, command_buffer: CommandBuffer, x: u32, y: u32, z: u32) {
        self.record(command_buffer, format!("dispatch {} {} {}", x, y, z));
    }

    fn queue_submit(&self, queue: QueueKind, submit: &SubmitInfo) -> Lumen3dResult<()> {
        for command_buffer in &submit.command_buffers {
            if command_buffer.is_null() || !self.is_live(command_buffer.0) {
                engine_bail!("lumen3d::mock", "queue_submit: {:?} is not live", command_buffer);
            }
        }
        for wait in &submit.waits {
            if wait.semaphore.is_null() || wait.stage.is_empty() {
                engine_bail!("lumen3d::mock", "queue_submit: invalid wait {:?}", wait);
            }
        }
        self.state.lock().unwrap().submissions.push(MockSubmission {
            queue,
            info: submit.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
