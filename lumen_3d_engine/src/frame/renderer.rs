//! Frame orchestrator
//!
//! `Renderer` owns the swapchain, the attachment set, the synchronization
//! table and the four passes. Its two entry points are `recreate()`, which
//! rebuilds the whole topology for a configuration and an extent, and
//! `draw()`, which renders and presents one frame.
//!
//! # Frame loop
//!
//! 1. wait for the in-flight fence of the current slot
//! 2. acquire a swapchain image (out of date: recreate, abandon the frame)
//! 3. upload camera, transforms and lights into the slot's host-visible memory
//! 4. record the enabled passes (skipped when already up to date)
//! 5. reset the fence, submit the passes in `PassKind::ORDER`
//! 6. present, then advance the slot
//!
//! # Example
//!
//! ```ignore
//! let mut renderer = Renderer::new(device, surface, "shaders", settings.configuration(), camera, 1280, 720)?;
//! loop {
//!     let input = FrameInput { camera: &camera, models: &models, lights: &lights, scene_version };
//!     renderer.draw(&input)?;
//! }
//! ```

use std::path::PathBuf;
use glam::Mat4;
use std::sync::Arc;
use crate::error::Lumen3dResult;
use crate::config::{Configuration, CullingMode};
use crate::device::{
    AcquireOutcome, Extent2D, GraphicsDevice, PresentOutcome, PresentationSurface, FENCE_TIMEOUT_NS,
};
use crate::frame::{AttachmentSet, ClusterGrid, FrameSync, PassKind, PassTopology, SetLayouts, SyncKind};
use crate::pass::{
    CullingPass, DeferredPass, DepthPass, ForwardPass, FramePass, PassContext, RecordContext, ShaderLibrary,
};
use crate::scene::{clamp_lights, Camera, FrameInput, TransformUniform};
use crate::swapchain::Swapchain;
use crate::{engine_debug, engine_error, engine_info, engine_warn};

/// What `draw()` did with the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Rendered and presented; the frame slot advanced
    Presented,
    /// The swapchain was stale or out of date and has been rebuilt; nothing
    /// was rendered
    SwapchainRecreated,
    /// Rendered, but present reported a stale swapchain; the next `draw()`
    /// rebuilds it
    PresentSkipped,
}

/// Field order is drop order: passes first (they reference attachments and
/// swapchain views), then attachments, sync objects and the swapchain.
pub struct Renderer {
    forward: ForwardPass,
    culling: CullingPass,
    deferred: DeferredPass,
    depth: DepthPass,
    attachments: AttachmentSet,
    sync: FrameSync,
    swapchain: Swapchain,
    shaders: ShaderLibrary,
    device: Arc<dyn GraphicsDevice>,
    config: Configuration,
    frame_count: usize,
    frame_index: usize,
    grid: ClusterGrid,
    /// Bumped on every recreate and scene change; passes re-encode when it moves
    generation: u64,
    scene_version: Option<u64>,
    /// Last camera drawn, reused to seed the frustum dispatch on recreate
    camera: Camera,
    /// Projection the frustum buffer was computed from (`None` without culling)
    frustum_projection: Option<Mat4>,
    swapchain_stale: bool,
    requested_extent: Extent2D,
}

impl Renderer {
    /// Build every object `config` needs at `width` x `height`
    ///
    /// `camera` seeds the light-culling frusta until the first `draw()`.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        surface: Box<dyn PresentationSurface>,
        shader_root: impl Into<PathBuf>,
        config: Configuration,
        camera: Camera,
        width: u32,
        height: u32,
    ) -> Lumen3dResult<Self> {
        let swapchain = Swapchain::new(device.clone(), surface);
        let attachments = AttachmentSet::new(&device)?;
        let mut renderer = Self {
            forward: ForwardPass::disabled(),
            culling: CullingPass::disabled(),
            deferred: DeferredPass::disabled(),
            depth: DepthPass::disabled(),
            attachments,
            sync: FrameSync::new(),
            swapchain,
            shaders: ShaderLibrary::new(shader_root),
            device,
            config,
            frame_count: 0,
            frame_index: 0,
            grid: ClusterGrid::new(CullingMode::Disabled, Extent2D::new(width, height)),
            generation: 0,
            scene_version: None,
            camera,
            frustum_projection: None,
            swapchain_stale: false,
            requested_extent: Extent2D::new(width, height),
        };
        renderer.recreate(&config, width, height)?;
        Ok(renderer)
    }

    // ===== RECONFIGURATION =====

    /// Rebuild the topology for `config` at `width` x `height`
    ///
    /// Waits for every in-flight frame first. Synchronization primitives
    /// that stay needed in a slot that stays live keep their handles.
    pub fn recreate(&mut self, config: &Configuration, width: u32, height: u32) -> Lumen3dResult<()> {
        if self.forward.enabled() {
            let fences = self.sync.fences(self.frame_count);
            self.device.wait_for_fences(&fences, FENCE_TIMEOUT_NS).map_err(|err| {
                engine_error!("lumen3d::Renderer", "In-flight frames did not complete before recreate: {}", err);
                err
            })?;
        }

        // Passes hold framebuffers over the views about to be replaced
        self.forward = ForwardPass::disabled();
        self.culling = CullingPass::disabled();
        self.deferred = DeferredPass::disabled();
        self.depth = DepthPass::disabled();

        let normalized = config.with_culling_depth();
        if normalized != *config {
            engine_warn!(
                "lumen3d::Renderer",
                "Tiled culling needs a depth buffer before shading, enabling depth (prepass {})",
                normalized.depth_prepass_enabled()
            );
        }
        let config = self.swapchain.recreate(&normalized, width, height)?;
        let frame_count = config.frame_count();
        let extent = self.swapchain.extent();
        let grid = ClusterGrid::new(config.culling_mode, extent);

        self.attachments.recreate(
            &self.device,
            &config,
            frame_count,
            extent,
            self.swapchain.format().format,
            grid,
        )?;

        let old = (self.frame_count > 0).then_some((&self.config, self.frame_count));
        self.sync.apply(&self.device, old, &config, frame_count)?;

        // Inputs of the one-time frustum dispatch
        self.attachments.write_camera(0, &self.camera.uniform(extent))?;
        if config.culling_enabled() {
            self.attachments.write_lights(0, grid, &[])?;
        }

        let ctx = PassContext {
            device: &self.device,
            config: &config,
            frame_count,
            attachments: &self.attachments,
            swapchain: &self.swapchain,
            shaders: &self.shaders,
            grid,
        };
        let depth = if config.depth_prepass_enabled() { DepthPass::new(&ctx)? } else { DepthPass::disabled() };
        let deferred = if config.deferred_enabled() { DeferredPass::new(&ctx)? } else { DeferredPass::disabled() };
        let culling = if config.culling_enabled() { CullingPass::new(&ctx)? } else { CullingPass::disabled() };
        let forward = ForwardPass::new(&ctx)?;
        self.depth = depth;
        self.deferred = deferred;
        self.culling = culling;
        self.forward = forward;

        if frame_count != self.frame_count && self.frame_count > 0 {
            engine_info!("lumen3d::Renderer", "Frame slots {} -> {}", self.frame_count, frame_count);
        }
        self.config = config;
        self.frame_count = frame_count;
        self.frame_index = 0;
        self.grid = grid;
        self.frustum_projection = config.culling_enabled().then(|| self.camera.projection());
        self.generation += 1;
        self.swapchain_stale = false;
        self.requested_extent = Extent2D::new(width, height);

        engine_info!(
            "lumen3d::Renderer",
            "Recreated at {}x{}: {:?} {:?} culling, depth {:?} (prepass {}), {}x MSAA, {} frames",
            extent.width, extent.height, config.render_mode, config.culling_mode, config.depth_mode,
            config.depth_prepass_enabled(), config.sample_count, frame_count
        );
        Ok(())
    }

    /// Recreate with the current configuration at a new window size
    pub fn resize(&mut self, width: u32, height: u32) -> Lumen3dResult<()> {
        let config = self.config;
        self.recreate(&config, width, height)
    }

    fn recreate_current(&mut self) -> Lumen3dResult<()> {
        let extent = self.requested_extent;
        self.resize(extent.width, extent.height)
    }

    // ===== FRAME =====

    /// Render and present one frame
    pub fn draw(&mut self, input: &FrameInput) -> Lumen3dResult<FrameOutcome> {
        if self.swapchain_stale {
            engine_debug!("lumen3d::Renderer", "Stale swapchain, recreating before acquire");
            self.recreate_current()?;
            return Ok(FrameOutcome::SwapchainRecreated);
        }

        let frame = self.frame_index;
        let fence = self.sync.fence(frame);
        self.device.wait_for_fences(&[fence], FENCE_TIMEOUT_NS).map_err(|err| {
            engine_error!("lumen3d::Renderer", "Frame slot {} fence wait failed: {}", frame, err);
            err
        })?;

        let image_index = match self.swapchain.acquire(self.sync.semaphore(SyncKind::ImageReady, frame))? {
            AcquireOutcome::OutOfDate => {
                engine_debug!("lumen3d::Renderer", "Swapchain out of date on acquire");
                self.recreate_current()?;
                return Ok(FrameOutcome::SwapchainRecreated);
            }
            AcquireOutcome::Image { index, suboptimal } => {
                if suboptimal {
                    self.swapchain_stale = true;
                }
                index
            }
        };

        if self.scene_version != Some(input.scene_version) {
            self.scene_version = Some(input.scene_version);
            self.generation += 1;
        }

        // Uploads into this slot's host-coherent memory
        let extent = self.swapchain.extent();
        self.camera = *input.camera;
        self.attachments.write_camera(frame, &input.camera.uniform(extent))?;
        for model in input.models {
            let binding = model.transform_binding(frame);
            let transform = TransformUniform::new(model.world_matrix());
            self.device.write_memory(binding.memory, binding.offset, bytemuck::bytes_of(&transform))?;
        }
        self.attachments.write_lights(frame, self.grid, clamp_lights(input.lights))?;
        self.refresh_frusta(frame, input.camera)?;

        let topology = self.topology();
        let ctx = RecordContext {
            device: self.device.as_ref(),
            frame,
            version: self.generation,
            image_index,
            extent,
            attachments: &self.attachments,
            models: input.models,
        };
        let mut passes: [&mut dyn FramePass; 4] =
            [&mut self.depth, &mut self.deferred, &mut self.culling, &mut self.forward];
        for pass in passes.iter_mut() {
            pass.record(&ctx)?;
        }

        self.device.reset_fences(&[fence])?;
        for pass in passes.iter() {
            pass.submit(self.device.as_ref(), frame, &self.sync, &topology)?;
        }

        let frame_ready = self.sync.semaphore(SyncKind::FrameReady, frame);
        match self.swapchain.present(image_index, &[frame_ready])? {
            PresentOutcome::Presented => {}
            outcome => {
                engine_debug!("lumen3d::Renderer", "Present returned {:?}, swapchain marked stale", outcome);
                self.swapchain_stale = true;
                return Ok(FrameOutcome::PresentSkipped);
            }
        }

        self.frame_index = (frame + 1) % self.frame_count;
        Ok(FrameOutcome::Presented)
    }

    /// Recompute the shared frustum buffer when the projection moved
    ///
    /// Reads the camera and light sets of `frame`, already uploaded. Every
    /// other slot may still be reading the old frusta, so all in-flight
    /// frames are waited for first.
    fn refresh_frusta(&mut self, frame: usize, camera: &Camera) -> Lumen3dResult<()> {
        let projection = camera.projection();
        match self.frustum_projection {
            Some(current) if current != projection => {}
            _ => return Ok(()),
        }
        let fences = self.sync.fences(self.frame_count);
        self.device.wait_for_fences(&fences, FENCE_TIMEOUT_NS)?;
        self.culling.compute_frusta(&self.device, &self.shaders, &self.attachments, frame)?;
        self.frustum_projection = Some(projection);
        engine_debug!("lumen3d::Renderer", "Projection changed, frusta recomputed from slot {}", frame);
        Ok(())
    }

    // ===== ACCESSORS =====

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn grid(&self) -> ClusterGrid {
        self.grid
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pass(&self, kind: PassKind) -> &dyn FramePass {
        match kind {
            PassKind::Depth => &self.depth,
            PassKind::Deferred => &self.deferred,
            PassKind::Culling => &self.culling,
            PassKind::Forward => &self.forward,
        }
    }

    /// Which passes run, as the submissions see it
    pub fn topology(&self) -> PassTopology {
        PassTopology {
            depth: self.depth.enabled(),
            deferred: self.deferred.enabled(),
            culling: if self.culling.enabled() { self.config.culling_mode } else { CullingMode::Disabled },
        }
    }

    pub fn sync(&self) -> &FrameSync {
        &self.sync
    }

    pub fn attachments(&self) -> &AttachmentSet {
        &self.attachments
    }

    /// Layouts external builders use for transform and material sets
    pub fn set_layouts(&self) -> &SetLayouts {
        self.attachments.layouts()
    }

    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(err) = self.device.wait_idle() {
            engine_error!("lumen3d::Renderer", "wait_idle failed on drop: {}", err);
        }
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
