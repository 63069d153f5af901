//! Render configuration snapshot
//!
//! A `Configuration` fully determines which passes run, which attachments
//! exist and which synchronization primitives are allocated. It is never
//! mutated in place: `Renderer::recreate` diffs the previous value against
//! the new one.

/// Shading path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Single lighting pass over the geometry
    Forward,
    /// Geometry into a G-buffer, then a full-screen composite pass
    Deferred,
}

/// Light culling strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullingMode {
    /// Every fragment iterates every light
    Disabled,
    /// 16x16 screen tiles, depth bounds from the depth buffer
    Tiled,
    /// 32x32 screen tiles split into 12 depth slices
    Clustered,
}

/// Depth buffer usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthMode {
    Disabled,
    Enabled,
}

/// Number of frames in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameBuffering {
    Double,
    Triple,
}

impl FrameBuffering {
    /// Frame slot count for this buffering mode
    pub fn frame_count(&self) -> usize {
        match self {
            FrameBuffering::Double => 2,
            FrameBuffering::Triple => 3,
        }
    }
}

/// Immutable render configuration snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Configuration {
    pub render_mode: RenderMode,
    pub culling_mode: CullingMode,
    pub depth_mode: DepthMode,
    /// Run a depth-only pass before the shading passes (needs `depth_mode == Enabled`)
    pub depth_prepass: bool,
    /// MSAA sample count (1, 2, 4 or 8)
    pub sample_count: u32,
    pub frame_buffering: FrameBuffering,
    pub vsync: bool,
    pub low_latency: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::Deferred,
            culling_mode: CullingMode::Disabled,
            depth_mode: DepthMode::Enabled,
            depth_prepass: true,
            sample_count: 1,
            frame_buffering: FrameBuffering::Double,
            vsync: true,
            low_latency: false,
        }
    }
}

impl Configuration {
    pub fn depth_enabled(&self) -> bool {
        self.depth_mode == DepthMode::Enabled
    }

    pub fn depth_prepass_enabled(&self) -> bool {
        self.depth_enabled() && self.depth_prepass
    }

    pub fn deferred_enabled(&self) -> bool {
        self.render_mode == RenderMode::Deferred
    }

    pub fn culling_enabled(&self) -> bool {
        self.culling_mode != CullingMode::Disabled
    }

    pub fn msaa_enabled(&self) -> bool {
        self.sample_count > 1
    }

    pub fn frame_count(&self) -> usize {
        self.frame_buffering.frame_count()
    }

    /// Tiled culling reads depth, and so does the deferred pass: with a prepass
    /// both consumers need their own depth-ready signal.
    pub fn needs_secondary_depth_ready(&self) -> bool {
        self.depth_prepass_enabled()
            && self.culling_mode == CullingMode::Tiled
            && self.deferred_enabled()
    }

    /// Tiled culling reads the depth buffer before the shading pass runs.
    /// Deferred writes it in the G-buffer pass; forward needs the prepass.
    pub fn culling_depth_available(&self) -> bool {
        match self.culling_mode {
            CullingMode::Tiled => match self.render_mode {
                RenderMode::Deferred => self.depth_enabled(),
                RenderMode::Forward => self.depth_prepass_enabled(),
            },
            _ => true,
        }
    }

    /// Copy of this configuration with the depth tiled culling reads turned on
    pub fn with_culling_depth(&self) -> Self {
        if self.culling_depth_available() {
            return *self;
        }
        let depth_prepass = self.depth_prepass || self.render_mode == RenderMode::Forward;
        Self { depth_mode: DepthMode::Enabled, depth_prepass, ..*self }
    }

    /// Copy of this configuration with low-latency presentation turned off
    pub fn without_low_latency(&self) -> Self {
        Self { low_latency: false, ..*self }
    }
}

#[cfg(test)]
#[path = "configuration_tests.rs"]
mod tests;
