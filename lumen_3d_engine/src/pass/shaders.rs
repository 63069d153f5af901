//! Pre-compiled shader lookup
//!
//! Each pass picks its binaries from a fixed table keyed by render mode,
//! culling mode and MSAA. Missing files are fatal (`ShaderNotFound`).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::error::Lumen3dResult;
use crate::config::{CullingMode, RenderMode};
use crate::device::{GraphicsDevice, ShaderModule};
use crate::resource::Owned;

pub const DEPTH_VERTEX: &str = "depth.vert.spv";
pub const GBUFFER_VERTEX: &str = "gbuffer.vert.spv";
pub const GBUFFER_FRAGMENT: &str = "gbuffer.frag.spv";
pub const FORWARD_VERTEX: &str = "forward.vert.spv";
pub const FULLSCREEN_VERTEX: &str = "fullscreen.vert.spv";

/// (render mode, culling mode, msaa) -> fragment shader of the forward pass
const FORWARD_FRAGMENTS: [(RenderMode, CullingMode, bool, &str); 12] = [
    (RenderMode::Forward, CullingMode::Disabled, false, "forward.frag.spv"),
    (RenderMode::Forward, CullingMode::Disabled, true, "forward.frag.spv"),
    (RenderMode::Forward, CullingMode::Tiled, false, "forward_tile.frag.spv"),
    (RenderMode::Forward, CullingMode::Tiled, true, "forward_tile.frag.spv"),
    (RenderMode::Forward, CullingMode::Clustered, false, "forward_cluster.frag.spv"),
    (RenderMode::Forward, CullingMode::Clustered, true, "forward_cluster.frag.spv"),
    (RenderMode::Deferred, CullingMode::Disabled, false, "composite.frag.spv"),
    (RenderMode::Deferred, CullingMode::Disabled, true, "composite_ms.frag.spv"),
    (RenderMode::Deferred, CullingMode::Tiled, false, "composite_tile.frag.spv"),
    (RenderMode::Deferred, CullingMode::Tiled, true, "composite_tile_ms.frag.spv"),
    (RenderMode::Deferred, CullingMode::Clustered, false, "composite_cluster.frag.spv"),
    (RenderMode::Deferred, CullingMode::Clustered, true, "composite_cluster_ms.frag.spv"),
];

/// Vertex and fragment shaders of the forward (or composite) pass
pub fn forward_shaders(render_mode: RenderMode, culling_mode: CullingMode, msaa: bool) -> (&'static str, &'static str) {
    let vertex = match render_mode {
        RenderMode::Forward => FORWARD_VERTEX,
        RenderMode::Deferred => FULLSCREEN_VERTEX,
    };
    let fragment = FORWARD_FRAGMENTS
        .iter()
        .find(|(render, culling, ms, _)| *render == render_mode && *culling == culling_mode && *ms == msaa)
        .map(|(_, _, _, name)| *name)
        .unwrap_or("forward.frag.spv");
    (vertex, fragment)
}

/// Per-frame light culling kernel
pub fn culling_shader(culling_mode: CullingMode) -> Option<&'static str> {
    match culling_mode {
        CullingMode::Disabled => None,
        CullingMode::Tiled => Some("cull_tile.comp.spv"),
        CullingMode::Clustered => Some("cull_cluster.comp.spv"),
    }
}

/// One-time frustum precomputation kernel
pub fn frustum_shader(culling_mode: CullingMode) -> Option<&'static str> {
    match culling_mode {
        CullingMode::Disabled => None,
        CullingMode::Tiled => Some("frustum_tile.comp.spv"),
        CullingMode::Clustered => Some("frustum_cluster.comp.spv"),
    }
}

/// Directory of compiled shaders
#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    root: PathBuf,
}

impl ShaderLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Load `name`; the module is released when the owner drops
    pub fn load(&self, device: &Arc<dyn GraphicsDevice>, name: &str) -> Lumen3dResult<Owned<ShaderModule>> {
        let module = device.load_shader(&self.path(name))?;
        Ok(Owned::new(device, module))
    }
}

#[cfg(test)]
#[path = "shaders_tests.rs"]
mod tests;
