/*!
# Lumen 3D Engine

Configuration-driven frame orchestration for a multi-pass GPU renderer.

A [`Configuration`](lumen3d::config::Configuration) snapshot (render mode,
light culling, depth, MSAA, frame buffering, presentation) fully determines
which passes run, which attachments and synchronization primitives exist,
and how the passes wait on each other. The `Renderer` rebuilds that topology
on `recreate()` and renders one frame per `draw()`.

This crate has no GPU dependency: it talks to the hardware through the
`GraphicsDevice` and `PresentationSurface` traits. The Vulkan implementation
lives in `lumen_3d_engine_renderer_vulkan`.

## Architecture

- **device**: backend traits, typed handles, queue-family and format selection
- **resource**: RAII owners, per-frame attachments, descriptor set building
- **swapchain**: extent, image count, present mode and format selection
- **frame**: `Renderer`, attachment set, synchronization and dependency tables
- **pass**: depth pre-pass, G-buffer, light culling, forward/composite
- **scene**: camera, lights and the `Model` interface the renderer draws
- **config**: render configuration and the persisted settings file
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod device;
pub mod resource;
pub mod swapchain;
pub mod scene;
pub mod frame;
pub mod pass;

// Main lumen3d namespace module
pub mod lumen3d {
    // Error types
    pub use crate::error::{Lumen3dError, Lumen3dResult};

    // Engine singleton (logger holder)
    pub use crate::engine::Engine;

    // Frame orchestrator
    pub use crate::frame::{FrameOutcome, Renderer};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    pub mod config {
        pub use crate::config::*;
    }

    pub mod device {
        pub use crate::device::*;
    }

    pub mod resource {
        pub use crate::resource::*;
    }

    pub mod swapchain {
        pub use crate::swapchain::*;
    }

    pub mod scene {
        pub use crate::scene::*;
    }

    pub mod frame {
        pub use crate::frame::*;
    }

    pub mod pass {
        pub use crate::pass::*;
    }
}

// Re-export math library at crate root
pub use glam;
