/*!
# Lumen 3D Engine - Vulkan Backend

Vulkan implementation of the `lumen_3d_engine` device traits, using ash for
the bindings and gpu-allocator for memory.

```no_run
use std::sync::Arc;
use lumen_3d_engine::lumen3d::Renderer;
use lumen_3d_engine::glam::Vec3;
use lumen_3d_engine::lumen3d::config::Settings;
use lumen_3d_engine::lumen3d::scene::Camera;
use lumen_3d_engine_renderer_vulkan::VulkanGraphicsDevice;

# fn run(window: &winit::window::Window) -> lumen_3d_engine::lumen3d::Lumen3dResult<()> {
let settings = Settings::load("settings.json");
let (device, surface) = VulkanGraphicsDevice::new(window, &settings.device_name)?;
let (width, height) = (settings.resolution.width, settings.resolution.height);
let camera = Camera::look_at(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, 1.0, width as f32 / height as f32, 0.1, 100.0);
let _renderer = Renderer::new(
    Arc::new(device),
    Box::new(surface),
    "shaders",
    settings.configuration(),
    camera,
    width,
    height,
)?;
# Ok(())
# }
```

Validation layers and the debug messenger are compiled in with the
`vulkan-validation` feature; messages go to the engine logger.
*/

mod vulkan_context;
mod vulkan_device;
mod vulkan_surface;
mod vulkan_format;
mod physical_device;
#[cfg_attr(not(feature = "vulkan-validation"), allow(dead_code))]
mod debug;

pub use vulkan_device::VulkanGraphicsDevice;
pub use vulkan_surface::VulkanSurface;
pub use physical_device::{select_physical_device, PhysicalDeviceCandidate};

// Validation statistics (always zero without the `vulkan-validation` feature)
pub use debug::{get_validation_stats, print_validation_stats_report, ValidationStats};
