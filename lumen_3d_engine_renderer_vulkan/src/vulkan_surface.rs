//! VulkanSurface - `PresentationSurface` for a window
//!
//! Owns the `VkSurfaceKHR` and the swapchain loader. Out-of-date and
//! suboptimal results from acquire/present are returned as outcomes.

use ash::vk;
use ash::vk::Handle;
use std::sync::{Arc, Mutex};

use lumen_3d_engine::lumen3d::Lumen3dResult;
use lumen_3d_engine::lumen3d::device::{
    AcquireOutcome, Extent2D, ImageHandle, PresentMode, PresentOutcome, PresentationSurface,
    Semaphore, SurfaceCapabilities, SurfaceFormat, SwapchainCreateInfo, SwapchainHandle,
};
use lumen_3d_engine::{engine_debug, engine_info, engine_warn};

use crate::vulkan_context::VulkanContext;
use crate::vulkan_device::{fail, lock};
use crate::vulkan_format::{
    color_space_from_vk, color_space_to_vk, format_from_vk, format_to_vk, image_usage_to_vk,
    present_mode_from_vk, present_mode_to_vk, sharing_to_vk,
};

const SOURCE: &str = "lumen3d::vulkan::surface";

pub struct VulkanSurface {
    surface_loader: ash::khr::surface::Instance,
    swapchain_loader: ash::khr::swapchain::Device,
    surface: vk::SurfaceKHR,
    present_queue: vk::Queue,
    queue_lock: Arc<Mutex<()>>,
    /// Swapchains created and not yet destroyed
    swapchains: Vec<vk::SwapchainKHR>,
    context: Arc<VulkanContext>,
}

impl VulkanSurface {
    pub(crate) fn new(
        context: Arc<VulkanContext>,
        surface_loader: ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        present_queue: vk::Queue,
        queue_lock: Arc<Mutex<()>>,
    ) -> Self {
        let swapchain_loader = ash::khr::swapchain::Device::new(&context.instance, &context.device);
        Self {
            surface_loader,
            swapchain_loader,
            surface,
            present_queue,
            queue_lock,
            swapchains: Vec::new(),
            context,
        }
    }

    fn raw_capabilities(&self) -> Lumen3dResult<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(self.context.physical_device, self.surface)
        }
        .map_err(|e| fail("query surface capabilities", e))
    }
}

impl PresentationSurface for VulkanSurface {
    fn capabilities(&self) -> Lumen3dResult<SurfaceCapabilities> {
        let caps = self.raw_capabilities()?;
        // u32::MAX means the window size decides
        let current_extent = if caps.current_extent.width == u32::MAX {
            None
        } else {
            Some(Extent2D::new(caps.current_extent.width, caps.current_extent.height))
        };
        Ok(SurfaceCapabilities {
            min_image_count: caps.min_image_count,
            max_image_count: caps.max_image_count,
            current_extent,
            min_image_extent: Extent2D::new(caps.min_image_extent.width, caps.min_image_extent.height),
            max_image_extent: Extent2D::new(caps.max_image_extent.width, caps.max_image_extent.height),
        })
    }

    fn supported_formats(&self) -> Lumen3dResult<Vec<SurfaceFormat>> {
        let formats = unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(self.context.physical_device, self.surface)
        }
        .map_err(|e| fail("query surface formats", e))?;

        Ok(formats
            .iter()
            .filter_map(|format| {
                Some(SurfaceFormat {
                    format: format_from_vk(format.format)?,
                    color_space: color_space_from_vk(format.color_space)?,
                })
            })
            .collect())
    }

    fn supported_present_modes(&self) -> Lumen3dResult<Vec<PresentMode>> {
        let modes = unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(self.context.physical_device, self.surface)
        }
        .map_err(|e| fail("query present modes", e))?;
        Ok(modes.into_iter().filter_map(present_mode_from_vk).collect())
    }

    fn create_swapchain(&mut self, info: &SwapchainCreateInfo) -> Lumen3dResult<SwapchainHandle> {
        let caps = self.raw_capabilities()?;
        let composite_alpha = if caps
            .supported_composite_alpha
            .contains(vk::CompositeAlphaFlagsKHR::OPAQUE)
        {
            vk::CompositeAlphaFlagsKHR::OPAQUE
        } else {
            vk::CompositeAlphaFlagsKHR::INHERIT
        };
        let (sharing_mode, families) = sharing_to_vk(&info.sharing);

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(info.min_image_count)
            .image_format(format_to_vk(info.format.format))
            .image_color_space(color_space_to_vk(info.format.color_space))
            .image_extent(vk::Extent2D {
                width: info.extent.width,
                height: info.extent.height,
            })
            .image_array_layers(1)
            .image_usage(image_usage_to_vk(info.image_usage))
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(families)
            .pre_transform(caps.current_transform)
            .composite_alpha(composite_alpha)
            .present_mode(present_mode_to_vk(info.present_mode))
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::from_raw(info.old_swapchain.raw()));

        let swapchain = unsafe { self.swapchain_loader.create_swapchain(&create_info, None) }
            .map_err(|e| fail("create swapchain", e))?;
        self.swapchains.push(swapchain);

        engine_info!(
            SOURCE,
            "Swapchain created: {}x{} {:?} {:?}, min {} image(s)",
            info.extent.width, info.extent.height, info.format.format, info.present_mode, info.min_image_count
        );
        Ok(SwapchainHandle(swapchain.as_raw()))
    }

    fn destroy_swapchain(&mut self, swapchain: SwapchainHandle) {
        if swapchain.is_null() {
            return;
        }
        let swapchain = vk::SwapchainKHR::from_raw(swapchain.raw());
        self.swapchains.retain(|&live| live != swapchain);
        unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) };
    }

    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Lumen3dResult<Vec<ImageHandle>> {
        let images = unsafe {
            self.swapchain_loader
                .get_swapchain_images(vk::SwapchainKHR::from_raw(swapchain.raw()))
        }
        .map_err(|e| fail("get swapchain images", e))?;
        Ok(images.iter().map(|image| ImageHandle(image.as_raw())).collect())
    }

    fn acquire_next_image(
        &mut self,
        swapchain: SwapchainHandle,
        timeout_ns: u64,
        signal: Semaphore,
    ) -> Lumen3dResult<AcquireOutcome> {
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                vk::SwapchainKHR::from_raw(swapchain.raw()),
                timeout_ns,
                vk::Semaphore::from_raw(signal.raw()),
                vk::Fence::null(),
            )
        };
        match result {
            Ok((index, suboptimal)) => Ok(AcquireOutcome::Image { index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                engine_debug!(SOURCE, "Swapchain out of date during acquire");
                Ok(AcquireOutcome::OutOfDate)
            }
            Err(e) => Err(fail("acquire swapchain image", e)),
        }
    }

    fn present(
        &mut self,
        swapchain: SwapchainHandle,
        image_index: u32,
        waits: &[Semaphore],
    ) -> Lumen3dResult<PresentOutcome> {
        let wait_semaphores: Vec<vk::Semaphore> = waits
            .iter()
            .map(|semaphore| vk::Semaphore::from_raw(semaphore.raw()))
            .collect();
        let swapchains = [vk::SwapchainKHR::from_raw(swapchain.raw())];
        let image_indices = [image_index];
        let info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let _guard = lock(&self.queue_lock);
        match unsafe { self.swapchain_loader.queue_present(self.present_queue, &info) } {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(fail("present swapchain image", e)),
        }
    }
}

impl Drop for VulkanSurface {
    fn drop(&mut self) {
        unsafe {
            if !self.swapchains.is_empty() {
                engine_warn!(SOURCE, "{} swapchain(s) still alive when the surface is dropped", self.swapchains.len());
                self.context.device.device_wait_idle().ok();
                for swapchain in self.swapchains.drain(..) {
                    self.swapchain_loader.destroy_swapchain(swapchain, None);
                }
            }
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
