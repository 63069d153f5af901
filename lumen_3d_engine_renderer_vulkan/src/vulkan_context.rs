//! VulkanContext - instance and logical device shared by the device and the surface
//!
//! `VulkanGraphicsDevice` and `VulkanSurface` each hold an `Arc` to it. The
//! logical device and the instance are destroyed when the last holder goes
//! away, after the surface has released its swapchain and the device its
//! allocator and pools.

use ash::vk;

pub struct VulkanContext {
    /// Loader entry points, kept alive for the instance
    pub(crate) _entry: ash::Entry,
    pub instance: ash::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: ash::Device,
    #[cfg(feature = "vulkan-validation")]
    pub(crate) debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_device(None);

            #[cfg(feature = "vulkan-validation")]
            if let Some((debug_utils, messenger)) = self.debug_messenger.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}
