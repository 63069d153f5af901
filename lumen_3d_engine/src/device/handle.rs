//! Opaque GPU object handles
//!
//! Every handle is a `Copy` newtype over the backend's raw 64-bit value.
//! The value `0` is the null sentinel: "not present" for optional objects,
//! "disabled" for pass command buffers.

use crate::device::GraphicsDevice;

macro_rules! define_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
            pub struct $name(pub u64);

            impl $name {
                /// Null sentinel
                pub const NULL: Self = Self(0);

                pub fn is_null(&self) -> bool {
                    self.0 == 0
                }

                pub fn raw(&self) -> u64 {
                    self.0
                }
            }
        )*
    };
}

define_handle!(
    /// Binary semaphore (GPU to GPU signal)
    Semaphore,
    /// Fence (GPU to CPU signal)
    Fence,
    /// Image without its memory
    ImageHandle,
    ImageView,
    /// Buffer without its memory
    BufferHandle,
    /// Device memory allocation backing one image or buffer
    MemoryHandle,
    Sampler,
    DescriptorSetLayout,
    DescriptorSet,
    ShaderModule,
    PipelineLayout,
    RenderPass,
    Framebuffer,
    Pipeline,
    CommandBuffer,
    SwapchainHandle,
);

/// A handle that can be released through the device that created it
pub trait DeviceObject: Copy + Default + Eq + std::fmt::Debug {
    fn is_null(&self) -> bool;

    /// Release the object. Never called on a null handle.
    fn destroy(self, device: &dyn GraphicsDevice);
}

macro_rules! impl_device_object {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            impl DeviceObject for $name {
                fn is_null(&self) -> bool {
                    self.0 == 0
                }

                fn destroy(self, device: &dyn GraphicsDevice) {
                    device.$method(self);
                }
            }
        )*
    };
}

impl_device_object!(
    Semaphore => destroy_semaphore,
    Fence => destroy_fence,
    ImageHandle => destroy_image,
    ImageView => destroy_image_view,
    BufferHandle => destroy_buffer,
    MemoryHandle => free_memory,
    Sampler => destroy_sampler,
    DescriptorSetLayout => destroy_descriptor_set_layout,
    DescriptorSet => free_descriptor_set,
    ShaderModule => destroy_shader,
    PipelineLayout => destroy_pipeline_layout,
    RenderPass => destroy_render_pass,
    Framebuffer => destroy_framebuffer,
    Pipeline => destroy_pipeline,
    CommandBuffer => free_command_buffer,
);
