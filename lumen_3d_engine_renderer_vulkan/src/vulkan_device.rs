//! VulkanGraphicsDevice - `GraphicsDevice` on top of ash and gpu-allocator
//!
//! Handles handed to the engine are the raw Vulkan handles, except memory:
//! a `MemoryHandle` is a key into the table of live gpu-allocator allocations.
//!
//! Creation also produces the `VulkanSurface` for the window: the surface is
//! needed to find a queue family that can present, so both come out of
//! `VulkanGraphicsDevice::new` together.

use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use gpu_allocator::MemoryLocation;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::mem::ManuallyDrop;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use lumen_3d_engine::lumen3d::{Lumen3dError, Lumen3dResult};
use lumen_3d_engine::lumen3d::device::{
    BufferDesc, BufferHandle, ClearValue, CommandBuffer, ComputePipelineDesc, DescriptorBinding,
    DescriptorResource, DescriptorSet, DescriptorSetLayout, DescriptorWrite, Extent2D, Fence,
    Filter, Format, FormatFeatures, Framebuffer, FramebufferDesc, GraphicsDevice,
    GraphicsPipelineDesc, ImageAspect, ImageDesc, ImageHandle, ImageView, IndexType, MemoryHandle,
    Pipeline, PipelineBindPoint, PipelineLayout, QueueAssignment, QueueFamilyInfo, QueueKind,
    Rect2D, RenderPass, RenderPassDesc, Sampler, SamplerDesc, Semaphore, ShaderModule, SubmitInfo,
    Viewport,
};
use lumen_3d_engine::{engine_bail, engine_debug, engine_err, engine_error, engine_info, engine_warn};

use crate::physical_device::{select_physical_device, PhysicalDeviceCandidate};
use crate::vulkan_context::VulkanContext;
use crate::vulkan_format::{
    address_mode_to_vk, allocation_error, bind_point_to_vk, buffer_usage_to_vk, clear_value_to_vk,
    compare_op_to_vk, cull_mode_to_vk, descriptor_type_to_vk, filter_to_vk, format_features_from_vk,
    format_to_vk, image_aspect_to_vk, image_layout_to_vk, image_usage_to_vk, index_type_to_vk,
    load_op_to_vk, memory_location, pipeline_stage_to_vk, queue_capabilities_from_vk,
    sample_count_to_vk, shader_stages_to_vk, sharing_to_vk, store_op_to_vk, vk_error,
};
use crate::vulkan_surface::VulkanSurface;

const SOURCE: &str = "lumen3d::vulkan";

/// Entry point of every shader stage
const SHADER_ENTRY: &CStr = c"main";

/// Fixed descriptor pool capacity
const DESCRIPTOR_POOL_MAX_SETS: u32 = 256;

/// Lock a mutex, recovering the data if a panicking thread poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Log a failed Vulkan call and convert it to an engine error
pub(crate) fn fail(operation: &str, result: vk::Result) -> Lumen3dError {
    engine_error!(SOURCE, "Failed to {}: {:?}", operation, result);
    vk_error(operation, result)
}

fn init_failed(operation: &str, detail: impl std::fmt::Debug) -> Lumen3dError {
    engine_error!(SOURCE, "Failed to {}: {:?}", operation, detail);
    Lumen3dError::InitializationFailed(format!("{}: {:?}", operation, detail))
}

/// Vulkan logical device with its queues, pools and allocator
pub struct VulkanGraphicsDevice {
    /// Dropped explicitly before the context releases the logical device
    allocator: ManuallyDrop<Mutex<Allocator>>,
    allocations: Mutex<FxHashMap<u64, Allocation>>,
    next_allocation: AtomicU64,

    /// One pool per distinct queue family
    command_pools: Mutex<FxHashMap<u32, vk::CommandPool>>,
    /// Pool each live command buffer was allocated from
    command_buffer_pools: Mutex<FxHashMap<u64, vk::CommandPool>>,
    descriptor_pool: Mutex<vk::DescriptorPool>,

    graphics_queue: vk::Queue,
    compute_queue: vk::Queue,
    present_queue: vk::Queue,
    /// Serializes submissions and presentation on shared queues
    queue_lock: Arc<Mutex<()>>,
    assignment: QueueAssignment,
    device_name: String,
    anisotropy: bool,

    context: Arc<VulkanContext>,
}

impl VulkanGraphicsDevice {
    /// Create the instance, the window surface and the logical device
    ///
    /// `device_name` selects the physical device by its reported name; an
    /// empty or unknown name falls back to the first discrete GPU.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        device_name: &str,
    ) -> Lumen3dResult<(Self, VulkanSurface)> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| init_failed("load Vulkan library", e))?;

            let app_info = vk::ApplicationInfo::default()
                .application_name(c"Lumen3D Application")
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Lumen3D")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_2);

            let display_handle = window
                .display_handle()
                .map_err(|e| init_failed("get display handle", e))?;
            let window_handle = window
                .window_handle()
                .map_err(|e| init_failed("get window handle", e))?;

            #[allow(unused_mut)]
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| init_failed("get required instance extensions", e))?
                .to_vec();
            #[allow(unused_mut)]
            let mut layer_names: Vec<*const std::os::raw::c_char> = Vec::new();

            #[cfg(feature = "vulkan-validation")]
            {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(c"VK_LAYER_KHRONOS_validation".as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_failed("create instance", e))?;

            #[cfg(feature = "vulkan-validation")]
            let debug_messenger = match Self::create_debug_messenger(&entry, &instance) {
                Ok(messenger) => Some(messenger),
                Err(e) => {
                    instance.destroy_instance(None);
                    return Err(e);
                }
            };

            let destroy_instance = |instance: &ash::Instance| {
                #[cfg(feature = "vulkan-validation")]
                if let Some((debug_utils, messenger)) = &debug_messenger {
                    debug_utils.destroy_debug_utils_messenger(*messenger, None);
                }
                instance.destroy_instance(None);
            };

            let surface = match ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            ) {
                Ok(surface) => surface,
                Err(e) => {
                    destroy_instance(&instance);
                    return Err(init_failed("create surface", e));
                }
            };
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let opened = Self::open_device(&instance, &surface_loader, surface, device_name);
            let (physical_device, assignment, name, device, anisotropy) = match opened {
                Ok(opened) => opened,
                Err(e) => {
                    surface_loader.destroy_surface(surface, None);
                    destroy_instance(&instance);
                    return Err(e);
                }
            };

            let graphics_queue = device.get_device_queue(assignment.graphics.family, assignment.graphics.index);
            let compute_queue = device.get_device_queue(assignment.compute.family, assignment.compute.index);
            let present_queue = device.get_device_queue(assignment.present.family, assignment.present.index);

            let context = Arc::new(VulkanContext {
                _entry: entry,
                instance,
                physical_device,
                device,
                #[cfg(feature = "vulkan-validation")]
                debug_messenger,
            });

            let queue_lock = Arc::new(Mutex::new(()));
            let vulkan_surface = VulkanSurface::new(
                Arc::clone(&context),
                surface_loader,
                surface,
                present_queue,
                Arc::clone(&queue_lock),
            );

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: context.instance.clone(),
                device: context.device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_failed("create GPU allocator", e))?;

            let graphics_device = Self {
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                allocations: Mutex::new(FxHashMap::default()),
                next_allocation: AtomicU64::new(1),
                command_pools: Mutex::new(FxHashMap::default()),
                command_buffer_pools: Mutex::new(FxHashMap::default()),
                descriptor_pool: Mutex::new(vk::DescriptorPool::null()),
                graphics_queue,
                compute_queue,
                present_queue,
                queue_lock,
                assignment,
                device_name: name,
                anisotropy,
                context,
            };
            graphics_device.create_pools()?;

            engine_info!(
                SOURCE,
                "Vulkan device '{}' ready ({} command pool(s))",
                graphics_device.device_name,
                graphics_device.assignment.unique_families().len()
            );
            Ok((graphics_device, vulkan_surface))
        }
    }

    #[cfg(feature = "vulkan-validation")]
    unsafe fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
    ) -> Lumen3dResult<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);
        crate::debug::reset_validation_stats();

        let info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

        let messenger = debug_utils
            .create_debug_utils_messenger(&info, None)
            .map_err(|e| init_failed("create debug messenger", e))?;
        Ok((debug_utils, messenger))
    }

    /// Describe one physical device for the selector
    unsafe fn describe(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        physical_device: vk::PhysicalDevice,
    ) -> PhysicalDeviceCandidate {
        let properties = instance.get_physical_device_properties(physical_device);
        let name = properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let swapchain_supported = instance
            .enumerate_device_extension_properties(physical_device)
            .map(|extensions| {
                extensions.iter().any(|extension| {
                    extension
                        .extension_name_as_c_str()
                        .map_or(false, |name| name == ash::khr::swapchain::NAME)
                })
            })
            .unwrap_or(false);

        let families = instance
            .get_physical_device_queue_family_properties(physical_device)
            .iter()
            .enumerate()
            .map(|(index, family)| QueueFamilyInfo {
                capabilities: queue_capabilities_from_vk(family.queue_flags),
                queue_count: family.queue_count,
                supports_present: surface_loader
                    .get_physical_device_surface_support(physical_device, index as u32, surface)
                    .unwrap_or(false),
            })
            .collect();

        PhysicalDeviceCandidate {
            name,
            discrete: properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU,
            swapchain_supported,
            families,
        }
    }

    /// Pick the physical device and create the logical device with its queues
    unsafe fn open_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        device_name: &str,
    ) -> Lumen3dResult<(vk::PhysicalDevice, QueueAssignment, String, ash::Device, bool)> {
        let physical_devices = instance
            .enumerate_physical_devices()
            .map_err(|e| init_failed("enumerate physical devices", e))?;

        let candidates: Vec<PhysicalDeviceCandidate> = physical_devices
            .iter()
            .map(|&physical_device| Self::describe(instance, surface_loader, surface, physical_device))
            .collect();
        for candidate in &candidates {
            engine_debug!(
                SOURCE,
                "Found GPU '{}' (discrete={}, swapchain={}, families={})",
                candidate.name, candidate.discrete, candidate.swapchain_supported, candidate.families.len()
            );
        }

        let (index, assignment) = select_physical_device(&candidates, device_name)
            .ok_or_else(|| init_failed("select physical device", "no GPU with graphics, compute and present support"))?;
        let physical_device = physical_devices[index];

        let queue_counts = assignment.queue_counts();
        let priorities: Vec<Vec<f32>> = queue_counts
            .iter()
            .map(|&(_, count)| vec![1.0; count as usize])
            .collect();
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = queue_counts
            .iter()
            .zip(&priorities)
            .map(|(&(family, _), priorities)| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(priorities)
            })
            .collect();

        let supported = instance.get_physical_device_features(physical_device);
        let anisotropy = supported.sampler_anisotropy == vk::TRUE;
        let features = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(anisotropy);
        let extension_names = [ash::khr::swapchain::NAME.as_ptr()];

        let device_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        let device = instance
            .create_device(physical_device, &device_info, None)
            .map_err(|e| init_failed("create logical device", e))?;

        Ok((physical_device, assignment, candidates[index].name.clone(), device, anisotropy))
    }

    /// One resettable command pool per distinct family, plus the descriptor pool
    fn create_pools(&self) -> Lumen3dResult<()> {
        let device = self.device();
        {
            let mut pools = lock(&self.command_pools);
            for family in self.assignment.unique_families() {
                let info = vk::CommandPoolCreateInfo::default()
                    .queue_family_index(family)
                    .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
                let pool = unsafe { device.create_command_pool(&info, None) }
                    .map_err(|e| init_failed("create command pool", e))?;
                pools.insert(family, pool);
            }
        }

        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: DESCRIPTOR_POOL_MAX_SETS * 2,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_BUFFER,
                descriptor_count: DESCRIPTOR_POOL_MAX_SETS,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: DESCRIPTOR_POOL_MAX_SETS * 2,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::INPUT_ATTACHMENT,
                descriptor_count: DESCRIPTOR_POOL_MAX_SETS / 4,
            },
        ];
        let info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .pool_sizes(&pool_sizes)
            .max_sets(DESCRIPTOR_POOL_MAX_SETS);
        let pool = unsafe { device.create_descriptor_pool(&info, None) }
            .map_err(|e| init_failed("create descriptor pool", e))?;
        *lock(&self.descriptor_pool) = pool;
        Ok(())
    }

    fn device(&self) -> &ash::Device {
        &self.context.device
    }

    /// Name reported by the selected physical device
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    fn queue(&self, kind: QueueKind) -> vk::Queue {
        match kind {
            QueueKind::Graphics => self.graphics_queue,
            QueueKind::Compute => self.compute_queue,
            QueueKind::Present => self.present_queue,
        }
    }

    fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
    ) -> Lumen3dResult<Allocation> {
        lock(&*self.allocator)
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                engine_error!(SOURCE, "Failed to allocate {} memory: {}", name, e);
                allocation_error(e)
            })
    }

    fn release(&self, allocation: Allocation) {
        if let Err(e) = lock(&*self.allocator).free(allocation) {
            engine_error!(SOURCE, "Failed to free allocation: {}", e);
        }
    }

    fn track(&self, allocation: Allocation) -> MemoryHandle {
        let id = self.next_allocation.fetch_add(1, Ordering::Relaxed);
        lock(&self.allocations).insert(id, allocation);
        MemoryHandle(id)
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    // ===== QUERIES =====

    fn queue_assignment(&self) -> QueueAssignment {
        self.assignment
    }

    fn format_features(&self, format: Format) -> FormatFeatures {
        if format == Format::Undefined {
            return FormatFeatures::empty();
        }
        let properties = unsafe {
            self.context
                .instance
                .get_physical_device_format_properties(self.context.physical_device, format_to_vk(format))
        };
        format_features_from_vk(properties.optimal_tiling_features)
    }

    fn buffer_format_features(&self, format: Format) -> FormatFeatures {
        if format == Format::Undefined {
            return FormatFeatures::empty();
        }
        let properties = unsafe {
            self.context
                .instance
                .get_physical_device_format_properties(self.context.physical_device, format_to_vk(format))
        };
        format_features_from_vk(properties.buffer_features)
    }

    // ===== SYNCHRONIZATION =====

    fn create_semaphore(&self) -> Lumen3dResult<Semaphore> {
        let semaphore = unsafe { self.device().create_semaphore(&vk::SemaphoreCreateInfo::default(), None) }
            .map_err(|e| fail("create semaphore", e))?;
        Ok(Semaphore(semaphore.as_raw()))
    }

    fn destroy_semaphore(&self, semaphore: Semaphore) {
        if semaphore.is_null() {
            return;
        }
        unsafe { self.device().destroy_semaphore(vk::Semaphore::from_raw(semaphore.raw()), None) };
    }

    fn create_fence(&self, signaled: bool) -> Lumen3dResult<Fence> {
        let flags = if signaled { vk::FenceCreateFlags::SIGNALED } else { vk::FenceCreateFlags::empty() };
        let fence = unsafe { self.device().create_fence(&vk::FenceCreateInfo::default().flags(flags), None) }
            .map_err(|e| fail("create fence", e))?;
        Ok(Fence(fence.as_raw()))
    }

    fn destroy_fence(&self, fence: Fence) {
        if fence.is_null() {
            return;
        }
        unsafe { self.device().destroy_fence(vk::Fence::from_raw(fence.raw()), None) };
    }

    fn wait_for_fences(&self, fences: &[Fence], timeout_ns: u64) -> Lumen3dResult<()> {
        if fences.is_empty() {
            return Ok(());
        }
        let fences: Vec<vk::Fence> = fences.iter().map(|f| vk::Fence::from_raw(f.raw())).collect();
        unsafe { self.device().wait_for_fences(&fences, true, timeout_ns) }
            .map_err(|e| fail("wait for fences", e))
    }

    fn reset_fences(&self, fences: &[Fence]) -> Lumen3dResult<()> {
        if fences.is_empty() {
            return Ok(());
        }
        let fences: Vec<vk::Fence> = fences.iter().map(|f| vk::Fence::from_raw(f.raw())).collect();
        unsafe { self.device().reset_fences(&fences) }.map_err(|e| fail("reset fences", e))
    }

    fn wait_idle(&self) -> Lumen3dResult<()> {
        unsafe { self.device().device_wait_idle() }.map_err(|e| fail("wait for device idle", e))
    }

    // ===== IMAGES, BUFFERS, MEMORY =====

    fn create_image(&self, desc: &ImageDesc) -> Lumen3dResult<(ImageHandle, MemoryHandle)> {
        let (sharing_mode, families) = sharing_to_vk(&desc.sharing);
        let info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format_to_vk(desc.format))
            .extent(vk::Extent3D {
                width: desc.extent.width,
                height: desc.extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(sample_count_to_vk(desc.samples))
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(image_usage_to_vk(desc.usage))
            .sharing_mode(sharing_mode)
            .queue_family_indices(families)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let device = self.device();
        let image = unsafe { device.create_image(&info, None) }.map_err(|e| fail("create image", e))?;
        let requirements = unsafe { device.get_image_memory_requirements(image) };

        let allocation = match self.allocate("image", requirements, memory_location(desc.memory), false) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(e);
            }
        };
        if let Err(e) = unsafe { device.bind_image_memory(image, allocation.memory(), allocation.offset()) } {
            self.release(allocation);
            unsafe { device.destroy_image(image, None) };
            return Err(fail("bind image memory", e));
        }

        Ok((ImageHandle(image.as_raw()), self.track(allocation)))
    }

    fn destroy_image(&self, image: ImageHandle) {
        if image.is_null() {
            return;
        }
        unsafe { self.device().destroy_image(vk::Image::from_raw(image.raw()), None) };
    }

    fn create_image_view(&self, image: ImageHandle, format: Format, aspect: ImageAspect) -> Lumen3dResult<ImageView> {
        let info = vk::ImageViewCreateInfo::default()
            .image(vk::Image::from_raw(image.raw()))
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format_to_vk(format))
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: image_aspect_to_vk(aspect),
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        let view = unsafe { self.device().create_image_view(&info, None) }
            .map_err(|e| fail("create image view", e))?;
        Ok(ImageView(view.as_raw()))
    }

    fn destroy_image_view(&self, view: ImageView) {
        if view.is_null() {
            return;
        }
        unsafe { self.device().destroy_image_view(vk::ImageView::from_raw(view.raw()), None) };
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Lumen3dResult<(BufferHandle, MemoryHandle)> {
        let (sharing_mode, families) = sharing_to_vk(&desc.sharing);
        let info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(buffer_usage_to_vk(desc.usage))
            .sharing_mode(sharing_mode)
            .queue_family_indices(families);

        let device = self.device();
        let buffer = unsafe { device.create_buffer(&info, None) }.map_err(|e| fail("create buffer", e))?;
        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

        let allocation = match self.allocate("buffer", requirements, memory_location(desc.memory), true) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };
        if let Err(e) = unsafe { device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) } {
            self.release(allocation);
            unsafe { device.destroy_buffer(buffer, None) };
            return Err(fail("bind buffer memory", e));
        }

        Ok((BufferHandle(buffer.as_raw()), self.track(allocation)))
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        if buffer.is_null() {
            return;
        }
        unsafe { self.device().destroy_buffer(vk::Buffer::from_raw(buffer.raw()), None) };
    }

    fn free_memory(&self, memory: MemoryHandle) {
        if memory.is_null() {
            return;
        }
        let allocation = lock(&self.allocations).remove(&memory.raw());
        match allocation {
            Some(allocation) => self.release(allocation),
            None => engine_warn!(SOURCE, "free_memory: unknown allocation {:?}", memory),
        }
    }

    fn write_memory(&self, memory: MemoryHandle, offset: u64, data: &[u8]) -> Lumen3dResult<()> {
        let mut allocations = lock(&self.allocations);
        let allocation = match allocations.get_mut(&memory.raw()) {
            Some(allocation) => allocation,
            None => engine_bail!(SOURCE, "write_memory: unknown allocation {:?}", memory),
        };
        let mapped = allocation
            .mapped_slice_mut()
            .ok_or_else(|| engine_err!(SOURCE, "write_memory: allocation {:?} is not host visible", memory))?;

        let start = offset as usize;
        let end = start + data.len();
        if end > mapped.len() {
            engine_bail!(
                SOURCE,
                "write_memory: {} bytes at offset {} overflow allocation of {} bytes",
                data.len(), offset, mapped.len()
            );
        }
        mapped[start..end].copy_from_slice(data);
        Ok(())
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Lumen3dResult<Sampler> {
        let filter = filter_to_vk(desc.filter);
        let address_mode = address_mode_to_vk(desc.address_mode);
        let mipmap_mode = match desc.filter {
            Filter::Nearest => vk::SamplerMipmapMode::NEAREST,
            Filter::Linear => vk::SamplerMipmapMode::LINEAR,
        };
        let anisotropy = desc.max_anisotropy.filter(|_| self.anisotropy);

        let info = vk::SamplerCreateInfo::default()
            .mag_filter(filter)
            .min_filter(filter)
            .mipmap_mode(mipmap_mode)
            .address_mode_u(address_mode)
            .address_mode_v(address_mode)
            .address_mode_w(address_mode)
            .anisotropy_enable(anisotropy.is_some())
            .max_anisotropy(anisotropy.unwrap_or(1.0))
            .max_lod(vk::LOD_CLAMP_NONE)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK);

        let sampler = unsafe { self.device().create_sampler(&info, None) }
            .map_err(|e| fail("create sampler", e))?;
        Ok(Sampler(sampler.as_raw()))
    }

    fn destroy_sampler(&self, sampler: Sampler) {
        if sampler.is_null() {
            return;
        }
        unsafe { self.device().destroy_sampler(vk::Sampler::from_raw(sampler.raw()), None) };
    }

    // ===== DESCRIPTORS =====

    fn create_descriptor_set_layout(&self, bindings: &[DescriptorBinding]) -> Lumen3dResult<DescriptorSetLayout> {
        let vk_bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
            .iter()
            .map(|binding| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(binding.binding)
                    .descriptor_type(descriptor_type_to_vk(binding.descriptor_type))
                    .descriptor_count(1)
                    .stage_flags(shader_stages_to_vk(binding.stages))
            })
            .collect();
        let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&vk_bindings);
        let layout = unsafe { self.device().create_descriptor_set_layout(&info, None) }
            .map_err(|e| fail("create descriptor set layout", e))?;
        Ok(DescriptorSetLayout(layout.as_raw()))
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayout) {
        if layout.is_null() {
            return;
        }
        unsafe {
            self.device()
                .destroy_descriptor_set_layout(vk::DescriptorSetLayout::from_raw(layout.raw()), None)
        };
    }

    fn allocate_descriptor_set(
        &self,
        layout: DescriptorSetLayout,
        writes: &[DescriptorWrite],
    ) -> Lumen3dResult<DescriptorSet> {
        let layouts = [vk::DescriptorSetLayout::from_raw(layout.raw())];
        let set = {
            let pool = lock(&self.descriptor_pool);
            let info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(*pool)
                .set_layouts(&layouts);
            let sets = unsafe { self.device().allocate_descriptor_sets(&info) }
                .map_err(|e| fail("allocate descriptor set", e))?;
            sets.first()
                .copied()
                .ok_or_else(|| engine_err!(SOURCE, "Descriptor set allocation returned no set"))?
        };

        for write in writes {
            let base = vk::WriteDescriptorSet::default()
                .dst_set(set)
                .dst_binding(write.binding);
            match write.resource {
                DescriptorResource::UniformBuffer { buffer, offset, range }
                | DescriptorResource::StorageBuffer { buffer, offset, range } => {
                    let descriptor_type = match write.resource {
                        DescriptorResource::UniformBuffer { .. } => vk::DescriptorType::UNIFORM_BUFFER,
                        _ => vk::DescriptorType::STORAGE_BUFFER,
                    };
                    let info = [vk::DescriptorBufferInfo {
                        buffer: vk::Buffer::from_raw(buffer.raw()),
                        offset,
                        range,
                    }];
                    let vk_write = base.descriptor_type(descriptor_type).buffer_info(&info);
                    unsafe { self.device().update_descriptor_sets(&[vk_write], &[]) };
                }
                DescriptorResource::SampledImage { view, sampler, layout } => {
                    let info = [vk::DescriptorImageInfo {
                        sampler: vk::Sampler::from_raw(sampler.raw()),
                        image_view: vk::ImageView::from_raw(view.raw()),
                        image_layout: image_layout_to_vk(layout),
                    }];
                    let vk_write = base
                        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                        .image_info(&info);
                    unsafe { self.device().update_descriptor_sets(&[vk_write], &[]) };
                }
                DescriptorResource::InputAttachment { view, layout } => {
                    let info = [vk::DescriptorImageInfo {
                        sampler: vk::Sampler::null(),
                        image_view: vk::ImageView::from_raw(view.raw()),
                        image_layout: image_layout_to_vk(layout),
                    }];
                    let vk_write = base
                        .descriptor_type(vk::DescriptorType::INPUT_ATTACHMENT)
                        .image_info(&info);
                    unsafe { self.device().update_descriptor_sets(&[vk_write], &[]) };
                }
            }
        }

        Ok(DescriptorSet(set.as_raw()))
    }

    fn free_descriptor_set(&self, set: DescriptorSet) {
        if set.is_null() {
            return;
        }
        let pool = lock(&self.descriptor_pool);
        let sets = [vk::DescriptorSet::from_raw(set.raw())];
        if let Err(e) = unsafe { self.device().free_descriptor_sets(*pool, &sets) } {
            engine_error!(SOURCE, "Failed to free descriptor set: {:?}", e);
        }
    }

    // ===== SHADERS AND PIPELINES =====

    fn load_shader(&self, path: &Path) -> Lumen3dResult<ShaderModule> {
        let mut file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                engine_error!(SOURCE, "Shader not found: {}", path.display());
                return Err(Lumen3dError::ShaderNotFound(path.display().to_string()));
            }
            Err(e) => engine_bail!(SOURCE, "Failed to open shader {}: {}", path.display(), e),
        };
        let code = ash::util::read_spv(&mut file)
            .map_err(|e| engine_err!(SOURCE, "Invalid SPIR-V in {}: {}", path.display(), e))?;

        let info = vk::ShaderModuleCreateInfo::default().code(&code);
        let module = unsafe { self.device().create_shader_module(&info, None) }
            .map_err(|e| fail("create shader module", e))?;
        engine_debug!(SOURCE, "Loaded shader {}", path.display());
        Ok(ShaderModule(module.as_raw()))
    }

    fn destroy_shader(&self, shader: ShaderModule) {
        if shader.is_null() {
            return;
        }
        unsafe { self.device().destroy_shader_module(vk::ShaderModule::from_raw(shader.raw()), None) };
    }

    fn create_pipeline_layout(&self, set_layouts: &[DescriptorSetLayout]) -> Lumen3dResult<PipelineLayout> {
        let layouts: Vec<vk::DescriptorSetLayout> = set_layouts
            .iter()
            .map(|layout| vk::DescriptorSetLayout::from_raw(layout.raw()))
            .collect();
        let info = vk::PipelineLayoutCreateInfo::default().set_layouts(&layouts);
        let layout = unsafe { self.device().create_pipeline_layout(&info, None) }
            .map_err(|e| fail("create pipeline layout", e))?;
        Ok(PipelineLayout(layout.as_raw()))
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayout) {
        if layout.is_null() {
            return;
        }
        unsafe { self.device().destroy_pipeline_layout(vk::PipelineLayout::from_raw(layout.raw()), None) };
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Lumen3dResult<RenderPass> {
        let attachments: Vec<vk::AttachmentDescription> = desc
            .attachments
            .iter()
            .map(|attachment| {
                vk::AttachmentDescription::default()
                    .format(format_to_vk(attachment.format))
                    .samples(sample_count_to_vk(attachment.samples))
                    .load_op(load_op_to_vk(attachment.load_op))
                    .store_op(store_op_to_vk(attachment.store_op))
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(image_layout_to_vk(attachment.initial_layout))
                    .final_layout(image_layout_to_vk(attachment.final_layout))
            })
            .collect();

        let color_ref = |&attachment: &u32| vk::AttachmentReference {
            attachment,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        };
        let color_refs: Vec<vk::AttachmentReference> = desc.color_refs.iter().map(color_ref).collect();
        let resolve_refs: Vec<vk::AttachmentReference> = desc.resolve_refs.iter().map(color_ref).collect();
        let depth_ref = desc.depth_ref.map(|(attachment, layout)| vk::AttachmentReference {
            attachment,
            layout: image_layout_to_vk(layout),
        });

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs);
        if !resolve_refs.is_empty() {
            subpass = subpass.resolve_attachments(&resolve_refs);
        }
        if let Some(depth_ref) = depth_ref.as_ref() {
            subpass = subpass.depth_stencil_attachment(depth_ref);
        }

        let attachment_stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
            | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
            | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
        let attachment_writes = vk::AccessFlags::COLOR_ATTACHMENT_WRITE
            | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
        let dependencies = [
            vk::SubpassDependency::default()
                .src_subpass(vk::SUBPASS_EXTERNAL)
                .dst_subpass(0)
                .src_stage_mask(attachment_stages)
                .src_access_mask(vk::AccessFlags::empty())
                .dst_stage_mask(attachment_stages)
                .dst_access_mask(attachment_writes | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ),
            // attachments written here are sampled by later passes
            vk::SubpassDependency::default()
                .src_subpass(0)
                .dst_subpass(vk::SUBPASS_EXTERNAL)
                .src_stage_mask(attachment_stages)
                .src_access_mask(attachment_writes)
                .dst_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER | vk::PipelineStageFlags::COMPUTE_SHADER)
                .dst_access_mask(vk::AccessFlags::SHADER_READ),
        ];

        let info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(&dependencies);
        let render_pass = unsafe { self.device().create_render_pass(&info, None) }
            .map_err(|e| fail("create render pass", e))?;
        Ok(RenderPass(render_pass.as_raw()))
    }

    fn destroy_render_pass(&self, render_pass: RenderPass) {
        if render_pass.is_null() {
            return;
        }
        unsafe { self.device().destroy_render_pass(vk::RenderPass::from_raw(render_pass.raw()), None) };
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Lumen3dResult<Framebuffer> {
        let attachments: Vec<vk::ImageView> = desc
            .attachments
            .iter()
            .map(|view| vk::ImageView::from_raw(view.raw()))
            .collect();
        let info = vk::FramebufferCreateInfo::default()
            .render_pass(vk::RenderPass::from_raw(desc.render_pass.raw()))
            .attachments(&attachments)
            .width(desc.extent.width)
            .height(desc.extent.height)
            .layers(1);
        let framebuffer = unsafe { self.device().create_framebuffer(&info, None) }
            .map_err(|e| fail("create framebuffer", e))?;
        Ok(Framebuffer(framebuffer.as_raw()))
    }

    fn destroy_framebuffer(&self, framebuffer: Framebuffer) {
        if framebuffer.is_null() {
            return;
        }
        unsafe { self.device().destroy_framebuffer(vk::Framebuffer::from_raw(framebuffer.raw()), None) };
    }

    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Lumen3dResult<Pipeline> {
        let mut stages = vec![vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vk::ShaderModule::from_raw(desc.vertex_shader.raw()))
            .name(SHADER_ENTRY)];
        if let Some(fragment) = desc.fragment_shader {
            stages.push(
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vk::ShaderStageFlags::FRAGMENT)
                    .module(vk::ShaderModule::from_raw(fragment.raw()))
                    .name(SHADER_ENTRY),
            );
        }

        // Full-screen passes generate their vertices in the shader
        let bindings: Vec<vk::VertexInputBindingDescription> = if desc.vertex_layout.attributes.is_empty() {
            Vec::new()
        } else {
            vec![vk::VertexInputBindingDescription {
                binding: 0,
                stride: desc.vertex_layout.stride,
                input_rate: vk::VertexInputRate::VERTEX,
            }]
        };
        let attributes: Vec<vk::VertexInputAttributeDescription> = desc
            .vertex_layout
            .attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: 0,
                format: format_to_vk(attribute.format),
                offset: attribute.offset,
            })
            .collect();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST);
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);
        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(cull_mode_to_vk(desc.cull_mode))
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0);
        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(sample_count_to_vk(desc.samples));
        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(desc.depth.test)
            .depth_write_enable(desc.depth.write)
            .depth_compare_op(compare_op_to_vk(desc.depth.compare));

        let blend_attachments = vec![
            vk::PipelineColorBlendAttachmentState::default()
                .color_write_mask(vk::ColorComponentFlags::RGBA);
            desc.color_attachment_count as usize
        ];
        let color_blend = vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(vk::PipelineLayout::from_raw(desc.layout.raw()))
            .render_pass(vk::RenderPass::from_raw(desc.render_pass.raw()))
            .subpass(0);

        let pipelines = unsafe {
            self.device()
                .create_graphics_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&info), None)
        }
        .map_err(|(_, e)| fail("create graphics pipeline", e))?;
        let pipeline = pipelines
            .first()
            .copied()
            .ok_or_else(|| engine_err!(SOURCE, "Graphics pipeline creation returned no pipeline"))?;
        Ok(Pipeline(pipeline.as_raw()))
    }

    fn create_compute_pipeline(&self, desc: &ComputePipelineDesc) -> Lumen3dResult<Pipeline> {
        let stage = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(vk::ShaderModule::from_raw(desc.shader.raw()))
            .name(SHADER_ENTRY);
        let info = vk::ComputePipelineCreateInfo::default()
            .stage(stage)
            .layout(vk::PipelineLayout::from_raw(desc.layout.raw()));

        let pipelines = unsafe {
            self.device()
                .create_compute_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&info), None)
        }
        .map_err(|(_, e)| fail("create compute pipeline", e))?;
        let pipeline = pipelines
            .first()
            .copied()
            .ok_or_else(|| engine_err!(SOURCE, "Compute pipeline creation returned no pipeline"))?;
        Ok(Pipeline(pipeline.as_raw()))
    }

    fn destroy_pipeline(&self, pipeline: Pipeline) {
        if pipeline.is_null() {
            return;
        }
        unsafe { self.device().destroy_pipeline(vk::Pipeline::from_raw(pipeline.raw()), None) };
    }

    // ===== COMMAND BUFFERS =====

    fn allocate_command_buffer(&self, queue: QueueKind) -> Lumen3dResult<CommandBuffer> {
        let family = self.assignment.family(queue);
        let pools = lock(&self.command_pools);
        let pool = match pools.get(&family) {
            Some(&pool) => pool,
            None => engine_bail!(SOURCE, "No command pool for queue family {}", family),
        };

        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = unsafe { self.device().allocate_command_buffers(&info) }
            .map_err(|e| fail("allocate command buffer", e))?;
        let command_buffer = buffers
            .first()
            .copied()
            .ok_or_else(|| engine_err!(SOURCE, "Command buffer allocation returned no buffer"))?;

        lock(&self.command_buffer_pools).insert(command_buffer.as_raw(), pool);
        Ok(CommandBuffer(command_buffer.as_raw()))
    }

    fn free_command_buffer(&self, command_buffer: CommandBuffer) {
        if command_buffer.is_null() {
            return;
        }
        let pool = lock(&self.command_buffer_pools).remove(&command_buffer.raw());
        match pool {
            Some(pool) => {
                let _pools = lock(&self.command_pools);
                unsafe {
                    self.device()
                        .free_command_buffers(pool, &[vk::CommandBuffer::from_raw(command_buffer.raw())])
                };
            }
            None => engine_warn!(SOURCE, "free_command_buffer: unknown command buffer {:?}", command_buffer),
        }
    }

    fn reset_command_buffer(&self, command_buffer: CommandBuffer) -> Lumen3dResult<()> {
        unsafe {
            self.device().reset_command_buffer(
                vk::CommandBuffer::from_raw(command_buffer.raw()),
                vk::CommandBufferResetFlags::empty(),
            )
        }
        .map_err(|e| fail("reset command buffer", e))
    }

    fn begin_command_buffer(&self, command_buffer: CommandBuffer) -> Lumen3dResult<()> {
        // Recorded buffers are resubmitted every frame until re-recorded
        let info = vk::CommandBufferBeginInfo::default();
        unsafe {
            self.device()
                .begin_command_buffer(vk::CommandBuffer::from_raw(command_buffer.raw()), &info)
        }
        .map_err(|e| fail("begin command buffer", e))
    }

    fn end_command_buffer(&self, command_buffer: CommandBuffer) -> Lumen3dResult<()> {
        unsafe { self.device().end_command_buffer(vk::CommandBuffer::from_raw(command_buffer.raw())) }
            .map_err(|e| fail("end command buffer", e))
    }

    // ===== COMMAND ENCODING =====

    fn cmd_begin_render_pass(
        &self,
        command_buffer: CommandBuffer,
        render_pass: RenderPass,
        framebuffer: Framebuffer,
        extent: Extent2D,
        clear_values: &[ClearValue],
    ) {
        let clear_values: Vec<vk::ClearValue> = clear_values.iter().map(|&value| clear_value_to_vk(value)).collect();
        let info = vk::RenderPassBeginInfo::default()
            .render_pass(vk::RenderPass::from_raw(render_pass.raw()))
            .framebuffer(vk::Framebuffer::from_raw(framebuffer.raw()))
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D { width: extent.width, height: extent.height },
            })
            .clear_values(&clear_values);
        unsafe {
            self.device().cmd_begin_render_pass(
                vk::CommandBuffer::from_raw(command_buffer.raw()),
                &info,
                vk::SubpassContents::INLINE,
            )
        };
    }

    fn cmd_end_render_pass(&self, command_buffer: CommandBuffer) {
        unsafe { self.device().cmd_end_render_pass(vk::CommandBuffer::from_raw(command_buffer.raw())) };
    }

    fn cmd_bind_pipeline(&self, command_buffer: CommandBuffer, bind_point: PipelineBindPoint, pipeline: Pipeline) {
        unsafe {
            self.device().cmd_bind_pipeline(
                vk::CommandBuffer::from_raw(command_buffer.raw()),
                bind_point_to_vk(bind_point),
                vk::Pipeline::from_raw(pipeline.raw()),
            )
        };
    }

    fn cmd_set_viewport(&self, command_buffer: CommandBuffer, viewport: Viewport) {
        let viewport = vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };
        unsafe {
            self.device()
                .cmd_set_viewport(vk::CommandBuffer::from_raw(command_buffer.raw()), 0, &[viewport])
        };
    }

    fn cmd_set_scissor(&self, command_buffer: CommandBuffer, scissor: Rect2D) {
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: scissor.x, y: scissor.y },
            extent: vk::Extent2D { width: scissor.width, height: scissor.height },
        };
        unsafe {
            self.device()
                .cmd_set_scissor(vk::CommandBuffer::from_raw(command_buffer.raw()), 0, &[scissor])
        };
    }

    fn cmd_bind_descriptor_sets(
        &self,
        command_buffer: CommandBuffer,
        bind_point: PipelineBindPoint,
        layout: PipelineLayout,
        first_set: u32,
        sets: &[DescriptorSet],
    ) {
        let sets: Vec<vk::DescriptorSet> = sets.iter().map(|set| vk::DescriptorSet::from_raw(set.raw())).collect();
        unsafe {
            self.device().cmd_bind_descriptor_sets(
                vk::CommandBuffer::from_raw(command_buffer.raw()),
                bind_point_to_vk(bind_point),
                vk::PipelineLayout::from_raw(layout.raw()),
                first_set,
                &sets,
                &[],
            )
        };
    }

    fn cmd_bind_vertex_buffer(&self, command_buffer: CommandBuffer, buffer: BufferHandle, offset: u64) {
        unsafe {
            self.device().cmd_bind_vertex_buffers(
                vk::CommandBuffer::from_raw(command_buffer.raw()),
                0,
                &[vk::Buffer::from_raw(buffer.raw())],
                &[offset],
            )
        };
    }

    fn cmd_bind_index_buffer(&self, command_buffer: CommandBuffer, buffer: BufferHandle, offset: u64, index_type: IndexType) {
        unsafe {
            self.device().cmd_bind_index_buffer(
                vk::CommandBuffer::from_raw(command_buffer.raw()),
                vk::Buffer::from_raw(buffer.raw()),
                offset,
                index_type_to_vk(index_type),
            )
        };
    }

    fn cmd_draw(&self, command_buffer: CommandBuffer, vertex_count: u32, first_vertex: u32) {
        unsafe {
            self.device()
                .cmd_draw(vk::CommandBuffer::from_raw(command_buffer.raw()), vertex_count, 1, first_vertex, 0)
        };
    }

    fn cmd_draw_indexed(&self, command_buffer: CommandBuffer, index_count: u32, first_index: u32, vertex_offset: i32) {
        unsafe {
            self.device().cmd_draw_indexed(
                vk::CommandBuffer::from_raw(command_buffer.raw()),
                index_count,
                1,
                first_index,
                vertex_offset,
                0,
            )
        };
    }

    fn cmd_dispatch(&self, command_buffer: CommandBuffer, x: u32, y: u32, z: u32) {
        unsafe { self.device().cmd_dispatch(vk::CommandBuffer::from_raw(command_buffer.raw()), x, y, z) };
    }

    // ===== SUBMISSION =====

    fn queue_submit(&self, queue: QueueKind, submit: &SubmitInfo) -> Lumen3dResult<()> {
        let wait_semaphores: Vec<vk::Semaphore> = submit
            .waits
            .iter()
            .map(|wait| vk::Semaphore::from_raw(wait.semaphore.raw()))
            .collect();
        let wait_stages: Vec<vk::PipelineStageFlags> = submit
            .waits
            .iter()
            .map(|wait| pipeline_stage_to_vk(wait.stage))
            .collect();
        let command_buffers: Vec<vk::CommandBuffer> = submit
            .command_buffers
            .iter()
            .map(|cb| vk::CommandBuffer::from_raw(cb.raw()))
            .collect();
        let signal_semaphores: Vec<vk::Semaphore> = submit
            .signals
            .iter()
            .map(|semaphore| vk::Semaphore::from_raw(semaphore.raw()))
            .collect();

        let info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        let _guard = lock(&self.queue_lock);
        unsafe {
            self.device().queue_submit(
                self.queue(queue),
                std::slice::from_ref(&info),
                vk::Fence::from_raw(submit.fence.raw()),
            )
        }
        .map_err(|e| fail("submit to queue", e))
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            self.context.device.device_wait_idle().ok();

            // Pools release every command buffer and descriptor set allocated from them
            for (_, pool) in lock(&self.command_pools).drain() {
                self.context.device.destroy_command_pool(pool, None);
            }
            lock(&self.command_buffer_pools).clear();
            let descriptor_pool = std::mem::replace(&mut *lock(&self.descriptor_pool), vk::DescriptorPool::null());
            self.context.device.destroy_descriptor_pool(descriptor_pool, None);

            let leaked: Vec<Allocation> = lock(&self.allocations).drain().map(|(_, allocation)| allocation).collect();
            if !leaked.is_empty() {
                engine_warn!(SOURCE, "{} allocation(s) still alive at device shutdown", leaked.len());
            }
            for allocation in leaked {
                self.release(allocation);
            }

            // Allocator memory must go before the context destroys the logical device
            ManuallyDrop::drop(&mut self.allocator);
        }
    }
}
