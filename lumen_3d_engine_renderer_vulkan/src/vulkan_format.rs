//! Conversions between engine descriptors and Vulkan enums
//!
//! Pure functions only: everything here is testable without a GPU.

use ash::vk;
use gpu_allocator::{AllocationError, MemoryLocation};
use lumen_3d_engine::lumen3d::Lumen3dError;
use lumen_3d_engine::lumen3d::device::{
    AddressMode, BufferUsage, ClearValue, ColorSpace, CompareOp, CullMode, DescriptorType, Filter,
    Format, FormatFeatures, ImageAspect, ImageLayout, ImageUsage, IndexType, LoadOp,
    MemoryProperty, PipelineBindPoint, PipelineStage, PresentMode, QueueCapabilities,
    ShaderStages, SharingMode, StoreOp,
};

// ===== FORMATS =====

pub fn format_to_vk(format: Format) -> vk::Format {
    match format {
        Format::Undefined => vk::Format::UNDEFINED,
        Format::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        Format::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        Format::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        Format::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        Format::R16G16B16A16_SFLOAT => vk::Format::R16G16B16A16_SFLOAT,
        Format::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        Format::D32_SFLOAT => vk::Format::D32_SFLOAT,
        Format::D32_SFLOAT_S8_UINT => vk::Format::D32_SFLOAT_S8_UINT,
        Format::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
        Format::D16_UNORM => vk::Format::D16_UNORM,
        Format::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        Format::R32G32B32_SFLOAT => vk::Format::R32G32B32_SFLOAT,
    }
}

/// Engine format for a surface-reported Vulkan format, `None` if the engine has no equivalent
pub fn format_from_vk(format: vk::Format) -> Option<Format> {
    let format = match format {
        vk::Format::B8G8R8A8_SRGB => Format::B8G8R8A8_SRGB,
        vk::Format::R8G8B8A8_SRGB => Format::R8G8B8A8_SRGB,
        vk::Format::B8G8R8A8_UNORM => Format::B8G8R8A8_UNORM,
        vk::Format::R8G8B8A8_UNORM => Format::R8G8B8A8_UNORM,
        vk::Format::R16G16B16A16_SFLOAT => Format::R16G16B16A16_SFLOAT,
        vk::Format::R32G32B32A32_SFLOAT => Format::R32G32B32A32_SFLOAT,
        vk::Format::D32_SFLOAT => Format::D32_SFLOAT,
        vk::Format::D32_SFLOAT_S8_UINT => Format::D32_SFLOAT_S8_UINT,
        vk::Format::D24_UNORM_S8_UINT => Format::D24_UNORM_S8_UINT,
        vk::Format::D16_UNORM => Format::D16_UNORM,
        vk::Format::R32G32_SFLOAT => Format::R32G32_SFLOAT,
        vk::Format::R32G32B32_SFLOAT => Format::R32G32B32_SFLOAT,
        _ => return None,
    };
    Some(format)
}

pub fn color_space_to_vk(color_space: ColorSpace) -> vk::ColorSpaceKHR {
    match color_space {
        ColorSpace::SrgbNonlinear => vk::ColorSpaceKHR::SRGB_NONLINEAR,
        ColorSpace::ExtendedSrgbLinear => vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
        ColorSpace::Hdr10St2084 => vk::ColorSpaceKHR::HDR10_ST2084_EXT,
    }
}

pub fn color_space_from_vk(color_space: vk::ColorSpaceKHR) -> Option<ColorSpace> {
    match color_space {
        vk::ColorSpaceKHR::SRGB_NONLINEAR => Some(ColorSpace::SrgbNonlinear),
        vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT => Some(ColorSpace::ExtendedSrgbLinear),
        vk::ColorSpaceKHR::HDR10_ST2084_EXT => Some(ColorSpace::Hdr10St2084),
        _ => None,
    }
}

pub fn format_features_from_vk(flags: vk::FormatFeatureFlags) -> FormatFeatures {
    let table = [
        (vk::FormatFeatureFlags::SAMPLED_IMAGE, FormatFeatures::SAMPLED_IMAGE),
        (vk::FormatFeatureFlags::STORAGE_IMAGE, FormatFeatures::STORAGE_IMAGE),
        (vk::FormatFeatureFlags::COLOR_ATTACHMENT, FormatFeatures::COLOR_ATTACHMENT),
        (vk::FormatFeatureFlags::COLOR_ATTACHMENT_BLEND, FormatFeatures::COLOR_ATTACHMENT_BLEND),
        (vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT, FormatFeatures::DEPTH_STENCIL_ATTACHMENT),
        (vk::FormatFeatureFlags::UNIFORM_TEXEL_BUFFER, FormatFeatures::UNIFORM_TEXEL_BUFFER),
        (vk::FormatFeatureFlags::STORAGE_TEXEL_BUFFER, FormatFeatures::STORAGE_TEXEL_BUFFER),
        (vk::FormatFeatureFlags::VERTEX_BUFFER, FormatFeatures::VERTEX_BUFFER),
    ];
    table
        .iter()
        .filter(|(vk_flag, _)| flags.contains(*vk_flag))
        .fold(FormatFeatures::empty(), |acc, (_, feature)| acc | *feature)
}

// ===== FLAGS =====

pub fn image_usage_to_vk(usage: ImageUsage) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(ImageUsage::TRANSFER_SRC) { flags |= vk::ImageUsageFlags::TRANSFER_SRC; }
    if usage.contains(ImageUsage::TRANSFER_DST) { flags |= vk::ImageUsageFlags::TRANSFER_DST; }
    if usage.contains(ImageUsage::SAMPLED) { flags |= vk::ImageUsageFlags::SAMPLED; }
    if usage.contains(ImageUsage::STORAGE) { flags |= vk::ImageUsageFlags::STORAGE; }
    if usage.contains(ImageUsage::COLOR_ATTACHMENT) { flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT; }
    if usage.contains(ImageUsage::DEPTH_STENCIL_ATTACHMENT) { flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT; }
    if usage.contains(ImageUsage::TRANSIENT_ATTACHMENT) { flags |= vk::ImageUsageFlags::TRANSIENT_ATTACHMENT; }
    if usage.contains(ImageUsage::INPUT_ATTACHMENT) { flags |= vk::ImageUsageFlags::INPUT_ATTACHMENT; }
    flags
}

pub fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUsage::TRANSFER_SRC) { flags |= vk::BufferUsageFlags::TRANSFER_SRC; }
    if usage.contains(BufferUsage::TRANSFER_DST) { flags |= vk::BufferUsageFlags::TRANSFER_DST; }
    if usage.contains(BufferUsage::UNIFORM) { flags |= vk::BufferUsageFlags::UNIFORM_BUFFER; }
    if usage.contains(BufferUsage::STORAGE) { flags |= vk::BufferUsageFlags::STORAGE_BUFFER; }
    if usage.contains(BufferUsage::INDEX) { flags |= vk::BufferUsageFlags::INDEX_BUFFER; }
    if usage.contains(BufferUsage::VERTEX) { flags |= vk::BufferUsageFlags::VERTEX_BUFFER; }
    flags
}

pub fn image_aspect_to_vk(aspect: ImageAspect) -> vk::ImageAspectFlags {
    let mut flags = vk::ImageAspectFlags::empty();
    if aspect.contains(ImageAspect::COLOR) { flags |= vk::ImageAspectFlags::COLOR; }
    if aspect.contains(ImageAspect::DEPTH) { flags |= vk::ImageAspectFlags::DEPTH; }
    if aspect.contains(ImageAspect::STENCIL) { flags |= vk::ImageAspectFlags::STENCIL; }
    flags
}

pub fn shader_stages_to_vk(stages: ShaderStages) -> vk::ShaderStageFlags {
    let mut flags = vk::ShaderStageFlags::empty();
    if stages.contains(ShaderStages::VERTEX) { flags |= vk::ShaderStageFlags::VERTEX; }
    if stages.contains(ShaderStages::FRAGMENT) { flags |= vk::ShaderStageFlags::FRAGMENT; }
    if stages.contains(ShaderStages::COMPUTE) { flags |= vk::ShaderStageFlags::COMPUTE; }
    flags
}

pub fn pipeline_stage_to_vk(stage: PipelineStage) -> vk::PipelineStageFlags {
    let table = [
        (PipelineStage::TOP_OF_PIPE, vk::PipelineStageFlags::TOP_OF_PIPE),
        (PipelineStage::VERTEX_SHADER, vk::PipelineStageFlags::VERTEX_SHADER),
        (PipelineStage::EARLY_FRAGMENT_TESTS, vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS),
        (PipelineStage::FRAGMENT_SHADER, vk::PipelineStageFlags::FRAGMENT_SHADER),
        (PipelineStage::LATE_FRAGMENT_TESTS, vk::PipelineStageFlags::LATE_FRAGMENT_TESTS),
        (PipelineStage::COLOR_ATTACHMENT_OUTPUT, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT),
        (PipelineStage::COMPUTE_SHADER, vk::PipelineStageFlags::COMPUTE_SHADER),
        (PipelineStage::TRANSFER, vk::PipelineStageFlags::TRANSFER),
        (PipelineStage::BOTTOM_OF_PIPE, vk::PipelineStageFlags::BOTTOM_OF_PIPE),
    ];
    table
        .iter()
        .filter(|(engine_stage, _)| stage.contains(*engine_stage))
        .fold(vk::PipelineStageFlags::empty(), |acc, (_, vk_stage)| acc | *vk_stage)
}

pub fn queue_capabilities_from_vk(flags: vk::QueueFlags) -> QueueCapabilities {
    let mut capabilities = QueueCapabilities::empty();
    if flags.contains(vk::QueueFlags::GRAPHICS) { capabilities |= QueueCapabilities::GRAPHICS; }
    if flags.contains(vk::QueueFlags::COMPUTE) { capabilities |= QueueCapabilities::COMPUTE; }
    if flags.contains(vk::QueueFlags::TRANSFER) { capabilities |= QueueCapabilities::TRANSFER; }
    capabilities
}

/// gpu-allocator location for the requested memory properties
///
/// Anything host visible is mapped persistently; everything else stays on the GPU.
pub fn memory_location(memory: MemoryProperty) -> MemoryLocation {
    if memory.contains(MemoryProperty::HOST_VISIBLE) {
        MemoryLocation::CpuToGpu
    } else {
        MemoryLocation::GpuOnly
    }
}

/// Vulkan sharing mode plus the family list to pass alongside it
pub fn sharing_to_vk(sharing: &SharingMode) -> (vk::SharingMode, &[u32]) {
    match sharing {
        SharingMode::Exclusive => (vk::SharingMode::EXCLUSIVE, &[]),
        SharingMode::Concurrent(families) => (vk::SharingMode::CONCURRENT, families.as_slice()),
    }
}

pub fn sample_count_to_vk(samples: u32) -> vk::SampleCountFlags {
    match samples {
        2 => vk::SampleCountFlags::TYPE_2,
        4 => vk::SampleCountFlags::TYPE_4,
        8 => vk::SampleCountFlags::TYPE_8,
        _ => vk::SampleCountFlags::TYPE_1,
    }
}

// ===== ENUMS =====

pub fn image_layout_to_vk(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::General => vk::ImageLayout::GENERAL,
        ImageLayout::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilAttachment => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilReadOnly => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        ImageLayout::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageLayout::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
    }
}

pub fn load_op_to_vk(op: LoadOp) -> vk::AttachmentLoadOp {
    match op {
        LoadOp::Load => vk::AttachmentLoadOp::LOAD,
        LoadOp::Clear => vk::AttachmentLoadOp::CLEAR,
        LoadOp::DontCare => vk::AttachmentLoadOp::DONT_CARE,
    }
}

pub fn store_op_to_vk(op: StoreOp) -> vk::AttachmentStoreOp {
    match op {
        StoreOp::Store => vk::AttachmentStoreOp::STORE,
        StoreOp::DontCare => vk::AttachmentStoreOp::DONT_CARE,
    }
}

pub fn descriptor_type_to_vk(descriptor_type: DescriptorType) -> vk::DescriptorType {
    match descriptor_type {
        DescriptorType::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        DescriptorType::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
        DescriptorType::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        DescriptorType::InputAttachment => vk::DescriptorType::INPUT_ATTACHMENT,
    }
}

pub fn bind_point_to_vk(bind_point: PipelineBindPoint) -> vk::PipelineBindPoint {
    match bind_point {
        PipelineBindPoint::Graphics => vk::PipelineBindPoint::GRAPHICS,
        PipelineBindPoint::Compute => vk::PipelineBindPoint::COMPUTE,
    }
}

pub fn index_type_to_vk(index_type: IndexType) -> vk::IndexType {
    match index_type {
        IndexType::U16 => vk::IndexType::UINT16,
        IndexType::U32 => vk::IndexType::UINT32,
    }
}

pub fn compare_op_to_vk(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

pub fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub fn filter_to_vk(filter: Filter) -> vk::Filter {
    match filter {
        Filter::Nearest => vk::Filter::NEAREST,
        Filter::Linear => vk::Filter::LINEAR,
    }
}

pub fn address_mode_to_vk(mode: AddressMode) -> vk::SamplerAddressMode {
    match mode {
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
    }
}

pub fn present_mode_to_vk(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
    }
}

pub fn present_mode_from_vk(mode: vk::PresentModeKHR) -> Option<PresentMode> {
    match mode {
        vk::PresentModeKHR::IMMEDIATE => Some(PresentMode::Immediate),
        vk::PresentModeKHR::MAILBOX => Some(PresentMode::Mailbox),
        vk::PresentModeKHR::FIFO => Some(PresentMode::Fifo),
        vk::PresentModeKHR::FIFO_RELAXED => Some(PresentMode::FifoRelaxed),
        _ => None,
    }
}

pub fn clear_value_to_vk(value: ClearValue) -> vk::ClearValue {
    match value {
        ClearValue::Color(color) => vk::ClearValue {
            color: vk::ClearColorValue { float32: color },
        },
        ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
        },
    }
}

// ===== ERRORS =====

/// Engine error for a failed Vulkan call
///
/// Memory exhaustion and device loss keep their own variants; everything
/// else becomes a `BackendError` naming the operation.
pub fn vk_error(operation: &str, result: vk::Result) -> Lumen3dError {
    match result {
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => Lumen3dError::OutOfMemory,
        vk::Result::ERROR_DEVICE_LOST => Lumen3dError::DeviceLost,
        vk::Result::TIMEOUT => Lumen3dError::FenceTimeout,
        vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL => Lumen3dError::DescriptorPoolExhausted,
        other => Lumen3dError::BackendError(format!("{}: {:?}", operation, other)),
    }
}

/// Engine error for a failed gpu-allocator request
pub fn allocation_error(error: AllocationError) -> Lumen3dError {
    match error {
        AllocationError::OutOfMemory => Lumen3dError::OutOfMemory,
        AllocationError::NoCompatibleMemoryTypeFound => Lumen3dError::NoSupportedMemoryType,
        other => Lumen3dError::BackendError(format!("allocation failed: {}", other)),
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
