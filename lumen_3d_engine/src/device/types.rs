//! Backend-agnostic descriptors and enums consumed by `GraphicsDevice`

use bitflags::bitflags;
use crate::device::{
    BufferHandle, CommandBuffer, Fence, ImageView, PipelineLayout,
    RenderPass, Sampler, Semaphore, ShaderModule,
};

// ===== FORMATS =====

/// Image, vertex attribute and surface formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Format {
    Undefined,

    // Color formats
    B8G8R8A8_SRGB,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    R8G8B8A8_UNORM,
    R16G16B16A16_SFLOAT,
    R32G32B32A32_SFLOAT,

    // Depth formats
    D32_SFLOAT,
    D32_SFLOAT_S8_UINT,
    D24_UNORM_S8_UINT,
    D16_UNORM,

    // Vertex attribute formats
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
}

impl Format {
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            Format::D32_SFLOAT | Format::D32_SFLOAT_S8_UINT | Format::D24_UNORM_S8_UINT | Format::D16_UNORM
        )
    }

    pub fn has_stencil(&self) -> bool {
        matches!(self, Format::D32_SFLOAT_S8_UINT | Format::D24_UNORM_S8_UINT)
    }
}

/// Surface color space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    SrgbNonlinear,
    ExtendedSrgbLinear,
    Hdr10St2084,
}

/// Format/colorspace pair offered by a presentation surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceFormat {
    pub format: Format,
    pub color_space: ColorSpace,
}

// ===== FLAGS =====

bitflags! {
    /// Pipeline stages used in semaphore waits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStage: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const VERTEX_SHADER = 1 << 1;
        const EARLY_FRAGMENT_TESTS = 1 << 2;
        const FRAGMENT_SHADER = 1 << 3;
        const LATE_FRAGMENT_TESTS = 1 << 4;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 5;
        const COMPUTE_SHADER = 1 << 6;
        const TRANSFER = 1 << 7;
        const BOTTOM_OF_PIPE = 1 << 8;
    }

    /// Features a format supports for a given tiling or as a texel buffer
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FormatFeatures: u32 {
        const SAMPLED_IMAGE = 1 << 0;
        const STORAGE_IMAGE = 1 << 1;
        const COLOR_ATTACHMENT = 1 << 2;
        const COLOR_ATTACHMENT_BLEND = 1 << 3;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 4;
        const UNIFORM_TEXEL_BUFFER = 1 << 5;
        const STORAGE_TEXEL_BUFFER = 1 << 6;
        const VERTEX_BUFFER = 1 << 7;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        const TRANSFER_SRC = 1 << 0;
        const TRANSFER_DST = 1 << 1;
        const SAMPLED = 1 << 2;
        const STORAGE = 1 << 3;
        const COLOR_ATTACHMENT = 1 << 4;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 5;
        const TRANSIENT_ATTACHMENT = 1 << 6;
        const INPUT_ATTACHMENT = 1 << 7;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const TRANSFER_SRC = 1 << 0;
        const TRANSFER_DST = 1 << 1;
        const UNIFORM = 1 << 2;
        const STORAGE = 1 << 3;
        const INDEX = 1 << 4;
        const VERTEX = 1 << 5;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryProperty: u32 {
        const DEVICE_LOCAL = 1 << 0;
        const HOST_VISIBLE = 1 << 1;
        const HOST_COHERENT = 1 << 2;
        const LAZILY_ALLOCATED = 1 << 3;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageAspect: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
    }

    /// Capabilities of a queue family
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct QueueCapabilities: u32 {
        const GRAPHICS = 1 << 0;
        const COMPUTE = 1 << 1;
        const TRANSFER = 1 << 2;
    }
}

// ===== QUEUES AND SHARING =====

/// Logical queue a command buffer is allocated for and submitted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Graphics,
    Compute,
    Present,
}

/// Resource sharing between queue families
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharingMode {
    /// Owned by a single family at a time
    Exclusive,
    /// Accessible from the listed (distinct) families without ownership transfer
    Concurrent(Vec<u32>),
}

impl SharingMode {
    /// Sharing mode for a raw family list
    ///
    /// Duplicates are removed first: concurrent sharing is only valid for two
    /// or more distinct families.
    pub fn for_families(families: &[u32]) -> Self {
        let mut unique = families.to_vec();
        unique.sort_unstable();
        unique.dedup();
        if unique.len() >= 2 {
            SharingMode::Concurrent(unique)
        } else {
            SharingMode::Exclusive
        }
    }

    pub fn is_concurrent(&self) -> bool {
        matches!(self, SharingMode::Concurrent(_))
    }
}

// ===== IMAGES, BUFFERS, SAMPLERS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Image + backing memory creation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDesc {
    pub extent: Extent2D,
    pub format: Format,
    pub usage: ImageUsage,
    pub samples: u32,
    pub memory: MemoryProperty,
    pub sharing: SharingMode,
}

/// Buffer + backing memory creation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    pub size: u64,
    pub usage: BufferUsage,
    pub memory: MemoryProperty,
    pub sharing: SharingMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    Repeat,
    ClampToEdge,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerDesc {
    pub filter: Filter,
    pub address_mode: AddressMode,
    /// Maximum anisotropy, `None` disables anisotropic filtering
    pub max_anisotropy: Option<f32>,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            filter: Filter::Nearest,
            address_mode: AddressMode::ClampToEdge,
            max_anisotropy: None,
        }
    }
}

/// Image layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    General,
    ColorAttachment,
    DepthStencilAttachment,
    DepthStencilReadOnly,
    ShaderReadOnly,
    PresentSrc,
}

// ===== DESCRIPTORS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    UniformBuffer,
    StorageBuffer,
    CombinedImageSampler,
    InputAttachment,
}

/// One binding slot in a descriptor set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorBinding {
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    pub stages: ShaderStages,
}

/// Resource written into one descriptor binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorResource {
    UniformBuffer { buffer: BufferHandle, offset: u64, range: u64 },
    StorageBuffer { buffer: BufferHandle, offset: u64, range: u64 },
    SampledImage { view: ImageView, sampler: Sampler, layout: ImageLayout },
    InputAttachment { view: ImageView, layout: ImageLayout },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorWrite {
    pub binding: u32,
    pub resource: DescriptorResource,
}

// ===== RENDER PASSES =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    DontCare,
}

/// One attachment of a render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDesc {
    pub format: Format,
    pub samples: u32,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
}

/// Single-subpass render pass
///
/// References are indices into `attachments`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPassDesc {
    pub attachments: Vec<AttachmentDesc>,
    pub color_refs: Vec<u32>,
    /// MSAA resolve targets, one per color reference when non-empty
    pub resolve_refs: Vec<u32>,
    pub depth_ref: Option<(u32, ImageLayout)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferDesc {
    pub render_pass: RenderPass,
    pub attachments: Vec<ImageView>,
    pub extent: Extent2D,
}

// ===== PIPELINES =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineBindPoint {
    Graphics,
    Compute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: Format,
    pub offset: u32,
}

/// Single interleaved vertex stream
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexLayout {
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    pub test: bool,
    pub write: bool,
    pub compare: CompareOp,
}

impl DepthState {
    pub const DISABLED: Self = Self { test: false, write: false, compare: CompareOp::Always };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsPipelineDesc {
    pub layout: PipelineLayout,
    pub render_pass: RenderPass,
    pub vertex_shader: ShaderModule,
    /// Depth-only pipelines have no fragment stage
    pub fragment_shader: Option<ShaderModule>,
    /// Empty layout for full-screen passes that generate vertices in the shader
    pub vertex_layout: VertexLayout,
    pub samples: u32,
    pub depth: DepthState,
    pub cull_mode: CullMode,
    pub color_attachment_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputePipelineDesc {
    pub layout: PipelineLayout,
    pub shader: ShaderModule,
}

// ===== COMMANDS =====

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-extent viewport with the [0, 1] depth range
    pub fn full(extent: Extent2D) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub fn full(extent: Extent2D) -> Self {
        Self { x: 0, y: 0, width: extent.width, height: extent.height }
    }
}

// ===== SUBMISSION =====

/// Semaphore wait paired with the earliest stage that consumes the awaited resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemaphoreWait {
    pub semaphore: Semaphore,
    pub stage: PipelineStage,
}

/// One queue submission
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmitInfo {
    pub command_buffers: Vec<CommandBuffer>,
    pub waits: Vec<SemaphoreWait>,
    pub signals: Vec<Semaphore>,
    /// Signaled when the submission completes (`Fence::NULL` for none)
    pub fence: Fence,
}
