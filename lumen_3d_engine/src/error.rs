//! Error types for the Lumen3D engine
//!
//! Every variant is fatal for the frame loop. The two recoverable conditions
//! of the presentation layer (surface out of date, suboptimal swapchain) are
//! not errors: they are reported through `AcquireOutcome` / `PresentOutcome`.

use std::fmt;

/// Result type for Lumen3D engine operations
pub type Lumen3dResult<T> = std::result::Result<T, Lumen3dError>;

/// Lumen3D engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lumen3dError {
    /// Backend-specific error (Vulkan, mock, etc.)
    BackendError(String),

    /// Out of GPU or host memory
    OutOfMemory,

    /// The logical device was lost
    DeviceLost,

    /// Invalid resource (null handle, out-of-range slot, etc.)
    InvalidResource(String),

    /// Initialization failed (device, swapchain, passes)
    InitializationFailed(String),

    /// None of the candidate formats supports the requested features
    NoSupportedFormat(String),

    /// No memory type satisfies the requested properties
    NoSupportedMemoryType,

    /// No queue family offers a mandatory capability
    QueueFamilyNotFound(String),

    /// A fence wait exceeded its timeout
    FenceTimeout,

    /// A pre-compiled shader binary could not be loaded
    ShaderNotFound(String),

    /// The fixed-capacity descriptor pool has no room left
    DescriptorPoolExhausted,
}

impl fmt::Display for Lumen3dError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lumen3dError::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Lumen3dError::OutOfMemory => write!(f, "Out of GPU memory"),
            Lumen3dError::DeviceLost => write!(f, "Device lost"),
            Lumen3dError::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Lumen3dError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Lumen3dError::NoSupportedFormat(msg) => write!(f, "No supported format: {}", msg),
            Lumen3dError::NoSupportedMemoryType => write!(f, "No supported memory type"),
            Lumen3dError::QueueFamilyNotFound(msg) => write!(f, "Queue family not found: {}", msg),
            Lumen3dError::FenceTimeout => write!(f, "Fence wait timed out"),
            Lumen3dError::ShaderNotFound(path) => write!(f, "Shader not found: {}", path),
            Lumen3dError::DescriptorPoolExhausted => write!(f, "Descriptor pool exhausted"),
        }
    }
}

impl std::error::Error for Lumen3dError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
