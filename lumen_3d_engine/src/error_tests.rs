//! Unit tests for error.rs
//!
//! Tests all Lumen3dError variants and their implementations (Display, Debug, Clone, std::error::Error).

use crate::error::{Lumen3dError, Lumen3dResult};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Lumen3dError::BackendError("vkQueueSubmit failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("vkQueueSubmit failed"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Lumen3dError::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_device_lost_display() {
    assert_eq!(format!("{}", Lumen3dError::DeviceLost), "Device lost");
}

#[test]
fn test_no_supported_format_display() {
    let err = Lumen3dError::NoSupportedFormat("depth attachment".to_string());
    let display = format!("{}", err);
    assert!(display.contains("No supported format"));
    assert!(display.contains("depth attachment"));
}

#[test]
fn test_queue_family_not_found_display() {
    let err = Lumen3dError::QueueFamilyNotFound("graphics".to_string());
    assert!(format!("{}", err).contains("graphics"));
}

#[test]
fn test_shader_not_found_display() {
    let err = Lumen3dError::ShaderNotFound("shaders/depth.vert.spv".to_string());
    assert!(format!("{}", err).contains("shaders/depth.vert.spv"));
}

#[test]
fn test_fixed_message_variants_display() {
    assert_eq!(format!("{}", Lumen3dError::NoSupportedMemoryType), "No supported memory type");
    assert_eq!(format!("{}", Lumen3dError::FenceTimeout), "Fence wait timed out");
    assert_eq!(format!("{}", Lumen3dError::DescriptorPoolExhausted), "Descriptor pool exhausted");
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Lumen3dError::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_debug() {
    let debug = format!("{:?}", Lumen3dError::InitializationFailed("init".to_string()));
    assert!(debug.contains("InitializationFailed"));

    let debug = format!("{:?}", Lumen3dError::FenceTimeout);
    assert!(debug.contains("FenceTimeout"));
}

#[test]
fn test_error_clone_and_eq() {
    let err1 = Lumen3dError::InvalidResource("slot 3".to_string());
    let err2 = err1.clone();
    assert_eq!(err1, err2);
    assert_ne!(err1, Lumen3dError::OutOfMemory);
}

// ============================================================================
// RESULT TYPE TESTS
// ============================================================================

#[test]
fn test_result_type_err_propagates() {
    fn inner() -> Lumen3dResult<u32> {
        Err(Lumen3dError::DeviceLost)
    }

    fn outer() -> Lumen3dResult<u32> {
        let value = inner()?;
        Ok(value + 1)
    }

    assert_eq!(outer(), Err(Lumen3dError::DeviceLost));
}
