//! GPU resource primitives
//!
//! RAII owners for device objects, buffers and images, per-frame attachments
//! and descriptor-set construction.

pub mod owned;
pub mod buffer;
pub mod image;
pub mod attachment;
pub mod descriptor;

pub use owned::Owned;
pub use buffer::Buffer;
pub use image::Image;
pub use attachment::{
    TextureAttachment, TextureAttachmentDesc,
    BufferAttachment, BufferAttachmentDesc,
    MAX_FRAMES_IN_FLIGHT,
};
pub use descriptor::{
    Binding, BindingKind, BoundResource,
    build_descriptor_set, create_layout, layout_bindings,
};

#[cfg(test)]
#[path = "primitive_tests.rs"]
mod primitive_tests;
