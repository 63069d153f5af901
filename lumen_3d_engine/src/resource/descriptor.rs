//! Descriptor-set bindings
//!
//! A descriptor set is built once from a short, fixed list of heterogeneous
//! bindings. The binding number is the position in the list, and a binding
//! whose resource is null (an attachment that does not exist under the
//! current configuration) is left unwritten.

use std::sync::Arc;
use crate::error::Lumen3dResult;
use crate::device::{
    BufferHandle, DescriptorBinding, DescriptorResource, DescriptorSet, DescriptorSetLayout,
    DescriptorType, DescriptorWrite, GraphicsDevice, ImageLayout, ImageView, Sampler, ShaderStages,
};
use crate::resource::{Buffer, Owned};

// ============================================================================
// Binding kinds and resources
// ============================================================================

/// How a resource is exposed to shaders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    UniformBuffer,
    StorageBuffer,
    /// Color texture read through a sampler
    SampledTexture,
    /// Subpass input read at the current fragment
    InputAttachment,
    /// Depth image read through a sampler in its read-only depth layout
    DepthAttachment,
}

impl BindingKind {
    pub fn descriptor_type(&self) -> DescriptorType {
        match self {
            BindingKind::UniformBuffer => DescriptorType::UniformBuffer,
            BindingKind::StorageBuffer => DescriptorType::StorageBuffer,
            BindingKind::SampledTexture | BindingKind::DepthAttachment => DescriptorType::CombinedImageSampler,
            BindingKind::InputAttachment => DescriptorType::InputAttachment,
        }
    }
}

/// Non-owning reference to the bound resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundResource {
    Buffer { buffer: BufferHandle, offset: u64, range: u64 },
    Image { view: ImageView, sampler: Sampler },
}

/// One entry of a descriptor set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub kind: BindingKind,
    pub resource: BoundResource,
}

impl Binding {
    fn buffer(kind: BindingKind, buffer: &Buffer) -> Self {
        Self {
            kind,
            resource: BoundResource::Buffer {
                buffer: buffer.handle(),
                offset: 0,
                range: buffer.size(),
            },
        }
    }

    pub fn uniform(buffer: &Buffer) -> Self {
        Self::buffer(BindingKind::UniformBuffer, buffer)
    }

    /// Uniform window of `range` bytes at `offset`
    pub fn uniform_range(buffer: BufferHandle, offset: u64, range: u64) -> Self {
        Self {
            kind: BindingKind::UniformBuffer,
            resource: BoundResource::Buffer { buffer, offset, range },
        }
    }

    pub fn storage(buffer: &Buffer) -> Self {
        Self::buffer(BindingKind::StorageBuffer, buffer)
    }

    pub fn sampled(view: ImageView, sampler: Sampler) -> Self {
        Self {
            kind: BindingKind::SampledTexture,
            resource: BoundResource::Image { view, sampler },
        }
    }

    pub fn input(view: ImageView) -> Self {
        Self {
            kind: BindingKind::InputAttachment,
            resource: BoundResource::Image { view, sampler: Sampler::NULL },
        }
    }

    pub fn depth(view: ImageView, sampler: Sampler) -> Self {
        Self {
            kind: BindingKind::DepthAttachment,
            resource: BoundResource::Image { view, sampler },
        }
    }

    /// Underlying resource does not exist
    pub fn is_null(&self) -> bool {
        match self.resource {
            BoundResource::Buffer { buffer, .. } => buffer.is_null(),
            BoundResource::Image { view, .. } => view.is_null(),
        }
    }

    fn write(&self, binding: u32) -> DescriptorWrite {
        let resource = match (self.kind, self.resource) {
            (BindingKind::UniformBuffer, BoundResource::Buffer { buffer, offset, range }) => {
                DescriptorResource::UniformBuffer { buffer, offset, range }
            }
            (_, BoundResource::Buffer { buffer, offset, range }) => {
                DescriptorResource::StorageBuffer { buffer, offset, range }
            }
            (BindingKind::InputAttachment, BoundResource::Image { view, .. }) => {
                DescriptorResource::InputAttachment { view, layout: ImageLayout::ShaderReadOnly }
            }
            (BindingKind::DepthAttachment, BoundResource::Image { view, sampler }) => {
                DescriptorResource::SampledImage { view, sampler, layout: ImageLayout::DepthStencilReadOnly }
            }
            (_, BoundResource::Image { view, sampler }) => {
                DescriptorResource::SampledImage { view, sampler, layout: ImageLayout::ShaderReadOnly }
            }
        };
        DescriptorWrite { binding, resource }
    }
}

// ============================================================================
// Layout and set construction
// ============================================================================

/// Layout bindings for a list of kinds, numbered by position
pub fn layout_bindings(kinds: &[BindingKind], stages: ShaderStages) -> Vec<DescriptorBinding> {
    kinds
        .iter()
        .enumerate()
        .map(|(i, kind)| DescriptorBinding {
            binding: i as u32,
            descriptor_type: kind.descriptor_type(),
            stages,
        })
        .collect()
}

/// Create a descriptor set layout for `kinds`
pub fn create_layout(
    device: &Arc<dyn GraphicsDevice>,
    kinds: &[BindingKind],
    stages: ShaderStages,
) -> Lumen3dResult<Owned<DescriptorSetLayout>> {
    let layout = device.create_descriptor_set_layout(&layout_bindings(kinds, stages))?;
    Ok(Owned::new(device, layout))
}

/// Allocate and write a descriptor set, skipping null bindings
pub fn build_descriptor_set(
    device: &Arc<dyn GraphicsDevice>,
    layout: DescriptorSetLayout,
    bindings: &[Binding],
) -> Lumen3dResult<Owned<DescriptorSet>> {
    let writes: Vec<DescriptorWrite> = bindings
        .iter()
        .enumerate()
        .filter(|(_, binding)| !binding.is_null())
        .map(|(i, binding)| binding.write(i as u32))
        .collect();
    let set = device.allocate_descriptor_set(layout, &writes)?;
    Ok(Owned::new(device, set))
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
