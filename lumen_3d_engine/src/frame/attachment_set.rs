//! Attachment set - per-frame render targets and storage buffers
//!
//! Which attachments exist is a pure function of the configuration (see
//! `AttachmentRole::exists`). Every live frame slot owns its own copy; only
//! the frustum buffer is shared, being written once and read-only after.

use std::sync::Arc;
use crate::error::Lumen3dResult;
use crate::config::Configuration;
use crate::device::{
    format::{DEPTH_FORMAT_CANDIDATES, GBUFFER_COLOR_CANDIDATES, GBUFFER_FLOAT_CANDIDATES},
    select_image_format, BufferDesc, BufferUsage, DescriptorSet, DescriptorSetLayout, Extent2D,
    Format, FormatFeatures, GraphicsDevice, ImageAspect, ImageUsage, ImageView, MemoryProperty,
    QueueKind, Sampler, SamplerDesc, ShaderStages, SharingMode,
};
use crate::frame::cluster::{light_buffer_bytes, ClusterGrid, LIGHT_BUFFER_SIZE};
use crate::resource::{
    build_descriptor_set, create_layout, Binding, BindingKind, Buffer, BufferAttachment,
    BufferAttachmentDesc, Owned, TextureAttachment, TextureAttachmentDesc, MAX_FRAMES_IN_FLIGHT,
};
use crate::scene::{CameraUniform, PointLight};
use crate::engine_debug;

// ============================================================================
// Roles
// ============================================================================

/// Semantic role of an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentRole {
    Depth,
    MsaaColor,
    Albedo,
    Normal,
    Position,
    Camera,
    Lights,
    Clusters,
    Frustum,
}

impl AttachmentRole {
    pub const ALL: [AttachmentRole; 9] = [
        AttachmentRole::Depth,
        AttachmentRole::MsaaColor,
        AttachmentRole::Albedo,
        AttachmentRole::Normal,
        AttachmentRole::Position,
        AttachmentRole::Camera,
        AttachmentRole::Lights,
        AttachmentRole::Clusters,
        AttachmentRole::Frustum,
    ];

    /// Whether `config` needs this attachment
    pub fn exists(&self, config: &Configuration) -> bool {
        match self {
            AttachmentRole::Depth => config.depth_enabled(),
            AttachmentRole::MsaaColor => config.msaa_enabled(),
            AttachmentRole::Albedo | AttachmentRole::Normal | AttachmentRole::Position => config.deferred_enabled(),
            AttachmentRole::Camera | AttachmentRole::Lights => true,
            AttachmentRole::Clusters | AttachmentRole::Frustum => config.culling_enabled(),
        }
    }
}

// ============================================================================
// Descriptor set layouts
// ============================================================================

/// Set 0 of every pass
pub const CAMERA_BINDINGS: [BindingKind; 1] = [BindingKind::UniformBuffer];
/// Per-model transform, built by the model owner
pub const TRANSFORM_BINDINGS: [BindingKind; 1] = [BindingKind::UniformBuffer];
/// Per-mesh material, built by the model owner
pub const MATERIAL_BINDINGS: [BindingKind; 1] = [BindingKind::SampledTexture];
/// Lights, cluster light lists, frustums and the depth buffer
pub const LIGHT_BINDINGS: [BindingKind; 4] = [
    BindingKind::StorageBuffer,
    BindingKind::StorageBuffer,
    BindingKind::StorageBuffer,
    BindingKind::DepthAttachment,
];
/// Albedo, normal and position read by the composite
pub const GBUFFER_BINDINGS: [BindingKind; 3] = [
    BindingKind::SampledTexture,
    BindingKind::SampledTexture,
    BindingKind::SampledTexture,
];

/// Descriptor set layouts shared by the passes and the scene
#[derive(Debug)]
pub struct SetLayouts {
    pub camera: Owned<DescriptorSetLayout>,
    pub transform: Owned<DescriptorSetLayout>,
    pub material: Owned<DescriptorSetLayout>,
    pub light: Owned<DescriptorSetLayout>,
    pub gbuffer: Owned<DescriptorSetLayout>,
}

impl SetLayouts {
    pub fn new(device: &Arc<dyn GraphicsDevice>) -> Lumen3dResult<Self> {
        let all = ShaderStages::VERTEX | ShaderStages::FRAGMENT | ShaderStages::COMPUTE;
        Ok(Self {
            camera: create_layout(device, &CAMERA_BINDINGS, all)?,
            transform: create_layout(device, &TRANSFORM_BINDINGS, ShaderStages::VERTEX)?,
            material: create_layout(device, &MATERIAL_BINDINGS, ShaderStages::FRAGMENT)?,
            light: create_layout(device, &LIGHT_BINDINGS, ShaderStages::FRAGMENT | ShaderStages::COMPUTE)?,
            gbuffer: create_layout(device, &GBUFFER_BINDINGS, ShaderStages::FRAGMENT)?,
        })
    }
}

// ============================================================================
// Attachment set
// ============================================================================

/// Render targets, storage buffers and their descriptor sets
///
/// Field order is drop order: descriptor sets go before the resources they
/// reference, and the layouts go last.
pub struct AttachmentSet {
    camera_sets: [Owned<DescriptorSet>; MAX_FRAMES_IN_FLIGHT],
    light_sets: [Owned<DescriptorSet>; MAX_FRAMES_IN_FLIGHT],
    gbuffer_sets: [Owned<DescriptorSet>; MAX_FRAMES_IN_FLIGHT],
    depth: TextureAttachment,
    msaa_color: TextureAttachment,
    albedo: TextureAttachment,
    normal: TextureAttachment,
    position: TextureAttachment,
    camera: BufferAttachment,
    lights: BufferAttachment,
    clusters: BufferAttachment,
    frustum: Buffer,
    sampler: Owned<Sampler>,
    layouts: SetLayouts,
    depth_format: Option<Format>,
    gbuffer_formats: Option<[Format; 3]>,
    extent: Extent2D,
}

impl AttachmentSet {
    /// Layouts and sampler only; attachments appear on `recreate()`
    pub fn new(device: &Arc<dyn GraphicsDevice>) -> Lumen3dResult<Self> {
        let sampler = device.create_sampler(&SamplerDesc::default())?;
        Ok(Self {
            camera_sets: Default::default(),
            light_sets: Default::default(),
            gbuffer_sets: Default::default(),
            depth: TextureAttachment::null(),
            msaa_color: TextureAttachment::null(),
            albedo: TextureAttachment::null(),
            normal: TextureAttachment::null(),
            position: TextureAttachment::null(),
            camera: BufferAttachment::null(),
            lights: BufferAttachment::null(),
            clusters: BufferAttachment::null(),
            frustum: Buffer::null(),
            sampler: Owned::new(device, sampler),
            layouts: SetLayouts::new(device)?,
            depth_format: None,
            gbuffer_formats: None,
            extent: Extent2D::default(),
        })
    }

    /// Rebuild every attachment of `[0, frame_count)` for `config` and
    /// `extent`, release the trailing slots, then rebuild the descriptor sets
    pub fn recreate(
        &mut self,
        device: &Arc<dyn GraphicsDevice>,
        config: &Configuration,
        frame_count: usize,
        extent: Extent2D,
        color_format: Format,
        grid: ClusterGrid,
    ) -> Lumen3dResult<()> {
        let frame_count = frame_count.min(MAX_FRAMES_IN_FLIGHT);

        // Sets reference the attachments about to be replaced
        for slot in 0..MAX_FRAMES_IN_FLIGHT {
            self.camera_sets[slot].reset();
            self.light_sets[slot].reset();
            self.gbuffer_sets[slot].reset();
        }

        let queues = device.queue_assignment();
        let render_families = queues.render_families();
        let graphics_family = vec![queues.family(QueueKind::Graphics)];

        self.depth_format = if AttachmentRole::Depth.exists(config) {
            Some(select_image_format(
                device.as_ref(),
                &DEPTH_FORMAT_CANDIDATES,
                FormatFeatures::DEPTH_STENCIL_ATTACHMENT | FormatFeatures::SAMPLED_IMAGE,
            )?)
        } else {
            None
        };
        self.gbuffer_formats = if config.deferred_enabled() {
            let color_features = FormatFeatures::COLOR_ATTACHMENT | FormatFeatures::SAMPLED_IMAGE;
            let albedo = select_image_format(device.as_ref(), &GBUFFER_COLOR_CANDIDATES, color_features)?;
            let float = select_image_format(device.as_ref(), &GBUFFER_FLOAT_CANDIDATES, color_features)?;
            Some([albedo, float, float])
        } else {
            None
        };

        let depth_desc = self.depth_format.map(|format| TextureAttachmentDesc {
            usage: ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::SAMPLED,
            format,
            aspect: ImageAspect::DEPTH,
            samples: config.sample_count,
            memory: MemoryProperty::DEVICE_LOCAL,
            queue_families: render_families.clone(),
        });
        let msaa_desc = TextureAttachmentDesc {
            usage: ImageUsage::COLOR_ATTACHMENT | ImageUsage::TRANSIENT_ATTACHMENT,
            format: color_format,
            aspect: ImageAspect::COLOR,
            samples: config.sample_count,
            memory: MemoryProperty::DEVICE_LOCAL,
            queue_families: graphics_family.clone(),
        };
        let gbuffer_descs = self.gbuffer_formats.map(|formats| {
            formats.map(|format| TextureAttachmentDesc {
                usage: ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED,
                format,
                aspect: ImageAspect::COLOR,
                samples: config.sample_count,
                memory: MemoryProperty::DEVICE_LOCAL,
                queue_families: graphics_family.clone(),
            })
        });
        let host = MemoryProperty::HOST_VISIBLE | MemoryProperty::HOST_COHERENT;
        let camera_desc = BufferAttachmentDesc {
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: BufferUsage::UNIFORM,
            memory: host,
            queue_families: render_families.clone(),
        };
        let lights_desc = BufferAttachmentDesc {
            size: LIGHT_BUFFER_SIZE,
            usage: BufferUsage::STORAGE,
            memory: host,
            queue_families: render_families.clone(),
        };
        let clusters_desc = BufferAttachmentDesc {
            size: grid.cluster_buffer_size(),
            usage: BufferUsage::STORAGE,
            memory: MemoryProperty::DEVICE_LOCAL,
            queue_families: render_families.clone(),
        };

        for slot in 0..frame_count {
            match &depth_desc {
                Some(desc) => self.depth.recreate_slot(device, slot, desc, extent)?,
                None => self.depth.clear_slot(slot),
            }
            if AttachmentRole::MsaaColor.exists(config) {
                self.msaa_color.recreate_slot(device, slot, &msaa_desc, extent)?;
            } else {
                self.msaa_color.clear_slot(slot);
            }
            match &gbuffer_descs {
                Some([albedo, normal, position]) => {
                    self.albedo.recreate_slot(device, slot, albedo, extent)?;
                    self.normal.recreate_slot(device, slot, normal, extent)?;
                    self.position.recreate_slot(device, slot, position, extent)?;
                }
                None => {
                    self.albedo.clear_slot(slot);
                    self.normal.clear_slot(slot);
                    self.position.clear_slot(slot);
                }
            }
            // Fixed-size buffers survive a resize
            if !self.camera.is_present(slot) {
                self.camera.recreate_slot(device, slot, &camera_desc)?;
            }
            if !self.lights.is_present(slot) {
                self.lights.recreate_slot(device, slot, &lights_desc)?;
            }
            if AttachmentRole::Clusters.exists(config) {
                self.clusters.recreate_slot(device, slot, &clusters_desc)?;
            } else {
                self.clusters.clear_slot(slot);
            }
        }
        for slot in frame_count..MAX_FRAMES_IN_FLIGHT {
            self.clear_slot(slot);
        }

        self.frustum = if AttachmentRole::Frustum.exists(config) {
            Buffer::new(
                device,
                &BufferDesc {
                    size: grid.frustum_buffer_size(config.culling_mode),
                    usage: BufferUsage::STORAGE,
                    memory: MemoryProperty::DEVICE_LOCAL,
                    sharing: SharingMode::for_families(&render_families),
                },
            )?
        } else {
            Buffer::null()
        };
        self.extent = extent;

        for slot in 0..frame_count {
            self.build_sets(device, slot)?;
        }

        engine_debug!(
            "lumen3d::AttachmentSet",
            "Attachments for {} slots at {}x{}: {:?}",
            frame_count, extent.width, extent.height,
            AttachmentRole::ALL.iter().filter(|role| self.is_present(**role, 0)).collect::<Vec<_>>()
        );
        Ok(())
    }

    fn clear_slot(&mut self, slot: usize) {
        self.camera_sets[slot].reset();
        self.light_sets[slot].reset();
        self.gbuffer_sets[slot].reset();
        self.depth.clear_slot(slot);
        self.msaa_color.clear_slot(slot);
        self.albedo.clear_slot(slot);
        self.normal.clear_slot(slot);
        self.position.clear_slot(slot);
        self.camera.clear_slot(slot);
        self.lights.clear_slot(slot);
        self.clusters.clear_slot(slot);
    }

    fn build_sets(&mut self, device: &Arc<dyn GraphicsDevice>, slot: usize) -> Lumen3dResult<()> {
        let null = Buffer::null();
        let sampler = self.sampler.handle();

        self.camera_sets[slot] = build_descriptor_set(
            device,
            self.layouts.camera.handle(),
            &[Binding::uniform(self.camera.slot(slot).unwrap_or(&null))],
        )?;
        self.light_sets[slot] = build_descriptor_set(
            device,
            self.layouts.light.handle(),
            &[
                Binding::storage(self.lights.slot(slot).unwrap_or(&null)),
                Binding::storage(self.clusters.slot(slot).unwrap_or(&null)),
                Binding::storage(&self.frustum),
                Binding::depth(self.depth.view(slot), sampler),
            ],
        )?;
        self.gbuffer_sets[slot] = if self.albedo.is_present(slot) {
            build_descriptor_set(
                device,
                self.layouts.gbuffer.handle(),
                &[
                    Binding::sampled(self.albedo.view(slot), sampler),
                    Binding::sampled(self.normal.view(slot), sampler),
                    Binding::sampled(self.position.view(slot), sampler),
                ],
            )?
        } else {
            Owned::null()
        };
        Ok(())
    }

    // ===== UPLOADS =====

    pub fn write_camera(&self, slot: usize, uniform: &CameraUniform) -> Lumen3dResult<()> {
        self.camera.write(slot, 0, bytemuck::bytes_of(uniform))
    }

    /// Header and lights for `slot`; `lights` must already be clamped
    pub fn write_lights(&self, slot: usize, grid: ClusterGrid, lights: &[PointLight]) -> Lumen3dResult<()> {
        self.lights.write(slot, 0, &light_buffer_bytes(grid, lights))
    }

    // ===== QUERIES =====

    pub fn is_present(&self, role: AttachmentRole, slot: usize) -> bool {
        match role {
            AttachmentRole::Depth => self.depth.is_present(slot),
            AttachmentRole::MsaaColor => self.msaa_color.is_present(slot),
            AttachmentRole::Albedo => self.albedo.is_present(slot),
            AttachmentRole::Normal => self.normal.is_present(slot),
            AttachmentRole::Position => self.position.is_present(slot),
            AttachmentRole::Camera => self.camera.is_present(slot),
            AttachmentRole::Lights => self.lights.is_present(slot),
            AttachmentRole::Clusters => self.clusters.is_present(slot),
            AttachmentRole::Frustum => !self.frustum.is_null(),
        }
    }

    /// View of an image attachment (`NULL` for buffers and absent slots)
    pub fn view(&self, role: AttachmentRole, slot: usize) -> ImageView {
        match role {
            AttachmentRole::Depth => self.depth.view(slot),
            AttachmentRole::MsaaColor => self.msaa_color.view(slot),
            AttachmentRole::Albedo => self.albedo.view(slot),
            AttachmentRole::Normal => self.normal.view(slot),
            AttachmentRole::Position => self.position.view(slot),
            _ => ImageView::NULL,
        }
    }

    pub fn camera_buffer(&self) -> &BufferAttachment {
        &self.camera
    }

    pub fn light_buffer(&self) -> &BufferAttachment {
        &self.lights
    }

    pub fn cluster_buffer(&self) -> &BufferAttachment {
        &self.clusters
    }

    pub fn frustum_buffer(&self) -> &Buffer {
        &self.frustum
    }

    pub fn camera_set(&self, slot: usize) -> DescriptorSet {
        self.camera_sets.get(slot).map(Owned::handle).unwrap_or_default()
    }

    pub fn light_set(&self, slot: usize) -> DescriptorSet {
        self.light_sets.get(slot).map(Owned::handle).unwrap_or_default()
    }

    pub fn gbuffer_set(&self, slot: usize) -> DescriptorSet {
        self.gbuffer_sets.get(slot).map(Owned::handle).unwrap_or_default()
    }

    pub fn layouts(&self) -> &SetLayouts {
        &self.layouts
    }

    pub fn sampler(&self) -> Sampler {
        self.sampler.handle()
    }

    pub fn depth_format(&self) -> Option<Format> {
        self.depth_format
    }

    /// Albedo, normal and position formats in deferred mode
    pub fn gbuffer_formats(&self) -> Option<[Format; 3]> {
        self.gbuffer_formats
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }
}

#[cfg(test)]
#[path = "attachment_set_tests.rs"]
mod tests;
