//! Queue family selection
//!
//! Graphics is mandatory. Compute prefers the graphics family so that the
//! culling pass needs no cross-family ownership transfer, then a dedicated
//! family, then any compute-capable one. Present prefers the graphics family,
//! then any family that can present to the window surface.

use crate::error::{Lumen3dError, Lumen3dResult};
use crate::device::{QueueCapabilities, QueueKind};
use crate::{engine_debug, engine_error};

/// Properties of one queue family as reported by the physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyInfo {
    pub capabilities: QueueCapabilities,
    pub queue_count: u32,
    /// Family can present to the window surface
    pub supports_present: bool,
}

/// Queue within a family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueSlot {
    pub family: u32,
    pub index: u32,
}

/// Hands out queue slots, preferring families that still have unused queues
pub struct QueueSelector<'a> {
    families: &'a [QueueFamilyInfo],
    used: Vec<u32>,
}

impl<'a> QueueSelector<'a> {
    pub fn new(families: &'a [QueueFamilyInfo]) -> Self {
        Self {
            families,
            used: vec![0; families.len()],
        }
    }

    fn matches(info: &QueueFamilyInfo, required: QueueCapabilities, excluded: QueueCapabilities) -> bool {
        info.queue_count > 0
            && info.capabilities.contains(required)
            && !info.capabilities.intersects(excluded)
    }

    /// Select a family offering `required` and none of `excluded`
    ///
    /// A family with a free queue wins over one whose queues are all taken;
    /// in the latter case the last queue of the family is shared.
    pub fn select(&mut self, required: QueueCapabilities, excluded: QueueCapabilities) -> Option<QueueSlot> {
        let free = self.families.iter().enumerate().position(|(i, info)| {
            Self::matches(info, required, excluded) && self.used[i] < info.queue_count
        });
        if let Some(family) = free {
            return Some(self.take(family as u32));
        }

        self.families
            .iter()
            .position(|info| Self::matches(info, required, excluded))
            .map(|family| self.take(family as u32))
    }

    /// Take the next queue of `family`, sharing the last one once exhausted
    pub fn take(&mut self, family: u32) -> QueueSlot {
        let i = family as usize;
        let count = self.families[i].queue_count.max(1);
        if self.used[i] < count {
            let slot = QueueSlot { family, index: self.used[i] };
            self.used[i] += 1;
            slot
        } else {
            QueueSlot { family, index: count - 1 }
        }
    }
}

/// Final queue assignment of the logical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueAssignment {
    pub graphics: QueueSlot,
    pub compute: QueueSlot,
    pub present: QueueSlot,
}

impl QueueAssignment {
    /// Resolve graphics, compute and present queues from the family list
    pub fn resolve(families: &[QueueFamilyInfo]) -> Lumen3dResult<Self> {
        let mut selector = QueueSelector::new(families);

        let graphics = match selector.select(QueueCapabilities::GRAPHICS, QueueCapabilities::empty()) {
            Some(slot) => slot,
            None => {
                engine_error!("lumen3d::QueueAssignment", "No graphics-capable queue family");
                return Err(Lumen3dError::QueueFamilyNotFound("graphics".to_string()));
            }
        };

        let graphics_info = families[graphics.family as usize];

        let compute = if graphics_info.capabilities.contains(QueueCapabilities::COMPUTE) {
            selector.take(graphics.family)
        } else {
            match selector
                .select(QueueCapabilities::COMPUTE, QueueCapabilities::GRAPHICS)
                .or_else(|| selector.select(QueueCapabilities::COMPUTE, QueueCapabilities::empty()))
            {
                Some(slot) => slot,
                None => {
                    engine_error!("lumen3d::QueueAssignment", "No compute-capable queue family");
                    return Err(Lumen3dError::QueueFamilyNotFound("compute".to_string()));
                }
            }
        };

        let present = if graphics_info.supports_present {
            graphics
        } else {
            match families.iter().position(|info| info.supports_present && info.queue_count > 0) {
                Some(family) => selector.take(family as u32),
                None => {
                    engine_error!("lumen3d::QueueAssignment", "No queue family can present to the surface");
                    return Err(Lumen3dError::QueueFamilyNotFound("present".to_string()));
                }
            }
        };

        let assignment = Self { graphics, compute, present };
        engine_debug!(
            "lumen3d::QueueAssignment",
            "graphics={:?} compute={:?} present={:?}",
            graphics, compute, present
        );
        Ok(assignment)
    }

    pub fn slot(&self, kind: QueueKind) -> QueueSlot {
        match kind {
            QueueKind::Graphics => self.graphics,
            QueueKind::Compute => self.compute,
            QueueKind::Present => self.present,
        }
    }

    pub fn family(&self, kind: QueueKind) -> u32 {
        self.slot(kind).family
    }

    /// Distinct families in ascending order (one command pool each)
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = vec![self.graphics.family, self.compute.family, self.present.family];
        families.sort_unstable();
        families.dedup();
        families
    }

    /// Number of queues to create per distinct family
    pub fn queue_counts(&self) -> Vec<(u32, u32)> {
        self.unique_families()
            .into_iter()
            .map(|family| {
                let count = [self.graphics, self.compute, self.present]
                    .iter()
                    .filter(|slot| slot.family == family)
                    .map(|slot| slot.index + 1)
                    .max()
                    .unwrap_or(1);
                (family, count)
            })
            .collect()
    }

    /// Graphics and compute families (compute attachments are shared between both)
    pub fn render_families(&self) -> Vec<u32> {
        vec![self.graphics.family, self.compute.family]
    }
}

#[cfg(test)]
#[path = "queue_family_tests.rs"]
mod tests;
