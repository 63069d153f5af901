//! Per-frame synchronization primitives
//!
//! Which fences and semaphores exist is a table: each `SyncKind` has a
//! predicate over the configuration, and `FrameSync::apply` walks the table
//! once per reconfiguration. Only the delta between the old and the new
//! (configuration, frame count) is created or destroyed; a primitive that
//! stays needed in a slot that stays live is never touched, since the GPU may
//! still reference it.

use std::ops::Range;
use std::sync::Arc;
use crate::error::Lumen3dResult;
use crate::config::Configuration;
use crate::device::{Fence, GraphicsDevice, Semaphore};
use crate::resource::{Owned, MAX_FRAMES_IN_FLIGHT};
use crate::engine_debug;

/// Kind of per-frame synchronization primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKind {
    /// Fence signaled when the frame's last submission completes
    InFlight,
    /// Swapchain image acquired
    ImageReady,
    /// Forward pass done, image can be presented
    FrameReady,
    DepthReady,
    /// Second depth signal for when both deferred and tiled culling consume depth
    DepthReadySecondary,
    DeferReady,
    LightReady,
}

impl SyncKind {
    pub const ALL: [SyncKind; 7] = [
        SyncKind::InFlight,
        SyncKind::ImageReady,
        SyncKind::FrameReady,
        SyncKind::DepthReady,
        SyncKind::DepthReadySecondary,
        SyncKind::DeferReady,
        SyncKind::LightReady,
    ];

    pub fn is_fence(&self) -> bool {
        matches!(self, SyncKind::InFlight)
    }

    /// Whether `config` needs this primitive in every live slot
    pub fn needed(&self, config: &Configuration) -> bool {
        match self {
            SyncKind::InFlight | SyncKind::ImageReady | SyncKind::FrameReady => true,
            SyncKind::DepthReady => config.depth_prepass_enabled(),
            SyncKind::DepthReadySecondary => config.needs_secondary_depth_ready(),
            SyncKind::DeferReady => config.deferred_enabled(),
            SyncKind::LightReady => config.culling_enabled(),
        }
    }

    /// Row in the semaphore table, `None` for the fence
    fn semaphore_index(&self) -> Option<usize> {
        match self {
            SyncKind::InFlight => None,
            SyncKind::ImageReady => Some(0),
            SyncKind::FrameReady => Some(1),
            SyncKind::DepthReady => Some(2),
            SyncKind::DepthReadySecondary => Some(3),
            SyncKind::DeferReady => Some(4),
            SyncKind::LightReady => Some(5),
        }
    }
}

const SEMAPHORE_KINDS: usize = 6;

/// Slots to create and to destroy for one kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncDelta {
    pub create: Range<usize>,
    pub destroy: Range<usize>,
}

impl SyncDelta {
    /// Delta between `(old_needed, old_count)` and `(new_needed, new_count)`
    pub fn between(old_needed: bool, old_count: usize, new_needed: bool, new_count: usize) -> Self {
        let (create, destroy) = match (old_needed, new_needed) {
            (true, true) if new_count >= old_count => (old_count..new_count, 0..0),
            (true, true) => (0..0, new_count..old_count),
            (false, true) => (0..new_count, 0..0),
            (true, false) => (0..0, 0..old_count),
            (false, false) => (0..0, 0..0),
        };
        Self { create, destroy }
    }

    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.destroy.is_empty()
    }
}

/// Fences and semaphores of every frame slot
#[derive(Debug, Default)]
pub struct FrameSync {
    in_flight: [Owned<Fence>; MAX_FRAMES_IN_FLIGHT],
    semaphores: [[Owned<Semaphore>; MAX_FRAMES_IN_FLIGHT]; SEMAPHORE_KINDS],
}

impl FrameSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move from `old` (configuration and frame count, `None` before the
    /// first reconfiguration) to `new`, touching only the delta
    pub fn apply(
        &mut self,
        device: &Arc<dyn GraphicsDevice>,
        old: Option<(&Configuration, usize)>,
        new: &Configuration,
        new_count: usize,
    ) -> Lumen3dResult<()> {
        let new_count = new_count.min(MAX_FRAMES_IN_FLIGHT);
        for kind in SyncKind::ALL {
            let (old_needed, old_count) = match old {
                Some((config, count)) => (kind.needed(config), count.min(MAX_FRAMES_IN_FLIGHT)),
                None => (false, 0),
            };
            let delta = SyncDelta::between(old_needed, old_count, kind.needed(new), new_count);
            if delta.is_empty() {
                continue;
            }
            engine_debug!(
                "lumen3d::FrameSync",
                "{:?}: create slots {:?}, destroy slots {:?}",
                kind, delta.create, delta.destroy
            );
            for slot in delta.destroy.clone() {
                self.destroy(kind, slot);
            }
            for slot in delta.create.clone() {
                self.create(device, kind, slot)?;
            }
        }
        Ok(())
    }

    fn create(&mut self, device: &Arc<dyn GraphicsDevice>, kind: SyncKind, slot: usize) -> Lumen3dResult<()> {
        match kind.semaphore_index() {
            None => {
                // Signaled so the first wait of the slot returns at once
                let fence = device.create_fence(true)?;
                self.in_flight[slot].replace(Owned::new(device, fence));
            }
            Some(row) => {
                let semaphore = device.create_semaphore()?;
                self.semaphores[row][slot].replace(Owned::new(device, semaphore));
            }
        }
        Ok(())
    }

    fn destroy(&mut self, kind: SyncKind, slot: usize) {
        match kind.semaphore_index() {
            None => self.in_flight[slot].reset(),
            Some(row) => self.semaphores[row][slot].reset(),
        }
    }

    pub fn fence(&self, slot: usize) -> Fence {
        self.in_flight.get(slot).map(Owned::handle).unwrap_or_default()
    }

    /// Semaphore of `kind` for `slot` (`NULL` when absent)
    pub fn semaphore(&self, kind: SyncKind, slot: usize) -> Semaphore {
        kind.semaphore_index()
            .and_then(|row| self.semaphores[row].get(slot))
            .map(Owned::handle)
            .unwrap_or_default()
    }

    /// Raw handle of `kind` in `slot`, fence or semaphore
    pub fn raw(&self, kind: SyncKind, slot: usize) -> u64 {
        if kind.is_fence() {
            self.fence(slot).raw()
        } else {
            self.semaphore(kind, slot).raw()
        }
    }

    /// Slots holding a live primitive of `kind`
    pub fn live_slots(&self, kind: SyncKind) -> usize {
        (0..MAX_FRAMES_IN_FLIGHT).filter(|&slot| self.raw(kind, slot) != 0).count()
    }

    /// Live in-flight fences of the first `count` slots
    pub fn fences(&self, count: usize) -> Vec<Fence> {
        self.in_flight
            .iter()
            .take(count)
            .map(Owned::handle)
            .filter(|fence| !fence.is_null())
            .collect()
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
