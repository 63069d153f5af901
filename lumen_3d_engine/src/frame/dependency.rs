//! Pass dependency table
//!
//! Who waits on whom, at which stage, and who signals what. Every semaphore a
//! pass signals is waited on exactly once per frame: binary semaphores cannot
//! be waited twice, which is why tiled culling in deferred mode gets its own
//! depth-ready signal.

use crate::config::{Configuration, CullingMode};
use crate::device::{PipelineStage, QueueKind};
use crate::frame::SyncKind;

/// The four passes in submission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    Depth,
    Deferred,
    Culling,
    Forward,
}

impl PassKind {
    /// Record and submission order
    pub const ORDER: [PassKind; 4] = [PassKind::Depth, PassKind::Deferred, PassKind::Culling, PassKind::Forward];

    pub fn queue(&self) -> QueueKind {
        match self {
            PassKind::Culling => QueueKind::Compute,
            _ => QueueKind::Graphics,
        }
    }
}

/// Which passes run, as seen by the dependency table
///
/// Built from the live passes' `enabled()` so waits never name a semaphore
/// whose signaling pass does not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassTopology {
    pub depth: bool,
    pub deferred: bool,
    /// `Disabled` when the culling pass does not run
    pub culling: CullingMode,
}

impl PassTopology {
    /// Topology a configuration produces
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            depth: config.depth_prepass_enabled(),
            deferred: config.deferred_enabled(),
            culling: config.culling_mode,
        }
    }

    pub fn enabled(&self, pass: PassKind) -> bool {
        match pass {
            PassKind::Depth => self.depth,
            PassKind::Deferred => self.deferred,
            PassKind::Culling => self.culling != CullingMode::Disabled,
            PassKind::Forward => true,
        }
    }

    fn culling_consumes_defer(&self) -> bool {
        self.culling == CullingMode::Tiled && !self.depth && self.deferred
    }

    /// Semaphores `pass` waits on, each with the earliest consuming stage
    pub fn waits(&self, pass: PassKind) -> Vec<(SyncKind, PipelineStage)> {
        let mut waits = Vec::new();
        if !self.enabled(pass) {
            return waits;
        }
        match pass {
            PassKind::Depth => {}
            PassKind::Deferred => {
                if self.depth {
                    waits.push((SyncKind::DepthReady, PipelineStage::EARLY_FRAGMENT_TESTS));
                }
            }
            PassKind::Culling => {
                // Clustered culling works from the frustum buffer alone
                if self.culling == CullingMode::Tiled {
                    if self.depth {
                        let kind = if self.deferred { SyncKind::DepthReadySecondary } else { SyncKind::DepthReady };
                        waits.push((kind, PipelineStage::COMPUTE_SHADER));
                    } else if self.deferred {
                        waits.push((SyncKind::DeferReady, PipelineStage::COMPUTE_SHADER));
                    }
                }
            }
            PassKind::Forward => {
                waits.push((SyncKind::ImageReady, PipelineStage::COLOR_ATTACHMENT_OUTPUT));
                if self.culling != CullingMode::Disabled {
                    waits.push((SyncKind::LightReady, PipelineStage::FRAGMENT_SHADER));
                }
                if self.deferred && !self.culling_consumes_defer() {
                    waits.push((SyncKind::DeferReady, PipelineStage::FRAGMENT_SHADER));
                }
                if self.depth && !self.deferred && self.culling != CullingMode::Tiled {
                    waits.push((SyncKind::DepthReady, PipelineStage::EARLY_FRAGMENT_TESTS));
                }
            }
        }
        waits
    }

    /// Semaphores `pass` signals (the forward pass also signals the in-flight fence)
    pub fn signals(&self, pass: PassKind) -> Vec<SyncKind> {
        if !self.enabled(pass) {
            return Vec::new();
        }
        match pass {
            PassKind::Depth => {
                let mut signals = vec![SyncKind::DepthReady];
                if self.deferred && self.culling == CullingMode::Tiled {
                    signals.push(SyncKind::DepthReadySecondary);
                }
                signals
            }
            PassKind::Deferred => vec![SyncKind::DeferReady],
            PassKind::Culling => vec![SyncKind::LightReady],
            PassKind::Forward => vec![SyncKind::FrameReady],
        }
    }
}

#[cfg(test)]
#[path = "dependency_tests.rs"]
mod tests;
