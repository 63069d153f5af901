//! Mock PresentationSurface for unit tests
//!
//! Cloning shares the underlying state, so a test can keep a clone while the
//! renderer owns the boxed surface.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;

use crate::error::{Lumen3dError, Lumen3dResult};
use crate::device::{
    AcquireOutcome, ColorSpace, Extent2D, Format, ImageHandle, PresentMode, PresentOutcome,
    PresentationSurface, Semaphore, SurfaceCapabilities, SurfaceFormat, SwapchainCreateInfo,
    SwapchainHandle,
};

/// Swapchain image handles live far above the mock device's counter
const IMAGE_HANDLE_BASE: u64 = 1 << 40;

pub struct MockSurfaceState {
    pub capabilities: SurfaceCapabilities,
    pub formats: Vec<SurfaceFormat>,
    pub present_modes: Vec<PresentMode>,
    /// Outcomes returned by the next acquires (round-robin images once empty)
    pub acquire_outcomes: VecDeque<AcquireOutcome>,
    /// Outcomes returned by the next presents (`Presented` once empty)
    pub present_outcomes: VecDeque<PresentOutcome>,
    pub created: Vec<SwapchainCreateInfo>,
    pub live: Vec<SwapchainHandle>,
    /// "create <handle>" / "destroy <handle>" in call order
    pub events: Vec<String>,
    pub presents: Vec<(u32, Vec<Semaphore>)>,
    pub acquire_signals: Vec<Semaphore>,
    image_counts: FxHashMap<u64, u32>,
    next_handle: u64,
    next_image: u32,
}

#[derive(Clone)]
pub struct MockSurface {
    state: Arc<Mutex<MockSurfaceState>>,
}

impl MockSurface {
    /// Surface with a 2..=8 image range, free extent, one sRGB format and every present mode
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockSurfaceState {
                capabilities: SurfaceCapabilities {
                    min_image_count: 2,
                    max_image_count: 8,
                    current_extent: None,
                    min_image_extent: Extent2D::new(1, 1),
                    max_image_extent: Extent2D::new(4096, 4096),
                },
                formats: vec![SurfaceFormat {
                    format: Format::B8G8R8A8_SRGB,
                    color_space: ColorSpace::SrgbNonlinear,
                }],
                present_modes: vec![
                    PresentMode::Fifo,
                    PresentMode::FifoRelaxed,
                    PresentMode::Mailbox,
                    PresentMode::Immediate,
                ],
                acquire_outcomes: VecDeque::new(),
                present_outcomes: VecDeque::new(),
                created: Vec::new(),
                live: Vec::new(),
                events: Vec::new(),
                presents: Vec::new(),
                acquire_signals: Vec::new(),
                image_counts: FxHashMap::default(),
                next_handle: 1,
                next_image: 0,
            })),
        }
    }

    /// Run `f` with exclusive access to the state
    pub fn with_state<R>(&self, f: impl FnOnce(&mut MockSurfaceState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn push_acquire(&self, outcome: AcquireOutcome) {
        self.with_state(|s| s.acquire_outcomes.push_back(outcome));
    }

    pub fn push_present(&self, outcome: PresentOutcome) {
        self.with_state(|s| s.present_outcomes.push_back(outcome));
    }

    pub fn created(&self) -> Vec<SwapchainCreateInfo> {
        self.with_state(|s| s.created.clone())
    }

    pub fn live(&self) -> Vec<SwapchainHandle> {
        self.with_state(|s| s.live.clone())
    }

    pub fn events(&self) -> Vec<String> {
        self.with_state(|s| s.events.clone())
    }

    pub fn presents(&self) -> Vec<(u32, Vec<Semaphore>)> {
        self.with_state(|s| s.presents.clone())
    }
}

impl PresentationSurface for MockSurface {
    fn capabilities(&self) -> Lumen3dResult<SurfaceCapabilities> {
        Ok(self.with_state(|s| s.capabilities))
    }

    fn supported_formats(&self) -> Lumen3dResult<Vec<SurfaceFormat>> {
        Ok(self.with_state(|s| s.formats.clone()))
    }

    fn supported_present_modes(&self) -> Lumen3dResult<Vec<PresentMode>> {
        Ok(self.with_state(|s| s.present_modes.clone()))
    }

    fn create_swapchain(&mut self, info: &SwapchainCreateInfo) -> Lumen3dResult<SwapchainHandle> {
        self.with_state(|s| {
            let handle = SwapchainHandle(s.next_handle);
            s.next_handle += 1;
            s.created.push(info.clone());
            s.live.push(handle);
            s.events.push(format!("create {}", handle.0));
            s.image_counts.insert(handle.0, info.min_image_count);
            s.next_image = 0;
            Ok(handle)
        })
    }

    fn destroy_swapchain(&mut self, swapchain: SwapchainHandle) {
        if swapchain.is_null() {
            return;
        }
        self.with_state(|s| {
            s.live.retain(|h| *h != swapchain);
            s.events.push(format!("destroy {}", swapchain.0));
        });
    }

    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Lumen3dResult<Vec<ImageHandle>> {
        self.with_state(|s| {
            let count = s
                .image_counts
                .get(&swapchain.0)
                .copied()
                .ok_or_else(|| Lumen3dError::InvalidResource(format!("unknown swapchain {:?}", swapchain)))?;
            Ok((0..count as u64)
                .map(|i| ImageHandle(IMAGE_HANDLE_BASE + swapchain.0 * 16 + i))
                .collect())
        })
    }

    fn acquire_next_image(
        &mut self,
        swapchain: SwapchainHandle,
        _timeout_ns: u64,
        signal: Semaphore,
    ) -> Lumen3dResult<AcquireOutcome> {
        self.with_state(|s| {
            if !s.live.contains(&swapchain) {
                return Err(Lumen3dError::InvalidResource(format!("acquire on dead swapchain {:?}", swapchain)));
            }
            s.acquire_signals.push(signal);
            if let Some(outcome) = s.acquire_outcomes.pop_front() {
                return Ok(outcome);
            }
            let count = s.image_counts.get(&swapchain.0).copied().unwrap_or(1).max(1);
            let index = s.next_image % count;
            s.next_image += 1;
            Ok(AcquireOutcome::Image { index, suboptimal: false })
        })
    }

    fn present(
        &mut self,
        swapchain: SwapchainHandle,
        image_index: u32,
        waits: &[Semaphore],
    ) -> Lumen3dResult<PresentOutcome> {
        self.with_state(|s| {
            if !s.live.contains(&swapchain) {
                return Err(Lumen3dError::InvalidResource(format!("present on dead swapchain {:?}", swapchain)));
            }
            s.presents.push((image_index, waits.to_vec()));
            Ok(s.present_outcomes.pop_front().unwrap_or(PresentOutcome::Presented))
        })
    }
}
