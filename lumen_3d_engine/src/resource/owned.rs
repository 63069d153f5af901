//! RAII ownership of device objects
//!
//! `Owned<H>` owns exactly one handle and releases it through the device that
//! created it. Dropping a null owner does nothing, and `take()` moves the
//! handle out leaving a null owner behind.

use std::fmt;
use std::sync::Arc;
use crate::device::{DeviceObject, GraphicsDevice};

pub struct Owned<H: DeviceObject> {
    device: Option<Arc<dyn GraphicsDevice>>,
    handle: H,
}

impl<H: DeviceObject> Owned<H> {
    /// Take ownership of `handle`, created by `device`
    pub fn new(device: &Arc<dyn GraphicsDevice>, handle: H) -> Self {
        if handle.is_null() {
            return Self::null();
        }
        Self {
            device: Some(Arc::clone(device)),
            handle,
        }
    }

    /// Owner of nothing
    pub fn null() -> Self {
        Self {
            device: None,
            handle: H::default(),
        }
    }

    pub fn handle(&self) -> H {
        self.handle
    }

    pub fn is_null(&self) -> bool {
        self.handle.is_null()
    }

    pub fn device(&self) -> Option<&Arc<dyn GraphicsDevice>> {
        self.device.as_ref()
    }

    /// Move ownership out, leaving this owner null
    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::null())
    }

    /// Release the held object now
    pub fn reset(&mut self) {
        if let Some(device) = self.device.take() {
            let handle = std::mem::take(&mut self.handle);
            if !handle.is_null() {
                handle.destroy(device.as_ref());
            }
        }
        self.handle = H::default();
    }

    /// Release the held object, then take ownership of `other`
    pub fn replace(&mut self, other: Self) {
        self.reset();
        *self = other;
    }

    /// Give up ownership without destroying the object
    pub fn release(mut self) -> H {
        self.device = None;
        std::mem::take(&mut self.handle)
    }
}

impl<H: DeviceObject> Default for Owned<H> {
    fn default() -> Self {
        Self::null()
    }
}

impl<H: DeviceObject> Drop for Owned<H> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<H: DeviceObject> fmt::Debug for Owned<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&self.handle).finish()
    }
}

#[cfg(test)]
#[path = "owned_tests.rs"]
mod tests;
