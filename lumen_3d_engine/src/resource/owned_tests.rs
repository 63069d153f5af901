//! Unit tests for owned.rs

use std::sync::Arc;
use crate::device::mock_graphics_device::{MockGraphicsDevice, MockObjectKind};
use crate::device::{Fence, GraphicsDevice, Semaphore};
use crate::resource::Owned;

fn setup() -> (Arc<MockGraphicsDevice>, Arc<dyn GraphicsDevice>) {
    let mock = Arc::new(MockGraphicsDevice::new());
    let device: Arc<dyn GraphicsDevice> = mock.clone();
    (mock, device)
}

#[test]
fn test_drop_destroys_handle() {
    let (mock, device) = setup();
    {
        let _fence = Owned::new(&device, device.create_fence(true).unwrap());
        assert_eq!(mock.live_count(MockObjectKind::Fence), 1);
    }
    assert_eq!(mock.live_count(MockObjectKind::Fence), 0);
    assert!(mock.misuse().is_empty());
}

#[test]
fn test_null_owner_drop_is_noop() {
    let (mock, device) = setup();
    let null: Owned<Fence> = Owned::null();
    assert!(null.is_null());
    drop(null);

    let wrapped_null = Owned::new(&device, Semaphore::NULL);
    assert!(wrapped_null.device().is_none());
    drop(wrapped_null);

    assert!(mock.events().is_empty());
}

#[test]
fn test_take_transfers_ownership() {
    let (mock, device) = setup();
    let mut a = Owned::new(&device, device.create_semaphore().unwrap());
    let handle = a.handle();

    let b = a.take();
    assert!(a.is_null());
    assert_eq!(b.handle(), handle);

    drop(a);
    assert!(mock.is_live(handle.raw()));
    drop(b);
    assert!(!mock.is_live(handle.raw()));
    assert!(mock.misuse().is_empty());
}

#[test]
fn test_replace_releases_previous_first() {
    let (mock, device) = setup();
    let mut owner = Owned::new(&device, device.create_semaphore().unwrap());
    let old = owner.handle();
    let new = device.create_semaphore().unwrap();

    owner.replace(Owned::new(&device, new));

    assert!(!mock.is_live(old.raw()));
    assert!(mock.is_live(new.raw()));
    assert_eq!(owner.handle(), new);
}

#[test]
fn test_reset_is_idempotent() {
    let (mock, device) = setup();
    let mut owner = Owned::new(&device, device.create_fence(false).unwrap());
    owner.reset();
    owner.reset();
    drop(owner);

    assert_eq!(mock.live_count(MockObjectKind::Fence), 0);
    assert!(mock.misuse().is_empty());
}

#[test]
fn test_release_keeps_object_alive() {
    let (mock, device) = setup();
    let owner = Owned::new(&device, device.create_fence(false).unwrap());
    let fence = owner.release();

    assert!(mock.is_live(fence.raw()));
    device.destroy_fence(fence);
}
