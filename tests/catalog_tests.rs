//! Unit tests for device catalog enumeration and degradation
//!
//! The catalog must never fail: whatever the platform backend does, the
//! caller always gets a list starting with the "none" sentinel.

use framegrab::backend::mock::MockInputBackend;
use framegrab::backend::DesktopFormat;
use framegrab::{DeviceCatalog, VideoMode, INVALID_DEVICE_ID, NONE_DEVICE_ID};

fn mock_catalog(backend: MockInputBackend) -> DeviceCatalog {
    DeviceCatalog::new(Some(Box::new(backend)), None)
}

// ============================================================================
// SENTINEL AND DEGRADATION TESTS
// ============================================================================

#[test]
fn test_list_devices_always_starts_with_the_none_sentinel() {
    let catalog = mock_catalog(MockInputBackend::new());
    let devices = catalog.list_devices();
    assert!(!devices.is_empty());
    assert_eq!(devices[0].id, NONE_DEVICE_ID);
    assert_eq!(devices[1].id, "mock0");
}

#[test]
fn test_missing_backend_degrades_to_sentinel_catalog() {
    let catalog = DeviceCatalog::new(None, None);
    let devices = catalog.list_devices();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, NONE_DEVICE_ID);
    assert!(catalog.backend_name().is_none());
}

#[test]
fn test_broken_enumeration_degrades_to_sentinel_catalog() {
    let mut backend = MockInputBackend::new();
    backend.set_fail_enumeration();
    let catalog = mock_catalog(backend);

    let devices = catalog.list_devices();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, NONE_DEVICE_ID);
    assert!(catalog.list_modes("mock0").is_empty());
    assert_eq!(catalog.default_device_id(), INVALID_DEVICE_ID);
}

// ============================================================================
// DEFAULT DEVICE RESOLUTION TESTS
// ============================================================================

#[test]
fn test_default_device_is_the_last_enumerated_camera() {
    let backend = MockInputBackend::with_devices(vec![
        ("cam0", "First Camera"),
        ("cam1", "Second Camera"),
    ]);
    let catalog = mock_catalog(backend);
    assert_eq!(catalog.default_device_id(), "cam1");
}

#[test]
fn test_default_device_without_backend_is_invalid() {
    let catalog = DeviceCatalog::new(None, None);
    assert_eq!(catalog.default_device_id(), INVALID_DEVICE_ID);
}

#[test]
fn test_default_device_with_empty_list_is_invalid() {
    let catalog = mock_catalog(MockInputBackend::with_devices(Vec::new()));
    assert_eq!(catalog.default_device_id(), INVALID_DEVICE_ID);
}

// ============================================================================
// DESKTOP ENTRY TESTS
// ============================================================================

#[test]
fn test_desktop_grabber_is_listed_after_cameras() {
    let catalog = DeviceCatalog::new(
        Some(Box::new(MockInputBackend::new())),
        Some(DesktopFormat {
            name: "x11grab",
            device_id: "x11grab#:0".to_string(),
        }),
    );
    let devices = catalog.list_devices();
    let last = devices.last().unwrap();
    assert_eq!(last.id, "x11grab#:0");
    assert_eq!(last.name, "Desktop as a camera input for screen sharing");
    // The desktop entry never becomes the default device
    assert_eq!(catalog.default_device_id(), "mock0");
}

// ============================================================================
// MODE ENUMERATION TESTS
// ============================================================================

#[test]
fn test_mode_listing_passes_through_the_backend() {
    let mut backend = MockInputBackend::with_devices(vec![("cam0", "Camera")]);
    backend.set_modes(
        "cam0",
        vec![
            VideoMode::new(640, 480, 30.0),
            VideoMode::new(1280, 720, 60.0),
        ],
    );
    let catalog = mock_catalog(backend);

    let modes = catalog.list_modes("cam0");
    assert_eq!(modes.len(), 2);
    assert_eq!(modes[1].width, 1280);
    assert!(catalog.list_modes("cam1").is_empty());
}

#[test]
fn test_descriptors_are_produced_fresh_on_every_call() {
    let catalog = mock_catalog(MockInputBackend::new());
    let first = catalog.list_devices();
    let second = catalog.list_devices();
    assert_eq!(first, second);
}
