//! Unit tests for capture session lifecycle and registry ticking
//!
//! All sessions run over the synthetic mock backend: its packet plan cycles
//! video frame / audio packet / video frame / transient gap, so the whole
//! decode-and-convert path is exercised without hardware.

use framegrab::backend::mock::MockInputBackend;
use framegrab::{
    CaptureError, CaptureSession, DeviceCatalog, SessionRegistry, VideoMode,
};

fn mock_setup() -> (DeviceCatalog, SessionRegistry) {
    framegrab::init();
    (
        DeviceCatalog::new(Some(Box::new(MockInputBackend::new())), None),
        SessionRegistry::new(),
    )
}

fn catalog_with(backend: MockInputBackend) -> DeviceCatalog {
    DeviceCatalog::new(Some(Box::new(backend)), None)
}

// ============================================================================
// OPEN AND BUFFER CONTRACT TESTS
// ============================================================================

#[test]
fn test_read_before_any_update_returns_stable_zeroed_buffer() {
    let (catalog, registry) = mock_setup();
    let session = CaptureSession::open(&catalog, &registry, Some("mock0"), None).unwrap();
    let mut session = session.lock();

    assert_eq!(session.width(), 640);
    assert_eq!(session.height(), 480);
    assert!(!session.is_dirty());

    let frame = session.read_frame().unwrap();
    assert_eq!(frame.len(), 640 * 480 * 3);
    assert!(frame.iter().all(|&b| b == 0));
}

#[test]
fn test_update_decodes_and_marks_dirty() {
    let (catalog, registry) = mock_setup();
    let session = CaptureSession::open(&catalog, &registry, Some("mock0"), None).unwrap();
    let mut session = session.lock();

    session.update().unwrap();
    assert!(session.is_dirty());

    let frame = session.read_frame().unwrap();
    assert_eq!(frame.len(), 640 * 480 * 3, "conversion never resizes the buffer");
    assert!(frame.iter().any(|&b| b != 0), "decoded content reached the buffer");
    assert!(!session.is_dirty(), "read acknowledges the frame");

    // Re-reading without a new frame is idempotent
    let again = session.read_frame().unwrap();
    assert_eq!(frame, again);
}

#[test]
fn test_non_video_and_empty_ticks_are_no_ops() {
    let (catalog, registry) = mock_setup();
    let session = CaptureSession::open(&catalog, &registry, Some("mock0"), None).unwrap();
    let mut session = session.lock();

    session.update().unwrap();
    let first = session.read_frame().unwrap();

    // Tick 1 is an audio packet, tick 3 a transient gap: neither dirties
    session.update().unwrap();
    assert!(!session.is_dirty());

    // Tick 2 is a fresh video frame
    session.update().unwrap();
    assert!(session.is_dirty());
    let second = session.read_frame().unwrap();
    assert_ne!(first, second);

    session.update().unwrap();
    assert!(!session.is_dirty());
}

#[test]
fn test_open_resolves_the_default_device() {
    let (catalog, registry) = mock_setup();
    let session = CaptureSession::open(&catalog, &registry, None, None).unwrap();
    assert_eq!(session.lock().width(), 640);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_open_unknown_device_fails() {
    let (catalog, registry) = mock_setup();
    let result = CaptureSession::open(&catalog, &registry, Some("nope"), None);
    assert!(matches!(
        result,
        Err(CaptureError::DeviceUnavailable { .. })
    ));
    assert!(registry.is_empty());
}

#[test]
fn test_open_none_sentinel_fails() {
    let (catalog, registry) = mock_setup();
    let result = CaptureSession::open(&catalog, &registry, Some("none"), None);
    assert!(matches!(
        result,
        Err(CaptureError::DeviceUnavailable { .. })
    ));
}

#[test]
fn test_busy_device_propagates_as_open_failure() {
    let mut backend = MockInputBackend::new();
    backend.set_busy("mock0");
    let catalog = catalog_with(backend);
    let registry = SessionRegistry::new();

    let result = CaptureSession::open(&catalog, &registry, Some("mock0"), None);
    assert!(matches!(
        result,
        Err(CaptureError::DeviceUnavailable { .. })
    ));
    assert!(registry.is_empty(), "failed opens are never registered");
}

#[test]
fn test_source_without_video_stream_fails_negotiation() {
    let mut backend = MockInputBackend::new();
    backend.set_without_video("mock0");
    let catalog = catalog_with(backend);
    let registry = SessionRegistry::new();

    let result = CaptureSession::open(&catalog, &registry, Some("mock0"), None);
    assert!(matches!(result, Err(CaptureError::NoVideoStream)));
    assert!(registry.is_empty());
}

// ============================================================================
// MODE NEGOTIATION TESTS
// ============================================================================

#[test]
fn test_requested_mode_gates_the_negotiated_geometry() {
    let (catalog, registry) = mock_setup();
    let session = CaptureSession::open(
        &catalog,
        &registry,
        Some("mock0"),
        Some(VideoMode::new(1280, 720, 30.0)),
    )
    .unwrap();
    let session = session.lock();
    assert_eq!(session.width(), 1280);
    assert_eq!(session.height(), 720);
}

#[test]
fn test_close_enough_mode_is_accepted() {
    let (catalog, registry) = mock_setup();
    // 1286x716 is 10 away from the offered 1280x720, well within 300
    let session = CaptureSession::open(
        &catalog,
        &registry,
        Some("mock0"),
        Some(VideoMode::new(1286, 716, 30.0)),
    )
    .unwrap();
    assert_eq!(session.lock().width(), 1280);
}

#[test]
fn test_far_off_mode_fails_instead_of_silently_substituting() {
    let (catalog, registry) = mock_setup();
    let result = CaptureSession::open(
        &catalog,
        &registry,
        Some("mock0"),
        Some(VideoMode::new(5000, 5000, 30.0)),
    );
    let err = result.unwrap_err();
    assert!(err.is_mode_mismatch());
    assert!(registry.is_empty());

    // The caller's documented fallback: retry unconstrained
    let session = CaptureSession::open(&catalog, &registry, Some("mock0"), None).unwrap();
    assert_eq!(session.lock().width(), 640);
}

#[test]
fn test_unset_requested_mode_is_treated_as_unconstrained() {
    let (catalog, registry) = mock_setup();
    let session = CaptureSession::open(
        &catalog,
        &registry,
        Some("mock0"),
        Some(VideoMode::default()),
    )
    .unwrap();
    assert_eq!(session.lock().width(), 640);
}

// ============================================================================
// PLAYBACK STATE TESTS
// ============================================================================

#[test]
fn test_play_pause_seek_are_stateful_stubs() {
    let (catalog, registry) = mock_setup();
    let session = CaptureSession::open(&catalog, &registry, Some("mock0"), None).unwrap();
    let mut session = session.lock();

    assert!(!session.is_playing());
    session.play().unwrap();
    assert!(session.is_playing());
    assert!(session.start_time() > 0.0);

    session.pause().unwrap();
    assert!(!session.is_playing());

    session.seek_to(12.5).unwrap();
    assert_eq!(session.start_frame_time(), 12.5);

    session.set_looping(true).unwrap();
    assert!(session.looping());
}

// ============================================================================
// CLOSE SEMANTICS TESTS
// ============================================================================

#[test]
fn test_every_operation_after_close_reports_session_closed() {
    let (catalog, registry) = mock_setup();
    let session = CaptureSession::open(&catalog, &registry, Some("mock0"), None).unwrap();
    let mut session = session.lock();

    session.update().unwrap();
    session.close(&registry).unwrap();
    assert!(registry.is_empty());
    assert!(!session.is_loaded());

    assert!(matches!(session.update(), Err(CaptureError::SessionClosed)));
    assert!(matches!(session.play(), Err(CaptureError::SessionClosed)));
    assert!(matches!(session.pause(), Err(CaptureError::SessionClosed)));
    assert!(matches!(
        session.seek_to(1.0),
        Err(CaptureError::SessionClosed)
    ));
    assert!(matches!(
        session.read_frame(),
        Err(CaptureError::SessionClosed)
    ));
    assert!(matches!(
        session.close(&registry),
        Err(CaptureError::SessionClosed)
    ));
}

#[test]
fn test_close_is_safe_right_after_a_partial_tick() {
    let (catalog, registry) = mock_setup();
    let session = CaptureSession::open(&catalog, &registry, Some("mock0"), None).unwrap();
    let mut session = session.lock();

    // Advance to the transient-gap tick, then close mid-"playing"
    for _ in 0..4 {
        session.update().unwrap();
    }
    session.play().unwrap();
    session.close(&registry).unwrap();
    assert!(registry.is_empty());
}

// ============================================================================
// REGISTRY TESTS
// ============================================================================

#[test]
fn test_tick_all_with_zero_sessions_is_a_no_op() {
    let registry = SessionRegistry::new();
    assert!(registry.is_empty());
    registry.tick_all();
    assert!(registry.is_empty());
}

#[test]
fn test_tick_all_advances_every_session_exactly_once() {
    let (catalog, registry) = mock_setup();
    let first = CaptureSession::open(&catalog, &registry, Some("mock0"), None).unwrap();
    let second = CaptureSession::open(&catalog, &registry, Some("mock0"), None).unwrap();
    assert_eq!(registry.len(), 2);

    // Tick 0 of the packet plan is a video frame for both sessions
    registry.tick_all();
    assert!(first.lock().is_dirty());
    assert!(second.lock().is_dirty());

    first.lock().read_frame().unwrap();
    second.lock().read_frame().unwrap();

    // One call advances each session by exactly one tick: tick 1 is the
    // audio packet, so nothing re-dirties
    registry.tick_all();
    assert!(!first.lock().is_dirty());
    assert!(!second.lock().is_dirty());

    // Tick 2 is a video frame again
    registry.tick_all();
    assert!(first.lock().is_dirty());
    assert!(second.lock().is_dirty());
}

#[test]
fn test_closing_one_session_does_not_stop_ticking_the_rest() {
    let (catalog, registry) = mock_setup();
    let first = CaptureSession::open(&catalog, &registry, Some("mock0"), None).unwrap();
    let second = CaptureSession::open(&catalog, &registry, Some("mock0"), None).unwrap();

    first.lock().close(&registry).unwrap();
    assert_eq!(registry.len(), 1);

    registry.tick_all();
    assert!(second.lock().is_dirty());
    assert!(!first.lock().is_dirty());
}
