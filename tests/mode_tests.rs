//! Unit tests for video mode equality, distance and tolerance matching

use framegrab::{closest_mode, VideoMode, UNSPECIFIED_RATE};

// ============================================================================
// EQUALITY TESTS
// ============================================================================

#[test]
fn test_equality_holds_for_identical_modes() {
    let a = VideoMode::new(640, 480, 30.0);
    let b = VideoMode::new(640, 480, 30.0);
    assert_eq!(a, b);
}

#[test]
fn test_equality_fails_when_any_field_differs() {
    let base = VideoMode::new(640, 480, 30.0);

    assert_ne!(base, VideoMode::new(641, 480, 30.0));
    assert_ne!(base, VideoMode::new(640, 481, 30.0));
    assert_ne!(base, VideoMode::new(640, 480, 29.97));
    assert_ne!(
        base,
        VideoMode {
            pixel_format: 7,
            ..base
        }
    );
    assert_ne!(base, VideoMode { x: 1, ..base });
    assert_ne!(base, VideoMode { y: -1, ..base });
}

#[test]
fn test_frame_rate_equality_is_exact() {
    // No epsilon on equality itself; tolerance applies only to matching
    let a = VideoMode::new(640, 480, 30.0);
    let b = VideoMode::new(640, 480, 30.0 + f32::EPSILON * 64.0);
    assert_ne!(a, b);
}

// ============================================================================
// DISTANCE AND TOLERANCE TESTS
// ============================================================================

#[test]
fn test_norm_is_manhattan_distance_in_resolution_space() {
    let a = VideoMode::new(640, 480, 30.0);
    assert_eq!(a.norm(&VideoMode::new(640, 480, 60.0)), 0);
    assert_eq!(a.norm(&VideoMode::new(632, 480, 30.0)), 8);
    assert_eq!(a.norm(&VideoMode::new(1920, 1080, 30.0)), 1280 + 600);
    // Negative deltas normalize to positive
    assert_eq!(VideoMode::new(1920, 1080, 30.0).norm(&a), 1280 + 600);
    assert_eq!(a.norm(&VideoMode::new(0, 0, 0.0)), 1120);
}

#[test]
fn test_tolerance_floors_at_300() {
    assert_eq!(VideoMode::new(640, 480, 30.0).tolerance(), 300);
    assert_eq!(VideoMode::new(0, 0, 0.0).tolerance(), 300);
}

#[test]
fn test_tolerance_scales_with_resolution() {
    assert_eq!(VideoMode::new(3840, 2160, 30.0).tolerance(), 600);
    assert_eq!(VideoMode::new(1920, 1080, 60.0).tolerance(), 300);
}

// ============================================================================
// MATCHING TESTS
// ============================================================================

#[test]
fn test_matching_selects_nearest_mode_within_tolerance() {
    let requested = VideoMode::new(640, 480, 30.0);
    let offered = vec![
        VideoMode::new(632, 480, 30.0),
        VideoMode::new(1920, 1080, 30.0),
    ];

    let matched = closest_mode(&requested, &offered).expect("within tolerance");
    assert_eq!(matched, offered[0]);
}

#[test]
fn test_matching_rejects_modes_outside_tolerance() {
    let requested = VideoMode::new(640, 480, 30.0);
    let offered = vec![VideoMode::new(1920, 1080, 30.0)];
    assert!(closest_mode(&requested, &offered).is_none());
}

#[test]
fn test_matching_uses_the_requested_tolerance() {
    // 4K tolerance is 600, so a 1280+600-away candidate fails for VGA but a
    // 500-away candidate passes for 4K
    let requested = VideoMode::new(3840, 2160, 30.0);
    let offered = vec![VideoMode::new(3440, 2060, 30.0)];
    assert!(closest_mode(&requested, &offered).is_some());
}

#[test]
fn test_matching_empty_offer_fails() {
    let requested = VideoMode::new(640, 480, 30.0);
    assert!(closest_mode(&requested, &[]).is_none());
}

// ============================================================================
// UNSET MODE TESTS
// ============================================================================

#[test]
fn test_unset_mode_detection() {
    assert!(VideoMode::default().is_unset());
    assert!(VideoMode::new(0, 0, 0.9).is_unset());
    assert!(!VideoMode::new(0, 0, UNSPECIFIED_RATE).is_unset());
    assert!(!VideoMode::new(640, 480, 0.0).is_unset());
}
