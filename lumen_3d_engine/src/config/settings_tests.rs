//! Unit tests for settings.rs

use crate::config::{
    Settings, Resolution, DisplayMode, FilterMode,
    RenderMode, CullingMode, DepthMode, FrameBuffering,
};
use crate::config::settings::normalize_sample_count;

// ============================================================================
// DEFAULTS
// ============================================================================

#[test]
fn test_defaults() {
    let s = Settings::default();
    assert_eq!(s.resolution, Resolution { width: 800, height: 600 });
    assert_eq!(s.render_mode, RenderMode::Deferred);
    assert_eq!(s.display_mode, DisplayMode::Windowed);
    assert_eq!(s.filter_mode, FilterMode::Linear);
    assert!(s.device_name.is_empty());
}

#[test]
fn test_empty_object_yields_defaults() {
    assert_eq!(Settings::from_json_str("{}"), Settings::default());
}

#[test]
fn test_invalid_json_yields_defaults() {
    assert_eq!(Settings::from_json_str("{ not json"), Settings::default());
    assert_eq!(Settings::from_json_str("[1, 2, 3]"), Settings::default());
}

// ============================================================================
// FIELD PARSING
// ============================================================================

#[test]
fn test_full_document() {
    let json = r#"{
        "device_name": "Test GPU",
        "resolution": { "width": 1920, "height": 1080 },
        "display_mode": "borderless",
        "render_mode": "forward",
        "culling_mode": "cluster",
        "depth_mode": "enabled",
        "depth_prepass": false,
        "sample_count": 4,
        "frame_buffering": "triple",
        "vsync": false,
        "low_latency": true,
        "mipmap_level": 3,
        "filter_mode": "anisotropic"
    }"#;

    let s = Settings::from_json_str(json);
    assert_eq!(s.device_name, "Test GPU");
    assert_eq!(s.resolution, Resolution { width: 1920, height: 1080 });
    assert_eq!(s.display_mode, DisplayMode::Borderless);
    assert_eq!(s.render_mode, RenderMode::Forward);
    assert_eq!(s.culling_mode, CullingMode::Clustered);
    assert_eq!(s.depth_mode, DepthMode::Enabled);
    assert!(!s.depth_prepass);
    assert_eq!(s.sample_count, 4);
    assert_eq!(s.frame_buffering, FrameBuffering::Triple);
    assert!(!s.vsync);
    assert!(s.low_latency);
    assert_eq!(s.mipmap_level, 3);
    assert_eq!(s.filter_mode, FilterMode::Anisotropic);
}

#[test]
fn test_malformed_field_falls_back_individually() {
    let json = r#"{
        "resolution": "huge",
        "culling_mode": "tile",
        "render_mode": 42,
        "vsync": "maybe"
    }"#;

    let s = Settings::from_json_str(json);
    assert_eq!(s.resolution, Resolution::default());
    assert_eq!(s.culling_mode, CullingMode::Tiled);
    assert_eq!(s.render_mode, RenderMode::Deferred);
    assert!(s.vsync);
}

#[test]
fn test_unknown_enum_value_falls_back() {
    let s = Settings::from_json_str(r#"{ "culling_mode": "octree" }"#);
    assert_eq!(s.culling_mode, CullingMode::Disabled);
}

#[test]
fn test_sample_count_normalized() {
    assert_eq!(normalize_sample_count(0), 1);
    assert_eq!(normalize_sample_count(1), 1);
    assert_eq!(normalize_sample_count(3), 2);
    assert_eq!(normalize_sample_count(6), 4);
    assert_eq!(normalize_sample_count(8), 8);
    assert_eq!(normalize_sample_count(64), 8);

    let s = Settings::from_json_str(r#"{ "sample_count": 5 }"#);
    assert_eq!(s.sample_count, 4);
}

// ============================================================================
// CONFIGURATION SNAPSHOT
// ============================================================================

#[test]
fn test_configuration_snapshot() {
    let s = Settings {
        render_mode: RenderMode::Forward,
        culling_mode: CullingMode::Tiled,
        frame_buffering: FrameBuffering::Triple,
        sample_count: 2,
        ..Settings::default()
    };

    let c = s.configuration();
    assert_eq!(c.render_mode, RenderMode::Forward);
    assert_eq!(c.culling_mode, CullingMode::Tiled);
    assert_eq!(c.frame_count(), 3);
    assert!(c.msaa_enabled());
}

#[test]
fn test_forward_tiled_snapshot_gets_depth_prepass() {
    let s = Settings {
        render_mode: RenderMode::Forward,
        culling_mode: CullingMode::Tiled,
        depth_mode: DepthMode::Disabled,
        depth_prepass: false,
        ..Settings::default()
    };

    let c = s.configuration();
    assert_eq!(c.depth_mode, DepthMode::Enabled);
    assert!(c.depth_prepass_enabled());
    // The stored settings keep what the user asked for
    assert_eq!(s.depth_mode, DepthMode::Disabled);
}

#[test]
fn test_json_round_trip_preserves_values() {
    let s = Settings {
        device_name: "GPU 0".to_string(),
        culling_mode: CullingMode::Clustered,
        display_mode: DisplayMode::Fullscreen,
        ..Settings::default()
    };

    let json = s.to_json_string().unwrap();
    assert!(json.contains("\"cluster\""));
    assert_eq!(Settings::from_json_str(&json), s);
}
