//! Persisted engine settings
//!
//! Settings are stored as a JSON object. Loading is lenient: every key is
//! parsed on its own, and a missing or malformed key falls back to its
//! default so the renderer always receives a complete `Configuration`.

use std::path::Path;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use crate::error::{Lumen3dError, Lumen3dResult};
use crate::config::{Configuration, RenderMode, CullingMode, DepthMode, FrameBuffering};
use crate::{engine_debug, engine_warn};

/// Window resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self { width: 800, height: 600 }
    }
}

/// Window presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Windowed,
    Fullscreen,
    Borderless,
}

/// Texture filtering used by material samplers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
    Anisotropic,
}

/// On-disk representation of a render mode
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RenderModeKey {
    Forward,
    Deferred,
}

/// On-disk representation of a culling mode
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum CullingModeKey {
    Disabled,
    Tile,
    Cluster,
}

/// On-disk representation of a depth mode
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum DepthModeKey {
    Disabled,
    Enabled,
}

/// On-disk representation of the frame buffering
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum FrameBufferingKey {
    Double,
    Triple,
}

/// Complete engine settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Preferred physical device name (empty = first suitable device)
    pub device_name: String,
    pub resolution: Resolution,
    pub display_mode: DisplayMode,
    pub render_mode: RenderMode,
    pub culling_mode: CullingMode,
    pub depth_mode: DepthMode,
    pub depth_prepass: bool,
    /// Anti-alias sample count (normalized to 1, 2, 4 or 8)
    pub sample_count: u32,
    pub frame_buffering: FrameBuffering,
    pub vsync: bool,
    pub low_latency: bool,
    pub mipmap_level: u32,
    pub filter_mode: FilterMode,
}

impl Default for Settings {
    fn default() -> Self {
        let config = Configuration::default();
        Self {
            device_name: String::new(),
            resolution: Resolution::default(),
            display_mode: DisplayMode::default(),
            render_mode: config.render_mode,
            culling_mode: config.culling_mode,
            depth_mode: config.depth_mode,
            depth_prepass: config.depth_prepass,
            sample_count: config.sample_count,
            frame_buffering: config.frame_buffering,
            vsync: config.vsync,
            low_latency: config.low_latency,
            mipmap_level: 0,
            filter_mode: FilterMode::default(),
        }
    }
}

/// Clamp a requested sample count to the largest supported power of two not above it
pub fn normalize_sample_count(requested: u32) -> u32 {
    match requested {
        0 | 1 => 1,
        2 | 3 => 2,
        4..=7 => 4,
        _ => 8,
    }
}

/// Parse one key of the settings object, falling back to `default`
fn field<T: DeserializeOwned>(map: &Map<String, Value>, key: &str, default: T) -> T {
    match map.get(key) {
        None => default,
        Some(value) => match serde_json::from_value(value.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                engine_warn!("lumen3d::Settings", "Ignoring malformed '{}': {}", key, e);
                default
            }
        },
    }
}

impl Settings {
    /// Parse settings from a JSON document
    ///
    /// Never fails: a document that is not a JSON object yields the defaults.
    pub fn from_json_str(json: &str) -> Self {
        let map = match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                engine_warn!("lumen3d::Settings", "Settings root is not an object, using defaults");
                return Self::default();
            }
            Err(e) => {
                engine_warn!("lumen3d::Settings", "Settings are not valid JSON ({}), using defaults", e);
                return Self::default();
            }
        };

        let defaults = Self::default();

        let render_mode = match field(&map, "render_mode", None::<RenderModeKey>) {
            Some(RenderModeKey::Forward) => RenderMode::Forward,
            Some(RenderModeKey::Deferred) => RenderMode::Deferred,
            None => defaults.render_mode,
        };
        let culling_mode = match field(&map, "culling_mode", None::<CullingModeKey>) {
            Some(CullingModeKey::Disabled) => CullingMode::Disabled,
            Some(CullingModeKey::Tile) => CullingMode::Tiled,
            Some(CullingModeKey::Cluster) => CullingMode::Clustered,
            None => defaults.culling_mode,
        };
        let depth_mode = match field(&map, "depth_mode", None::<DepthModeKey>) {
            Some(DepthModeKey::Disabled) => DepthMode::Disabled,
            Some(DepthModeKey::Enabled) => DepthMode::Enabled,
            None => defaults.depth_mode,
        };
        let frame_buffering = match field(&map, "frame_buffering", None::<FrameBufferingKey>) {
            Some(FrameBufferingKey::Double) => FrameBuffering::Double,
            Some(FrameBufferingKey::Triple) => FrameBuffering::Triple,
            None => defaults.frame_buffering,
        };

        Self {
            device_name: field(&map, "device_name", defaults.device_name),
            resolution: field(&map, "resolution", defaults.resolution),
            display_mode: field(&map, "display_mode", defaults.display_mode),
            render_mode,
            culling_mode,
            depth_mode,
            depth_prepass: field(&map, "depth_prepass", defaults.depth_prepass),
            sample_count: normalize_sample_count(field(&map, "sample_count", defaults.sample_count)),
            frame_buffering,
            vsync: field(&map, "vsync", defaults.vsync),
            low_latency: field(&map, "low_latency", defaults.low_latency),
            mipmap_level: field(&map, "mipmap_level", defaults.mipmap_level),
            filter_mode: field(&map, "filter_mode", defaults.filter_mode),
        }
    }

    /// Load settings from a file
    ///
    /// A missing or unreadable file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                engine_debug!("lumen3d::Settings", "Loaded settings from {}", path.display());
                Self::from_json_str(&content)
            }
            Err(e) => {
                engine_warn!("lumen3d::Settings", "Cannot read {} ({}), using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Serialize settings to a pretty-printed JSON document
    pub fn to_json_string(&self) -> Lumen3dResult<String> {
        let render_mode = match self.render_mode {
            RenderMode::Forward => RenderModeKey::Forward,
            RenderMode::Deferred => RenderModeKey::Deferred,
        };
        let culling_mode = match self.culling_mode {
            CullingMode::Disabled => CullingModeKey::Disabled,
            CullingMode::Tiled => CullingModeKey::Tile,
            CullingMode::Clustered => CullingModeKey::Cluster,
        };
        let depth_mode = match self.depth_mode {
            DepthMode::Disabled => DepthModeKey::Disabled,
            DepthMode::Enabled => DepthModeKey::Enabled,
        };
        let frame_buffering = match self.frame_buffering {
            FrameBuffering::Double => FrameBufferingKey::Double,
            FrameBuffering::Triple => FrameBufferingKey::Triple,
        };

        let value = serde_json::json!({
            "device_name": self.device_name,
            "resolution": self.resolution,
            "display_mode": self.display_mode,
            "render_mode": render_mode,
            "culling_mode": culling_mode,
            "depth_mode": depth_mode,
            "depth_prepass": self.depth_prepass,
            "sample_count": self.sample_count,
            "frame_buffering": frame_buffering,
            "vsync": self.vsync,
            "low_latency": self.low_latency,
            "mipmap_level": self.mipmap_level,
            "filter_mode": self.filter_mode,
        });

        serde_json::to_string_pretty(&value)
            .map_err(|e| Lumen3dError::BackendError(format!("Cannot serialize settings: {}", e)))
    }

    /// Write settings to a file as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Lumen3dResult<()> {
        let json = self.to_json_string()?;
        std::fs::write(path.as_ref(), json).map_err(|e| {
            Lumen3dError::BackendError(format!("Cannot write {}: {}", path.as_ref().display(), e))
        })
    }

    /// Render configuration snapshot derived from these settings
    ///
    /// Tiled culling turns on the depth it reads (see
    /// `Configuration::with_culling_depth`).
    pub fn configuration(&self) -> Configuration {
        let requested = Configuration {
            render_mode: self.render_mode,
            culling_mode: self.culling_mode,
            depth_mode: self.depth_mode,
            depth_prepass: self.depth_prepass,
            sample_count: normalize_sample_count(self.sample_count),
            frame_buffering: self.frame_buffering,
            vsync: self.vsync,
            low_latency: self.low_latency,
        };
        let config = requested.with_culling_depth();
        if config != requested {
            engine_warn!(
                "lumen3d::Settings",
                "Tiled culling needs a depth buffer before shading, enabling depth (prepass {})",
                config.depth_prepass_enabled()
            );
        }
        config
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
