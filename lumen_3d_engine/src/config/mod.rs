//! Render configuration and persisted settings
//!
//! `Configuration` is the immutable snapshot the renderer is built from.
//! `Settings` is the on-disk file it is derived from.

pub mod configuration;
pub mod settings;

pub use configuration::{
    Configuration, RenderMode, CullingMode, DepthMode, FrameBuffering,
};
pub use settings::{Settings, Resolution, DisplayMode, FilterMode};
