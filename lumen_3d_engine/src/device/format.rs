//! Format selection
//!
//! Candidates are scanned in order and the first one supporting every
//! requested feature is returned. Order is the caller's preference.

use crate::error::{Lumen3dError, Lumen3dResult};
use crate::device::{Format, FormatFeatures, GraphicsDevice};
use crate::engine_error;

/// Depth attachment candidates, most precise first
pub const DEPTH_FORMAT_CANDIDATES: [Format; 3] = [
    Format::D32_SFLOAT,
    Format::D32_SFLOAT_S8_UINT,
    Format::D24_UNORM_S8_UINT,
];

/// G-buffer position/normal candidates (need signed, high-range storage)
pub const GBUFFER_FLOAT_CANDIDATES: [Format; 2] = [
    Format::R16G16B16A16_SFLOAT,
    Format::R32G32B32A32_SFLOAT,
];

/// G-buffer albedo candidates
pub const GBUFFER_COLOR_CANDIDATES: [Format; 2] = [
    Format::R8G8B8A8_UNORM,
    Format::B8G8R8A8_UNORM,
];

/// First candidate whose reported features contain `required`
pub fn select_format<F>(candidates: &[Format], required: FormatFeatures, features: F) -> Lumen3dResult<Format>
where
    F: Fn(Format) -> FormatFeatures,
{
    candidates
        .iter()
        .copied()
        .find(|&format| features(format).contains(required))
        .ok_or_else(|| {
            engine_error!(
                "lumen3d::format",
                "None of {:?} supports {:?}",
                candidates, required
            );
            Lumen3dError::NoSupportedFormat(format!("{:?}", required))
        })
}

/// Select an optimally tiled image format
pub fn select_image_format(
    device: &dyn GraphicsDevice,
    candidates: &[Format],
    required: FormatFeatures,
) -> Lumen3dResult<Format> {
    select_format(candidates, required, |format| device.format_features(format))
}

/// Select a buffer (texel) format
pub fn select_buffer_format(
    device: &dyn GraphicsDevice,
    candidates: &[Format],
    required: FormatFeatures,
) -> Lumen3dResult<Format> {
    select_format(candidates, required, |format| device.buffer_format_features(format))
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
