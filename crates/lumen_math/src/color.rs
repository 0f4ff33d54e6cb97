//! Linear RGB color helpers.
//!
//! All light-transport math happens in linear space. Scene-authored colors
//! that are meant to be displayed (the background) are sRGB-encoded and must
//! be decoded with [`srgb_to_linear`] before use.

use crate::Vec3;

/// Color type alias (linear RGB, typically 0-1 but unbounded for radiance)
pub type Color = Vec3;

/// Decode one sRGB-encoded channel to linear.
#[inline]
pub fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

/// Encode one linear channel to sRGB. Negative input maps to 0.
#[inline]
pub fn linear_to_srgb(value: f32) -> f32 {
    if value <= 0.0 {
        0.0
    } else if value <= 0.003_130_8 {
        value * 12.92
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}

/// Scalar "strength" of a color used for Russian roulette and emitter tests.
///
/// This is the largest channel, so a valid albedo always maps into [0, 1].
#[inline]
pub fn magnitude(color: Color) -> f32 {
    color.max_element().max(0.0)
}
