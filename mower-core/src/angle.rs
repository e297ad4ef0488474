//! Heading arithmetic in radians
//!
//! All headings handled by the controller live in (−π, π]. Any sum of two
//! headings goes through [`wrap`] before it is stored.

use core::f32::consts::{PI, TAU};

/// Normalizes an angle to (−π, π]
///
/// −π itself maps to +π so every direction has exactly one representation.
pub fn wrap(angle: f32) -> f32 {
    let mut shifted = libm::fmodf(angle + PI, TAU);
    if shifted <= 0.0 {
        shifted += TAU;
    }
    let wrapped = shifted - PI;
    // rounding can land exactly on −π for inputs a hair above an odd multiple of π
    if wrapped <= -PI {
        PI
    } else {
        wrapped
    }
}

/// Signed shortest rotation that carries `from` onto `to`, in (−π, π]
///
/// Positive means counter-clockwise.
pub fn distance(from: f32, to: f32) -> f32 {
    wrap(to - from)
}

/// Converts degrees to radians
pub fn from_degrees(degrees: f32) -> f32 {
    degrees * PI / 180.0
}

/// Converts radians to degrees
pub fn to_degrees(radians: f32) -> f32 {
    radians * 180.0 / PI
}
