//! # Math Module
//!
//! The small amount of matrix math the projection pipeline needs.
//!
//! ## Plain English
//!
//! The emulated graphics chip hands us a 4x4 matrix and expects every
//! vertex to be multiplied by it. We keep that chip's conventions exactly
//! so the numbers we read out of a matrix mean what the game intended:
//!
//! - Row-major storage, cells named `<row><col>` with rows/columns `x y z w`
//! - Row vectors: a vertex is transformed as `v' = v * M`
//! - `A * B` therefore applies `A` first, then `B`
//!
//! Vectors and quaternions come from `glam`. Conversions to and from
//! `glam::Mat4` keep the transform (and the memory layout) identical.

mod matrix;

pub use matrix::{Matrix3, Matrix4};

pub use glam::{Quat, Vec3, Vec4};

/// Returns `-1.0` for negative values and `1.0` otherwise (zero included).
#[inline]
pub fn sign_of(value: f32) -> f32 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Full field of view in degrees for a projection scale factor (`xx` or `yy`).
///
/// Returns `0.0` when the scale is zero, which callers treat as
/// "no FOV on this axis".
#[inline]
pub fn fov_from_scale(scale: f32) -> f32 {
    if scale == 0.0 || !scale.is_finite() {
        return 0.0;
    }
    2.0 * (1.0 / scale).atan().to_degrees()
}

/// Tangent of half a full angle given in degrees.
#[inline]
pub fn half_tan_deg(fov_deg: f32) -> f32 {
    (fov_deg.to_radians() / 2.0).tan()
}
