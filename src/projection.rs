//! # Projection Decomposer
//!
//! Reads meaning back out of an opaque projection matrix.
//!
//! ## Plain English Explanation
//!
//! The game never tells us "this is a 60 degree camera with a near plane
//! at 10 cm". It just hands the graphics chip 16 numbers. Luckily a
//! projection matrix is built from a handful of formulas, so we can run
//! those formulas backwards:
//!
//! - `zw == -1` means perspective, anything else is orthographic
//! - `xx` and `yy` are `1 / tan(fov / 2)` on each axis
//! - `zz` and `wz` encode the near and far clip planes
//! - `zx` and `zy` shift the frustum off-centre
//!
//! This module also holds the small corrections applied to every matrix
//! before anything looks at it: undoing a mirrored viewport, the depth-range
//! workaround, and the final viewport scale.

use log::{debug, warn};

use crate::math::{fov_from_scale, half_tan_deg, Matrix4, Vec3};

// ============================================
// SIGNATURE
// ============================================

/// The seven values that identify a projection for scene detection.
///
/// Off-axis cells (`zx`, `zy`) are used for perspective matrices and the
/// translation cells (`wx`, `wy`) for orthographic ones.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProjectionSignature(pub [f32; 7]);

impl ProjectionSignature {
    pub fn of(m: &Matrix4) -> Self {
        let perspective = is_perspective(m);
        Self([
            m.xx,
            if perspective { m.zx } else { m.wx },
            m.yy,
            if perspective { m.zy } else { m.wy },
            m.zz,
            m.wz,
            m.zw,
        ])
    }
}

// ============================================
// DECOMPOSED PARAMETERS
// ============================================

/// Screen-space rectangle covered by an orthographic projection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrthoBounds {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

/// What a projection matrix means.
///
/// ## Degenerate input
///
/// A zero `xx` or `yy` reports a FOV of `0.0` on that axis. Callers treat
/// zero as "undefined" rather than as a real angle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionParams {
    pub is_perspective: bool,
    /// Horizontal FOV in degrees. Negative when the x axis is mirrored.
    pub hfov_deg: f32,
    /// Vertical FOV in degrees. Negative when the y axis is mirrored.
    pub vfov_deg: f32,
    pub z_near: f32,
    /// `f32::INFINITY` for an infinite far plane.
    pub z_far: f32,
    pub off_axis_x: f32,
    pub off_axis_y: f32,
    /// Only for orthographic matrices with both scales defined.
    pub bounds: Option<OrthoBounds>,
}

impl ProjectionParams {
    /// True for a perspective matrix with a usable FOV on both axes.
    pub fn is_3d(&self) -> bool {
        self.is_perspective && self.hfov_deg != 0.0 && self.vfov_deg != 0.0
    }

    /// True when the frustum is shifted off-centre.
    pub fn is_off_axis(&self) -> bool {
        self.off_axis_x != 0.0 || self.off_axis_y != 0.0
    }
}

#[inline]
pub fn is_perspective(m: &Matrix4) -> bool {
    m.zw == -1.0
}

/// Division that yields `0.0` instead of NaN or infinity.
#[inline]
pub(crate) fn safe_div(numerator: f32, denominator: f32) -> f32 {
    if denominator == 0.0 {
        return 0.0;
    }
    let q = numerator / denominator;
    if q.is_finite() {
        q
    } else {
        0.0
    }
}

/// Recovers FOV, clip planes and layout from a projection matrix.
///
/// ## Formulas
///
/// ```text
/// perspective   z_near = wz / (zz - 1)      z_far = wz / (zz + 1)
/// orthographic  z_far  = wz / zz            z_near = (1 + zz * z_far) / zz
///               left   = -(wx + 1) / xx     right  = left + 2 / xx
///               bottom = -(wy + 1) / yy     top    = bottom + 2 / yy
/// ```
///
/// `zz == -1` on a perspective matrix is an infinite far plane.
/// Nothing here ever returns NaN.
pub fn decompose(m: &Matrix4) -> ProjectionParams {
    let perspective = is_perspective(m);
    let hfov_deg = fov_from_scale(m.xx);
    let vfov_deg = fov_from_scale(m.yy);

    if perspective {
        let (z_near, z_far) = if m.zz == 0.0 {
            (0.0, 0.0)
        } else if m.zz == -1.0 {
            (safe_div(m.wz, m.zz - 1.0), f32::INFINITY)
        } else {
            (safe_div(m.wz, m.zz - 1.0), safe_div(m.wz, m.zz + 1.0))
        };

        return ProjectionParams {
            is_perspective: true,
            hfov_deg,
            vfov_deg,
            z_near,
            z_far,
            off_axis_x: m.zx,
            off_axis_y: m.zy,
            bounds: None,
        };
    }

    let (z_near, z_far) = if m.zz == 0.0 {
        (0.0, 0.0)
    } else {
        let far = safe_div(m.wz, m.zz);
        (safe_div(1.0 + m.zz * far, m.zz), far)
    };

    let bounds = if m.xx != 0.0 && m.yy != 0.0 {
        let left = -(m.wx + 1.0) / m.xx;
        let bottom = -(m.wy + 1.0) / m.yy;
        Some(OrthoBounds {
            left,
            right: left + 2.0 / m.xx,
            bottom,
            top: bottom + 2.0 / m.yy,
        })
    } else {
        None
    };

    ProjectionParams {
        is_perspective: false,
        hfov_deg,
        vfov_deg,
        z_near,
        z_far,
        off_axis_x: 0.0,
        off_axis_y: 0.0,
        bounds,
    }
}

/// Builds an on-axis perspective matrix from full FOV angles in degrees.
///
/// `far == f32::INFINITY` produces the infinite-far form.
pub fn perspective_matrix(hfov_deg: f32, vfov_deg: f32, near: f32, far: f32) -> Matrix4 {
    let (zz, wz) = if far.is_infinite() {
        (-1.0, -2.0 * near)
    } else {
        (-(far + near) / (far - near), -2.0 * far * near / (far - near))
    };
    Matrix4 {
        xx: 1.0 / half_tan_deg(hfov_deg),
        yy: 1.0 / half_tan_deg(vfov_deg),
        zz,
        zw: -1.0,
        wz,
        ww: 0.0,
        ..Matrix4::ZERO
    }
}

/// Builds an orthographic matrix covering the given screen rectangle.
pub fn orthographic_matrix(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Matrix4 {
    Matrix4 {
        xx: 2.0 / (right - left),
        yy: 2.0 / (top - bottom),
        zz: -2.0 / (far - near),
        wx: -(right + left) / (right - left),
        wy: -(top + bottom) / (top - bottom),
        wz: -(far + near) / (far - near),
        ww: 1.0,
        ..Matrix4::ZERO
    }
}

// ============================================
// PRE-COMPOSITION CORRECTIONS
// ============================================

/// Undoes a mirrored viewport by negating the scale and translation of the
/// inverted axis.
pub fn correct_viewport_flip(m: &Matrix4, inverted_x: bool, inverted_y: bool) -> Matrix4 {
    let mut out = *m;
    if inverted_x {
        out.xx = -out.xx;
        out.wx = -out.wx;
    }
    if inverted_y {
        out.yy = -out.yy;
        out.wy = -out.wy;
    }
    out
}

/// Viewport depth mapping as normalised `0..1` values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthRange {
    pub z_center: f32,
    pub z_scale: f32,
    pub depth_min: f32,
    pub depth_max: f32,
}

impl Default for DepthRange {
    fn default() -> Self {
        Self {
            z_center: 0.5,
            z_scale: 0.5,
            depth_min: 0.0,
            depth_max: 1.0,
        }
    }
}

impl DepthRange {
    /// The far end of the viewport depth range lies below zero.
    pub fn far_is_negative(&self) -> bool {
        self.z_center + self.z_scale < 0.0
    }
}

/// Pulls the far plane in when the viewport depth range goes negative.
///
/// Some games set a depth range whose far end is below zero, which the
/// host clamps and clips geometry with. The far plane is re-derived so the
/// visible depth fits the clamped range. The matrix is returned unchanged
/// unless the new `zz`/`wz` pair is finite.
pub fn apply_depth_range_hack(m: &Matrix4, range: &DepthRange) -> Matrix4 {
    if !range.far_is_negative() || m.zw >= 0.0 {
        return *m;
    }

    let n = m.wz / (m.zz - 1.0);
    let f = m.wz / (m.zz + 1.0);
    let f = (n * f) / (n + ((range.z_center + range.z_scale) * (n - f) / (range.depth_max - range.depth_min)));

    let zz = (n + f) / (n - f);
    let wz = (2.0 * n * f) / (n - f);

    if zz.is_finite() && wz.is_finite() {
        debug!("Depth range hack: far plane now {:.3}", f);
        Matrix4 { zz, wz, ..*m }
    } else {
        warn!("Depth range hack produced a non-finite matrix, skipping");
        *m
    }
}

// ============================================
// VIEWPORT SCALE CORRECTION
// ============================================

/// Maps the game's viewport onto the one actually rendered.
///
/// Applied to every finished matrix just before it is handed out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportCorrection {
    pub offset: Vec3,
    pub scale: Vec3,
}

impl ViewportCorrection {
    pub const IDENTITY: Self = Self {
        offset: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn new(offset: Vec3, scale: Vec3) -> Self {
        Self { offset, scale }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn apply(&self, m: &Matrix4) -> Matrix4 {
        if self.is_identity() {
            return *m;
        }
        m.translate_and_scale(self.offset, self.scale)
    }
}

impl Default for ViewportCorrection {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ============================================
// TESTS
// ============================================
