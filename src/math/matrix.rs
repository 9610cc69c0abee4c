//! # Matrix Types
//!
//! Named-field 3x3 and 4x4 matrices in the fixed-function convention.
//!
//! ## Plain English
//!
//! The cells have names instead of indices because the projection code
//! reads specific cells to understand a matrix: `xx` and `yy` hold the
//! field of view, `zz` and `wz` hold the clip planes, `zx` and `zy` hold
//! the off-axis shift, and `zw` tells perspective (`-1`) from
//! orthographic. Writing `m.zw` instead of `m.data[11]` keeps that
//! readable.
//!
//! ```text
//!        col x   col y   col z   col w
//! row x [ xx      xy      xz      xw ]   data[0..4]
//! row y [ yx      yy      yz      yw ]   data[4..8]
//! row z [ zx      zy      zz      zw ]   data[8..12]
//! row w [ wx      wy      wz      ww ]   data[12..16]
//! ```

use std::ops::Mul;

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Quat, Vec3, Vec4};

// ============================================
// 4x4 MATRIX
// ============================================

/// A 4x4 matrix, row-major, transforming row vectors (`v * M`).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Matrix4 {
    pub xx: f32,
    pub xy: f32,
    pub xz: f32,
    pub xw: f32,
    pub yx: f32,
    pub yy: f32,
    pub yz: f32,
    pub yw: f32,
    pub zx: f32,
    pub zy: f32,
    pub zz: f32,
    pub zw: f32,
    pub wx: f32,
    pub wy: f32,
    pub wz: f32,
    pub ww: f32,
}

impl Matrix4 {
    /// The identity transform.
    pub const IDENTITY: Self = Self::from_array([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// All cells zero. Draws using this projection collapse to nothing.
    pub const ZERO: Self = Self::from_array([0.0; 16]);

    /// Builds a matrix from its 16 cells in storage order.
    pub const fn from_array(d: [f32; 16]) -> Self {
        Self {
            xx: d[0],
            xy: d[1],
            xz: d[2],
            xw: d[3],
            yx: d[4],
            yy: d[5],
            yz: d[6],
            yw: d[7],
            zx: d[8],
            zy: d[9],
            zz: d[10],
            zw: d[11],
            wx: d[12],
            wy: d[13],
            wz: d[14],
            ww: d[15],
        }
    }

    /// Returns the 16 cells in storage order.
    pub const fn to_array(&self) -> [f32; 16] {
        [
            self.xx, self.xy, self.xz, self.xw, //
            self.yx, self.yy, self.yz, self.yw, //
            self.zx, self.zy, self.zz, self.zw, //
            self.wx, self.wy, self.wz, self.ww,
        ]
    }

    /// A pure translation by `offset`.
    pub fn translation(offset: Vec3) -> Self {
        Self {
            wx: offset.x,
            wy: offset.y,
            wz: offset.z,
            ..Self::IDENTITY
        }
    }

    /// A pure (possibly non-uniform) scale.
    pub fn scaling(scale: Vec3) -> Self {
        Self {
            xx: scale.x,
            yy: scale.y,
            zz: scale.z,
            ..Self::IDENTITY
        }
    }

    /// Rotation of `radians` about the X axis (positive pitches up).
    pub fn rotation_x(radians: f32) -> Self {
        Self::from_matrix3(&Matrix3::rotation_x(radians))
    }

    /// Rotation of `radians` about the Y axis.
    pub fn rotation_y(radians: f32) -> Self {
        Self::from_matrix3(&Matrix3::rotation_y(radians))
    }

    /// Rotation of `radians` about the Z axis.
    pub fn rotation_z(radians: f32) -> Self {
        Self::from_matrix3(&Matrix3::rotation_z(radians))
    }

    /// Embeds a 3x3 rotation/scale in the upper-left corner of an identity.
    pub fn from_matrix3(m: &Matrix3) -> Self {
        Self {
            xx: m.xx,
            xy: m.xy,
            xz: m.xz,
            yx: m.yx,
            yy: m.yy,
            yz: m.yz,
            zx: m.zx,
            zy: m.zy,
            zz: m.zz,
            ..Self::IDENTITY
        }
    }

    pub fn transpose(&self) -> Self {
        Self {
            xx: self.xx,
            xy: self.yx,
            xz: self.zx,
            xw: self.wx,
            yx: self.xy,
            yy: self.yy,
            yz: self.zy,
            yw: self.wy,
            zx: self.xz,
            zy: self.yz,
            zz: self.zz,
            zw: self.wz,
            wx: self.xw,
            wy: self.yw,
            wz: self.zw,
            ww: self.ww,
        }
    }

    /// General inverse. Returns `None` for singular or non-finite matrices.
    pub fn inverse(&self) -> Option<Self> {
        let m = Mat4::from(*self);
        let det = m.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(Self::from(m.inverse()))
    }

    /// Transforms a row vector: `v * M`.
    pub fn transform(&self, v: Vec4) -> Vec4 {
        Vec4::new(
            v.x * self.xx + v.y * self.yx + v.z * self.zx + v.w * self.wx,
            v.x * self.xy + v.y * self.yy + v.z * self.zy + v.w * self.wy,
            v.x * self.xz + v.y * self.yz + v.z * self.zz + v.w * self.wz,
            v.x * self.xw + v.y * self.yw + v.z * self.zw + v.w * self.ww,
        )
    }

    /// Transforms a point (`w = 1`).
    pub fn transform_point(&self, p: Vec3) -> Vec4 {
        self.transform(p.extend(1.0))
    }

    /// True when every cell is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.to_array().iter().all(|&c| c == 0.0)
    }

    /// True when no cell is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|c| c.is_finite())
    }

    /// Replaces every non-finite cell with zero.
    ///
    /// Returns the cleaned matrix and how many cells were replaced.
    pub fn sanitized(&self) -> (Self, usize) {
        let mut replaced = 0;
        let mut cells = self.to_array();
        for cell in cells.iter_mut() {
            if !cell.is_finite() {
                *cell = 0.0;
                replaced += 1;
            }
        }
        (Self::from_array(cells), replaced)
    }

    /// Mirrors the x axis of a composed matrix, keeping `xx` itself.
    ///
    /// Used for games that draw with a negative horizontal scale.
    pub fn flip_x_axis(&self) -> Self {
        Self {
            xy: -self.xy,
            xz: -self.xz,
            xw: -self.xw,
            yx: -self.yx,
            zx: -self.zx,
            wx: -self.wx,
            ..*self
        }
    }

    /// Mirrors the y axis of a composed matrix, keeping `yy` itself.
    pub fn flip_y_axis(&self) -> Self {
        Self {
            xy: -self.xy,
            yx: -self.yx,
            yz: -self.yz,
            yw: -self.yw,
            zy: -self.zy,
            wy: -self.wy,
            ..*self
        }
    }

    /// Scales the x/y output columns and shifts them by the `w` column.
    ///
    /// This is the viewport correction applied when the rendered viewport
    /// differs from the one the game asked for.
    pub fn translate_and_scale(&self, offset: Vec3, scale: Vec3) -> Self {
        let row = |x: f32, y: f32, z: f32, w: f32| {
            (
                x * scale.x + w * offset.x,
                y * scale.y + w * offset.y,
                z * scale.z + w * offset.z,
            )
        };
        let (xx, xy, xz) = row(self.xx, self.xy, self.xz, self.xw);
        let (yx, yy, yz) = row(self.yx, self.yy, self.yz, self.yw);
        let (zx, zy, zz) = row(self.zx, self.zy, self.zz, self.zw);
        let (wx, wy, wz) = row(self.wx, self.wy, self.wz, self.ww);
        Self {
            xx,
            xy,
            xz,
            yx,
            yy,
            yz,
            zx,
            zy,
            zz,
            wx,
            wy,
            wz,
            ..*self
        }
    }

    /// Cell-wise comparison with an absolute tolerance.
    pub fn abs_diff_eq(&self, other: &Self, max_abs_diff: f32) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| (a - b).abs() <= max_abs_diff)
    }
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Matrix4 {
    type Output = Matrix4;

    fn mul(self, rhs: Matrix4) -> Matrix4 {
        // Same operand swap as `Matrix3`
        Matrix4::from(Mat4::from(rhs) * Mat4::from(self))
    }
}

// glam stores column-major and transforms column vectors, so our rows are
// its columns and the same 16 floats describe the same transform.
impl From<Mat4> for Matrix4 {
    fn from(m: Mat4) -> Self {
        Self::from_array(m.to_cols_array())
    }
}

impl From<Matrix4> for Mat4 {
    fn from(m: Matrix4) -> Self {
        Mat4::from_cols_array(&m.to_array())
    }
}

// ============================================
// 3x3 MATRIX
// ============================================

/// A 3x3 rotation/scale matrix in the same row-vector convention.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix3 {
    pub xx: f32,
    pub xy: f32,
    pub xz: f32,
    pub yx: f32,
    pub yy: f32,
    pub yz: f32,
    pub zx: f32,
    pub zy: f32,
    pub zz: f32,
}

impl Matrix3 {
    pub const IDENTITY: Self = Self {
        xx: 1.0,
        xy: 0.0,
        xz: 0.0,
        yx: 0.0,
        yy: 1.0,
        yz: 0.0,
        zx: 0.0,
        zy: 0.0,
        zz: 1.0,
    };

    pub fn rotation_x(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self {
            yy: c,
            yz: s,
            zy: -s,
            zz: c,
            ..Self::IDENTITY
        }
    }

    pub fn rotation_y(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self {
            xx: c,
            xz: -s,
            zx: s,
            zz: c,
            ..Self::IDENTITY
        }
    }

    pub fn rotation_z(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self {
            xx: c,
            xy: s,
            yx: -s,
            yy: c,
            ..Self::IDENTITY
        }
    }

    /// The rotation described by a unit quaternion.
    pub fn from_quat(q: Quat) -> Self {
        Self::from(Mat3::from_quat(q))
    }

    pub fn transpose(&self) -> Self {
        Self {
            xx: self.xx,
            xy: self.yx,
            xz: self.zx,
            yx: self.xy,
            yy: self.yy,
            yz: self.zy,
            zx: self.xz,
            zy: self.yz,
            zz: self.zz,
        }
    }

    /// Transforms a row vector: `v * M`.
    pub fn transform(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            v.x * self.xx + v.y * self.yx + v.z * self.zx,
            v.x * self.xy + v.y * self.yy + v.z * self.zy,
            v.x * self.xz + v.y * self.yz + v.z * self.zz,
        )
    }

    pub fn abs_diff_eq(&self, other: &Self, max_abs_diff: f32) -> bool {
        let a = Mat3::from(*self);
        let b = Mat3::from(*other);
        a.abs_diff_eq(b, max_abs_diff)
    }
}

impl Default for Matrix3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Matrix3 {
    type Output = Matrix3;

    fn mul(self, rhs: Matrix3) -> Matrix3 {
        // Column-vector product of the transposed forms is the same thing
        // with the operands swapped.
        Matrix3::from(Mat3::from(rhs) * Mat3::from(self))
    }
}

impl From<Mat3> for Matrix3 {
    fn from(m: Mat3) -> Self {
        Self {
            xx: m.x_axis.x,
            xy: m.x_axis.y,
            xz: m.x_axis.z,
            yx: m.y_axis.x,
            yy: m.y_axis.y,
            yz: m.y_axis.z,
            zx: m.z_axis.x,
            zy: m.z_axis.y,
            zz: m.z_axis.z,
        }
    }
}

impl From<Matrix3> for Mat3 {
    fn from(m: Matrix3) -> Self {
        Mat3::from_cols(
            Vec3::new(m.xx, m.xy, m.xz),
            Vec3::new(m.yx, m.yy, m.yz),
            Vec3::new(m.zx, m.zy, m.zz),
        )
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_array_round_trip_keeps_cell_names() {
        let cells: [f32; 16] = std::array::from_fn(|i| i as f32);
        let m = Matrix4::from_array(cells);
        assert_eq!(m.zz, 10.0);
        assert_eq!(m.zw, 11.0);
        assert_eq!(m.wz, 14.0);
        assert_eq!(m.to_array(), cells);
    }

    #[test]
    fn test_multiply_applies_left_operand_first() {
        let translate = Matrix4::translation(Vec3::new(1.0, 0.0, 0.0));
        let scale = Matrix4::scaling(Vec3::splat(2.0));

        // translate, then scale: (0 + 1) * 2
        let p = (translate * scale).transform_point(Vec3::ZERO);
        assert!((p.x - 2.0).abs() < 1e-6);

        // scale, then translate: 0 * 2 + 1
        let p = (scale * translate).transform_point(Vec3::ZERO);
        assert!((p.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_multiply_cells() {
        let a = Matrix4::from_array([
            1.0, 2.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            3.0, 0.0, 0.0, 1.0,
        ]);
        let b = Matrix4::scaling(Vec3::new(2.0, 3.0, 4.0));
        let ab = a * b;
        assert_eq!(ab.xx, 2.0);
        assert_eq!(ab.xy, 6.0);
        assert_eq!(ab.wx, 6.0);
        assert_eq!(ab.zz, 4.0);
        assert_eq!((b * a).yx, 0.0);
        assert_eq!((b * a).xy, 4.0);
    }

    #[test]
    fn test_rotation_x_pitches_forward_axis_up() {
        let p = Matrix4::rotation_x(FRAC_PI_2).transform_point(Vec3::new(0.0, 0.0, -1.0));
        assert!((p.y - 1.0).abs() < 1e-6);
        assert!(p.z.abs() < 1e-6);
    }

    #[test]
    fn test_glam_conversion_preserves_transform() {
        let m = Matrix4::rotation_y(0.3) * Matrix4::translation(Vec3::new(1.0, 2.0, 3.0));
        let g = Mat4::from(m);
        let p = Vec3::new(0.5, -1.0, 2.0);

        let ours = m.transform_point(p);
        let theirs = g * p.extend(1.0);
        assert!(ours.abs_diff_eq(theirs, 1e-5));
        assert_eq!(Matrix4::from(g), m);
    }

    #[test]
    fn test_inverse() {
        let m = Matrix4::rotation_z(0.7) * Matrix4::translation(Vec3::new(4.0, -2.0, 1.0));
        let inv = m.inverse().unwrap();
        assert!((m * inv).abs_diff_eq(&Matrix4::IDENTITY, 1e-5));
        assert!(Matrix4::ZERO.inverse().is_none());
    }

    #[test]
    fn test_sanitized_replaces_non_finite_cells() {
        let mut m = Matrix4::IDENTITY;
        m.zz = f32::NAN;
        m.wz = f32::INFINITY;
        let (clean, replaced) = m.sanitized();
        assert_eq!(replaced, 2);
        assert_eq!(clean.zz, 0.0);
        assert_eq!(clean.wz, 0.0);
        assert!(clean.is_finite());
    }

    #[test]
    fn test_flip_axes_keep_diagonal() {
        let m = Matrix4::from_array(std::array::from_fn(|i| i as f32 + 1.0));
        let fx = m.flip_x_axis();
        assert_eq!(fx.xx, m.xx);
        assert_eq!(fx.xy, -m.xy);
        assert_eq!(fx.wx, -m.wx);
        let fy = m.flip_y_axis();
        assert_eq!(fy.yy, m.yy);
        assert_eq!(fy.wy, -m.wy);
        // Both flips touch xy and yx, so doing both restores them.
        let both = fx.flip_y_axis();
        assert_eq!(both.xy, m.xy);
        assert_eq!(both.yx, m.yx);
    }

    #[test]
    fn test_translate_and_scale_identity_is_noop() {
        let m = Matrix4::rotation_x(0.4);
        assert_eq!(m.translate_and_scale(Vec3::ZERO, Vec3::ONE), m);
    }

    #[test]
    fn test_matrix3_product_order() {
        let yaw = Matrix3::rotation_y(0.5);
        let pitch = Matrix3::rotation_x(0.25);
        let v = Vec3::new(0.0, 0.0, -1.0);
        let combined = (yaw * pitch).transform(v);
        let stepwise = pitch.transform(yaw.transform(v));
        assert!(combined.abs_diff_eq(stepwise, 1e-6));
    }

    #[test]
    fn test_matrix3_from_quat_matches_axis_rotation() {
        let q = Quat::from_rotation_y(0.8);
        assert!(Matrix3::from_quat(q).abs_diff_eq(&Matrix3::rotation_y(0.8), 1e-6));
    }
}
