//! # HUD Placement
//!
//! Turns a flat 2D layer into a box floating in front of the player.
//!
//! ## Plain English Explanation
//!
//! A HUD is drawn by the game as if the screen were a flat sheet. In VR we
//! take that sheet and hang it in the world as a shallow box:
//!
//! ```text
//!                       width
//!               ┌─────────────────┐
//!    eye  ●     │                 │ height      box front at `distance`
//!               │                 │             box depth  = `thickness`
//!               └─────────────────┘
//!       ◄──────── distance ─────►
//! ```
//!
//! When the scene has a 3D world, the box is sized to cover exactly the
//! angle the game's camera covered, so crosshairs still line up with what
//! they aim at. Without a 3D world the layer becomes a big virtual screen.

use crate::config::VrConfig;
use crate::math::{half_tan_deg, Matrix4, Vec3};
use crate::projection::safe_div;
use crate::scene::SceneFovState;

/// Near planes of HUD boxes are pulled in this much so the box never clips.
const HUD_NEAR_DIVISOR: f32 = 40.0;

/// Horizontal FOV assumed for 2D-only scenes.
const DEFAULT_HFOV_DEG: f32 = 70.0;

const DEFAULT_NEAR_METRES: f32 = 0.5;
const DEFAULT_FAR_METRES: f32 = 40.0;

// ============================================
// FRUSTUM
// ============================================

/// Field of view and clip planes used to project HUD layers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HudFrustum {
    pub hfov_deg: f32,
    pub vfov_deg: f32,
    /// Near plane before it is pulled in
    pub z_near_3d: f32,
    pub z_near: f32,
    pub z_far: f32,
}

/// Picks the frustum for a HUD layer.
///
/// With a 3D world the widest camera is reused, narrowed to `min_fov` when
/// zooming. Otherwise a 70 degree, 16:9 view from 0.5 m to 40 m.
pub fn hud_frustum(config: &VrConfig, fov: &SceneFovState, zooming: bool, units_per_metre: f32) -> HudFrustum {
    let (hfov_deg, vfov_deg, near, far) = if fov.has_widest() {
        let (h, v) = if zooming {
            (config.min_fov, config.min_fov * fov.widest_vfov / fov.widest_hfov)
        } else {
            (fov.widest_hfov, fov.widest_vfov)
        };
        (h, v, fov.widest_z_near, fov.widest_z_far)
    } else {
        // 2D screens are always 16:9
        let v = 2.0 * (half_tan_deg(DEFAULT_HFOV_DEG) * 9.0 / 16.0).atan().to_degrees();
        (
            DEFAULT_HFOV_DEG,
            v,
            DEFAULT_NEAR_METRES * units_per_metre,
            DEFAULT_FAR_METRES * units_per_metre,
        )
    };

    HudFrustum {
        hfov_deg,
        vfov_deg,
        z_near_3d: near,
        z_near: near / HUD_NEAR_DIVISOR,
        z_far: far,
    }
}

// ============================================
// BOX DIMENSIONS
// ============================================

/// Size and placement of the HUD box, game units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HudBox {
    pub width: f32,
    pub height: f32,
    pub thickness: f32,
    pub distance: f32,
    pub up: f32,
}

/// Sizes the HUD box.
///
/// `camera_forward` is the forward offset of the world camera (metres),
/// zero when the camera doesn't move forward.
pub fn hud_box(config: &VrConfig, frustum: &HudFrustum, has_3d: bool, camera_forward: f32, units_per_metre: f32) -> HudBox {
    if !has_3d {
        let height = config.screen_height * units_per_metre;
        return HudBox {
            width: height * 16.0 / 9.0,
            height,
            thickness: config.screen_thickness * units_per_metre,
            distance: config.screen_distance * units_per_metre,
            up: config.screen_up * units_per_metre,
        };
    }

    let thickness = config.hud_thickness * units_per_metre;
    let distance = config.hud_distance * units_per_metre;
    let forward = camera_forward * units_per_metre;
    let aim = match config.aim_distance * units_per_metre {
        a if a <= 0.0 => distance,
        a => a,
    };

    // Correct for the camera moving forward so aim lines up at aim distance
    let correction = (aim + forward) / aim;
    HudBox {
        width: 2.0 * half_tan_deg(frustum.hfov_deg) * distance * correction,
        height: 2.0 * half_tan_deg(frustum.vfov_deg) * distance * correction,
        thickness,
        distance,
        up: 0.0,
    }
}

// ============================================
// PLACEMENT
// ============================================

/// How the layer's own coordinates map into the box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HudPlacement {
    pub scale: Vec3,
    pub position: Vec3,
}

impl HudPlacement {
    /// `scale * position` in row-vector order.
    pub fn matrix(&self) -> Matrix4 {
        Matrix4::scaling(self.scale) * Matrix4::translation(self.position)
    }
}

/// Fits a layer's screen rectangle into the HUD box.
///
/// Orthographic layers spread their depth range through the box thickness.
/// Perspective HUD elements (3D models drawn in the HUD) are placed at
/// `hud_3d_closer` between their own near and far planes, with depth scaled
/// like width so they keep their shape.
pub fn place_layer(m: &Matrix4, is_perspective: bool, hud: &HudBox, hud_3d_closer: f32) -> HudPlacement {
    if is_perspective {
        let z_far = safe_div(m.wz, m.zz);
        let z_near = safe_div(z_far * m.zz, m.zz - 1.0);
        let z_obj = z_near + (z_far - z_near) * hud_3d_closer;

        let left = safe_div(-(m.zx + 1.0), m.xx);
        let right = left + safe_div(2.0, m.xx);
        let bottom = safe_div(-(m.zy + 1.0), m.yy);
        let top = bottom + safe_div(2.0, m.yy);
        let (left, right, bottom, top) = (left * z_obj, right * z_obj, bottom * z_obj, top * z_obj);

        let sx = axis_scale(m.xx, hud.width, right - left);
        let sy = axis_scale(m.yy, hud.height, top - bottom);
        let scale = Vec3::new(sx, sy, sx);

        return HudPlacement {
            scale,
            position: Vec3::new(
                sx * (-(right + left) / 2.0),
                sy * (-(top + bottom) / 2.0) + hud.up,
                scale.z * z_obj - hud.distance,
            ),
        };
    }

    let left = safe_div(-(m.wx + 1.0), m.xx);
    let right = left + safe_div(2.0, m.xx);
    let bottom = safe_div(-(m.wy + 1.0), m.yy);
    let top = bottom + safe_div(2.0, m.yy);
    let z_far = safe_div(m.wz, m.zz);
    let z_near = safe_div(1.0 + m.zz * z_far, m.zz);

    let sx = axis_scale(m.xx, hud.width, right - left);
    let sy = axis_scale(m.yy, hud.height, top - bottom);
    // A flat layer stays flat
    let sz = axis_scale(m.zz, hud.thickness, z_far - z_near);

    HudPlacement {
        scale: Vec3::new(sx, sy, sz),
        position: Vec3::new(sx * (-(right + left) / 2.0), sy * (-(top + bottom) / 2.0) + hud.up, -hud.distance),
    }
}

/// `size / extent`, or zero for a degenerate axis.
fn axis_scale(matrix_scale: f32, size: f32, extent: f32) -> f32 {
    if matrix_scale == 0.0 || extent == 0.0 {
        0.0
    } else {
        safe_div(size, extent)
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{orthographic_matrix, perspective_matrix};

    fn widest(h: f32, v: f32) -> SceneFovState {
        SceneFovState {
            widest_hfov: h,
            widest_vfov: v,
            widest_z_near: 0.2,
            widest_z_far: 300.0,
            widest_call: Some(0),
        }
    }

    #[test]
    fn test_default_frustum_without_3d() {
        let f = hud_frustum(&VrConfig::default(), &SceneFovState::default(), false, 1.0);
        assert_eq!(f.hfov_deg, 70.0);
        assert!(f.vfov_deg < 70.0 && f.vfov_deg > 40.0);
        assert!((f.z_near - 0.5 / 40.0).abs() < 1e-6);
        assert_eq!(f.z_far, 40.0);
    }

    #[test]
    fn test_zoomed_frustum_keeps_aspect() {
        let config = VrConfig::default();
        let f = hud_frustum(&config, &widest(8.0, 4.0), true, 1.0);
        assert_eq!(f.hfov_deg, config.min_fov);
        assert_eq!(f.vfov_deg, config.min_fov / 2.0);
        assert_eq!(f.z_near_3d, 0.2);
    }

    #[test]
    fn test_screen_box_is_16_by_9() {
        let config = VrConfig::default();
        let f = hud_frustum(&config, &SceneFovState::default(), false, 1.0);
        let b = hud_box(&config, &f, false, 0.0, 1.0);
        assert_eq!(b.height, 2.0);
        assert!((b.width - 2.0 * 16.0 / 9.0).abs() < 1e-6);
        assert_eq!(b.distance, 1.5);
    }

    #[test]
    fn test_hud_box_fills_fov() {
        let config = VrConfig::default();
        let f = hud_frustum(&config, &widest(90.0, 60.0), false, 1.0);
        let b = hud_box(&config, &f, true, 0.0, 1.0);
        // tan(45) = 1, so the box is twice its distance wide
        assert!((b.width - 2.0 * config.hud_distance).abs() < 1e-5);
    }

    #[test]
    fn test_hud_box_grows_with_camera_forward() {
        let config = VrConfig::default();
        let f = hud_frustum(&config, &widest(90.0, 60.0), false, 1.0);
        let still = hud_box(&config, &f, true, 0.0, 1.0);
        let forward = hud_box(&config, &f, true, 1.0, 1.0);
        assert!((forward.width / still.width - 8.0 / 7.0).abs() < 1e-5);
    }

    #[test]
    fn test_orthographic_layer_centred_in_box() {
        let hud = HudBox {
            width: 4.0,
            height: 2.0,
            thickness: 0.5,
            distance: 1.5,
            up: 0.0,
        };
        let m = orthographic_matrix(0.0, 480.0, 0.0, 272.0, 0.0, 1.0);
        let placement = place_layer(&m, false, &hud, 0.5);
        assert!((placement.scale.x - 4.0 / 480.0).abs() < 1e-6);

        // The screen centre ends up straight ahead at the HUD distance
        let centre = placement.matrix().transform_point(Vec3::new(240.0, 136.0, 0.0));
        assert!(centre.x.abs() < 1e-4);
        assert!(centre.y.abs() < 1e-4);
        assert!((centre.z + 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_flat_layer_gets_zero_depth_scale() {
        let hud = HudBox {
            width: 4.0,
            height: 2.0,
            thickness: 0.5,
            distance: 1.5,
            up: 0.0,
        };
        let m = Matrix4 { zz: 0.0, ..orthographic_matrix(0.0, 480.0, 0.0, 272.0, 0.0, 1.0) };
        let placement = place_layer(&m, false, &hud, 0.5);
        assert_eq!(placement.scale.z, 0.0);
        assert!(placement.scale.x > 0.0);
    }

    #[test]
    fn test_perspective_element_depth_matches_width() {
        let hud = HudBox {
            width: 3.0,
            height: 2.0,
            thickness: 0.5,
            distance: 1.5,
            up: 0.0,
        };
        let placement = place_layer(&perspective_matrix(60.0, 40.0, 1.0, 10.0), true, &hud, 0.5);
        assert_eq!(placement.scale.z, placement.scale.x);
        assert!(placement.position.is_finite());
    }
}
