//! Headset stand-in used when no device is attached.

use crate::error::HmdResult;
use crate::math::{half_tan_deg, Matrix4, Vec3};

use super::{depth_terms, EyePair, HeadPose, HmdBackend};

/// Horizontal FOV of the stand-in display.
const FALLBACK_HFOV_DEG: f32 = 32.0;

/// Half the default interpupillary distance (62 mm).
const HALF_IPD_METRES: f32 = 0.031;

/// A fixed 32 degree, 4:3 "headset" that never moves.
#[derive(Clone, Debug, Default)]
pub struct FallbackHmd;

impl FallbackHmd {
    pub fn new() -> Self {
        Self
    }
}

impl HmdBackend for FallbackHmd {
    fn name(&self) -> &str {
        "Fallback"
    }

    fn projection_half_tan(&self) -> f32 {
        half_tan_deg(FALLBACK_HFOV_DEG) * 3.0 / 4.0
    }

    fn projection_matrices(&self, near: f32, far: f32, opengl: bool) -> EyePair<Matrix4> {
        let xx = 1.0 / half_tan_deg(FALLBACK_HFOV_DEG);
        let (zz, wz) = depth_terms(near, far, opengl);
        let m = Matrix4 {
            xx,
            yy: xx * 4.0 / 3.0,
            zz,
            zw: -1.0,
            wz,
            ..Matrix4::ZERO
        };
        EyePair::splat(m)
    }

    fn eye_offsets(&self) -> EyePair<Vec3> {
        EyePair::new(Vec3::new(HALF_IPD_METRES, 0.0, 0.0), Vec3::new(-HALF_IPD_METRES, 0.0, 0.0))
    }

    fn poll_head_pose(&mut self) -> HmdResult<HeadPose> {
        Ok(HeadPose::IDENTITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::decompose;

    #[test]
    fn test_fallback_fov() {
        let hmd = FallbackHmd::new();
        let eyes = hmd.projection_matrices(0.1, 100.0, true);
        let p = decompose(&eyes.left);
        assert!((p.hfov_deg - 32.0).abs() < 1e-3);
        assert!(p.vfov_deg < p.hfov_deg);
        assert_eq!(eyes.left, eyes.right);
    }

    #[test]
    fn test_fallback_ipd() {
        let offsets = FallbackHmd::new().eye_offsets();
        assert!(((offsets.left.x - offsets.right.x) - 0.062).abs() < 1e-6);
    }
}
