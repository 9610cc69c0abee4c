//! # Tangent FOV Ports
//!
//! Headsets that describe each eye's view as four tangents.
//!
//! ## Plain English
//!
//! Instead of an angle, each eye reports how far its view reaches up, down,
//! left and right at one metre in front of the lens. The left and right
//! reaches are usually different (the nose side is narrower), which makes
//! the projection off-axis.
//!
//! ```text
//!             up_tan
//!          ┌─────────┐
//! left_tan │    +    │ right_tan      all four are positive
//!          └─────────┘
//!            down_tan
//! ```

use crate::error::{HmdError, HmdResult};
use crate::math::{Matrix4, Vec3};

use super::{depth_terms, EyePair, HeadPose, HmdBackend};

/// One eye's extent as tangents of the half-angles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FovPort {
    pub up_tan: f32,
    pub down_tan: f32,
    pub left_tan: f32,
    pub right_tan: f32,
}

impl FovPort {
    /// A centred port with the given full angles in degrees.
    pub fn symmetric(hfov_deg: f32, vfov_deg: f32) -> Self {
        let h = (hfov_deg.to_radians() / 2.0).tan();
        let v = (vfov_deg.to_radians() / 2.0).tan();
        Self {
            up_tan: v,
            down_tan: v,
            left_tan: h,
            right_tan: h,
        }
    }

    /// The largest of the four tangents.
    pub fn max_tan(&self) -> f32 {
        self.up_tan
            .abs()
            .max(self.down_tan.abs())
            .max(self.left_tan.abs())
            .max(self.right_tan.abs())
    }

    pub fn is_valid(&self) -> bool {
        let sum_h = self.left_tan + self.right_tan;
        let sum_v = self.up_tan + self.down_tan;
        sum_h.is_finite() && sum_v.is_finite() && sum_h > 0.0 && sum_v > 0.0
    }

    /// Right-handed projection through this port.
    pub fn projection(&self, near: f32, far: f32, opengl: bool) -> Matrix4 {
        let x_scale = 2.0 / (self.left_tan + self.right_tan);
        let y_scale = 2.0 / (self.up_tan + self.down_tan);
        let (zz, wz) = depth_terms(near, far, opengl);
        Matrix4 {
            xx: x_scale,
            yy: y_scale,
            zx: (self.right_tan - self.left_tan) / (self.left_tan + self.right_tan),
            zy: (self.up_tan - self.down_tan) / (self.up_tan + self.down_tan),
            zz,
            zw: -1.0,
            wz,
            ..Matrix4::ZERO
        }
    }
}

/// A headset described by per-eye tangent ports.
///
/// The head pose is pushed in by whoever talks to the device.
#[derive(Clone, Debug)]
pub struct FovPortHmd {
    name: String,
    ports: EyePair<FovPort>,
    offsets: EyePair<Vec3>,
    pose: HeadPose,
    tracking: bool,
}

impl FovPortHmd {
    pub fn new(name: impl Into<String>, ports: EyePair<FovPort>, offsets: EyePair<Vec3>) -> HmdResult<Self> {
        if !ports.left.is_valid() || !ports.right.is_valid() {
            return Err(HmdError::InvalidFov(format!("{:?}", ports)));
        }
        Ok(Self {
            name: name.into(),
            ports,
            offsets,
            pose: HeadPose::IDENTITY,
            tracking: true,
        })
    }

    /// Both eyes share one centred port, eyes `ipd` metres apart.
    pub fn symmetric(hfov_deg: f32, vfov_deg: f32, ipd: f32) -> HmdResult<Self> {
        let port = FovPort::symmetric(hfov_deg, vfov_deg);
        let half = ipd / 2.0;
        Self::new(
            "FOV ports",
            EyePair::splat(port),
            EyePair::new(Vec3::new(half, 0.0, 0.0), Vec3::new(-half, 0.0, 0.0)),
        )
    }

    pub fn ports(&self) -> &EyePair<FovPort> {
        &self.ports
    }

    pub fn set_pose(&mut self, pose: HeadPose) {
        self.pose = pose;
        self.tracking = true;
    }

    /// Following polls fail until the next `set_pose`.
    pub fn lose_tracking(&mut self) {
        self.tracking = false;
    }
}

impl HmdBackend for FovPortHmd {
    fn name(&self) -> &str {
        &self.name
    }

    fn projection_half_tan(&self) -> f32 {
        self.ports.left.max_tan()
    }

    fn projection_matrices(&self, near: f32, far: f32, opengl: bool) -> EyePair<Matrix4> {
        self.ports.map(|_, port| port.projection(near, far, opengl))
    }

    fn eye_offsets(&self) -> EyePair<Vec3> {
        self.offsets
    }

    fn poll_head_pose(&mut self) -> HmdResult<HeadPose> {
        if self.tracking {
            Ok(self.pose)
        } else {
            Err(HmdError::TrackingLost)
        }
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::decompose;

    fn asymmetric() -> FovPort {
        FovPort {
            up_tan: 1.0,
            down_tan: 1.0,
            left_tan: 1.2,
            right_tan: 0.8,
        }
    }

    #[test]
    fn test_symmetric_port_is_on_axis() {
        let m = FovPort::symmetric(90.0, 90.0).projection(0.1, 10.0, true);
        assert!((m.xx - 1.0).abs() < 1e-5);
        assert!(m.zx.abs() < 1e-6);
        assert!((decompose(&m).z_near - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_asymmetric_port_shifts_off_axis() {
        let m = asymmetric().projection(0.1, 10.0, true);
        assert!((m.xx - 1.0).abs() < 1e-6);
        // Wider to the left, so the centre shifts left
        assert!(m.zx < 0.0);
        assert!((m.zx + 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_infinite_far() {
        let m = asymmetric().projection(0.25, f32::INFINITY, true);
        assert_eq!(m.zz, -1.0);
        assert_eq!(m.wz, -0.5);
    }

    #[test]
    fn test_half_tan_is_largest_left_tangent() {
        let hmd = FovPortHmd::new("test", EyePair::splat(asymmetric()), EyePair::default()).unwrap();
        assert_eq!(hmd.projection_half_tan(), 1.2);
    }

    #[test]
    fn test_invalid_port_rejected() {
        let bad = FovPort {
            up_tan: 0.0,
            down_tan: 0.0,
            left_tan: 1.0,
            right_tan: 1.0,
        };
        assert!(FovPortHmd::new("bad", EyePair::splat(bad), EyePair::default()).is_err());
    }

    #[test]
    fn test_tracking_loss() {
        let mut hmd = FovPortHmd::symmetric(100.0, 100.0, 0.064).unwrap();
        hmd.lose_tracking();
        assert!(hmd.poll_head_pose().is_err());
        hmd.set_pose(HeadPose::IDENTITY);
        assert!(hmd.poll_head_pose().is_ok());
    }
}
