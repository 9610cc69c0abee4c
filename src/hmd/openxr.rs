//! # OpenXR Backend
//!
//! Adapts the views located by an OpenXR session to `HmdBackend`.
//!
//! ## Plain English Explanation
//!
//! An OpenXR runtime doesn't report "the head". Every frame it reports one
//! view per eye: where that eye is and which angles it covers. We rebuild
//! a head from the two eyes:
//!
//! ```text
//!    left eye ●───────┼───────● right eye
//!                     │
//!                head = midpoint,
//!           facing the left eye's way
//! ```
//!
//! Eye offsets then become "how far each eye sits from that midpoint",
//! expressed in head space. The session itself (instance, swapchains,
//! frame loop) belongs to the application.

use ::openxr as xr;

use crate::error::{HmdError, HmdResult};
use crate::math::{Matrix4, Quat, Vec3};

use super::{EyePair, FovPort, HeadPose, HmdBackend};

/// Converts OpenXR angles (radians, left/down negative) to tangent ports.
pub fn fov_to_port(fov: &xr::Fovf) -> FovPort {
    FovPort {
        up_tan: fov.angle_up.tan(),
        down_tan: -fov.angle_down.tan(),
        left_tan: -fov.angle_left.tan(),
        right_tan: fov.angle_right.tan(),
    }
}

fn to_vec3(v: &xr::Vector3f) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_quat(q: &xr::Quaternionf) -> Quat {
    Quat::from_xyzw(q.x, q.y, q.z, q.w)
}

/// An HMD driven by `xrLocateViews` results.
///
/// Until the first update it reports a generic 90 degree display.
pub struct OpenXrHmd {
    system_name: String,
    ports: EyePair<FovPort>,
    offsets: EyePair<Vec3>,
    pose: HeadPose,
    orientation_valid: bool,
    frames_located: u64,
}

impl OpenXrHmd {
    pub fn new(system_name: impl Into<String>) -> Self {
        Self {
            system_name: system_name.into(),
            ports: EyePair::splat(FovPort::symmetric(90.0, 90.0)),
            offsets: EyePair::new(Vec3::new(0.032, 0.0, 0.0), Vec3::new(-0.032, 0.0, 0.0)),
            pose: HeadPose::IDENTITY,
            orientation_valid: false,
            frames_located: 0,
        }
    }

    /// Takes the views located this frame, left eye first.
    pub fn update_views(&mut self, views: &[xr::View], orientation_valid: bool) -> HmdResult<()> {
        match views {
            [left, right, ..] => {
                self.update_eyes([left.pose, right.pose], [left.fov, right.fov], orientation_valid);
                Ok(())
            }
            _ => Err(HmdError::Runtime(format!("expected 2 views, located {}", views.len()))),
        }
    }

    /// Takes one pose and FOV per eye, left eye first.
    pub fn update_eyes(&mut self, poses: [xr::Posef; 2], fovs: [xr::Fovf; 2], orientation_valid: bool) {
        let left_pos = to_vec3(&poses[0].position);
        let right_pos = to_vec3(&poses[1].position);
        let head_pos = (left_pos + right_pos) * 0.5;
        let head_rot = to_quat(&poses[0].orientation).normalize();

        // Eye positions relative to the head, in head space. Offsets move the
        // world the opposite way.
        let to_head = head_rot.conjugate();
        self.offsets = EyePair::new(-(to_head * (left_pos - head_pos)), -(to_head * (right_pos - head_pos)));

        self.ports = EyePair::new(fov_to_port(&fovs[0]), fov_to_port(&fovs[1]));
        self.pose = HeadPose::new(head_pos, head_rot);
        self.orientation_valid = orientation_valid;
        self.frames_located += 1;
    }

    pub fn frames_located(&self) -> u64 {
        self.frames_located
    }
}

impl HmdBackend for OpenXrHmd {
    fn name(&self) -> &str {
        &self.system_name
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
        if self.frames_located == 0 {
            return Err(HmdError::Runtime("no views located yet".to_string()));
        }
        if !self.orientation_valid {
            return Err(HmdError::TrackingLost);
        }
        Ok(self.pose)
    }
}

// ============================================
// TESTS
// ============================================
