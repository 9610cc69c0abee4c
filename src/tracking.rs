//! # Head Tracking Gate
//!
//! Samples the head pose at most once per rendered frame.
//!
//! ## Plain English
//!
//! A frame may contain hundreds of draw calls. If each one asked the
//! headset where the head is, the answer would drift during the frame and
//! the world would shear. Instead the first 3D draw of each frame takes one
//! sample and every later draw reuses it.
//!
//! The sample is stored already inverted: moving the head right moves the
//! world left.

use log::warn;

use crate::hmd::{HeadPose, HmdBackend};
use crate::math::{Matrix3, Matrix4, Vec3};

#[derive(Clone, Debug)]
pub struct HeadTracker {
    armed: bool,
    pose: HeadPose,
    view_rotation: Matrix4,
    view_translation: Vec3,
    samples: u64,
    failures: u64,
}

impl HeadTracker {
    pub fn new() -> Self {
        Self {
            armed: true,
            pose: HeadPose::IDENTITY,
            view_rotation: Matrix4::IDENTITY,
            view_translation: Vec3::ZERO,
            samples: 0,
            failures: 0,
        }
    }

    /// Allows one more sample. Called at the start of every frame.
    pub fn request_new_frame(&mut self) {
        self.armed = true;
    }

    /// Polls the headset if this frame hasn't been sampled yet.
    ///
    /// Returns `true` if a poll happened, even a failed one. A failed poll
    /// keeps the previous pose.
    pub fn update_if_needed(&mut self, hmd: &mut dyn HmdBackend) -> bool {
        if !self.armed {
            return false;
        }
        self.armed = false;

        match hmd.poll_head_pose() {
            Ok(pose) => {
                self.set_pose(pose);
                self.samples += 1;
            }
            Err(e) => {
                self.failures += 1;
                warn!("Head tracking failed on {}: {}. Keeping last pose", hmd.name(), e);
            }
        }
        true
    }

    /// Replaces the pose directly, bypassing the gate.
    pub fn set_pose(&mut self, pose: HeadPose) {
        self.pose = pose;
        self.view_rotation = Matrix4::from_matrix3(&Matrix3::from_quat(pose.orientation.conjugate()));
        self.view_translation = -pose.position;
    }

    pub fn pose(&self) -> &HeadPose {
        &self.pose
    }

    /// Inverse head rotation.
    pub fn view_rotation(&self) -> &Matrix4 {
        &self.view_rotation
    }

    /// Inverse head position, metres.
    pub fn view_translation(&self) -> Vec3 {
        self.view_translation
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}

impl Default for HeadTracker {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// TESTS
// ============================================
