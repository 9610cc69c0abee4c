//! # HMD Abstraction
//!
//! What the composer needs to know about the headset, behind one trait.
//!
//! ## Plain English Explanation
//!
//! Every headset reports the same few facts in its own way: how wide each
//! eye can see, where each eye sits relative to the centre of the head, and
//! where the head is right now. The composer only asks those questions, so
//! a new device means one new `HmdBackend` implementation.
//!
//! Three backends ship with the crate:
//!
//! - `FallbackHmd`: no headset at all, fixed narrow FOV, useful for testing
//! - `FovPortHmd`: per-eye tangent FOV ports, the way the Rift SDK reports them
//! - `OpenXrHmd`: fed every frame with the views located by an OpenXR session
//!
//! All matrices returned by a backend use the crate's row-vector convention
//! (see `math`).

mod fallback;
mod fov_port;
mod openxr;

pub use self::fallback::FallbackHmd;
pub use self::fov_port::{FovPort, FovPortHmd};
pub use self::openxr::OpenXrHmd;

use glam::EulerRot;

use crate::error::HmdResult;
use crate::math::{Matrix4, Quat, Vec3};

// ============================================
// PER-EYE VALUES
// ============================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

/// One value per eye.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EyePair<T> {
    pub left: T,
    pub right: T,
}

impl<T> EyePair<T> {
    pub fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    pub fn get(&self, eye: Eye) -> &T {
        match eye {
            Eye::Left => &self.left,
            Eye::Right => &self.right,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(Eye, T) -> U) -> EyePair<U> {
        EyePair {
            left: f(Eye::Left, self.left),
            right: f(Eye::Right, self.right),
        }
    }
}

impl<T: Clone> EyePair<T> {
    pub fn splat(value: T) -> Self {
        Self {
            left: value.clone(),
            right: value,
        }
    }
}

// ============================================
// HEAD POSE
// ============================================

/// Where the physical head is, in metres, in tracking space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeadPose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl HeadPose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self { position, orientation }
    }

    /// Builds a pose from yaw, pitch and roll in degrees, applied in that
    /// order.
    ///
    /// For devices that only report Euler angles.
    pub fn from_euler_degrees(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::from_euler(EulerRot::YXZ, yaw.to_radians(), pitch.to_radians(), roll.to_radians()),
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }
}

impl Default for HeadPose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ============================================
// BACKEND TRAIT
// ============================================

/// A source of per-eye projection, eye placement and head pose.
///
/// ## Plain English
///
/// `projection_matrices` answers "what would a correct projection for each
/// eye look like at these clip planes?". The composer copies only the FOV
/// and off-axis cells out of it. `eye_offsets` are the translations that
/// move the view from the centre of the head to each eye, in metres.
pub trait HmdBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Tangent of the widest half-angle the display covers.
    fn projection_half_tan(&self) -> f32;

    /// Per-eye projection for the given clip planes.
    ///
    /// `far` may be `f32::INFINITY`. With `opengl` the clip range is
    /// `-1..1`, otherwise `0..1`.
    fn projection_matrices(&self, near: f32, far: f32, opengl: bool) -> EyePair<Matrix4>;

    /// View-space translation for each eye, metres.
    fn eye_offsets(&self) -> EyePair<Vec3>;

    /// Samples the current head pose.
    fn poll_head_pose(&mut self) -> HmdResult<HeadPose>;
}

/// Depth cells of a right-handed projection.
///
/// Returns `(zz, wz)` for the row-vector convention.
pub(crate) fn depth_terms(near: f32, far: f32, opengl: bool) -> (f32, f32) {
    if far.is_infinite() {
        if opengl {
            (-1.0, -2.0 * near)
        } else {
            (-1.0, -near)
        }
    } else if opengl {
        ((far + near) / (near - far), 2.0 * far * near / (near - far))
    } else {
        (far / (near - far), far * near / (near - far))
    }
}
