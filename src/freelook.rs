//! # Free-Look Camera
//!
//! A user-controlled camera offset layered on top of the game's camera.
//!
//! ## Plain English
//!
//! Free-look lets the player fly the viewpoint around a scene, for example
//! to step back from a wall the game camera is stuck against. Movement is
//! relative to where the free-look camera is facing, so "forward" after
//! turning left moves left in the world.
//!
//! Distances are in metres. The composer converts to game units.

use crate::math::{Matrix3, Vec3};

/// Accumulated free-look offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FreeLookState {
    translation: Vec3,
    /// Yaw then pitch, radians
    yaw: f32,
    pitch: f32,
    rotation: Matrix3,
    inverse_rotation: Matrix3,
    changed: bool,
    speed: f32,
}

impl FreeLookState {
    pub fn new() -> Self {
        Self {
            translation: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            rotation: Matrix3::IDENTITY,
            inverse_rotation: Matrix3::IDENTITY,
            changed: false,
            speed: 0.0,
        }
    }

    /// Moves relative to the current free-look facing.
    pub fn translate(&mut self, left: f32, forward: f32, down: f32) {
        let local = Vec3::new(left, down, forward);
        let world = self.inverse_rotation.transform(local);
        self.translation += world;
        self.speed += world.x + world.y + world.z;
        self.update_changed();
    }

    /// Turns the free-look camera. Angles are radians and accumulate.
    pub fn rotate(&mut self, yaw_delta: f32, pitch_delta: f32) {
        self.yaw += yaw_delta;
        self.pitch += pitch_delta;

        // Row vectors: yaw is applied before pitch
        self.rotation = Matrix3::rotation_y(self.yaw) * Matrix3::rotation_x(self.pitch);
        self.inverse_rotation = Matrix3::rotation_x(-self.pitch) * Matrix3::rotation_y(-self.yaw);
        self.update_changed();
    }

    /// Scales the offset so the camera keeps its place when the world is
    /// rescaled.
    pub fn scale(&mut self, factor: f32) {
        self.translation *= factor;
        self.update_changed();
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn update_changed(&mut self) {
        self.changed = self.translation != Vec3::ZERO || self.yaw != 0.0 || self.pitch != 0.0;
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    /// `(yaw, pitch)` in radians.
    pub fn angles(&self) -> (f32, f32) {
        (self.yaw, self.pitch)
    }

    pub fn rotation(&self) -> &Matrix3 {
        &self.rotation
    }

    pub fn inverse_rotation(&self) -> &Matrix3 {
        &self.inverse_rotation
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }
}

impl Default for FreeLookState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// TESTS
// ============================================
