//! # View Chain
//!
//! The ordered list of transforms between the game camera and the eyes.
//!
//! ## Plain English
//!
//! Each link moves or turns the world a little. Order matters: the game's
//! camera corrections come first, the player's real head last.
//!
//! ```text
//!  camera forward ─► camera position ─► camera pitch ─► free look
//!        ─► lean back ─► head position ─► head rotation
//! ```
//!
//! HUD layers replace "camera forward" with the box scale and position.

use crate::config::{SkyboxMode, VrConfig};
use crate::math::{Matrix4, Vec3};
use crate::state::FrameContext;

/// Every link of the chain, kept separate so each can be inspected.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewChain {
    pub camera_forward: Matrix4,
    pub camera_position: Matrix4,
    pub camera_pitch: Matrix4,
    pub free_look: Matrix4,
    pub lean_back: Matrix4,
    pub head_position: Matrix4,
    pub head_rotation: Matrix4,
}

/// What the chain needs to know about the layer being drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerKind {
    pub is_perspective: bool,
    pub is_skybox: bool,
    /// Camera forward is suppressed (telescope)
    pub no_forward: bool,
    /// Extra forward movement from zooming, metres
    pub zoom_forward: f32,
    /// A 3D camera has been seen this scene
    pub scene_has_3d: bool,
}

impl ViewChain {
    pub fn build(ctx: &FrameContext, layer: &LayerKind, units_per_metre: f32) -> Self {
        let config = &ctx.config;

        let (head_rotation, lean_back, camera_pitch) = if layer.is_perspective {
            let rotation = if config.orientation_tracking {
                ctx.head_rotation
            } else {
                Matrix4::IDENTITY
            };
            (
                rotation,
                Matrix4::rotation_x(config.lean_back_angle.to_radians()),
                camera_pitch(ctx, layer),
            )
        } else {
            (Matrix4::IDENTITY, Matrix4::IDENTITY, Matrix4::IDENTITY)
        };

        let (head_position, free_look, camera_position) = if layer.is_skybox {
            (Matrix4::IDENTITY, Matrix4::IDENTITY, Matrix4::IDENTITY)
        } else {
            let head = if config.position_tracking {
                Matrix4::translation(ctx.head_translation * units_per_metre)
            } else {
                Matrix4::IDENTITY
            };
            let camera = if config.stabilizes_position() {
                Matrix4::translation(-ctx.game_camera.position * units_per_metre)
            } else {
                Matrix4::IDENTITY
            };
            (head, Matrix4::translation(ctx.free_look * units_per_metre), camera)
        };

        let camera_forward = if layer.no_forward || layer.is_skybox {
            Matrix4::IDENTITY
        } else {
            let z = (config.camera_forward + layer.zoom_forward) * units_per_metre;
            Matrix4::translation(Vec3::new(0.0, 0.0, z))
        };

        Self {
            camera_forward,
            camera_position,
            camera_pitch,
            free_look,
            lean_back,
            head_position,
            head_rotation,
        }
    }

    /// Everything after the first link.
    fn tail(&self) -> Matrix4 {
        self.camera_position * self.camera_pitch * self.free_look * self.lean_back * self.head_position * self.head_rotation
    }

    /// View for the 3D world.
    pub fn world(&self) -> Matrix4 {
        self.camera_forward * self.tail()
    }

    /// View for a HUD layer, given its box placement (`scale * position`).
    pub fn hud(&self, placement: &Matrix4) -> Matrix4 {
        *placement * self.tail()
    }
}

/// Tilt from the game camera.
///
/// When the game's camera rotation can be read and stabilisation is on, the
/// game rotation is undone (keeping a user pitch if pitch itself isn't
/// stabilised). Otherwise it is a plain pitch.
fn camera_pitch(ctx: &FrameContext, layer: &LayerKind) -> Matrix4 {
    let config: &VrConfig = &ctx.config;
    let pitch_deg = if layer.is_perspective || layer.scene_has_3d {
        config.camera_pitch
    } else {
        config.screen_pitch
    };
    let user_pitch = Matrix4::rotation_x(-pitch_deg.to_radians());

    let stabilised = config.stabilizes_rotation()
        && config.can_read_camera_angles
        && (config.skybox_mode != SkyboxMode::Locked || !layer.is_skybox);

    match (stabilised, config.stabilize_pitch) {
        (true, false) => ctx.game_camera.rotation * user_pitch,
        (true, true) => ctx.game_camera.rotation,
        (false, _) => user_pitch,
    }
}

// ============================================
// TESTS
// ============================================
