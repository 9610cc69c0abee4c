//! # Configuration Module
//!
//! All the settings that shape how a flat game is placed around the player.
//!
//! ## Plain English Explanation
//!
//! The game was never designed for VR, so a lot is left to taste: how big
//! the world should feel, how far away the HUD floats, whether the camera
//! should follow the game's camera when it bobs and rolls. This module
//! defines those settings and their defaults.
//!
//! Settings include:
//! - World scale (how many game units make a metre)
//! - Where the HUD and the 2D screen float
//! - Comfort options (skybox handling, camera stabilisation)
//! - Zoom and telescope behaviour for sniper scopes

use crate::error::ConfigError;

// ============================================
// SKYBOX HANDLING
// ============================================

/// What to do with draw calls detected as sky.
///
/// ## Plain English
///
/// A sky that turns with the game camera while your head stays still is a
/// classic cause of motion sickness. Hiding it or locking it to the real
/// world helps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SkyboxMode {
    /// Draw the sky like everything else
    #[default]
    Normal,
    /// Don't draw the sky at all
    Hidden,
    /// Draw the sky, but ignore camera stabilisation for it
    Locked,
}

// ============================================
// TELESCOPE EYE MASK
// ============================================

pub const TELESCOPE_OFF: u8 = 0;
pub const TELESCOPE_LEFT: u8 = 1;
pub const TELESCOPE_RIGHT: u8 = 2;
pub const TELESCOPE_BOTH: u8 = TELESCOPE_LEFT | TELESCOPE_RIGHT;

// ============================================
// MAIN CONFIGURATION
// ============================================

/// All configuration for the VR projection pipeline.
///
/// Distances are in metres unless noted. Angles are in degrees.
#[derive(Clone, Debug, PartialEq)]
pub struct VrConfig {
    // ----------------------------------------
    // WORLD
    // "How big everything is"
    // ----------------------------------------
    /// Master switch. When off, matrices pass through with viewport
    /// correction only.
    pub enable_vr: bool,

    /// How many game units make one metre
    ///
    /// ## Plain English
    /// Every game picks its own unit. Get this wrong and you feel like a
    /// giant (too small) or an ant (too big).
    pub units_per_metre: f32,

    /// Extra world scale applied on top of `units_per_metre`
    pub scale: f32,

    // ----------------------------------------
    // HUD OVER 3D
    // "Where the HUD floats during gameplay"
    // ----------------------------------------
    /// Distance from the eyes to the front of the HUD box
    pub hud_distance: f32,

    /// Depth of the HUD box. 2D layers drawn at different depths spread
    /// through this thickness.
    pub hud_thickness: f32,

    /// Where 3D HUD elements sit between their near (0.0) and far (1.0)
    /// planes
    pub hud_3d_closer: f32,

    /// The 2D layer was copied from a fullscreen framebuffer that already
    /// contains both eyes
    pub hud_fullscreen: bool,

    /// Draw the HUD over everything instead of depth testing it
    pub hud_on_top: bool,

    // ----------------------------------------
    // CAMERA
    // ----------------------------------------
    /// Move the viewpoint forward from the game camera, metres
    pub camera_forward: f32,

    /// Tilt the world down (positive) to compensate for a game camera that
    /// looks at the ground
    pub camera_pitch: f32,

    /// The distance at which HUD crosshairs line up with the world
    pub aim_distance: f32,

    /// Compensates for reclining in a chair
    pub lean_back_angle: f32,

    // ----------------------------------------
    // 2D SCREEN
    // "Where menus and 2D games float"
    // ----------------------------------------
    pub screen_height: f32,
    pub screen_distance: f32,
    pub screen_thickness: f32,
    /// Raise the screen above eye level
    pub screen_up: f32,
    pub screen_pitch: f32,

    // ----------------------------------------
    // ZOOM AND TELESCOPE
    // ----------------------------------------
    /// Narrower game FOVs than this are treated as zooming in
    pub min_fov: f32,

    /// Which eyes see the zoomed view (bit 0 left, bit 1 right)
    pub telescope_eye: u8,

    /// Game FOVs at or below this switch to telescope mode
    pub telescope_max_fov: f32,

    // ----------------------------------------
    // COMFORT
    // ----------------------------------------
    pub skybox_mode: SkyboxMode,
    pub orientation_tracking: bool,
    pub position_tracking: bool,

    /// Cancel the game camera's rotation on these axes
    pub stabilize_pitch: bool,
    pub stabilize_roll: bool,
    pub stabilize_yaw: bool,

    /// Cancel the game camera's movement on these axes
    pub stabilize_x: bool,
    pub stabilize_y: bool,
    pub stabilize_z: bool,

    /// The game's camera rotation can be read from memory
    pub can_read_camera_angles: bool,

    // ----------------------------------------
    // WORKAROUNDS AND DEBUG
    // ----------------------------------------
    /// Pull the far plane in when the game sets a negative depth range
    pub depth_range_hack: bool,

    /// Draw call index of the layer being inspected, if any
    pub selected_layer: Option<usize>,

    /// Blink counter for the inspected layer. It is hidden while above 5.
    pub flash_state: u32,

    /// Split-screen player shown in the headset, `1..=4`
    pub vr_player: u8,

    /// Free-look movement follows the world scale
    pub scale_free_look: bool,

    /// A geometry shader duplicates draws per eye, so both eyes share one
    /// view matrix
    pub geometry_shader_stereo: bool,
}

impl VrConfig {
    /// Settings for people new to VR: sky hidden, camera stabilised.
    pub fn comfort() -> Self {
        Self {
            skybox_mode: SkyboxMode::Hidden,
            stabilize_pitch: true,
            stabilize_roll: true,
            hud_on_top: true,
            ..Self::default()
        }
    }

    /// A big cinema screen for 2D games, with the HUD further out.
    pub fn seated_large_screen() -> Self {
        Self {
            screen_height: 6.0,
            screen_distance: 4.5,
            screen_thickness: 1.0,
            hud_distance: 3.0,
            hud_thickness: 1.0,
            lean_back_angle: 10.0,
            ..Self::default()
        }
    }

    /// Any stabilise-rotation toggle is on.
    pub fn stabilizes_rotation(&self) -> bool {
        self.stabilize_pitch || self.stabilize_roll || self.stabilize_yaw
    }

    /// Any stabilise-position toggle is on.
    pub fn stabilizes_position(&self) -> bool {
        self.stabilize_x || self.stabilize_y || self.stabilize_z
    }

    /// Game units per real metre, world scale included.
    pub fn world_units_per_metre(&self) -> f32 {
        self.units_per_metre / self.scale
    }

    /// Validates the configuration.
    ///
    /// Returns every problem found, or an empty list.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let finite = [
            ("units_per_metre", self.units_per_metre),
            ("scale", self.scale),
            ("hud_distance", self.hud_distance),
            ("hud_thickness", self.hud_thickness),
            ("hud_3d_closer", self.hud_3d_closer),
            ("camera_forward", self.camera_forward),
            ("camera_pitch", self.camera_pitch),
            ("aim_distance", self.aim_distance),
            ("lean_back_angle", self.lean_back_angle),
            ("screen_height", self.screen_height),
            ("screen_distance", self.screen_distance),
            ("screen_thickness", self.screen_thickness),
            ("screen_up", self.screen_up),
            ("screen_pitch", self.screen_pitch),
            ("min_fov", self.min_fov),
            ("telescope_max_fov", self.telescope_max_fov),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                errors.push(ConfigError::NotFinite(name));
            }
        }

        if self.units_per_metre <= 0.0 {
            errors.push(ConfigError::InvalidUnitsPerMetre(self.units_per_metre));
        }
        if self.scale <= 0.0 {
            errors.push(ConfigError::InvalidScale(self.scale));
        }

        let distances = [
            ("hud_distance", self.hud_distance),
            ("hud_thickness", self.hud_thickness),
            ("screen_height", self.screen_height),
            ("screen_distance", self.screen_distance),
            ("screen_thickness", self.screen_thickness),
        ];
        for (name, value) in distances {
            if value < 0.0 {
                errors.push(ConfigError::NegativeDistance { name, value });
            }
        }

        if !(0.0..=1.0).contains(&self.hud_3d_closer) {
            errors.push(ConfigError::HudCloserOutOfRange(self.hud_3d_closer));
        }

        let angles = [
            ("min_fov", self.min_fov, 0.0, 180.0),
            ("telescope_max_fov", self.telescope_max_fov, 0.0, 180.0),
            ("camera_pitch", self.camera_pitch, -90.0, 90.0),
            ("screen_pitch", self.screen_pitch, -90.0, 90.0),
            ("lean_back_angle", self.lean_back_angle, -90.0, 90.0),
        ];
        for (name, value, min, max) in angles {
            if value < min || value > max {
                errors.push(ConfigError::AngleOutOfRange { name, value, min, max });
            }
        }

        if self.telescope_eye > TELESCOPE_BOTH {
            errors.push(ConfigError::InvalidTelescopeEye(self.telescope_eye));
        }
        if !(1..=4).contains(&self.vr_player) {
            errors.push(ConfigError::InvalidPlayer(self.vr_player));
        }

        errors
    }
}

impl Default for VrConfig {
    fn default() -> Self {
        Self {
            enable_vr: true,
            units_per_metre: 1.0,
            scale: 1.0,

            // HUD: a half-metre deep box 1.5 m away
            hud_distance: 1.5,
            hud_thickness: 0.5,
            hud_3d_closer: 0.5,
            hud_fullscreen: false,
            hud_on_top: false,

            camera_forward: 0.0,
            camera_pitch: 0.0,
            aim_distance: 7.0,
            lean_back_angle: 0.0,

            // Screen: 2 m tall, 1.5 m away
            screen_height: 2.0,
            screen_distance: 1.5,
            screen_thickness: 0.5,
            screen_up: 0.0,
            screen_pitch: 0.0,

            min_fov: 10.0,
            telescope_eye: TELESCOPE_OFF,
            telescope_max_fov: 30.0,

            skybox_mode: SkyboxMode::Normal,
            orientation_tracking: true,
            position_tracking: true,
            stabilize_pitch: false,
            stabilize_roll: false,
            stabilize_yaw: false,
            stabilize_x: false,
            stabilize_y: false,
            stabilize_z: false,
            can_read_camera_angles: false,

            depth_range_hack: false,
            selected_layer: None,
            flash_state: 0,
            vr_player: 1,
            scale_free_look: false,
            geometry_shader_stereo: true,
        }
    }
}

// ============================================
// TESTS
// ============================================
