//! # Composer State
//!
//! Everything the composer remembers between draw calls and frames.
//!
//! ## Plain English Explanation
//!
//! Composition itself is a pure function: matrix in, two matrices out. The
//! memory lives here instead:
//!
//! - which scene we're in and how wide its 3D camera is
//! - the head pose sampled this frame
//! - the free-look offset the player has flown to
//! - the game camera, for stabilisation
//! - dirty flags that say whether a cached result is still good
//!
//! Each draw call is first `prepare`d here, exactly once and in order. The
//! prepared call carries the widest-FOV state as it stood at that call.
//! `context()` then freezes the rest into a `FrameContext` that any number
//! of threads can compose against.

use log::debug;

use crate::config::VrConfig;
use crate::freelook::FreeLookState;
use crate::hmd::{HeadPose, HmdBackend};
use crate::math::{Matrix4, Vec3};
use crate::projection::{apply_depth_range_hack, correct_viewport_flip, is_perspective, ViewportCorrection};
use crate::scene::{SceneClassifier, SceneFovState};
use crate::tracking::HeadTracker;
use crate::viewport::{DrawCall, ViewportType};

// ============================================
// INPUTS FROM OUTSIDE
// ============================================

/// The game's own camera, read out of game memory by the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GameCamera {
    /// Metres
    pub position: Vec3,
    /// Rotation only, row-vector convention
    pub rotation: Matrix4,
}

impl Default for GameCamera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Matrix4::IDENTITY,
        }
    }
}

/// Reasons a cached composition can't be reused.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameFlags {
    /// A new frame started (new head pose)
    pub frame_changed: bool,
    /// The viewport type differs from the previous draw call
    pub viewport_changed: bool,
    /// The free-look camera is away from home
    pub free_look_changed: bool,
    /// Settings or free-look changed since the last composition
    pub projection_changed: bool,
}

impl FrameFlags {
    pub fn any(&self) -> bool {
        self.frame_changed || self.viewport_changed || self.free_look_changed || self.projection_changed
    }
}

// ============================================
// PER-CALL AND PER-FRAME SNAPSHOTS
// ============================================

/// A draw call after flip and depth correction, ready to compose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreparedCall {
    /// Flip- and depth-corrected projection
    pub matrix: Matrix4,
    pub viewport: ViewportType,
    pub correction: ViewportCorrection,
    pub call_index: usize,
    pub is_perspective: bool,
    /// Widest 3D camera seen so far this scene, as of this call
    pub fov: SceneFovState,
}

/// Immutable snapshot of everything composition reads.
#[derive(Clone, Debug)]
pub struct FrameContext {
    pub config: VrConfig,
    pub is_new_scene: bool,
    pub head_rotation: Matrix4,
    /// Inverse head position, metres
    pub head_translation: Vec3,
    /// Free-look offset, metres
    pub free_look: Vec3,
    pub game_camera: GameCamera,
    pub black_screen: bool,
}

// ============================================
// COMPOSER STATE
// ============================================

pub struct ComposerState {
    config: VrConfig,
    scene: SceneClassifier,
    free_look: FreeLookState,
    tracker: HeadTracker,
    game_camera: GameCamera,
    flags: FrameFlags,
    had_3d_already: bool,
    black_screen: bool,
    vr_active: bool,
    last_viewport: Option<ViewportType>,
    last_call_index: usize,
}

impl ComposerState {
    pub fn new(config: VrConfig) -> Self {
        Self {
            config,
            scene: SceneClassifier::new(),
            free_look: FreeLookState::new(),
            tracker: HeadTracker::new(),
            game_camera: GameCamera::default(),
            flags: FrameFlags {
                frame_changed: true,
                ..FrameFlags::default()
            },
            had_3d_already: false,
            black_screen: false,
            vr_active: false,
            last_viewport: None,
            last_call_index: 0,
        }
    }

    // ----------------------------------------
    // FRAME LIFECYCLE
    // ----------------------------------------

    /// Starts a new render frame.
    ///
    /// Returns `true` when the frame starts a new scene.
    pub fn begin_frame(&mut self) -> bool {
        let new_scene = self.scene.begin_frame();
        self.tracker.request_new_frame();
        self.flags.frame_changed = true;
        self.flags.viewport_changed = false;
        self.flags.free_look_changed = self.free_look.changed();
        self.had_3d_already = false;
        self.last_viewport = None;
        new_scene
    }

    /// Corrects a draw call and lets the scene classifier see it.
    ///
    /// Must be called exactly once per draw call, in draw order.
    pub fn prepare(&mut self, call: &DrawCall) -> PreparedCall {
        let mut matrix = correct_viewport_flip(&call.projection, call.inverted_x, call.inverted_y);
        if self.config.depth_range_hack {
            matrix = apply_depth_range_hack(&matrix, &call.depth_range);
        }

        if call.projection_changed {
            let observation = self.scene.observe(&matrix);
            self.last_call_index = observation.call_index;
        }

        if self.last_viewport != Some(call.viewport) {
            if let Some(previous) = self.last_viewport {
                debug!("Viewport changed: {} -> {}", previous, call.viewport);
            }
            self.flags.viewport_changed = true;
            self.last_viewport = Some(call.viewport);
        }

        PreparedCall {
            matrix,
            viewport: call.viewport,
            correction: call.correction,
            call_index: self.last_call_index,
            is_perspective: is_perspective(&matrix),
            fov: *self.scene.fov(),
        }
    }

    /// Whether a draw call must be composed again instead of reusing the
    /// previous result.
    pub fn needs_recompose(&self, projection_dirty: bool) -> bool {
        projection_dirty || self.flags.any()
    }

    /// Clears the per-composition flags once a result is cached.
    pub fn mark_composed(&mut self) {
        self.flags.frame_changed = false;
        self.flags.viewport_changed = false;
        self.flags.projection_changed = false;
    }

    /// Records a 3D draw. Returns `true` for the first one this frame.
    pub fn note_3d_draw(&mut self) -> bool {
        !std::mem::replace(&mut self.had_3d_already, true)
    }

    /// Samples head tracking if this frame hasn't yet.
    pub fn update_tracking(&mut self, hmd: &mut dyn HmdBackend) -> bool {
        if !(self.config.orientation_tracking || self.config.position_tracking) {
            return false;
        }
        self.tracker.update_if_needed(hmd)
    }

    /// Freezes the state for composition.
    pub fn context(&self) -> FrameContext {
        FrameContext {
            config: self.config.clone(),
            is_new_scene: self.scene.is_new_scene(),
            head_rotation: *self.tracker.view_rotation(),
            head_translation: self.tracker.view_translation(),
            free_look: self.free_look.translation(),
            game_camera: self.game_camera,
            black_screen: self.black_screen,
        }
    }

    // ----------------------------------------
    // VIEW OPERATIONS
    // ----------------------------------------

    /// Moves the free-look camera, metres relative to where it faces.
    pub fn translate_view(&mut self, left: f32, forward: f32, down: f32) {
        let factor = if self.vr_active && self.config.enable_vr && self.config.scale_free_look {
            self.config.scale
        } else {
            1.0
        };
        self.free_look.translate(left * factor, forward * factor, down * factor);
        self.view_changed();
    }

    /// Turns the free-look camera, radians.
    pub fn rotate_view(&mut self, yaw: f32, pitch: f32) {
        self.free_look.rotate(yaw, pitch);
        self.view_changed();
    }

    pub fn scale_view(&mut self, factor: f32) {
        self.free_look.scale(factor);
        self.view_changed();
    }

    pub fn reset_view(&mut self) {
        self.free_look.reset();
        self.view_changed();
    }

    fn view_changed(&mut self) {
        self.flags.free_look_changed = self.free_look.changed();
        self.flags.projection_changed = true;
    }

    // ----------------------------------------
    // ACCESSORS
    // ----------------------------------------

    pub fn config(&self) -> &VrConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: VrConfig) {
        self.config = config;
        self.flags.projection_changed = true;
    }

    pub fn set_vr_active(&mut self, active: bool) {
        self.vr_active = active;
    }

    pub fn set_game_camera(&mut self, camera: GameCamera) {
        self.game_camera = camera;
        self.flags.projection_changed = true;
    }

    /// Blanks every draw while set, for loading screens and transitions.
    pub fn set_black_screen(&mut self, black: bool) {
        self.black_screen = black;
        self.flags.projection_changed = true;
    }

    /// Overrides the tracked head pose.
    pub fn set_head_pose(&mut self, pose: HeadPose) {
        self.tracker.set_pose(pose);
        self.flags.projection_changed = true;
    }

    pub fn scene(&self) -> &SceneClassifier {
        &self.scene
    }

    pub fn free_look(&self) -> &FreeLookState {
        &self.free_look
    }

    pub fn tracker(&self) -> &HeadTracker {
        &self.tracker
    }

    pub fn flags(&self) -> FrameFlags {
        self.flags
    }

    pub fn had_3d_already(&self) -> bool {
        self.had_3d_already
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{perspective_matrix, DepthRange};

    #[test]
    fn test_prepare_flips_viewport() {
        let mut state = ComposerState::new(VrConfig::default());
        state.begin_frame();
        let m = perspective_matrix(60.0, 40.0, 0.1, 100.0);
        let prepared = state.prepare(&DrawCall::new(m, ViewportType::Fullscreen).with_inverted(true, false));
        assert_eq!(prepared.matrix.xx, -m.xx);
        assert!(prepared.is_perspective);
    }

    #[test]
    fn test_prepare_applies_depth_hack_only_when_enabled() {
        let m = perspective_matrix(60.0, 40.0, 1.0, 100.0);
        let range = DepthRange {
            z_center: -0.3,
            z_scale: 0.1,
            depth_min: 0.0,
            depth_max: 1.0,
        };
        let call = DrawCall::new(m, ViewportType::Fullscreen).with_depth_range(range);

        let mut off = ComposerState::new(VrConfig::default());
        off.begin_frame();
        assert_eq!(off.prepare(&call).matrix, m);

        let mut on = ComposerState::new(VrConfig {
            depth_range_hack: true,
            ..VrConfig::default()
        });
        on.begin_frame();
        assert_ne!(on.prepare(&call).matrix.zz, m.zz);
    }

    #[test]
    fn test_prepared_call_keeps_fov_as_of_that_call() {
        let mut state = ComposerState::new(VrConfig::default());
        assert!(state.begin_frame());
        let hud = state.prepare(&DrawCall::new(
            crate::projection::orthographic_matrix(0.0, 480.0, 272.0, 0.0, -1.0, 1.0),
            ViewportType::HudElement,
        ));
        let world = state.prepare(&DrawCall::new(perspective_matrix(90.0, 60.0, 0.1, 100.0), ViewportType::Fullscreen));
        assert!(!hud.fov.has_widest());
        assert!(world.fov.has_widest());
        assert!((world.fov.widest_hfov - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_unchanged_projection_is_not_observed() {
        let mut state = ComposerState::new(VrConfig::default());
        state.begin_frame();
        let m = perspective_matrix(60.0, 40.0, 0.1, 100.0);
        let first = state.prepare(&DrawCall::new(m, ViewportType::Fullscreen));
        let second = state.prepare(&DrawCall::new(m, ViewportType::Fullscreen).unchanged());
        assert_eq!(first.call_index, 0);
        assert_eq!(second.call_index, 0);
        assert_eq!(state.scene().call_index(), 1);
    }

    #[test]
    fn test_view_operations_mark_projection_changed() {
        let mut state = ComposerState::new(VrConfig::default());
        state.begin_frame();
        state.mark_composed();
        assert!(!state.flags().projection_changed);

        state.translate_view(0.0, 1.0, 0.0);
        assert!(state.flags().projection_changed);
        assert!(state.flags().free_look_changed);

        state.reset_view();
        assert!(!state.flags().free_look_changed);
    }

    #[test]
    fn test_translate_scaled_only_when_vr_active() {
        let config = VrConfig {
            scale: 2.0,
            scale_free_look: true,
            ..VrConfig::default()
        };
        let mut state = ComposerState::new(config);
        state.translate_view(1.0, 0.0, 0.0);
        assert_eq!(state.free_look().translation().x, 1.0);

        state.reset_view();
        state.set_vr_active(true);
        state.translate_view(1.0, 0.0, 0.0);
        assert_eq!(state.free_look().translation().x, 2.0);
    }

    #[test]
    fn test_recompose_gate() {
        let mut state = ComposerState::new(VrConfig::default());
        state.begin_frame();
        assert!(state.needs_recompose(false));
        state.mark_composed();
        assert!(!state.needs_recompose(false));
        assert!(state.needs_recompose(true));
    }

    #[test]
    fn test_first_3d_draw() {
        let mut state = ComposerState::new(VrConfig::default());
        state.begin_frame();
        assert!(state.note_3d_draw());
        assert!(!state.note_3d_draw());
        state.begin_frame();
        assert!(state.note_3d_draw());
    }
}
