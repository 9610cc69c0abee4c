//! # HMD Projection
//!
//! Turns the single projection matrix of an emulated fixed-function GPU into
//! a pair of per-eye matrices for a VR headset.
//!
//! ## Architecture Overview
//!
//! The crate is structured into independent modules:
//!
//! - `math`: Row-major 4x4 and 3x3 matrices
//! - `projection`: Reading FOV and clip planes back out of a matrix
//! - `scene`: Noticing scene changes and the widest 3D camera
//! - `viewport`: What kind of render target a draw call goes to
//! - `composer`: The per-eye matrices themselves
//! - `hmd`: Headset backends
//! - `tracking`: Head pose, sampled once per frame
//! - `freelook`: A debug camera the player can fly around
//! - `state`: Everything remembered between draw calls
//! - `publish`: Handing finished frames to other threads
//! - `config`: Settings
//! - `error`: Error types
//!
//! `VrPipeline` ties them together for a renderer.

// ============================================
// MODULE DECLARATIONS
// ============================================

pub mod composer;
pub mod config;
pub mod error;
pub mod freelook;
pub mod hmd;
pub mod math;
pub mod projection;
pub mod publish;
pub mod scene;
pub mod state;
pub mod tracking;
pub mod viewport;

// ============================================
// RE-EXPORTS
// ============================================

pub use composer::{ComposedProjection, CompositionPath};
pub use config::{SkyboxMode, VrConfig};
pub use error::{ConfigError, HmdError, VrError, VrResult};
pub use hmd::{Eye, EyePair, FallbackHmd, FovPort, FovPortHmd, HeadPose, HmdBackend, OpenXrHmd};
pub use math::{Matrix3, Matrix4, Quat, Vec3};
pub use publish::{FramePublisher, PublishedFrame};
pub use state::GameCamera;
pub use viewport::{DrawCall, ViewportType};

// ============================================
// IMPORTS
// ============================================

use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;

use crate::composer::{compose, is_world_call};
use crate::state::{ComposerState, PreparedCall};

// ============================================
// PIPELINE
// ============================================

/// The projection pipeline for one renderer.
///
/// ## Plain English
///
/// This is the "control center" a renderer talks to:
/// - once per frame: `begin_frame`, then `end_frame`
/// - once per draw call: `compose_draw` (or all at once with `compose_frame`)
/// - whenever the player moves the debug camera: the view operations
///
/// Without a headset, or with VR switched off in the config, every call
/// comes back flat: the game's matrix with only viewport correction.
pub struct VrPipeline {
    /// Everything remembered between draw calls
    state: ComposerState,

    /// The headset, if one is attached
    hmd: Option<Box<dyn HmdBackend>>,

    /// Where finished frames go
    publisher: FramePublisher,

    /// Last composed call, reused while nothing changed
    cache: Option<(PreparedCall, ComposedProjection)>,

    /// Eye matrices of the last world call this frame
    last_world: Option<EyePair<Matrix4>>,

    frame_index: u64,

    stats: PipelineStats,
}

/// Runtime statistics for monitoring
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PipelineStats {
    /// Frames started
    pub frames: u64,
    /// Draw calls composed from scratch
    pub draws_composed: u64,
    /// Draw calls answered from the cache
    pub draws_reused: u64,
    /// Draw calls hidden
    pub draws_hidden: u64,
    /// Scenes seen, the first one included
    pub scenes_detected: u64,
    /// Successful head-pose samples
    pub tracking_samples: u64,
    /// Failed head-pose samples
    pub tracking_failures: u64,
}

impl VrPipeline {
    /// Creates a pipeline with the default configuration and no headset.
    pub fn new() -> Self {
        Self::build(VrConfig::default())
    }

    /// Creates a pipeline with a custom configuration.
    ///
    /// Returns the first validation error if the configuration is invalid.
    pub fn with_config(config: VrConfig) -> VrResult<Self> {
        if let Some(error) = config.validate().into_iter().next() {
            return Err(error.into());
        }
        Ok(Self::build(config))
    }

    fn build(config: VrConfig) -> Self {
        info!(
            "Initializing projection pipeline: {} units per metre, scale {}, VR {}",
            config.units_per_metre,
            config.scale,
            if config.enable_vr { "on" } else { "off" }
        );

        Self {
            state: ComposerState::new(config),
            hmd: None,
            publisher: FramePublisher::new(),
            cache: None,
            last_world: None,
            frame_index: 0,
            stats: PipelineStats::default(),
        }
    }

    /// Attaches a headset backend, builder style.
    pub fn with_hmd(mut self, hmd: Box<dyn HmdBackend>) -> VrResult<Self> {
        self.attach_hmd(hmd)?;
        Ok(self)
    }

    /// Attaches a headset backend, replacing any previous one.
    ///
    /// Fails if the backend reports an unusable field of view.
    pub fn attach_hmd(&mut self, hmd: Box<dyn HmdBackend>) -> VrResult<()> {
        let half_tan = hmd.projection_half_tan();
        if !half_tan.is_finite() || half_tan <= 0.0 {
            return Err(HmdError::InvalidFov(format!("{} reports half-angle tangent {}", hmd.name(), half_tan)).into());
        }

        info!("Attached headset: {}", hmd.name());
        self.hmd = Some(hmd);
        self.state.set_vr_active(true);
        self.cache = None;
        Ok(())
    }

    /// Detaches the headset. Later calls compose flat.
    pub fn detach_hmd(&mut self) -> Option<Box<dyn HmdBackend>> {
        let hmd = self.hmd.take();
        if let Some(hmd) = &hmd {
            info!("Detached headset: {}", hmd.name());
            self.publisher.clear();
        }
        self.state.set_vr_active(false);
        self.cache = None;
        hmd
    }

    fn vr_active(&self) -> bool {
        self.hmd.is_some() && self.state.config().enable_vr
    }

    // ----------------------------------------
    // FRAME LIFECYCLE
    // ----------------------------------------

    /// Starts a new render frame.
    ///
    /// Returns `true` when this frame starts a new scene.
    pub fn begin_frame(&mut self) -> bool {
        self.frame_index += 1;
        self.stats.frames += 1;
        self.last_world = None;
        self.state.begin_frame()
    }

    /// Composes one draw call.
    ///
    /// Calls must arrive in draw order, each exactly once.
    pub fn compose_draw(&mut self, call: &DrawCall) -> ComposedProjection {
        let prepared = self.state.prepare(call);
        self.sample_tracking();
        self.note_world_call(&prepared);

        if !self.state.needs_recompose(call.projection_changed) {
            if let Some((cached_call, cached)) = &self.cache {
                if *cached_call == prepared {
                    self.stats.draws_reused += 1;
                    return *cached;
                }
            }
        }

        let ctx = self.state.context();
        let out = compose(&ctx, self.hmd.as_deref(), &prepared);
        self.state.mark_composed();
        self.record(&out);
        self.cache = Some((prepared, out));
        out
    }

    /// Composes a whole frame's draw calls at once.
    ///
    /// Calls are prepared in order on this thread, then composed in parallel.
    /// Each call sees the widest FOV as it stood when that call was prepared,
    /// so the results equal calling `compose_draw` on each in turn. Results
    /// keep the input order.
    pub fn compose_frame(&mut self, calls: &[DrawCall]) -> Vec<ComposedProjection> {
        let prepared: Vec<PreparedCall> = calls.iter().map(|call| self.state.prepare(call)).collect();
        self.sample_tracking();
        for call in &prepared {
            self.note_world_call(call);
        }

        let ctx = self.state.context();
        let hmd = self.hmd.as_deref();
        let composed: Vec<ComposedProjection> = prepared.par_iter().map(|call| compose(&ctx, hmd, call)).collect();

        self.state.mark_composed();
        for out in &composed {
            self.record(out);
        }
        if let (Some(call), Some(out)) = (prepared.last(), composed.last()) {
            self.cache = Some((*call, *out));
        }

        debug!("Composed {} draw calls for frame {}", composed.len(), self.frame_index);
        composed
    }

    /// Finishes the frame and publishes its pose and eye matrices.
    pub fn end_frame(&mut self) -> Arc<PublishedFrame> {
        let view_pose = if self.vr_active() {
            *self.state.tracker().pose()
        } else {
            HeadPose::IDENTITY
        };

        self.publisher.publish(PublishedFrame {
            frame_index: self.frame_index,
            view_pose,
            eyes: self.last_world.take(),
        })
    }

    fn sample_tracking(&mut self) {
        if !self.state.config().enable_vr {
            return;
        }
        if let Some(hmd) = self.hmd.as_deref_mut() {
            self.state.update_tracking(hmd);
        }
    }

    fn note_world_call(&mut self, call: &PreparedCall) {
        if self.vr_active() && is_world_call(call) && self.state.note_3d_draw() {
            debug!("First 3D draw of frame {} at call {}", self.frame_index, call.call_index);
        }
    }

    fn record(&mut self, out: &ComposedProjection) {
        self.stats.draws_composed += 1;
        match out.path {
            CompositionPath::Hidden => self.stats.draws_hidden += 1,
            CompositionPath::World3d => self.last_world = Some(EyePair::new(out.left, out.right)),
            _ => {}
        }
    }

    // ----------------------------------------
    // VIEW OPERATIONS
    // ----------------------------------------

    /// Moves the free-look camera, metres relative to where it faces.
    pub fn translate_view(&mut self, left: f32, forward: f32, down: f32) {
        self.state.translate_view(left, forward, down);
    }

    /// Turns the free-look camera, radians.
    pub fn rotate_view(&mut self, yaw: f32, pitch: f32) {
        self.state.rotate_view(yaw, pitch);
    }

    pub fn scale_view(&mut self, factor: f32) {
        self.state.scale_view(factor);
    }

    pub fn reset_view(&mut self) {
        self.state.reset_view();
    }

    // ----------------------------------------
    // HOST INPUTS
    // ----------------------------------------

    /// Replaces the configuration after validating it.
    pub fn set_config(&mut self, config: VrConfig) -> VrResult<()> {
        if let Some(error) = config.validate().into_iter().next() {
            return Err(error.into());
        }
        self.state.set_config(config);
        Ok(())
    }

    pub fn set_game_camera(&mut self, camera: GameCamera) {
        self.state.set_game_camera(camera);
    }

    pub fn set_black_screen(&mut self, black: bool) {
        self.state.set_black_screen(black);
    }

    /// Overrides the head pose, for hosts that track the head themselves.
    pub fn set_head_pose(&mut self, pose: HeadPose) {
        self.state.set_head_pose(pose);
    }

    // ----------------------------------------
    // ACCESSORS
    // ----------------------------------------

    pub fn config(&self) -> &VrConfig {
        self.state.config()
    }

    pub fn state(&self) -> &ComposerState {
        &self.state
    }

    pub fn hmd_name(&self) -> Option<&str> {
        self.hmd.as_deref().map(|hmd| hmd.name())
    }

    /// A handle other threads can read published frames from.
    pub fn publisher(&self) -> FramePublisher {
        self.publisher.clone()
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Returns a copy of the current statistics.
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            scenes_detected: self.state.scene().scenes_detected(),
            tracking_samples: self.state.tracker().samples(),
            tracking_failures: self.state.tracker().failures(),
            ..self.stats.clone()
        }
    }
}

impl Default for VrPipeline {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// LOGGING
// ============================================

/// Initialize logging for the platform.
pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Info)
                .with_tag("HmdProjection"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        let _ = env_logger::builder().filter_level(log::LevelFilter::Info).try_init();
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{orthographic_matrix, perspective_matrix};

    fn headset() -> Box<dyn HmdBackend> {
        Box::new(FallbackHmd::new())
    }

    fn world_call() -> DrawCall {
        DrawCall::new(perspective_matrix(60.0, 40.0, 0.1, 100.0), ViewportType::Fullscreen)
    }

    #[test]
    fn test_pipeline_creation() {
        init_logging();
        let pipeline = VrPipeline::new();
        assert!(pipeline.hmd_name().is_none());
        assert_eq!(pipeline.stats(), PipelineStats::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = VrConfig {
            units_per_metre: -1.0,
            ..VrConfig::default()
        };
        assert!(matches!(
            VrPipeline::with_config(config),
            Err(VrError::Config(ConfigError::InvalidUnitsPerMetre(_)))
        ));
    }

    #[test]
    fn test_without_headset_is_flat() {
        let mut pipeline = VrPipeline::new();
        pipeline.begin_frame();
        let out = pipeline.compose_draw(&world_call());
        assert_eq!(out.path, CompositionPath::Flat);
        assert_eq!(out.left, world_call().projection);
    }

    #[test]
    fn test_with_headset_composes_stereo() {
        let mut pipeline = VrPipeline::new().with_hmd(headset()).unwrap();
        assert_eq!(pipeline.hmd_name(), Some("Fallback"));

        assert!(pipeline.begin_frame());
        let out = pipeline.compose_draw(&world_call());
        assert_eq!(out.path, CompositionPath::World3d);
        assert!(pipeline.state().had_3d_already());

        let frame = pipeline.end_frame();
        assert_eq!(frame.frame_index, 1);
        assert_eq!(frame.eyes.map(|e| e.left), Some(out.left));
    }

    #[test]
    fn test_cache_reuse() {
        let mut pipeline = VrPipeline::new().with_hmd(headset()).unwrap();
        pipeline.begin_frame();
        let first = pipeline.compose_draw(&world_call());
        let second = pipeline.compose_draw(&world_call().unchanged());
        assert_eq!(first, second);
        assert_eq!(pipeline.stats().draws_reused, 1);
        assert_eq!(pipeline.stats().draws_composed, 1);
    }

    #[test]
    fn test_compose_frame_matches_compose_draw() {
        let calls = vec![
            world_call(),
            DrawCall::new(orthographic_matrix(0.0, 480.0, 272.0, 0.0, -1.0, 1.0), ViewportType::HudElement),
            DrawCall::new(perspective_matrix(60.0, 40.0, 0.1, 100.0), ViewportType::Offscreen),
        ];

        let mut batched = VrPipeline::new().with_hmd(headset()).unwrap();
        batched.begin_frame();
        let all = batched.compose_frame(&calls);

        let mut single = VrPipeline::new().with_hmd(headset()).unwrap();
        single.begin_frame();
        let one_by_one: Vec<_> = calls.iter().map(|c| single.compose_draw(c)).collect();

        assert_eq!(all, one_by_one);
        assert_eq!(all[2].path, CompositionPath::Hidden);
        assert_eq!(batched.stats().draws_hidden, 1);
    }

    #[test]
    fn test_compose_frame_hud_before_world_in_new_scene() {
        let calls = vec![
            DrawCall::new(orthographic_matrix(0.0, 640.0, 480.0, 0.0, -1.0, 1.0), ViewportType::Fullscreen),
            DrawCall::new(perspective_matrix(100.0, 60.0, 0.1, 100.0), ViewportType::Fullscreen),
        ];

        let mut batched = VrPipeline::new().with_hmd(headset()).unwrap();
        assert!(batched.begin_frame());
        let all = batched.compose_frame(&calls);

        let mut single = VrPipeline::new().with_hmd(headset()).unwrap();
        assert!(single.begin_frame());
        let one_by_one: Vec<_> = calls.iter().map(|c| single.compose_draw(c)).collect();

        assert_eq!(all[0].path, CompositionPath::Hud);
        assert_eq!(all[1].path, CompositionPath::World3d);
        assert_eq!(all, one_by_one);
    }

    #[test]
    fn test_detach_goes_flat() {
        let mut pipeline = VrPipeline::new().with_hmd(headset()).unwrap();
        pipeline.begin_frame();
        pipeline.compose_draw(&world_call());
        pipeline.end_frame();
        assert!(pipeline.publisher().latest().is_some());

        assert!(pipeline.detach_hmd().is_some());
        assert!(pipeline.publisher().latest().is_none());
        pipeline.begin_frame();
        assert_eq!(pipeline.compose_draw(&world_call()).path, CompositionPath::Flat);
    }

    #[test]
    fn test_set_config_validates() {
        let mut pipeline = VrPipeline::new();
        let bad = VrConfig {
            vr_player: 0,
            ..VrConfig::default()
        };
        assert!(pipeline.set_config(bad).is_err());
        assert!(pipeline.set_config(VrConfig::comfort()).is_ok());
        assert_eq!(pipeline.config().skybox_mode, SkyboxMode::Hidden);
    }
}
