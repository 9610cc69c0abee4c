//! # Scene Classifier
//!
//! Detects scene changes and tracks the widest 3D field of view.
//!
//! ## Plain English Explanation
//!
//! A game draws the same sequence of projection matrices every frame while
//! nothing much changes: world, then maybe a skybox, then the HUD. When the
//! game switches to a menu or a cutscene, that sequence changes.
//!
//! We remember the first 64 projections of each frame and compare them with
//! the next frame's. A difference means "new scene", which is acted on one
//! frame later. During a new-scene frame we look for the widest 3D camera,
//! because that's the one that represents the world. The HUD is later sized
//! to match it.
//!
//! ```text
//! frame N      A B C D        recorded
//! frame N+1    A B X D        X != C  -> next frame is a new scene
//! frame N+2    A B X D        new scene: widest FOV re-measured
//! frame N+3    A B X D        same as N+2, nothing to do
//! ```

use log::info;

use crate::math::Matrix4;
use crate::projection::{decompose, ProjectionSignature};

/// How many projections per frame take part in scene detection.
pub const MAX_RECORDED_PROJECTIONS: usize = 64;

/// Projections wider than this are treated as special effects, not cameras.
pub const MAX_WORLD_HFOV_DEG: f32 = 125.0;

// ============================================
// WIDEST FOV AGGREGATE
// ============================================

/// The widest 3D camera seen in the current scene.
///
/// All angles are stored as absolute values. A zero `widest_hfov` means no
/// 3D camera has been seen yet.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SceneFovState {
    pub widest_hfov: f32,
    pub widest_vfov: f32,
    pub widest_z_near: f32,
    pub widest_z_far: f32,
    /// Index of the draw call that produced the widest FOV.
    pub widest_call: Option<usize>,
}

impl SceneFovState {
    /// Offers a perspective FOV as the scene's widest.
    ///
    /// Square FOVs (`|hfov| == |vfov|`) are rejected since they are almost
    /// always cube-map or shadow passes.
    pub fn offer(&mut self, hfov: f32, vfov: f32, near: f32, far: f32, call_index: usize) -> bool {
        let h = hfov.abs();
        let v = vfov.abs();
        if h > self.widest_hfov && h <= MAX_WORLD_HFOV_DEG && h != v {
            self.widest_hfov = h;
            self.widest_vfov = v;
            self.widest_z_near = near;
            self.widest_z_far = far;
            self.widest_call = Some(call_index);
            true
        } else {
            false
        }
    }

    /// True once a 3D camera has been seen this scene.
    pub fn has_widest(&self) -> bool {
        self.widest_hfov > 0.0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ============================================
// CLASSIFIER
// ============================================

/// What the classifier learned from one draw call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub call_index: usize,
    pub is_new_scene: bool,
    pub widest_updated: bool,
}

/// Cross-frame scene detection state.
#[derive(Clone, Debug)]
pub struct SceneClassifier {
    recorded: [ProjectionSignature; MAX_RECORDED_PROJECTIONS],
    call_index: usize,
    new_scene: bool,
    next_scene: bool,
    fov: SceneFovState,
    scenes_detected: u64,
}

impl SceneClassifier {
    pub fn new() -> Self {
        Self {
            recorded: [ProjectionSignature::default(); MAX_RECORDED_PROJECTIONS],
            call_index: 0,
            new_scene: false,
            // The very first frame always measures
            next_scene: true,
            fov: SceneFovState::default(),
            scenes_detected: 0,
        }
    }

    /// Rolls over to a new frame.
    ///
    /// Returns `true` when this frame starts a new scene.
    pub fn begin_frame(&mut self) -> bool {
        self.new_scene = std::mem::take(&mut self.next_scene);
        if self.new_scene {
            self.fov.reset();
            self.scenes_detected += 1;
            info!("New scene detected (scene #{})", self.scenes_detected);
        }
        self.call_index = 0;
        self.new_scene
    }

    /// Records one draw call's projection.
    ///
    /// Must run exactly once per draw call, in draw order.
    pub fn observe(&mut self, m: &Matrix4) -> Observation {
        let call_index = self.call_index;
        let signature = ProjectionSignature::of(m);

        let mut widest_updated = false;
        if self.new_scene {
            let p = decompose(m);
            if p.is_perspective {
                widest_updated = self.fov.offer(p.hfov_deg, p.vfov_deg, p.z_near, p.z_far, call_index);
                if widest_updated {
                    info!(
                        "Widest 3D FOV now {:.1} x {:.1} deg (near {:.3}, far {:.3}) at call {}",
                        self.fov.widest_hfov, self.fov.widest_vfov, self.fov.widest_z_near, self.fov.widest_z_far, call_index
                    );
                }
            }
        }

        if call_index < MAX_RECORDED_PROJECTIONS {
            if !self.new_scene && self.recorded[call_index] != signature {
                self.next_scene = true;
            }
            self.recorded[call_index] = signature;
        }

        self.call_index = (call_index + 1).min(MAX_RECORDED_PROJECTIONS);

        Observation {
            call_index,
            is_new_scene: self.new_scene,
            widest_updated,
        }
    }

    pub fn is_new_scene(&self) -> bool {
        self.new_scene
    }

    pub fn fov(&self) -> &SceneFovState {
        &self.fov
    }

    pub fn call_index(&self) -> usize {
        self.call_index
    }

    /// Number of scenes started so far, the first one included.
    pub fn scenes_detected(&self) -> u64 {
        self.scenes_detected
    }
}

impl Default for SceneClassifier {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// TESTS
// ============================================
