//! # Eye Transform Composer
//!
//! Turns one game projection into a pair of per-eye matrices.
//!
//! ## Plain English Explanation
//!
//! The game asked for one picture from one camera. The headset needs two
//! pictures, one per eye, that follow the player's head. For each draw call
//! we pick a path:
//!
//! ```text
//!   VR off, flashing debug layer? ─────────► Hidden (all-zero matrix)
//!   VR off? ───────────────────────────────► Flat (pass through)
//!   should hide? ──────────────────────────► Hidden
//!   render to texture? ────────────────────► RenderToTexture (untouched)
//!   already-stereo fullscreen copy? ───────► FullscreenLayer
//!   perspective world geometry? ───────────► World3d
//!   anything else (HUD, menus, 2D games) ──► Hud
//! ```
//!
//! The last two build a real stereo pair: headset FOV, head tracking and the
//! view chain (see `view`). HUD layers are first fitted into a floating box
//! (see `hud`).
//!
//! `compose` only reads the `FrameContext`, so calls can be composed on
//! many threads at once.

pub mod hud;
pub mod view;

use log::{debug, warn};

use crate::config::{SkyboxMode, VrConfig, TELESCOPE_LEFT, TELESCOPE_RIGHT};
use crate::hmd::{Eye, EyePair, HmdBackend};
use crate::math::{half_tan_deg, sign_of, Matrix4, Vec3};
use crate::projection::decompose;
use crate::scene::SceneFovState;
use crate::state::{FrameContext, PreparedCall};
use crate::viewport::ViewportType;

use self::hud::{hud_box, hud_frustum, place_layer};
use self::view::{LayerKind, ViewChain};

// ============================================
// OUTPUT
// ============================================

/// Which policy produced a composed projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompositionPath {
    Hidden,
    RenderToTexture,
    FullscreenLayer,
    Flat,
    World3d,
    Hud,
}

/// Finished per-eye matrices for one draw call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComposedProjection {
    pub left: Matrix4,
    pub right: Matrix4,
    pub path: CompositionPath,
    /// Draw without depth testing against the world
    pub layer_on_top: bool,
    /// Per-eye clip-space x shift for a stereo geometry stage. `None` when
    /// the eye matrices already differ.
    pub stereo_offsets: Option<EyePair<Vec3>>,
}

impl ComposedProjection {
    fn mono(matrix: Matrix4, path: CompositionPath) -> Self {
        Self {
            left: matrix,
            right: matrix,
            path,
            layer_on_top: false,
            stereo_offsets: None,
        }
    }

    pub fn eye(&self, eye: Eye) -> &Matrix4 {
        match eye {
            Eye::Left => &self.left,
            Eye::Right => &self.right,
        }
    }

    /// True when every draw with this projection collapses to nothing.
    pub fn is_hidden(&self) -> bool {
        self.left.is_zero() && self.right.is_zero()
    }

    /// Both eyes' matrices as one contiguous uniform block.
    pub fn as_uniform_bytes(&self) -> [u8; 128] {
        let mut out = [0u8; 128];
        out[..64].copy_from_slice(bytemuck::bytes_of(&self.left));
        out[64..].copy_from_slice(bytemuck::bytes_of(&self.right));
        out
    }
}

// ============================================
// TELESCOPE AND ZOOM
// ============================================

/// Per-eye FOV multipliers and forward offset for narrow game cameras.
///
/// ## Plain English
///
/// A sniper scope narrows the game's FOV to a few degrees. Stretched over a
/// headset's 100 degrees that's unusable, so either:
/// - telescope: the chosen eye(s) see a magnified view and the camera stays put
/// - zoom: both eyes see normally but the camera moves forward
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zoom {
    pub width_mul: EyePair<f32>,
    pub height_mul: EyePair<f32>,
    pub telescope: bool,
    /// Suppresses camera-forward movement
    pub no_forward: bool,
    /// Metres to move forward
    pub forward: f32,
}

impl Zoom {
    pub fn evaluate(config: &VrConfig, fov: &SceneFovState, hmd_half_tan: f32) -> Self {
        let vfov = fov.widest_vfov;
        let telescope = config.telescope_eye != 0
            && vfov <= config.telescope_max_fov
            && vfov > 1.0
            && (config.telescope_max_fov <= config.min_fov || vfov > config.min_fov);

        let mut zoom = Self {
            width_mul: EyePair::splat(1.0),
            height_mul: EyePair::splat(1.0),
            telescope,
            no_forward: telescope,
            forward: 0.0,
        };

        if telescope {
            let scale = (hmd_half_tan / half_tan_deg(vfov)).abs();
            if config.telescope_eye & TELESCOPE_LEFT != 0 {
                zoom.width_mul.left = scale;
                zoom.height_mul.left = scale;
            }
            if config.telescope_eye & TELESCOPE_RIGHT != 0 {
                zoom.width_mul.right = scale;
                zoom.height_mul.right = scale;
            }
        } else if fov.widest_hfov > 0.0 && fov.widest_hfov <= config.min_fov {
            zoom.forward =
                config.aim_distance * half_tan_deg(config.min_fov) / half_tan_deg(fov.widest_hfov) - config.aim_distance;
        }

        zoom
    }
}

// ============================================
// CLASSIFICATION HELPERS
// ============================================

/// Whether the call is the debug-selected layer in the off half of its
/// flash cycle. Hidden with or without VR.
pub fn is_flashing(config: &VrConfig, call: &PreparedCall) -> bool {
    config.selected_layer == Some(call.call_index) && config.flash_state > 5
}

/// Whether a call must be blanked out while VR is active.
pub fn should_hide(ctx: &FrameContext, call: &PreparedCall) -> bool {
    let config = &ctx.config;
    let other_player = matches!(call.viewport.player(), Some(p) if p != config.vr_player);
    let hidden_sky = call.viewport.is_skybox() && config.skybox_mode == SkyboxMode::Hidden;

    call.viewport == ViewportType::Offscreen
        || other_player
        || is_flashing(config, call)
        || hidden_sky
        || ctx.black_screen
}

/// Whether a call takes the world path (as opposed to the HUD path).
pub fn is_world_call(call: &PreparedCall) -> bool {
    call.is_perspective && !matches!(call.viewport, ViewportType::HudElement | ViewportType::Offscreen)
}

// ============================================
// COMPOSITION
// ============================================

/// Composes the per-eye matrices for one prepared draw call.
///
/// Never fails and never returns a non-finite cell.
pub fn compose(ctx: &FrameContext, hmd: Option<&dyn HmdBackend>, call: &PreparedCall) -> ComposedProjection {
    let m = call.matrix;

    let hmd = match hmd {
        Some(hmd) if ctx.config.enable_vr => hmd,
        _ if is_flashing(&ctx.config, call) => return ComposedProjection::mono(Matrix4::ZERO, CompositionPath::Hidden),
        _ => return finish(ComposedProjection::mono(m, CompositionPath::Flat), call),
    };

    if should_hide(ctx, call) {
        if ctx.is_new_scene {
            debug!("Hiding call {} ({})", call.call_index, call.viewport);
        }
        return ComposedProjection::mono(Matrix4::ZERO, CompositionPath::Hidden);
    }

    // Rendered exactly as the game asked, in mono, with no viewport correction
    if call.viewport == ViewportType::RenderToTexture {
        return ComposedProjection::mono(m, CompositionPath::RenderToTexture);
    }

    // Copied from a fullscreen framebuffer that already holds both eyes
    if ctx.config.hud_fullscreen && !call.is_perspective {
        return finish(ComposedProjection::mono(m, CompositionPath::FullscreenLayer), call);
    }

    let config = &ctx.config;
    let units_per_metre = config.world_units_per_metre();
    let zoom = Zoom::evaluate(config, &call.fov, hmd.projection_half_tan());
    let world = is_world_call(call);

    let layer = LayerKind {
        is_perspective: call.is_perspective,
        is_skybox: call.viewport.is_skybox(),
        no_forward: zoom.no_forward,
        zoom_forward: zoom.forward,
        scene_has_3d: call.fov.has_widest(),
    };
    let chain = ViewChain::build(ctx, &layer, units_per_metre);

    let (look, hmd_proj, path, layer_on_top) = if world {
        let p = decompose(&m);
        if ctx.is_new_scene {
            debug!(
                "World call {}: hfov {:.2} vfov {:.2} near {:.3} far {:.3}",
                call.call_index, p.hfov_deg, p.vfov_deg, p.z_near, p.z_far
            );
        }
        (
            chain.world(),
            hmd.projection_matrices(p.z_near, p.z_far, true),
            CompositionPath::World3d,
            false,
        )
    } else {
        let frustum = hud_frustum(config, &call.fov, zoom.forward != 0.0, units_per_metre);
        let forward = if zoom.no_forward {
            0.0
        } else {
            config.camera_forward + zoom.forward
        };
        let hud = hud_box(config, &frustum, call.fov.has_widest(), forward, units_per_metre);
        let placement = place_layer(&m, call.is_perspective, &hud, config.hud_3d_closer);
        if ctx.is_new_scene {
            debug!(
                "HUD call {}: box {:.2} x {:.2} x {:.2} at {:.2}, near {:.4} far {:.2}",
                call.call_index, hud.width, hud.height, hud.thickness, hud.distance, frustum.z_near, frustum.z_far
            );
        }
        (
            chain.hud(&placement.matrix()),
            hmd.projection_matrices(frustum.z_near, frustum.z_far, true),
            CompositionPath::Hud,
            config.hud_on_top,
        )
    };

    // Per-eye projection: headset FOV, game's handedness
    let sx = sign_of(m.xx);
    let sy = sign_of(m.yy);
    let mut proj = hmd_proj.map(|eye, h| {
        let mut p = Matrix4 {
            xx: h.xx * sx * *zoom.width_mul.get(eye),
            yy: h.yy * sy * *zoom.height_mul.get(eye),
            zx: h.zx * sx,
            zy: h.zy * sy,
            ..m
        };
        if !world {
            // The layer now sits in a 3D box, so it needs real perspective depth
            p.zz = h.zz;
            p.zw = h.zw;
            p.wz = h.wz;
            p.ww = 0.0;
        }
        p
    });
    if config.geometry_shader_stereo {
        proj.left.zx = 0.0;
    }

    let offsets = if layer.is_skybox {
        EyePair::splat(Vec3::ZERO)
    } else {
        hmd.eye_offsets().map(|_, o| o * units_per_metre)
    };

    let (views, stereo_offsets) = if config.geometry_shader_stereo {
        let scaled = offsets.map(|eye, o| o * proj.get(eye).xx);
        (EyePair::splat(look), Some(scaled))
    } else {
        (offsets.map(|_, o| look * Matrix4::translation(o)), None)
    };

    let finals = views.map(|eye, v| {
        let mut f = v * *proj.get(eye);
        if call.is_perspective && m.xx < 0.0 {
            f = f.flip_x_axis();
        }
        if call.is_perspective && m.yy < 0.0 {
            f = f.flip_y_axis();
        }
        f
    });

    finish(
        ComposedProjection {
            left: finals.left,
            right: finals.right,
            path,
            layer_on_top,
            stereo_offsets,
        },
        call,
    )
}

/// Applies viewport correction and clears any non-finite cells.
fn finish(mut out: ComposedProjection, call: &PreparedCall) -> ComposedProjection {
    out.left = sanitize(call.correction.apply(&out.left), call, Eye::Left);
    out.right = sanitize(call.correction.apply(&out.right), call, Eye::Right);
    out
}

fn sanitize(m: Matrix4, call: &PreparedCall, eye: Eye) -> Matrix4 {
    let (clean, replaced) = m.sanitized();
    if replaced > 0 {
        warn!(
            "Replaced {} non-finite cells in {:?} eye matrix of call {} ({})",
            replaced, eye, call.call_index, call.viewport
        );
    }
    clean
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TELESCOPE_BOTH;
    use crate::hmd::FallbackHmd;
    use crate::projection::{orthographic_matrix, perspective_matrix, ViewportCorrection};
    use crate::state::GameCamera;
    use pretty_assertions::assert_eq;

    fn context(config: VrConfig) -> FrameContext {
        FrameContext {
            config,
            is_new_scene: false,
            head_rotation: Matrix4::IDENTITY,
            head_translation: Vec3::ZERO,
            free_look: Vec3::ZERO,
            game_camera: GameCamera::default(),
            black_screen: false,
        }
    }

    fn call(matrix: Matrix4, viewport: ViewportType) -> PreparedCall {
        PreparedCall {
            matrix,
            viewport,
            correction: ViewportCorrection::IDENTITY,
            call_index: 0,
            is_perspective: matrix.zw == -1.0,
            fov: SceneFovState::default(),
        }
    }

    fn world() -> Matrix4 {
        perspective_matrix(60.0, 40.0, 0.1, 100.0)
    }

    #[test]
    fn test_vr_disabled_is_flat() {
        let ctx = context(VrConfig {
            enable_vr: false,
            ..VrConfig::default()
        });
        let hmd = FallbackHmd::new();
        let out = compose(&ctx, Some(&hmd), &call(world(), ViewportType::Offscreen));
        assert_eq!(out.path, CompositionPath::Flat);
        assert_eq!(out.left, world());
        assert_eq!(out.right, world());
    }

    #[test]
    fn test_no_backend_is_flat() {
        let out = compose(&context(VrConfig::default()), None, &call(world(), ViewportType::Fullscreen));
        assert_eq!(out.path, CompositionPath::Flat);
    }

    #[test]
    fn test_hidden_paths() {
        let hmd = FallbackHmd::new();
        let ctx = context(VrConfig {
            skybox_mode: SkyboxMode::Hidden,
            vr_player: 2,
            ..VrConfig::default()
        });
        for viewport in [ViewportType::Offscreen, ViewportType::Player(1), ViewportType::Skybox] {
            let out = compose(&ctx, Some(&hmd), &call(world(), viewport));
            assert_eq!(out.path, CompositionPath::Hidden, "{}", viewport);
            assert!(out.is_hidden());
        }
        let out = compose(&ctx, Some(&hmd), &call(world(), ViewportType::Player(2)));
        assert_eq!(out.path, CompositionPath::World3d);
    }

    #[test]
    fn test_flashing_layer() {
        let hmd = FallbackHmd::new();
        let mut config = VrConfig {
            selected_layer: Some(0),
            flash_state: 6,
            ..VrConfig::default()
        };
        assert!(compose(&context(config.clone()), Some(&hmd), &call(world(), ViewportType::Fullscreen)).is_hidden());
        config.flash_state = 5;
        assert!(!compose(&context(config), Some(&hmd), &call(world(), ViewportType::Fullscreen)).is_hidden());
    }

    #[test]
    fn test_flashing_layer_hidden_without_vr() {
        let mut config = VrConfig {
            enable_vr: false,
            selected_layer: Some(0),
            flash_state: 6,
            ..VrConfig::default()
        };
        let hmd = FallbackHmd::new();
        let out = compose(&context(config.clone()), Some(&hmd), &call(world(), ViewportType::Fullscreen));
        assert_eq!(out.path, CompositionPath::Hidden);
        assert!(out.is_hidden());

        let out = compose(&context(config.clone()), None, &call(world(), ViewportType::Fullscreen));
        assert!(out.is_hidden());

        let mut other = call(world(), ViewportType::Offscreen);
        other.call_index = 1;
        assert_eq!(compose(&context(config.clone()), None, &other).path, CompositionPath::Flat);

        config.flash_state = 5;
        let out = compose(&context(config), None, &call(world(), ViewportType::Fullscreen));
        assert_eq!(out.path, CompositionPath::Flat);
    }

    #[test]
    fn test_black_screen_hides_everything() {
        let hmd = FallbackHmd::new();
        let mut ctx = context(VrConfig::default());
        ctx.black_screen = true;
        assert!(compose(&ctx, Some(&hmd), &call(world(), ViewportType::Fullscreen)).is_hidden());
    }

    #[test]
    fn test_render_to_texture_untouched() {
        let hmd = FallbackHmd::new();
        let mut c = call(world(), ViewportType::RenderToTexture);
        c.correction = ViewportCorrection::new(Vec3::new(0.5, 0.0, 0.0), Vec3::splat(2.0));
        let out = compose(&context(VrConfig::default()), Some(&hmd), &c);
        assert_eq!(out.path, CompositionPath::RenderToTexture);
        assert_eq!(out.left, world());
    }

    #[test]
    fn test_fullscreen_layer_mono() {
        let hmd = FallbackHmd::new();
        let ctx = context(VrConfig {
            hud_fullscreen: true,
            ..VrConfig::default()
        });
        let ortho = orthographic_matrix(0.0, 480.0, 272.0, 0.0, -1.0, 1.0);
        let out = compose(&ctx, Some(&hmd), &call(ortho, ViewportType::Fullscreen));
        assert_eq!(out.path, CompositionPath::FullscreenLayer);
        assert_eq!(out.left, out.right);
        assert_eq!(out.left, ortho);
    }

    #[test]
    fn test_world_call_uses_headset_fov() {
        let hmd = FallbackHmd::new();
        let out = compose(&context(VrConfig::default()), Some(&hmd), &call(world(), ViewportType::Fullscreen));
        assert_eq!(out.path, CompositionPath::World3d);
        assert!(!out.is_hidden());
        // With identity head and view, the eye projection is the matrix itself
        let expected_xx = hmd.projection_matrices(0.1, 100.0, true).left.xx;
        assert!((out.left.xx - expected_xx).abs() < 1e-5);
        assert!(out.stereo_offsets.is_some());
    }

    #[test]
    fn test_separate_eye_views_without_geometry_stereo() {
        let hmd = FallbackHmd::new();
        let ctx = context(VrConfig {
            geometry_shader_stereo: false,
            ..VrConfig::default()
        });
        let out = compose(&ctx, Some(&hmd), &call(world(), ViewportType::Fullscreen));
        assert!(out.stereo_offsets.is_none());
        assert_ne!(out.left, out.right);
    }

    #[test]
    fn test_hud_path_layer_on_top() {
        let hmd = FallbackHmd::new();
        let ctx = context(VrConfig {
            hud_on_top: true,
            ..VrConfig::default()
        });
        let ortho = orthographic_matrix(0.0, 480.0, 0.0, 272.0, -1.0, 1.0);
        let out = compose(&ctx, Some(&hmd), &call(ortho, ViewportType::Fullscreen));
        assert_eq!(out.path, CompositionPath::Hud);
        assert!(out.layer_on_top);
        assert!(!out.is_hidden());
        assert!(out.left.is_finite());
    }

    #[test]
    fn test_flipped_x_is_mirrored_back() {
        let hmd = FallbackHmd::new();
        let ctx = context(VrConfig::default());
        let mirrored = Matrix4 { xx: -world().xx, ..world() };
        let out = compose(&ctx, Some(&hmd), &call(mirrored, ViewportType::Fullscreen));
        assert!(out.left.xx < 0.0);
        assert!(out.left.is_finite());
    }

    #[test]
    fn test_zoom_forward() {
        let config = VrConfig::default();
        let fov = SceneFovState {
            widest_hfov: 5.0,
            widest_vfov: 3.0,
            widest_z_near: 0.1,
            widest_z_far: 100.0,
            widest_call: Some(0),
        };
        let zoom = Zoom::evaluate(&config, &fov, 1.0);
        assert!(!zoom.telescope);
        assert!(zoom.forward > 0.0);
        let expected = 7.0 * half_tan_deg(10.0) / half_tan_deg(5.0) - 7.0;
        assert!((zoom.forward - expected).abs() < 1e-4);
    }

    #[test]
    fn test_telescope() {
        let config = VrConfig {
            telescope_eye: TELESCOPE_LEFT,
            ..VrConfig::default()
        };
        let fov = SceneFovState {
            widest_hfov: 30.0,
            widest_vfov: 20.0,
            widest_z_near: 0.1,
            widest_z_far: 100.0,
            widest_call: Some(0),
        };
        let zoom = Zoom::evaluate(&config, &fov, 1.0);
        assert!(zoom.telescope);
        assert!(zoom.no_forward);
        assert!(zoom.width_mul.left > 1.0);
        assert_eq!(zoom.width_mul.right, 1.0);
        assert_eq!(zoom.forward, 0.0);

        let both = Zoom::evaluate(
            &VrConfig {
                telescope_eye: TELESCOPE_BOTH,
                ..VrConfig::default()
            },
            &fov,
            1.0,
        );
        assert_eq!(both.width_mul.left, both.width_mul.right);
    }

    #[test]
    fn test_uniform_bytes_layout() {
        let out = ComposedProjection::mono(Matrix4::IDENTITY, CompositionPath::Flat);
        let bytes = out.as_uniform_bytes();
        assert_eq!(&bytes[..4], &1.0f32.to_ne_bytes());
        assert_eq!(&bytes[64..68], &1.0f32.to_ne_bytes());
    }
}
