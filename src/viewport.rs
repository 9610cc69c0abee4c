//! # Viewport Classification
//!
//! Tags describing what kind of layer a draw call renders into, and the
//! draw-call record handed to the pipeline.
//!
//! ## Plain English
//!
//! Whether a draw is the game world, a HUD element or a texture being
//! rendered for later is decided by the renderer (viewport size, target
//! framebuffer, skybox detection). We only receive the verdict as a
//! `ViewportType` and pick a composition path from it.

use std::fmt;

use crate::math::Matrix4;
use crate::projection::{DepthRange, ViewportCorrection};

// ============================================
// VIEWPORT TYPE
// ============================================

/// The kind of layer a draw call targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ViewportType {
    /// Covers the whole screen
    #[default]
    Fullscreen,
    /// Fullscreen with black bars
    Letterboxed,
    /// A small rectangle of the screen (minimap, health bar)
    HudElement,
    /// Drawn outside the visible screen
    Offscreen,
    /// Drawn into a texture sampled later
    RenderToTexture,
    /// One quarter of a split-screen game, `1..=4`
    Player(u8),
    /// Detected as sky geometry
    Skybox,
}

impl ViewportType {
    /// Human-readable name, used in logs.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Fullscreen => "Fullscreen",
            Self::Letterboxed => "Letterboxed",
            Self::HudElement => "HUD element",
            Self::Offscreen => "Offscreen",
            Self::RenderToTexture => "Render to texture",
            Self::Player(1) => "Player 1",
            Self::Player(2) => "Player 2",
            Self::Player(3) => "Player 3",
            Self::Player(4) => "Player 4",
            Self::Player(_) => "Player ?",
            Self::Skybox => "Skybox",
        }
    }

    pub fn is_skybox(&self) -> bool {
        matches!(self, Self::Skybox)
    }

    /// The split-screen player number, if any.
    pub fn player(&self) -> Option<u8> {
        match self {
            Self::Player(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for ViewportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================
// DRAW CALL
// ============================================

/// One draw call as the renderer sees it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCall {
    /// The projection matrix exactly as the game set it
    pub projection: Matrix4,
    pub viewport: ViewportType,
    /// Viewport width is negative
    pub inverted_x: bool,
    /// Viewport height is negative
    pub inverted_y: bool,
    pub correction: ViewportCorrection,
    pub depth_range: DepthRange,
    /// The projection was changed since the previous draw call.
    ///
    /// Unchanged projections are not observed again by the scene classifier.
    pub projection_changed: bool,
}

impl DrawCall {
    pub fn new(projection: Matrix4, viewport: ViewportType) -> Self {
        Self {
            projection,
            viewport,
            inverted_x: false,
            inverted_y: false,
            correction: ViewportCorrection::IDENTITY,
            depth_range: DepthRange::default(),
            projection_changed: true,
        }
    }

    pub fn with_inverted(mut self, inverted_x: bool, inverted_y: bool) -> Self {
        self.inverted_x = inverted_x;
        self.inverted_y = inverted_y;
        self
    }

    pub fn with_correction(mut self, correction: ViewportCorrection) -> Self {
        self.correction = correction;
        self
    }

    pub fn with_depth_range(mut self, depth_range: DepthRange) -> Self {
        self.depth_range = depth_range;
        self
    }

    /// Marks the projection as unchanged since the previous call.
    pub fn unchanged(mut self) -> Self {
        self.projection_changed = false;
        self
    }
}
