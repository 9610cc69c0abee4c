//! # Error Types Module
//!
//! The error types used throughout the projection pipeline.
//!
//! ## Plain English Explanation
//!
//! Composing a matrix never fails: bad numbers are replaced by safe ones
//! and the frame goes on. Errors only come from the edges:
//!
//! - "ConfigError: the HUD distance is negative"
//! - "HmdError: the headset lost tracking"
//!
//! Construction and validation return these. The per-draw-call path
//! returns plain values.

use thiserror::Error;

// ============================================
// MAIN PIPELINE ERROR
// ============================================

/// The top-level error for the crate.
#[derive(Debug, Error)]
pub enum VrError {
    /// A setting is out of range
    ///
    /// ## Examples
    /// - Units per metre of zero
    /// - HUD closer than 0 or further than 1
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The headset backend failed
    #[error("HMD error: {0}")]
    Hmd(#[from] HmdError),
}

// ============================================
// HMD ERRORS
// ============================================

/// Errors reported by an `HmdBackend`.
///
/// ## Plain English
///
/// These are problems with the headset itself. Tracking loss is the common
/// one and happens every time the headset is covered or leaves the
/// sensors' view. The tracker keeps the last good pose when it does.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HmdError {
    /// The device was unplugged or the runtime shut it down
    #[error("Headset disconnected")]
    DeviceLost,

    /// The device is present but doesn't know where it is
    #[error("Head tracking lost")]
    TrackingLost,

    /// The device reported an unusable field of view
    #[error("Invalid field of view: {0}")]
    InvalidFov(String),

    /// Any other runtime failure
    #[error("Runtime error: {0}")]
    Runtime(String),
}

// ============================================
// CONFIGURATION ERRORS
// ============================================

/// Errors that can occur with configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Units per metre {0} must be positive")]
    InvalidUnitsPerMetre(f32),

    #[error("World scale {0} must be positive")]
    InvalidScale(f32),

    /// A distance or size that can't be negative
    #[error("{name} is {value}, must not be negative")]
    NegativeDistance { name: &'static str, value: f32 },

    #[error("HUD 3D closer {0} is outside 0..=1")]
    HudCloserOutOfRange(f32),

    #[error("{name} {value} degrees is outside {min}..={max}")]
    AngleOutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("Telescope eye mask {0} is invalid (0 = off, 1 = left, 2 = right, 3 = both)")]
    InvalidTelescopeEye(u8),

    #[error("VR player {0} is outside 1..=4")]
    InvalidPlayer(u8),

    /// Non-finite values poison every matrix they touch
    #[error("{0} is not a finite number")]
    NotFinite(&'static str),
}

// ============================================
// RESULT TYPE ALIASES
// ============================================

/// Shorthand for `Result<T, VrError>`.
pub type VrResult<T> = Result<T, VrError>;

/// Shorthand for `Result<T, HmdError>`.
pub type HmdResult<T> = Result<T, HmdError>;

// ============================================
// TESTS
// ============================================
