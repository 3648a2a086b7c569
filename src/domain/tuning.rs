//! Gameplay and reconciliation tuning for the sync client.
//!
//! Keep this separate from runtime configuration (tick rate, channel sizes).
//! Every field can be overridden from a TOML file, see `frameworks::config`.

use crate::domain::coords::UnitConverter;
use serde::Deserialize;

/// Render units a character covers per sub-move.
pub const MOVE_SPEED: f64 = 0.4;
/// Render units a bullet travels per frame.
pub const BULLET_SPEED: f64 = 0.5;
/// Fixed-point scale between the 100x100 grid and the chain grid.
pub const SCALING_FACTOR: u32 = 1000;
/// Longest on-chain sub-move in raw units (`MOVE_SPEED * SCALING_FACTOR`).
pub const SUBMOVE_SCALE: u32 = 400;
/// Maximum number of frames captured by one recording.
pub const RECORDING_FRAME_LIMIT: u32 = 300;
/// A recording keeps one sample every this many frames.
pub const FRAME_INTERVAL: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncTuning {
    pub move_speed: f64,
    pub bullet_speed: f64,
    pub scaling_factor: u32,
    pub submove_scale: u32,
    pub recording_frame_limit: u32,
    pub frame_interval: u32,

    /// Milliseconds a pending move may wait for confirmation before rollback.
    pub pending_timeout_ms: u64,

    /// Milliseconds a predicted bullet may wait for its on-chain id.
    pub bullet_timeout_ms: u64,

    /// Two local shots closer than this (ms) with the same angle are one shot.
    pub duplicate_window_ms: u64,

    /// Max angle difference, in degrees, for a confirmed bullet to claim a
    /// predicted one.
    pub angle_tolerance: f64,

    /// Max render-space drift between prediction and confirmation before the
    /// store is corrected.
    pub coord_tolerance: f64,

    /// Bullet corrections up to this distance snap instead of blending.
    pub snap_epsilon: f64,

    /// Render frames over which a larger bullet correction is blended away.
    pub interpolation_frames: u32,
}

impl SyncTuning {
    pub fn converter(&self) -> UnitConverter {
        UnitConverter::new(self.scaling_factor)
    }
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            move_speed: MOVE_SPEED,
            bullet_speed: BULLET_SPEED,
            scaling_factor: SCALING_FACTOR,
            submove_scale: SUBMOVE_SCALE,
            recording_frame_limit: RECORDING_FRAME_LIMIT,
            frame_interval: FRAME_INTERVAL,
            pending_timeout_ms: 15_000,
            bullet_timeout_ms: 10_000,
            duplicate_window_ms: 250,
            angle_tolerance: 1.0,
            coord_tolerance: 0.05,
            snap_epsilon: 0.5,
            interpolation_frames: 6,
        }
    }
}
