//! Star Rift - A vertical arcade shoot-'em-up simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (spawning, bosses, collisions, world state)
//! - `game`: Orchestrator that owns the world and the outbound services
//! - `config`: Stage, boss and enemy-type records with validation
//! - `settings`: Quality presets and entity limits
//! - `services`: Outbound events (audio, shake, stats, popups)

pub mod config;
pub mod game;
pub mod services;
pub mod settings;
pub mod sim;

pub use config::{ConfigError, GameConfig, ValidationError};
pub use game::GameLoop;
pub use settings::{EntityLimits, QualityPreset, Settings};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Nominal display refresh step (60 Hz)
    pub const FRAME_DT: f32 = 1.0 / 60.0;
    /// Largest delta a single step will integrate (tab switches, debugger stalls)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Playfield dimensions (screen space, +y points down)
    pub const PLAYFIELD_WIDTH: f32 = 480.0;
    pub const PLAYFIELD_HEIGHT: f32 = 720.0;
    /// Entities this far outside the playfield are culled
    pub const CULL_MARGIN: f32 = 64.0;

    /// Player defaults
    pub const PLAYER_SIZE: f32 = 32.0;
    pub const PLAYER_SPEED: f32 = 300.0;
    pub const PLAYER_START_LIVES: u8 = 3;
    pub const PLAYER_FIRE_COOLDOWN: f32 = 0.25;
    pub const PLAYER_RAPID_FIRE_COOLDOWN: f32 = 0.12;
    /// Grace period after taking a hit
    pub const PLAYER_HIT_INVULNERABILITY: f32 = 1.5;
    pub const MAX_WEAPON_LEVEL: u8 = 3;

    /// Player bullet defaults
    pub const BULLET_WIDTH: f32 = 4.0;
    pub const BULLET_HEIGHT: f32 = 12.0;
    pub const BULLET_SPEED: f32 = 600.0;

    /// Enemy bullet defaults
    pub const ENEMY_BULLET_SIZE: f32 = 8.0;

    /// Powerup defaults
    pub const POWERUP_SIZE: f32 = 20.0;
    pub const POWERUP_FALL_SPEED: f32 = 90.0;
    pub const POWERUP_DROP_CHANCE: f32 = 0.10;

    /// Seconds between kills before the combo resets
    pub const COMBO_WINDOW: f32 = 2.0;

    /// Boss defaults
    pub const BOSS_WIDTH: f32 = 120.0;
    pub const BOSS_HEIGHT: f32 = 80.0;
    pub const BOSS_BONUS_SCORE: u64 = 5000;
    /// Cumulative regular spawns in a stage before its boss appears
    pub const BOSS_SPAWN_THRESHOLD: u32 = 30;
    /// Per-tick swoop trigger probability once the boss is below half health
    pub const BOSS_SWOOP_CHANCE: f32 = 0.02;
    /// Delay between boss defeat and the next stage
    pub const STAGE_TRANSITION_DELAY: f32 = 3.0;

    /// Timed powerup durations (seconds)
    pub const WEAPON_OVERRIDE_DURATION: f32 = 10.0;
    pub const RAPID_FIRE_DURATION: f32 = 8.0;
    pub const SLOW_DURATION: f32 = 6.0;
    /// Enemy speed factor while slow is active
    pub const SLOW_FACTOR: f32 = 0.5;

    /// Bonus round: every Nth level, lasting this many seconds
    pub const BONUS_ROUND_EVERY: u32 = 3;
    pub const BONUS_ROUND_DURATION: f32 = 15.0;
    pub const BONUS_SCORE_MULTIPLIER: f32 = 2.0;

    /// Per-tick chance that an idle formation member breaks into a swoop
    pub const ENEMY_SWOOP_CHANCE: f32 = 0.003;
}

/// Unit direction for an angle measured from straight down (+y), positive toward +x
#[inline]
pub fn dir_from_down_angle(angle: f32) -> Vec2 {
    Vec2::new(angle.sin(), angle.cos())
}

/// Angle (from straight down) of the vector pointing from `from` to `to`
#[inline]
pub fn down_angle_to(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.x.atan2(d.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_down_angle_round_trip() {
        let from = Vec2::new(100.0, 100.0);
        let to = Vec2::new(200.0, 200.0);
        let angle = down_angle_to(from, to);
        let dir = dir_from_down_angle(angle);
        let expected = (to - from).normalize();
        assert!((dir - expected).length() < 1e-5);
    }

    #[test]
    fn test_zero_angle_points_down() {
        let dir = dir_from_down_angle(0.0);
        assert!(dir.x.abs() < 1e-6);
        assert!((dir.y - 1.0).abs() < 1e-6);
    }
}
