//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only (stored in the world)
//! - Stable iteration order (collection / acquisition order)
//! - No rendering, audio or platform dependencies; side effects are queued
//!   as events on the world

pub mod boss;
pub mod collision;
pub mod difficulty;
pub mod formation;
pub mod limiter;
pub mod pool;
pub mod spawner;
pub mod state;
pub mod swoop;
pub mod tick;

pub use boss::{generate_boss_bullets, select_pattern, spawn_boss, update_boss};
pub use collision::{PlayerHit, Rect, resolve_bullets_vs_boss, resolve_bullets_vs_enemies};
pub use formation::{Formation, FormationKind, FormationOptions, create_formation, offsets, update_formation};
pub use limiter::enforce_limit;
pub use pool::{Pool, PoolHandle, PoolStats, Poolable};
pub use spawner::{WaveChoice, roll_enemy_kind, select_enemy_kind, spawn_wave};
pub use state::{
    Boss, BossPattern, BossState, Bullet, Enemy, EnemyBehavior, EnemyBullet, EnemyKind, GamePhase,
    MovementPattern, Player, Powerup, PowerupKind, SessionStats, World,
};
pub use swoop::{Swoop, SwoopPattern, SwoopPhase, advance_swoop, start_swoop};
pub use tick::{Rules, TickInput, step};
