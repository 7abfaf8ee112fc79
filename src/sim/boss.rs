//! Stage boss controller
//!
//! Entering -> Holding (lateral patrol) -> optional Swooping -> Defeated.
//! Once the entry position is reached the boss fires on its cooldown in every
//! live state; the bullet pattern follows the current health phase.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::state::{Boss, BossPattern, BossState, EnemyBullet};
use super::swoop::{SwoopPattern, advance_swoop, start_swoop};
use crate::config::{BossConfig, BossPhase, GameConfig};
use crate::consts::*;
use crate::{dir_from_down_angle, down_angle_to};

/// Half-width of the holding patrol (pixels)
const PATROL_AMPLITUDE: f32 = 60.0;
/// Patrol angular frequency (rad/s)
const PATROL_FREQUENCY: f32 = 1.2;
/// Spiral base-angle rotation (rad/s)
const SPIRAL_SPIN: f32 = 2.0;
/// Aimed shots travel faster than the base bullet speed
const AIMED_SPEED_SCALE: f32 = 1.2;

/// Create the boss for a stage key, or `None` if the stage has no boss
pub fn spawn_boss(stage_key: &str, config: &GameConfig) -> Option<Boss> {
    let boss_config = config.boss(stage_key)?;
    let size = Vec2::new(BOSS_WIDTH, BOSS_HEIGHT);
    let x = (PLAYFIELD_WIDTH - size.x) / 2.0;
    let max_hp = boss_config.max_hp.min(i32::MAX as u32) as i32;

    log::info!("Boss '{}' incoming ({} hp)", boss_config.name, max_hp);

    Some(Boss {
        stage_key: stage_key.to_string(),
        hp: max_hp,
        max_hp,
        pos: Vec2::new(x, -size.y),
        target_pos: Vec2::new(x, boss_config.entry_y),
        size,
        speed: boss_config.speed,
        bullet_speed: boss_config.bullet_speed,
        fire_cooldown: boss_config.fire_interval,
        fire_interval: boss_config.fire_interval,
        alive: true,
        state: BossState::Entering,
        swoop: None,
        patrol_time: 0.0,
    })
}

/// Pattern for the current health. The first phase whose threshold the health
/// percentage strictly exceeds wins; otherwise the last phase applies.
pub fn select_pattern(hp: i32, max_hp: i32, phases: &[BossPhase]) -> BossPattern {
    let percent = if max_hp > 0 {
        hp.max(0) as f32 / max_hp as f32 * 100.0
    } else {
        0.0
    };
    phases
        .iter()
        .find(|phase| percent > phase.hp_threshold_percent)
        .or(phases.last())
        .map_or(BossPattern::Radial, |phase| phase.pattern)
}

/// Where a holding boss currently wants to be
pub fn patrol_anchor(boss: &Boss) -> Vec2 {
    Vec2::new(
        boss.target_pos.x + (boss.patrol_time * PATROL_FREQUENCY).sin() * PATROL_AMPLITUDE,
        boss.target_pos.y,
    )
}

fn fan(origin: Vec2, angles: impl Iterator<Item = f32>, speed: f32) -> Vec<EnemyBullet> {
    angles
        .map(|angle| EnemyBullet::centered(origin, dir_from_down_angle(angle) * speed))
        .collect()
}

/// One volley of `pattern` from the boss's center-bottom. Angle 0 is straight down.
pub fn generate_boss_bullets(
    boss: &Boss,
    pattern: BossPattern,
    player_center: Vec2,
    time: f32,
) -> Vec<EnemyBullet> {
    let origin = boss.muzzle();
    let speed = boss.bullet_speed;
    let aim = down_angle_to(origin, player_center);

    match pattern {
        BossPattern::Radial => fan(origin, (0..12).map(|i| i as f32 * TAU / 12.0), speed),
        BossPattern::Spread => fan(origin, (-3..=3).map(|i| i as f32 * 0.2), speed),
        BossPattern::Burst => fan(origin, (0..8).map(|i| aim - 0.3 + 0.6 * i as f32 / 7.0), speed),
        BossPattern::Spiral => {
            let base = time * SPIRAL_SPIN;
            fan(origin, (0..6).map(|i| base + i as f32 * TAU / 6.0), speed)
        }
        BossPattern::Aimed => fan(origin, std::iter::once(aim), speed * AIMED_SPEED_SCALE),
    }
}

/// Advance the boss one tick. Returns the bullets fired this tick.
pub fn update_boss<R: Rng>(
    boss: &mut Boss,
    config: &BossConfig,
    player_center: Vec2,
    time: f32,
    dt: f32,
    rng: &mut R,
) -> Vec<EnemyBullet> {
    if !boss.alive {
        return Vec::new();
    }

    match boss.state {
        BossState::Entering => {
            let to_target = boss.target_pos - boss.pos;
            let step = boss.speed * dt;
            if to_target.length() <= step {
                boss.pos = boss.target_pos;
                boss.state = BossState::Holding;
                boss.patrol_time = 0.0;
                log::debug!("Boss reached entry position");
            } else {
                boss.pos += to_target.normalize_or_zero() * step;
            }
        }
        BossState::Holding => {
            boss.patrol_time += dt;
            boss.pos = patrol_anchor(boss);

            if config.swoop_enabled
                && boss.health_ratio() <= 0.5
                && rng.random::<f32>() < BOSS_SWOOP_CHANCE
            {
                let pattern = SwoopPattern::random(rng);
                let target = Vec2::new(
                    player_center.x - boss.size.x * 0.5,
                    PLAYFIELD_HEIGHT * 0.55,
                );
                start_swoop(boss, pattern, target);
                log::debug!("Boss swoop {:?}", pattern);
            }
        }
        BossState::Swooping => {
            boss.patrol_time += dt;
            advance_swoop(boss, dt);
        }
        BossState::Defeated => return Vec::new(),
    }

    if boss.state == BossState::Entering {
        return Vec::new();
    }

    boss.fire_cooldown -= dt;
    if boss.fire_cooldown > 0.0 {
        return Vec::new();
    }
    boss.fire_cooldown = boss.fire_interval;

    let pattern = select_pattern(boss.hp, boss.max_hp, &config.phases);
    generate_boss_bullets(boss, pattern, player_center, time)
}
