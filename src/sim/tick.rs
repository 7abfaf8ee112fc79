//! Frame step
//!
//! [`step`] consumes the tick-start world and returns the next one. Every
//! subsystem inside a step reads and writes that single value, so a step with
//! the same world, input and dt always produces the same result.

use std::collections::BTreeSet;

use glam::Vec2;
use rand::Rng;

use super::boss::{spawn_boss, update_boss};
use super::collision::{
    EffectSpawn, PlayerHit, Rect, collected_powerups, enemy_bullet_rects, resolve_bullets_vs_boss,
    resolve_bullets_vs_enemies, resolve_player_hit,
};
use super::difficulty;
use super::formation::update_formation;
use super::limiter::enforce_limit_in_place;
use super::spawner::{enemy_bullet, enemy_fire_cooldown, spawn_wave};
use super::state::{
    Bullet, EnemyBehavior, Enemy, GamePhase, MovementPattern, Powerup, PowerupKind, TimerKind,
    WeaponType, World,
};
use super::swoop::{SwoopPattern, advance_swoop, start_swoop};
use crate::config::GameConfig;
use crate::consts::*;
use crate::services::{GameEvent, MusicTrack, SoundEffect, StatEvent};
use crate::settings::EntityLimits;

/// Input commands for a single step (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Desired movement direction; longer than 1 is clamped
    pub move_dir: Vec2,
    /// Hold to fire
    pub fire: bool,
    /// Pause toggle
    pub pause: bool,
    /// Idle/demo mode - autopilot flies the ship
    pub idle_mode: bool,
}

/// Read-only tuning a step runs against
#[derive(Debug, Clone, Copy)]
pub struct Rules<'a> {
    pub config: &'a GameConfig,
    pub limits: EntityLimits,
}

impl<'a> Rules<'a> {
    pub fn new(config: &'a GameConfig, limits: EntityLimits) -> Self {
        Self { config, limits }
    }
}

/// Fallback enemy bullet speed when no stage config exists
const DEFAULT_ENEMY_BULLET_SPEED: f32 = 200.0;
/// Dive-prone enemies break off once this far down the screen
const DIVE_TRIGGER_Y: f32 = 80.0;
/// Formation members fly to their slot this much faster than they cruise
const RETURN_SPEED_SCALE: f32 = 2.0;

/// Advance the world by `dt` seconds
pub fn step(mut world: World, input: &TickInput, dt: f32, rules: &Rules) -> World {
    // Events only live for one step
    world.events.clear();

    // Handle pause toggle
    if input.pause {
        match world.phase {
            GamePhase::Playing => {
                world.phase = GamePhase::Paused;
                log::info!("Paused");
                return world;
            }
            GamePhase::Paused => {
                world.phase = GamePhase::Playing;
                log::info!("Resumed");
            }
            GamePhase::GameOver => {}
        }
    }

    // Nothing ticks while paused or after game over (timers included)
    if world.phase != GamePhase::Playing {
        return world;
    }

    if !dt.is_finite() {
        return world;
    }
    let dt = dt.clamp(0.0, MAX_FRAME_DT);
    if dt <= 0.0 {
        return world;
    }
    world.time += dt;

    let input = if input.idle_mode {
        autopilot(&world, input)
    } else {
        input.clone()
    };

    tick_timers(&mut world, dt);
    tick_combo(&mut world, dt);
    update_player(&mut world, &input, dt);
    move_player_bullets(&mut world, dt);
    run_spawner(&mut world, dt, rules.config);

    // Slow powerup scales every hostile
    let hostile_dt = if world.slow_active { dt * SLOW_FACTOR } else { dt };
    for formation in &mut world.formations {
        update_formation(formation, hostile_dt);
    }
    update_enemies(&mut world, hostile_dt, rules.config);
    run_boss(&mut world, hostile_dt, rules.config);
    move_enemy_bullets(&mut world, hostile_dt);
    move_powerups(&mut world, dt);

    resolve_collisions(&mut world);
    if world.phase == GamePhase::Playing {
        check_level_up(&mut world);
    }

    update_effects(&mut world, dt);
    enforce_limits(&mut world, &rules.limits);

    world
}

/// Pick inputs for demo play: dodge, then grab pickups, then line up on a target
fn autopilot(world: &World, input: &TickInput) -> TickInput {
    let mut input = input.clone();
    input.fire = true;

    let player_center = world.player.center();

    // Closest bullet about to land on us
    let threat = world
        .enemy_bullets
        .values()
        .map(|b| b.center())
        .filter(|c| {
            c.y < player_center.y
                && player_center.y - c.y < 160.0
                && (c.x - player_center.x).abs() < PLAYER_SIZE
        })
        .min_by(|a, b| {
            a.distance_squared(player_center)
                .total_cmp(&b.distance_squared(player_center))
        });

    let target_x = if let Some(threat) = threat {
        let away = if threat.x > player_center.x { -1.0 } else { 1.0 };
        player_center.x + away * PLAYER_SIZE * 2.0
    } else if let Some(powerup) = world
        .powerups
        .iter()
        .filter(|p| p.pos.y > PLAYFIELD_HEIGHT * 0.4)
        .min_by(|a, b| {
            (a.pos.x - player_center.x)
                .abs()
                .total_cmp(&(b.pos.x - player_center.x).abs())
        })
    {
        powerup.rect().center().x
    } else if let Some(boss) = world.boss.as_ref().filter(|b| b.alive) {
        boss.center().x
    } else if let Some(enemy) = world
        .enemies
        .iter()
        .filter(|e| e.pos.y > 0.0)
        .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
    {
        enemy.center().x
    } else {
        PLAYFIELD_WIDTH / 2.0
    };

    let dx = target_x - player_center.x;
    input.move_dir = if dx.abs() > 4.0 {
        Vec2::new(dx.signum(), 0.0)
    } else {
        Vec2::ZERO
    };
    input
}

fn tick_timers(world: &mut World, dt: f32) {
    let mut expired = Vec::new();
    world.timers.retain_mut(|timer| {
        timer.remaining -= dt;
        if timer.remaining <= 0.0 {
            expired.push(timer.kind);
            false
        } else {
            true
        }
    });

    for kind in expired {
        on_timer_expired(world, kind);
    }

    world.player.invulnerable = (world.player.invulnerable - dt).max(0.0);
}

fn on_timer_expired(world: &mut World, kind: TimerKind) {
    match kind {
        TimerKind::WeaponOverride => world.player.weapon_override = None,
        TimerKind::RapidFire => world.player.rapid_fire = false,
        TimerKind::Slow => world.slow_active = false,
        TimerKind::BonusRound => {
            world.bonus_round = false;
            world.emit(GameEvent::Music(MusicTrack::Stage));
            log::info!("Bonus round over");
        }
        TimerKind::StageTransition => advance_stage(world),
    }
}

fn advance_stage(world: &mut World) {
    world.stage += 1;
    world.spawned_this_stage = 0;
    world.spawn_timer = 0.0;
    world.boss = None;
    world.stage_clear_pending = false;
    world.enemy_bullets.clear();
    world.emit(GameEvent::Music(MusicTrack::Stage));
    world.emit(GameEvent::Popup(format!("STAGE {}", world.stage)));
    log::info!("Stage {} begins", world.stage);
}

fn tick_combo(world: &mut World, dt: f32) {
    if world.combo == 0 {
        return;
    }
    world.combo_timer -= dt;
    if world.combo_timer <= 0.0 {
        world.combo = 0;
        world.combo_timer = 0.0;
    }
}

fn update_player(world: &mut World, input: &TickInput, dt: f32) {
    let player = &mut world.player;
    if !player.alive {
        return;
    }

    let dir = input.move_dir.clamp_length_max(1.0);
    player.pos += dir * PLAYER_SPEED * dt;
    player.pos.x = player.pos.x.clamp(0.0, PLAYFIELD_WIDTH - player.size.x);
    player.pos.y = player.pos.y.clamp(0.0, PLAYFIELD_HEIGHT - player.size.y);

    player.fire_cooldown = (player.fire_cooldown - dt).max(0.0);
    if input.fire && player.fire_cooldown <= 0.0 {
        player.fire_cooldown = if player.rapid_fire {
            PLAYER_RAPID_FIRE_COOLDOWN
        } else {
            PLAYER_FIRE_COOLDOWN
        };
        fire_player_weapon(world);
    }
}

/// Spawn this volley's bullets from the ship's nose
fn fire_player_weapon(world: &mut World) {
    let player = &world.player;
    let nose = Vec2::new(player.center().x, player.pos.y);

    // (x offset, angle from straight up, damage, size)
    let normal = Vec2::new(BULLET_WIDTH, BULLET_HEIGHT);
    let shots: Vec<(f32, f32, i32, Vec2)> = match player.weapon_override {
        Some(WeaponType::Spread) => (-2..=2)
            .map(|i| (0.0, i as f32 * 0.15, 1, normal))
            .collect(),
        Some(WeaponType::Laser) => vec![(0.0, 0.0, 3, Vec2::new(8.0, 28.0))],
        None => match player.weapon_level {
            0 | 1 => vec![(0.0, 0.0, 1, normal)],
            2 => vec![(-6.0, 0.0, 1, normal), (6.0, 0.0, 1, normal)],
            _ => vec![
                (0.0, 0.0, 1, normal),
                (-8.0, -0.12, 1, normal),
                (8.0, 0.12, 1, normal),
            ],
        },
    };

    for (offset, angle, damage, size) in shots {
        let origin = nose + Vec2::new(offset, 0.0);
        world.bullets.acquire(|bullet: &mut Bullet| {
            bullet.pos = origin - Vec2::new(size.x * 0.5, size.y);
            bullet.size = size;
            bullet.vel = Vec2::new(angle.sin(), -angle.cos()) * BULLET_SPEED;
            bullet.damage = damage;
        });
    }

    world.stats.shots_fired += 1;
    world.emit(GameEvent::Sound(SoundEffect::PlayerShot));
}

fn on_playfield(rect: Rect) -> bool {
    rect.x + rect.w > -CULL_MARGIN
        && rect.x < PLAYFIELD_WIDTH + CULL_MARGIN
        && rect.y + rect.h > -CULL_MARGIN
        && rect.y < PLAYFIELD_HEIGHT + CULL_MARGIN
}

fn move_player_bullets(world: &mut World, dt: f32) {
    world.bullets.for_each_mut(|b| b.pos += b.vel * dt);
    world.bullets.retain(|b| on_playfield(b.rect()));
}

fn run_spawner(world: &mut World, dt: f32, config: &GameConfig) {
    if world.stage_clear_pending {
        return;
    }

    if world.boss.is_none() && world.spawned_this_stage >= BOSS_SPAWN_THRESHOLD {
        let boss = config
            .boss_for(world.stage)
            .and_then(|(key, _)| spawn_boss(&key, config));
        if let Some(boss) = boss {
            world.boss = Some(boss);
            world.emit(GameEvent::Sound(SoundEffect::BossWarning));
            world.emit(GameEvent::Music(MusicTrack::Boss));
            world.emit(GameEvent::Popup("WARNING".into()));
        }
    }

    // Regular waves pause for the boss fight
    if world.boss_alive() {
        return;
    }

    world.spawn_timer -= dt;
    if world.spawn_timer > 0.0 {
        return;
    }

    match config.stage_for(world.stage) {
        Some(stage) => {
            spawn_wave(world, stage, config);
            world.spawn_timer =
                difficulty::spawn_interval(stage.spawn_interval, world.level, world.bonus_round);
        }
        None => world.spawn_timer = 1.0,
    }
}

/// Move `from` toward `to` by at most `step`; returns true on arrival
fn move_toward(from: &mut Vec2, to: Vec2, step: f32) -> bool {
    let delta = to - *from;
    if delta.length() <= step {
        *from = to;
        true
    } else {
        *from += delta.normalize_or_zero() * step;
        false
    }
}

fn move_by_pattern(enemy: &mut Enemy, dt: f32, player_center: Vec2) {
    let speed = enemy.speed;
    match enemy.pattern {
        MovementPattern::Straight => enemy.pos.y += speed * dt,
        MovementPattern::Zigzag => {
            let side = if (enemy.timer * 0.8).fract() < 0.5 { 1.0 } else { -1.0 };
            enemy.pos += Vec2::new(side * speed * 0.8, speed) * dt;
        }
        MovementPattern::Sine => {
            enemy.pos.y += speed * dt;
            enemy.pos.x += (enemy.timer * 3.0).cos() * speed * 0.9 * dt;
        }
        MovementPattern::Chase => {
            let to_player = (player_center - enemy.center()).normalize_or_zero();
            // Always keeps descending
            let heading = Vec2::new(to_player.x * 0.7, to_player.y.max(0.4)).normalize_or_zero();
            enemy.pos += heading * speed * dt;
        }
        MovementPattern::Formation => {
            let anchor = enemy.base_pos;
            move_toward(&mut enemy.pos, anchor, speed * dt);
        }
    }

    if matches!(enemy.pattern, MovementPattern::Zigzag | MovementPattern::Sine) {
        enemy.pos.x = enemy.pos.x.clamp(0.0, PLAYFIELD_WIDTH - enemy.size);
    }
}

fn swoop_target(enemy: &Enemy, player_center: Vec2) -> Vec2 {
    player_center - Vec2::splat(enemy.size * 0.5)
}

fn update_enemies(world: &mut World, dt: f32, config: &GameConfig) {
    let player_center = world.player.center();
    let bullet_speed = config
        .stage_for(world.stage)
        .map_or(DEFAULT_ENEMY_BULLET_SPEED, |stage| {
            difficulty::enemy_bullet_speed(stage.enemy_bullet_speed, world.level)
        });
    let level = world.level;

    let mut enemies = std::mem::take(&mut world.enemies);
    let mut shots = Vec::new();

    for enemy in &mut enemies {
        enemy.timer += dt;

        // Formation slot is the anchor
        let formation = enemy.formation.and_then(|slot| {
            world
                .formations
                .iter()
                .find(|f| f.id == slot.formation_id)
                .and_then(|f| f.slot_position(slot.index).map(|pos| (pos, f.behavior)))
        });
        if let Some((slot_pos, _)) = formation {
            enemy.base_pos = slot_pos - Vec2::splat(enemy.size * 0.5);
        }

        if enemy.is_swooping() {
            advance_swoop(enemy, dt);
        } else {
            match enemy.behavior {
                EnemyBehavior::Return => {
                    let anchor = enemy.base_pos;
                    let step = enemy.speed * RETURN_SPEED_SCALE * dt;
                    if move_toward(&mut enemy.pos, anchor, step) {
                        enemy.behavior = formation.map_or(EnemyBehavior::Idle, |(_, b)| b);
                    }
                }
                EnemyBehavior::Swoop => {
                    // Dive-prone archetype approaching its break-off point
                    move_by_pattern(enemy, dt, player_center);
                    enemy.base_pos = enemy.pos;
                    if enemy.pos.y >= DIVE_TRIGGER_Y {
                        let pattern = SwoopPattern::random(&mut world.rng);
                        let target = swoop_target(enemy, player_center);
                        start_swoop(enemy, pattern, target);
                    }
                }
                EnemyBehavior::Idle if enemy.formation.is_some() => {
                    enemy.pos = enemy.base_pos;
                    if world.rng.random::<f32>() < ENEMY_SWOOP_CHANCE {
                        let pattern = SwoopPattern::random(&mut world.rng);
                        let target = swoop_target(enemy, player_center);
                        start_swoop(enemy, pattern, target);
                    }
                }
                _ => {
                    move_by_pattern(enemy, dt, player_center);
                    if enemy.formation.is_none() {
                        enemy.base_pos = enemy.pos;
                    }
                }
            }
        }

        if enemy.can_shoot && enemy.pos.y >= 0.0 {
            enemy.fire_cooldown -= dt;
            if enemy.fire_cooldown <= 0.0 {
                shots.push(enemy_bullet(enemy, player_center, bullet_speed));
                enemy.fire_cooldown = enemy_fire_cooldown(enemy.kind, level, &mut world.rng);
            }
        }
    }

    // Off the bottom or sides; enemies still flying in from above are kept
    enemies.retain(|e| {
        e.pos.y < PLAYFIELD_HEIGHT + CULL_MARGIN
            && e.pos.x + e.size > -CULL_MARGIN
            && e.pos.x < PLAYFIELD_WIDTH + CULL_MARGIN
    });
    world.enemies = enemies;

    for shot in shots {
        world.enemy_bullets.acquire(|b| *b = shot);
    }
}

fn run_boss(world: &mut World, dt: f32, config: &GameConfig) {
    let Some(mut boss) = world.boss.take() else {
        return;
    };
    if let Some(boss_config) = config.boss(&boss.stage_key) {
        let player_center = world.player.center();
        let shots = update_boss(
            &mut boss,
            boss_config,
            player_center,
            world.time,
            dt,
            &mut world.rng,
        );
        for shot in shots {
            world.enemy_bullets.acquire(|b| *b = shot);
        }
    }
    world.boss = Some(boss);
}

fn move_enemy_bullets(world: &mut World, dt: f32) {
    world.enemy_bullets.for_each_mut(|b| b.pos += b.vel * dt);
    world.enemy_bullets.retain(|b| on_playfield(b.rect()));
}

fn move_powerups(world: &mut World, dt: f32) {
    for powerup in &mut world.powerups {
        powerup.pos.y += powerup.fall_speed * dt;
        powerup.rotation += 2.0 * dt;
    }
    world
        .powerups
        .retain(|p| !p.collected && p.pos.y < PLAYFIELD_HEIGHT + CULL_MARGIN);
}

fn resolve_collisions(world: &mut World) {
    let (bullet_handles, bullet_rects): (Vec<_>, Vec<_>) = world
        .bullets
        .iter()
        .map(|(handle, b)| (handle, (b.rect(), b.damage)))
        .unzip();

    // Player bullets vs enemies
    let enemies = std::mem::take(&mut world.enemies);
    let previous_combo = world.combo;
    let outcome = resolve_bullets_vs_enemies(
        &bullet_rects,
        enemies,
        world.combo,
        world.bonus_multiplier(),
        &mut world.rng,
    );
    world.enemies = outcome.survivors;
    let mut consumed = outcome.consumed_bullets;

    if outcome.damaged > 0 {
        world.emit(GameEvent::Sound(SoundEffect::EnemyHit));
    }
    if !outcome.destroyed.is_empty() {
        let kills = outcome.destroyed.len() as u32;
        world.combo = outcome.combo;
        world.combo_timer = COMBO_WINDOW;
        world.score += outcome.score;
        world.kills_this_level += kills;
        world.stats.kills += kills;
        world.stats.max_combo = world.stats.max_combo.max(world.combo);

        for _ in 0..kills {
            world.emit(GameEvent::Sound(SoundEffect::EnemyDestroyed));
            world.emit(GameEvent::Stat(StatEvent::Kill));
        }
        world.emit(GameEvent::Stat(StatEvent::Combo(world.combo)));
        world.emit(GameEvent::ScreenShake(0.2));
        if world.combo >= 3 && world.combo > previous_combo {
            world.emit(GameEvent::Popup(format!("COMBO x{}", world.combo)));
        }
    }
    world.score_texts.extend(outcome.score_texts);
    for effect in outcome.effects {
        spawn_effect(world, effect);
    }
    for (center, kind) in outcome.drops {
        let id = world.next_entity_id();
        world.powerups.push(Powerup::new(id, center, kind));
    }

    // Player bullets vs boss
    if let Some(boss) = world.boss.as_mut() {
        let hit = resolve_bullets_vs_boss(&bullet_rects, &consumed, boss);
        consumed.extend(&hit.consumed_bullets);
        if hit.defeated {
            world.score += hit.bonus_score;
            world.stats.bosses_defeated += 1;
            world.stage_clear_pending = true;
            world.set_timer(TimerKind::StageTransition, STAGE_TRANSITION_DELAY);
            world.enemy_bullets.clear();
            world.emit(GameEvent::Sound(SoundEffect::BossDefeated));
            world.emit(GameEvent::Music(MusicTrack::Victory));
            world.emit(GameEvent::Stat(StatEvent::BossDefeated));
            world.emit(GameEvent::ScreenShake(1.0));
            world.emit(GameEvent::Popup(format!("BOSS DEFEATED +{}", hit.bonus_score)));
            log::info!("Boss defeated on stage {}", world.stage);
        } else if hit.damage > 0 {
            world.emit(GameEvent::Sound(SoundEffect::BossHit));
        }
        for effect in hit.effects {
            spawn_effect(world, effect);
        }
    }
    world
        .bullets
        .release_many(consumed.into_iter().map(|i| bullet_handles[i]));

    // Hazards vs player
    let hazard_handles = world.enemy_bullets.handles();
    let hazard_rects = enemy_bullet_rects(world.enemy_bullets.values());
    let hit = resolve_player_hit(
        &world.player,
        world.player_invulnerable(),
        &hazard_rects,
        &world.enemies,
        world.boss.as_ref(),
    );
    match hit {
        Some(PlayerHit::Bullet(i)) => {
            world.enemy_bullets.release(hazard_handles[i]);
            damage_player(world);
        }
        Some(PlayerHit::Enemy(i)) => {
            let enemy = world.enemies.remove(i);
            spawn_effect(
                world,
                EffectSpawn {
                    pos: enemy.center(),
                    large: false,
                    color: enemy.kind as u32,
                },
            );
            damage_player(world);
        }
        Some(PlayerHit::Boss) => damage_player(world),
        None => {}
    }

    // Player vs powerups
    let picked = collected_powerups(&world.player, &world.powerups);
    let kinds: Vec<PowerupKind> = picked.iter().map(|&i| world.powerups[i].kind).collect();
    let picked: BTreeSet<usize> = picked.into_iter().collect();
    let mut index = 0;
    world.powerups.retain(|_| {
        let keep = !picked.contains(&index);
        index += 1;
        keep
    });
    for kind in kinds {
        apply_powerup(world, kind);
    }
}

fn damage_player(world: &mut World) {
    if world.player.shield {
        world.player.shield = false;
        world.player.invulnerable = PLAYER_HIT_INVULNERABILITY * 0.5;
        world.emit(GameEvent::Sound(SoundEffect::ShieldBreak));
        return;
    }

    world.player.lives = world.player.lives.saturating_sub(1);
    world.player.invulnerable = PLAYER_HIT_INVULNERABILITY;
    world.combo = 0;
    world.combo_timer = 0.0;
    world.stats.hits_taken += 1;
    world.emit(GameEvent::Sound(SoundEffect::PlayerHit));
    world.emit(GameEvent::Stat(StatEvent::HitTaken));
    world.emit(GameEvent::ScreenShake(0.6));
    let center = world.player.center();
    spawn_effect(
        world,
        EffectSpawn {
            pos: center,
            large: true,
            color: 0xffffff,
        },
    );

    if world.player.lives == 0 {
        world.player.alive = false;
        world.phase = GamePhase::GameOver;
        world.emit(GameEvent::Sound(SoundEffect::GameOver));
        world.emit(GameEvent::Music(MusicTrack::GameOver));
        log::info!(
            "Game over: score {} on stage {} level {}",
            world.score,
            world.stage,
            world.level
        );
    }
}

fn apply_powerup(world: &mut World, kind: PowerupKind) {
    let label = match kind {
        PowerupKind::WeaponUpgrade => {
            world.player.weapon_level = (world.player.weapon_level + 1).min(MAX_WEAPON_LEVEL);
            "POWER UP"
        }
        PowerupKind::SpreadShot => {
            world.player.weapon_override = Some(WeaponType::Spread);
            world.set_timer(TimerKind::WeaponOverride, WEAPON_OVERRIDE_DURATION);
            "SPREAD"
        }
        PowerupKind::LaserShot => {
            world.player.weapon_override = Some(WeaponType::Laser);
            world.set_timer(TimerKind::WeaponOverride, WEAPON_OVERRIDE_DURATION);
            "LASER"
        }
        PowerupKind::RapidFire => {
            world.player.rapid_fire = true;
            world.set_timer(TimerKind::RapidFire, RAPID_FIRE_DURATION);
            "RAPID FIRE"
        }
        PowerupKind::Shield => {
            world.player.shield = true;
            "SHIELD"
        }
        PowerupKind::Slow => {
            world.slow_active = true;
            world.set_timer(TimerKind::Slow, SLOW_DURATION);
            "SLOW"
        }
    };

    world.stats.powerups_collected += 1;
    world.emit(GameEvent::Sound(SoundEffect::PowerupCollect));
    world.emit(GameEvent::Stat(StatEvent::PowerupCollected));
    world.emit(GameEvent::Popup(label.into()));
}

fn check_level_up(world: &mut World) {
    let target = difficulty::level_target(world.level);
    if world.kills_this_level < target {
        return;
    }
    world.kills_this_level -= target;
    world.level += 1;
    world.emit(GameEvent::Sound(SoundEffect::LevelUp));
    world.emit(GameEvent::Popup(format!("LEVEL {}", world.level)));
    log::info!("Level {} reached", world.level);

    if difficulty::is_bonus_level(world.level, BONUS_ROUND_EVERY) {
        world.bonus_round = true;
        world.set_timer(TimerKind::BonusRound, BONUS_ROUND_DURATION);
        world.emit(GameEvent::Music(MusicTrack::Bonus));
        world.emit(GameEvent::Popup("BONUS ROUND".into()));
        log::info!("Bonus round on level {}", world.level);
    }
}

/// Explosion ring plus a burst of particles
fn spawn_effect(world: &mut World, effect: EffectSpawn) {
    let (radius, ttl, count) = if effect.large {
        (60.0, 1.0, 24)
    } else {
        (24.0, 0.4, 8)
    };

    world.explosions.acquire(|e| {
        e.pos = effect.pos;
        e.radius = radius * 0.25;
        e.ttl = ttl;
        e.max_ttl = ttl;
        e.large = effect.large;
    });

    for _ in 0..count {
        let angle = world.rng.random_range(0.0..std::f32::consts::TAU);
        let speed = world.rng.random_range(40.0..160.0) * if effect.large { 1.6 } else { 1.0 };
        let life = world.rng.random_range(0.3..0.8);
        world.particles.acquire(|p| {
            p.pos = effect.pos;
            p.vel = Vec2::new(angle.cos(), angle.sin()) * speed;
            p.color = effect.color;
            p.ttl = life;
            p.size = if effect.large { 4.0 } else { 2.5 };
        });
    }
}

fn update_effects(world: &mut World, dt: f32) {
    world.particles.for_each_mut(|p| {
        p.pos += p.vel * dt;
        p.vel *= 0.96;
        p.ttl -= dt;
    });
    world.particles.retain(|p| p.ttl > 0.0);

    world.explosions.for_each_mut(|e| {
        e.ttl -= dt;
        let growth = if e.large { 120.0 } else { 60.0 };
        e.radius += growth * dt;
    });
    world.explosions.retain(|e| e.ttl > 0.0);

    for text in &mut world.score_texts {
        text.pos.y -= 30.0 * dt;
        text.ttl -= dt;
    }
    world.score_texts.retain(|t| t.ttl > 0.0);
}

fn enforce_limits(world: &mut World, limits: &EntityLimits) {
    world.bullets.enforce_limit(limits.bullets);
    world.enemy_bullets.enforce_limit(limits.enemy_bullets);
    world.particles.enforce_limit(limits.particles);
    world.explosions.enforce_limit(limits.explosions);
    enforce_limit_in_place(&mut world.enemies, limits.enemies);
    enforce_limit_in_place(&mut world.powerups, limits.powerups);
    enforce_limit_in_place(&mut world.score_texts, limits.score_texts);

    // Formations live as long as one member does
    let enemies = &world.enemies;
    world.formations.retain(|f| {
        enemies
            .iter()
            .any(|e| e.formation.is_some_and(|slot| slot.formation_id == f.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{EnemyBullet, EnemyKind};

    fn rules(config: &GameConfig) -> Rules<'_> {
        Rules::new(config, EntityLimits::default())
    }

    fn quiet_world(seed: u64) -> World {
        let mut world = World::new(seed);
        // Keep the spawner out of scripted scenarios
        world.spawn_timer = 1_000.0;
        world
    }

    fn grunt(world: &mut World, pos: Vec2) -> Enemy {
        Enemy {
            id: world.next_entity_id(),
            kind: EnemyKind::Grunt,
            pos,
            base_pos: pos,
            size: 20.0,
            speed: 0.0,
            hp: 1,
            pattern: MovementPattern::Straight,
            can_shoot: false,
            fire_cooldown: 10.0,
            swoop: None,
            behavior: EnemyBehavior::Normal,
            formation: None,
            score: 100,
            timer: 0.0,
        }
    }

    #[test]
    fn test_bullet_destroys_enemy() {
        let config = GameConfig::default();
        let mut world = quiet_world(1);
        let enemy = grunt(&mut world, Vec2::new(100.0, 100.0));
        world.enemies.push(enemy);
        world.bullets.acquire(|b| {
            b.pos = Vec2::new(98.0, 100.0);
        });

        let world = step(world, &TickInput::default(), FRAME_DT, &rules(&config));

        assert!(world.enemies.is_empty());
        assert_eq!(world.combo, 1);
        assert_eq!(world.score, 100);
        assert_eq!(world.stats.kills, 1);
        assert!(world.bullets.is_empty());
        assert!(
            world
                .events
                .contains(&GameEvent::Sound(SoundEffect::EnemyDestroyed))
        );
        assert_eq!(world.score_texts.len(), 1);
        assert_eq!(world.score_texts[0].text, "+100");
    }

    #[test]
    fn test_pause_freezes_timers() {
        let config = GameConfig::default();
        let rules = rules(&config);
        let mut world = quiet_world(2);
        world.player.rapid_fire = true;
        world.set_timer(TimerKind::RapidFire, 1.0);

        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        world = step(world, &pause, FRAME_DT, &rules);
        assert_eq!(world.phase, GamePhase::Paused);

        for _ in 0..600 {
            world = step(world, &TickInput::default(), FRAME_DT, &rules);
        }
        assert_eq!(world.timer_remaining(TimerKind::RapidFire), Some(1.0));
        assert!(world.player.rapid_fire);
        assert_eq!(world.time, 0.0);

        world = step(world, &pause, FRAME_DT, &rules);
        assert_eq!(world.phase, GamePhase::Playing);
        for _ in 0..70 {
            world = step(world, &TickInput::default(), FRAME_DT, &rules);
        }
        assert!(!world.player.rapid_fire);
        assert!(world.timer_remaining(TimerKind::RapidFire).is_none());
    }

    #[test]
    fn test_determinism() {
        let config = GameConfig::default();
        let rules = rules(&config);
        let input = TickInput {
            idle_mode: true,
            ..Default::default()
        };

        let mut a = World::new(99_999);
        let mut b = World::new(99_999);
        for _ in 0..1200 {
            a = step(a, &input, FRAME_DT, &rules);
            b = step(b, &input, FRAME_DT, &rules);
        }

        assert_eq!(a.events, b.events);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
        assert!(a.stats.shots_fired > 0);
    }

    #[test]
    fn test_collections_stay_bounded() {
        let config = GameConfig::default();
        let limits = EntityLimits {
            bullets: 6,
            enemy_bullets: 10,
            enemies: 5,
            powerups: 2,
            particles: 20,
            explosions: 3,
            score_texts: 4,
        };
        let rules = Rules::new(&config, limits);
        let input = TickInput {
            idle_mode: true,
            ..Default::default()
        };

        let mut world = World::new(4242);
        world.player.lives = u8::MAX;
        for _ in 0..3000 {
            world = step(world, &input, FRAME_DT, &rules);
            assert!(world.bullets.len() <= limits.bullets);
            assert!(world.enemy_bullets.len() <= limits.enemy_bullets);
            assert!(world.enemies.len() <= limits.enemies);
            assert!(world.powerups.len() <= limits.powerups);
            assert!(world.particles.len() <= limits.particles);
            assert!(world.explosions.len() <= limits.explosions);
            assert!(world.score_texts.len() <= limits.score_texts);
        }
    }

    #[test]
    fn test_dt_is_clamped() {
        let config = GameConfig::default();
        let world = step(quiet_world(3), &TickInput::default(), 5.0, &rules(&config));
        assert!((world.time - MAX_FRAME_DT).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_dt_is_ignored() {
        let config = GameConfig::default();
        let rules = rules(&config);
        let world = quiet_world(3);
        let start = world.player.pos;

        let world = step(world, &TickInput::default(), f32::NAN, &rules);
        let world = step(world, &TickInput::default(), f32::INFINITY, &rules);
        assert_eq!(world.time, 0.0);
        assert_eq!(world.player.pos, start);
    }

    #[test]
    fn test_events_only_live_for_one_step() {
        let config = GameConfig::default();
        let mut world = quiet_world(3);
        world.emit(GameEvent::Popup("stale".into()));

        let world = step(world, &TickInput::default(), FRAME_DT, &rules(&config));
        assert!(!world.events.contains(&GameEvent::Popup("stale".into())));
    }

    #[test]
    fn test_last_life_ends_the_run() {
        let config = GameConfig::default();
        let rules = rules(&config);
        let mut world = quiet_world(5);
        world.player.lives = 1;
        let center = world.player.center();
        world
            .enemy_bullets
            .acquire(|b| *b = EnemyBullet::centered(center, Vec2::ZERO));

        world = step(world, &TickInput::default(), FRAME_DT, &rules);
        assert_eq!(world.phase, GamePhase::GameOver);
        assert!(!world.player.alive);
        assert_eq!(world.stats.hits_taken, 1);
        assert!(world.events.contains(&GameEvent::Music(MusicTrack::GameOver)));

        let time = world.time;
        world = step(world, &TickInput::default(), FRAME_DT, &rules);
        assert_eq!(world.time, time);
    }

    #[test]
    fn test_shield_absorbs_hit() {
        let config = GameConfig::default();
        let mut world = quiet_world(6);
        world.player.shield = true;
        let center = world.player.center();
        world
            .enemy_bullets
            .acquire(|b| *b = EnemyBullet::centered(center, Vec2::ZERO));

        let world = step(world, &TickInput::default(), FRAME_DT, &rules(&config));
        assert!(!world.player.shield);
        assert_eq!(world.player.lives, PLAYER_START_LIVES);
        assert!(world.enemy_bullets.is_empty());
        assert!(world.events.contains(&GameEvent::Sound(SoundEffect::ShieldBreak)));
    }

    #[test]
    fn test_invulnerable_player_ignores_hazards() {
        let config = GameConfig::default();
        let mut world = quiet_world(7);
        world.bonus_round = true;
        let center = world.player.center();
        world
            .enemy_bullets
            .acquire(|b| *b = EnemyBullet::centered(center, Vec2::ZERO));

        let world = step(world, &TickInput::default(), FRAME_DT, &rules(&config));
        assert_eq!(world.player.lives, PLAYER_START_LIVES);
        assert_eq!(world.enemy_bullets.len(), 1);
    }

    #[test]
    fn test_boss_arrives_after_threshold() {
        let config = GameConfig::default();
        let mut world = World::new(8);
        world.spawned_this_stage = BOSS_SPAWN_THRESHOLD;

        let world = step(world, &TickInput::default(), FRAME_DT, &rules(&config));
        assert!(world.boss_alive());
        assert!(world.enemies.is_empty());
        assert!(world.events.contains(&GameEvent::Sound(SoundEffect::BossWarning)));
        assert!(world.events.contains(&GameEvent::Music(MusicTrack::Boss)));
    }

    #[test]
    fn test_boss_returns_past_last_configured_stage() {
        let config = GameConfig::default();
        let mut world = World::new(8);
        world.stage = 4;
        world.spawned_this_stage = BOSS_SPAWN_THRESHOLD;

        let world = step(world, &TickInput::default(), FRAME_DT, &rules(&config));
        let boss = world.boss.as_ref().unwrap();
        assert!(boss.alive);
        assert_eq!(boss.stage_key, "stage3");
        assert!(world.events.contains(&GameEvent::Sound(SoundEffect::BossWarning)));
    }

    #[test]
    fn test_boss_hp_never_rises_while_alive() {
        let config = GameConfig::default();
        let rules = rules(&config);
        let mut world = World::new(11);
        world.player.lives = u8::MAX;
        let mut boss = spawn_boss("stage1", &config).unwrap();
        boss.pos = boss.target_pos;
        boss.state = crate::sim::state::BossState::Holding;
        world.boss = Some(boss);
        world.spawned_this_stage = BOSS_SPAWN_THRESHOLD;

        let input = TickInput {
            idle_mode: true,
            ..Default::default()
        };
        let mut last: Option<(u32, i32)> = None;
        let mut damaged = false;
        for _ in 0..1200 {
            world = step(world, &input, FRAME_DT, &rules);
            if let Some(boss) = world.boss.as_ref().filter(|b| b.alive) {
                if let Some((stage, hp)) = last {
                    if stage == world.stage {
                        assert!(boss.hp <= hp, "boss hp rose from {} to {}", hp, boss.hp);
                    }
                }
                damaged |= boss.hp < boss.max_hp;
                last = Some((world.stage, boss.hp));
            }
        }
        assert!(damaged);
    }

    #[test]
    fn test_boss_defeat_advances_stage() {
        let config = GameConfig::default();
        let rules = rules(&config);
        let mut world = quiet_world(9);
        let mut boss = spawn_boss("stage1", &config).unwrap();
        boss.pos = boss.target_pos;
        boss.state = crate::sim::state::BossState::Holding;
        boss.hp = 1;
        let muzzle = boss.muzzle();
        world.boss = Some(boss);
        world.spawned_this_stage = BOSS_SPAWN_THRESHOLD;
        world.bullets.acquire(|b| {
            b.pos = muzzle - Vec2::new(2.0, 20.0);
            b.vel = Vec2::ZERO;
        });

        world = step(world, &TickInput::default(), FRAME_DT, &rules);
        assert!(world.stage_clear_pending);
        assert_eq!(world.score, BOSS_BONUS_SCORE);
        assert_eq!(world.stats.bosses_defeated, 1);
        assert!(world.timer_remaining(TimerKind::StageTransition).is_some());

        for _ in 0..35 {
            world = step(world, &TickInput::default(), 0.1, &rules);
        }
        assert_eq!(world.stage, 2);
        assert!(world.boss.is_none());
        assert!(world.spawned_this_stage < BOSS_SPAWN_THRESHOLD);
        assert!(!world.stage_clear_pending);
    }

    #[test]
    fn test_powerup_pickup_and_expiry() {
        let config = GameConfig::default();
        let rules = rules(&config);
        let mut world = quiet_world(10);
        let center = world.player.center();
        let id = world.next_entity_id();
        world
            .powerups
            .push(Powerup::new(id, center, PowerupKind::RapidFire));

        world = step(world, &TickInput::default(), FRAME_DT, &rules);
        assert!(world.powerups.is_empty());
        assert!(world.player.rapid_fire);
        assert_eq!(world.stats.powerups_collected, 1);

        for _ in 0..90 {
            world = step(world, &TickInput::default(), 0.1, &rules);
        }
        assert!(!world.player.rapid_fire);
    }

    #[test]
    fn test_level_up_opens_bonus_round() {
        let config = GameConfig::default();
        let rules = rules(&config);
        let mut world = quiet_world(11);
        world.level = 2;
        world.kills_this_level = difficulty::level_target(2);

        world = step(world, &TickInput::default(), FRAME_DT, &rules);
        assert_eq!(world.level, 3);
        assert_eq!(world.kills_this_level, 0);
        assert!(world.bonus_round);
        assert!(world.player_invulnerable());
        assert_eq!(world.bonus_multiplier(), BONUS_SCORE_MULTIPLIER);

        for _ in 0..160 {
            world = step(world, &TickInput::default(), 0.1, &rules);
        }
        assert!(!world.bonus_round);
    }

    #[test]
    fn test_firing_respects_cooldown() {
        let config = GameConfig::default();
        let rules = rules(&config);
        let mut world = quiet_world(12);
        let fire = TickInput {
            fire: true,
            ..Default::default()
        };
        for _ in 0..60 {
            world = step(world, &fire, FRAME_DT, &rules);
        }
        // One second at a quarter-second cooldown
        assert_eq!(world.stats.shots_fired, 4);
    }
}
