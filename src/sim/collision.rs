//! Collision detection and hit resolution
//!
//! Everything here is axis-aligned. Rectangles that only share an edge do
//! not overlap: all four comparisons are strict.
//!
//! Tie-break for bullets vs enemies: enemies are visited in collection order
//! and each takes the lowest-index (oldest) overlapping bullet that is still
//! unconsumed. A bullet destroys at most one enemy per frame.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::difficulty::combo_multiplier;
use super::state::{Boss, BossState, Enemy, EnemyBullet, Player, Powerup, PowerupKind, ScoreText};
use crate::consts::*;

/// Axis-aligned rectangle (top-left origin, +y down)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_pos_size(pos: Vec2, size: Vec2) -> Self {
        Self::new(pos.x, pos.y, size.x, size.y)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    /// Strict overlap test; touching edges do not count
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }
}

/// Cosmetic effect requested by a hit (spawned into the effect pools by the tick)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectSpawn {
    pub pos: Vec2,
    pub large: bool,
    pub color: u32,
}

/// Result of bullets vs enemies for one frame
#[derive(Debug, Clone, Default)]
pub struct EnemyHitOutcome {
    /// Indices into the bullet slice that hit something
    pub consumed_bullets: Vec<usize>,
    pub survivors: Vec<Enemy>,
    pub destroyed: Vec<Enemy>,
    /// Enemies hit but not destroyed this frame
    pub damaged: u32,
    pub score: u64,
    /// Combo after all kills this frame
    pub combo: u32,
    pub score_texts: Vec<ScoreText>,
    pub effects: Vec<EffectSpawn>,
    /// (center, kind) of powerups to drop
    pub drops: Vec<(Vec2, PowerupKind)>,
}

/// Resolve player bullets against regular enemies
pub fn resolve_bullets_vs_enemies<R: Rng>(
    bullets: &[(Rect, i32)],
    enemies: Vec<Enemy>,
    combo: u32,
    bonus_multiplier: f32,
    rng: &mut R,
) -> EnemyHitOutcome {
    let mut outcome = EnemyHitOutcome {
        combo,
        ..Default::default()
    };
    let mut consumed = vec![false; bullets.len()];

    for mut enemy in enemies {
        let enemy_rect = enemy.rect();
        let hit = bullets
            .iter()
            .enumerate()
            .find(|(i, (rect, _))| !consumed[*i] && rect.overlaps(&enemy_rect));

        let Some((bullet_idx, &(_, damage))) = hit else {
            outcome.survivors.push(enemy);
            continue;
        };
        consumed[bullet_idx] = true;
        outcome.consumed_bullets.push(bullet_idx);

        enemy.hp -= damage.max(1);
        if enemy.hp > 0 {
            outcome.damaged += 1;
            outcome.survivors.push(enemy);
            continue;
        }

        outcome.combo += 1;
        let points =
            (enemy.score as f32 * combo_multiplier(outcome.combo) * bonus_multiplier).floor() as u64;
        outcome.score += points;

        let center = enemy.center();
        outcome.score_texts.push(ScoreText {
            pos: center,
            text: format!("+{}", points),
            ttl: 1.0,
        });
        outcome.effects.push(EffectSpawn {
            pos: center,
            large: false,
            color: enemy_color(&enemy),
        });

        if rng.random::<f32>() < POWERUP_DROP_CHANCE {
            let kind = PowerupKind::ALL[rng.random_range(0..PowerupKind::ALL.len())];
            outcome.drops.push((center, kind));
        }

        outcome.destroyed.push(enemy);
    }

    outcome
}

fn enemy_color(enemy: &Enemy) -> u32 {
    // Color index by archetype; the renderer owns the palette
    enemy.kind as u32
}

/// Result of bullets vs the boss for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BossHitOutcome {
    pub consumed_bullets: Vec<usize>,
    pub damage: i32,
    pub defeated: bool,
    pub bonus_score: u64,
    pub effects: Vec<EffectSpawn>,
}

/// Resolve player bullets against the boss. Every overlapping bullet deals one
/// point of damage; `skip` marks bullets already consumed this frame.
pub fn resolve_bullets_vs_boss(bullets: &[(Rect, i32)], skip: &[usize], boss: &mut Boss) -> BossHitOutcome {
    let mut outcome = BossHitOutcome::default();
    // Still fully above the playfield
    if !boss.alive || (boss.state == BossState::Entering && boss.pos.y + boss.size.y <= 0.0) {
        return outcome;
    }

    let boss_rect = boss.rect();
    for (i, (rect, _)) in bullets.iter().enumerate() {
        if skip.contains(&i) || !rect.overlaps(&boss_rect) {
            continue;
        }
        outcome.consumed_bullets.push(i);
        outcome.damage += 1;
    }

    if outcome.damage > 0 {
        boss.hp -= outcome.damage;
        if boss.hp <= 0 {
            boss.hp = 0;
            boss.alive = false;
            boss.state = BossState::Defeated;
            boss.swoop = None;
            outcome.defeated = true;
            outcome.bonus_score = BOSS_BONUS_SCORE;
            outcome.effects.push(EffectSpawn {
                pos: boss.center(),
                large: true,
                color: 99,
            });
        }
    }

    outcome
}

/// What struck the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerHit {
    /// Index into the enemy bullet slice
    Bullet(usize),
    /// Index into the enemy slice
    Enemy(usize),
    Boss,
}

/// First hazard overlapping the player, if any. Enemy bullets are checked
/// before enemy bodies, then the boss. Returns `None` while invulnerable.
pub fn resolve_player_hit(
    player: &Player,
    invulnerable: bool,
    enemy_bullets: &[Rect],
    enemies: &[Enemy],
    boss: Option<&Boss>,
) -> Option<PlayerHit> {
    if invulnerable || !player.alive {
        return None;
    }
    let player_rect = player.rect();

    if let Some(i) = enemy_bullets.iter().position(|r| r.overlaps(&player_rect)) {
        return Some(PlayerHit::Bullet(i));
    }
    if let Some(i) = enemies.iter().position(|e| e.rect().overlaps(&player_rect)) {
        return Some(PlayerHit::Enemy(i));
    }
    match boss {
        Some(boss) if boss.alive && boss.rect().overlaps(&player_rect) => Some(PlayerHit::Boss),
        _ => None,
    }
}

/// Indices of powerups the player is touching
pub fn collected_powerups(player: &Player, powerups: &[Powerup]) -> Vec<usize> {
    if !player.alive {
        return Vec::new();
    }
    let player_rect = player.rect();
    powerups
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.collected && p.rect().overlaps(&player_rect))
        .map(|(i, _)| i)
        .collect()
}

/// Hit boxes for a run of enemy bullets, in iteration order
pub fn enemy_bullet_rects<'a>(bullets: impl Iterator<Item = &'a EnemyBullet>) -> Vec<Rect> {
    bullets.map(EnemyBullet::rect).collect()
}
