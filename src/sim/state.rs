//! Game state and core simulation types
//!
//! Everything a step reads or writes lives in [`World`]. A world is a plain
//! value: `step` consumes the tick-start snapshot and returns the next one.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::formation::Formation;
use super::pool::{Pool, Poolable};
use super::swoop::Swoop;
use crate::consts::*;
use crate::services::GameEvent;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Game is paused (nothing ticks, timers included)
    Paused,
    /// Player is out of lives
    GameOver,
}

/// Enemy archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    Grunt,
    Scout,
    Shooter,
    Dive,
    Elite,
    Tank,
    Kamikaze,
}

impl EnemyKind {
    pub const ALL: [EnemyKind; 7] = [
        EnemyKind::Grunt,
        EnemyKind::Scout,
        EnemyKind::Shooter,
        EnemyKind::Dive,
        EnemyKind::Elite,
        EnemyKind::Tank,
        EnemyKind::Kamikaze,
    ];

    /// Fixed firing capability per archetype
    pub fn can_shoot(&self) -> bool {
        matches!(self, EnemyKind::Shooter | EnemyKind::Elite | EnemyKind::Tank)
    }
}

/// How a non-swooping enemy moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementPattern {
    /// Straight down
    Straight,
    /// Down with a triangle-wave sidestep
    Zigzag,
    /// Down with a sinusoidal sway
    Sine,
    /// Homes on the player
    Chase,
    /// Anchored to a formation slot
    Formation,
}

/// Behavior tag (what the enemy is currently doing)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyBehavior {
    #[default]
    Normal,
    Chase,
    Swoop,
    Return,
    Idle,
}

/// Boss bullet patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossPattern {
    Radial,
    Spread,
    Burst,
    Spiral,
    Aimed,
}

/// Weapon-type overrides granted by powerups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponType {
    /// Five-way fan
    Spread,
    /// Single heavy bolt
    Laser,
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerupKind {
    WeaponUpgrade,
    SpreadShot,
    LaserShot,
    RapidFire,
    Shield,
    Slow,
}

impl PowerupKind {
    pub const ALL: [PowerupKind; 6] = [
        PowerupKind::WeaponUpgrade,
        PowerupKind::SpreadShot,
        PowerupKind::LaserShot,
        PowerupKind::RapidFire,
        PowerupKind::Shield,
        PowerupKind::Slow,
    ];
}

/// The player's craft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
    pub alive: bool,
    pub lives: u8,
    /// 1-3
    pub weapon_level: u8,
    pub weapon_override: Option<WeaponType>,
    pub shield: bool,
    pub rapid_fire: bool,
    /// Seconds of post-hit grace remaining
    pub invulnerable: f32,
    pub fire_cooldown: f32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            pos: Vec2::new(
                (PLAYFIELD_WIDTH - PLAYER_SIZE) / 2.0,
                PLAYFIELD_HEIGHT - PLAYER_SIZE - 40.0,
            ),
            size: Vec2::splat(PLAYER_SIZE),
            alive: true,
            lives: PLAYER_START_LIVES,
            weapon_level: 1,
            weapon_override: None,
            shield: false,
            rapid_fire: false,
            invulnerable: 0.0,
            fire_cooldown: 0.0,
        }
    }
}

impl Player {
    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }
}

/// Which formation slot an enemy occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationSlot {
    pub formation_id: u32,
    pub index: usize,
}

/// A regular enemy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    /// Top-left corner
    pub pos: Vec2,
    /// Anchor the enemy returns to after a swoop
    pub base_pos: Vec2,
    /// Square side length
    pub size: f32,
    pub speed: f32,
    pub hp: i32,
    pub pattern: MovementPattern,
    pub can_shoot: bool,
    pub fire_cooldown: f32,
    pub swoop: Option<Swoop>,
    pub behavior: EnemyBehavior,
    pub formation: Option<FormationSlot>,
    pub score: u32,
    /// Seconds alive (drives pattern oscillation)
    pub timer: f32,
}

impl Enemy {
    pub fn rect(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, self.size, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.pos + Vec2::splat(self.size * 0.5)
    }

    /// Center of the bottom edge (bullet origin)
    pub fn muzzle(&self) -> Vec2 {
        Vec2::new(self.pos.x + self.size * 0.5, self.pos.y + self.size)
    }

    pub fn is_swooping(&self) -> bool {
        self.swoop.is_some()
    }
}

/// Boss lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BossState {
    /// Moving from spawn toward the entry position
    Entering,
    /// Patrolling around the entry position
    Holding,
    /// Diving via a swoop
    Swooping,
    Defeated,
}

/// A stage boss
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boss {
    pub stage_key: String,
    pub hp: i32,
    pub max_hp: i32,
    /// Top-left corner
    pub pos: Vec2,
    /// Entry position (top-left)
    pub target_pos: Vec2,
    pub size: Vec2,
    pub speed: f32,
    pub bullet_speed: f32,
    pub fire_cooldown: f32,
    pub fire_interval: f32,
    pub alive: bool,
    pub state: BossState,
    pub swoop: Option<Swoop>,
    /// Seconds spent holding (drives the lateral patrol)
    pub patrol_time: f32,
}

impl Boss {
    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    /// Center of the bottom edge (bullet origin)
    pub fn muzzle(&self) -> Vec2 {
        Vec2::new(self.pos.x + self.size.x * 0.5, self.pos.y + self.size.y)
    }

    pub fn health_ratio(&self) -> f32 {
        if self.max_hp <= 0 {
            0.0
        } else {
            self.hp.max(0) as f32 / self.max_hp as f32
        }
    }
}

/// A player bullet
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bullet {
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
    pub vel: Vec2,
    pub damage: i32,
}

impl Default for Bullet {
    fn default() -> Self {
        Self {
            pos: Vec2::ZERO,
            size: Vec2::new(BULLET_WIDTH, BULLET_HEIGHT),
            vel: Vec2::new(0.0, -BULLET_SPEED),
            damage: 1,
        }
    }
}

impl Poolable for Bullet {}

impl Bullet {
    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }
}

/// An enemy or boss bullet
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnemyBullet {
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
    pub vel: Vec2,
}

impl Default for EnemyBullet {
    fn default() -> Self {
        Self {
            pos: Vec2::ZERO,
            size: Vec2::splat(ENEMY_BULLET_SIZE),
            vel: Vec2::ZERO,
        }
    }
}

impl Poolable for EnemyBullet {}

impl EnemyBullet {
    /// Bullet centered on `origin` moving at `vel`
    pub fn centered(origin: Vec2, vel: Vec2) -> Self {
        let size = Vec2::splat(ENEMY_BULLET_SIZE);
        Self {
            pos: origin - size * 0.5,
            size,
            vel,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }
}

/// A falling pickup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Powerup {
    pub id: u32,
    /// Top-left corner
    pub pos: Vec2,
    pub kind: PowerupKind,
    pub size: f32,
    pub fall_speed: f32,
    pub rotation: f32,
    pub collected: bool,
}

impl Powerup {
    /// Powerup centered on `center`
    pub fn new(id: u32, center: Vec2, kind: PowerupKind) -> Self {
        Self {
            id,
            pos: center - Vec2::splat(POWERUP_SIZE * 0.5),
            kind,
            size: POWERUP_SIZE,
            fall_speed: POWERUP_FALL_SPEED,
            rotation: 0.0,
            collected: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, self.size, self.size)
    }
}

/// A particle for visual effects
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub color: u32,
    /// Seconds remaining
    pub ttl: f32,
    pub size: f32,
}

impl Poolable for Particle {}

/// An expanding explosion ring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Explosion {
    pub pos: Vec2,
    pub radius: f32,
    pub ttl: f32,
    pub max_ttl: f32,
    pub large: bool,
}

impl Poolable for Explosion {}

/// Floating score label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreText {
    pub pos: Vec2,
    pub text: String,
    pub ttl: f32,
}

/// Countdown-driven deferred effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerKind {
    WeaponOverride,
    RapidFire,
    Slow,
    BonusRound,
    StageTransition,
}

/// One pending deferred effect; ticks only while the simulation ticks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    pub kind: TimerKind,
    pub remaining: f32,
}

/// Session statistics for the achievement system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub kills: u32,
    pub bosses_defeated: u32,
    pub powerups_collected: u32,
    pub max_combo: u32,
    pub hits_taken: u32,
    pub shots_fired: u32,
}

/// Complete simulation snapshot (deterministic for a given seed and input stream)
#[derive(Debug, Clone, Serialize)]
pub struct World {
    /// Run seed for reproducibility
    pub seed: u64,
    #[serde(skip)]
    pub rng: Pcg32,
    pub phase: GamePhase,
    /// Simulated seconds (excludes paused time)
    pub time: f32,
    pub score: u64,
    pub combo: u32,
    /// Seconds left before the combo lapses
    pub combo_timer: f32,
    /// 1-based difficulty level
    pub level: u32,
    pub kills_this_level: u32,
    /// 1-based stage number
    pub stage: u32,
    /// Regular spawns since the stage began (boss trigger)
    pub spawned_this_stage: u32,
    pub spawn_timer: f32,
    pub bonus_round: bool,
    pub slow_active: bool,
    /// Boss beaten, waiting for the stage transition countdown
    pub stage_clear_pending: bool,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub formations: Vec<Formation>,
    pub boss: Option<Boss>,
    pub bullets: Pool<Bullet>,
    pub enemy_bullets: Pool<EnemyBullet>,
    pub powerups: Vec<Powerup>,
    pub particles: Pool<Particle>,
    pub explosions: Pool<Explosion>,
    pub score_texts: Vec<ScoreText>,
    pub timers: Vec<Countdown>,
    pub stats: SessionStats,
    /// Outbound events produced by the last step. Cleared when the next step
    /// starts; the orchestrator drains them in between.
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl Default for World {
    fn default() -> Self {
        Self::new(0)
    }
}

impl World {
    /// Create a new world with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase: GamePhase::Playing,
            time: 0.0,
            score: 0,
            combo: 0,
            combo_timer: 0.0,
            level: 1,
            kills_this_level: 0,
            stage: 1,
            spawned_this_stage: 0,
            spawn_timer: 0.0,
            bonus_round: false,
            slow_active: false,
            stage_clear_pending: false,
            player: Player::default(),
            enemies: Vec::new(),
            formations: Vec::new(),
            boss: None,
            bullets: Pool::new(),
            enemy_bullets: Pool::new(),
            powerups: Vec::new(),
            particles: Pool::new(),
            explosions: Pool::new(),
            score_texts: Vec::new(),
            timers: Vec::new(),
            stats: SessionStats::default(),
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Start (or restart) a countdown; an existing timer of the same kind is replaced
    pub fn set_timer(&mut self, kind: TimerKind, seconds: f32) {
        self.timers.retain(|t| t.kind != kind);
        self.timers.push(Countdown {
            kind,
            remaining: seconds,
        });
    }

    pub fn timer_remaining(&self, kind: TimerKind) -> Option<f32> {
        self.timers
            .iter()
            .find(|t| t.kind == kind)
            .map(|t| t.remaining)
    }

    /// Player cannot be damaged (post-hit grace or bonus round)
    pub fn player_invulnerable(&self) -> bool {
        self.bonus_round || self.player.invulnerable > 0.0
    }

    /// Score multiplier for the current round
    pub fn bonus_multiplier(&self) -> f32 {
        if self.bonus_round {
            BONUS_SCORE_MULTIPLIER
        } else {
            1.0
        }
    }

    pub fn boss_alive(&self) -> bool {
        self.boss.as_ref().is_some_and(|b| b.alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_world_defaults() {
        let world = World::new(7);
        assert_eq!(world.level, 1);
        assert_eq!(world.stage, 1);
        assert_eq!(world.player.lives, PLAYER_START_LIVES);
        assert!(world.player.alive);
        assert!(world.enemies.is_empty());
        assert_eq!(world.phase, GamePhase::Playing);
    }

    #[test]
    fn test_set_timer_replaces_same_kind() {
        let mut world = World::new(1);
        world.set_timer(TimerKind::RapidFire, 2.0);
        world.set_timer(TimerKind::Slow, 1.0);
        world.set_timer(TimerKind::RapidFire, 5.0);
        assert_eq!(world.timers.len(), 2);
        assert_eq!(world.timer_remaining(TimerKind::RapidFire), Some(5.0));
    }

    #[test]
    fn test_entity_ids_increase() {
        let mut world = World::new(1);
        let a = world.next_entity_id();
        let b = world.next_entity_id();
        assert!(b > a);
    }

    #[test]
    fn test_boss_health_ratio() {
        let boss = Boss {
            stage_key: "stage1".into(),
            hp: 25,
            max_hp: 100,
            pos: Vec2::ZERO,
            target_pos: Vec2::ZERO,
            size: Vec2::new(BOSS_WIDTH, BOSS_HEIGHT),
            speed: 80.0,
            bullet_speed: 200.0,
            fire_cooldown: 1.0,
            fire_interval: 1.0,
            alive: true,
            state: BossState::Holding,
            swoop: None,
            patrol_time: 0.0,
        };
        assert!((boss.health_ratio() - 0.25).abs() < 1e-6);
        assert_eq!(boss.muzzle(), Vec2::new(BOSS_WIDTH / 2.0, BOSS_HEIGHT));
    }
}
