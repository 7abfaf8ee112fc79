//! Enemy wave spawning
//!
//! Each spawn tick rolls a V formation, a line formation or a single enemy.
//! Enemy archetypes come from a weighted roll restricted to the stage's
//! allowed list; their stats come from the enemy-type profiles.

use glam::Vec2;
use rand::Rng;

use super::difficulty;
use super::formation::{FormationKind, FormationOptions, create_formation};
use super::state::{
    EnemyBehavior, Enemy, EnemyBullet, EnemyKind, FormationSlot, MovementPattern, World,
};
use crate::config::{EnemyTypeConfig, GameConfig, StageConfig};
use crate::consts::*;
use crate::{dir_from_down_angle, down_angle_to};

/// Cumulative roll thresholds, rarest first
const ENEMY_KIND_TABLE: [(f32, EnemyKind); 7] = [
    (0.05, EnemyKind::Elite),
    (0.10, EnemyKind::Tank),
    (0.15, EnemyKind::Kamikaze),
    (0.25, EnemyKind::Scout),
    (0.40, EnemyKind::Shooter),
    (0.60, EnemyKind::Dive),
    (1.00, EnemyKind::Grunt),
];

const V_FORMATION_SIZE: usize = 5;
const LINE_FORMATION_SIZE: usize = 4;
const FORMATION_SPACING: f32 = 44.0;
/// Enemies above this y count as occupying their column for single spawns
const TOP_BAND: f32 = 120.0;
const SPAWN_X_TRIES: usize = 5;

/// Map a roll in `[0, 1)` onto the archetype table
pub fn roll_enemy_kind(roll: f32) -> EnemyKind {
    ENEMY_KIND_TABLE
        .iter()
        .find(|(threshold, _)| roll < *threshold)
        .map_or(EnemyKind::Grunt, |(_, kind)| *kind)
}

/// Roll an archetype, substituting the first allowed one when the roll is not
/// allowed on this stage
pub fn select_enemy_kind<R: Rng>(rng: &mut R, allowed: &[EnemyKind]) -> EnemyKind {
    let kind = roll_enemy_kind(rng.random());
    match allowed.first() {
        Some(first) if !allowed.contains(&kind) => *first,
        _ => kind,
    }
}

/// What a spawn tick produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveChoice {
    VFormation,
    LineFormation,
    Single,
}

pub fn roll_wave_choice(roll: f32) -> WaveChoice {
    if roll < 0.3 {
        WaveChoice::VFormation
    } else if roll < 0.6 {
        WaveChoice::LineFormation
    } else {
        WaveChoice::Single
    }
}

/// Seconds until an enemy's next shot
pub fn enemy_fire_cooldown<R: Rng>(kind: EnemyKind, level: u32, rng: &mut R) -> f32 {
    match kind {
        EnemyKind::Elite => rng.random_range(0.4..0.7),
        _ => rng.random_range(1.2..2.4) * difficulty::enemy_fire_cooldown_scale(level),
    }
}

/// Bullet fired from the enemy's center-bottom. Elites aim at the player.
pub fn enemy_bullet(enemy: &Enemy, player_center: Vec2, speed: f32) -> EnemyBullet {
    let origin = enemy.muzzle();
    let vel = match enemy.kind {
        EnemyKind::Elite => dir_from_down_angle(down_angle_to(origin, player_center)) * speed,
        _ => Vec2::new(0.0, speed),
    };
    EnemyBullet::centered(origin, vel)
}

/// Stat block shared by every spawn path
#[allow(clippy::too_many_arguments)]
pub fn build_enemy<R: Rng>(
    id: u32,
    kind: EnemyKind,
    pos: Vec2,
    pattern: MovementPattern,
    stage: &StageConfig,
    profile: &EnemyTypeConfig,
    level: u32,
    bonus_round: bool,
    rng: &mut R,
) -> Enemy {
    let pattern = match profile.behavior {
        EnemyBehavior::Chase if pattern != MovementPattern::Formation => MovementPattern::Chase,
        _ => pattern,
    };
    Enemy {
        id,
        kind,
        pos,
        base_pos: pos,
        size: profile.size,
        speed: difficulty::enemy_speed(stage.enemy_speed, level, bonus_round)
            * profile.speed_multiplier,
        hp: profile.hp.min(i32::MAX as u32) as i32,
        pattern,
        can_shoot: kind.can_shoot(),
        fire_cooldown: enemy_fire_cooldown(kind, level, rng),
        swoop: None,
        behavior: profile.behavior,
        formation: None,
        score: profile.score,
        timer: 0.0,
    }
}

/// Random x for a single enemy, avoiding columns already used near the top
pub fn pick_spawn_x<R: Rng>(rng: &mut R, enemies: &[Enemy], size: f32) -> f32 {
    let max_x = (PLAYFIELD_WIDTH - size).max(1.0);
    let mut x = 0.0;
    for _ in 0..SPAWN_X_TRIES {
        x = rng.random_range(0.0..max_x);
        let clear = enemies
            .iter()
            .filter(|e| e.pos.y < TOP_BAND)
            .all(|e| (e.pos.x - x).abs() >= (e.size + size) * 0.5 + 8.0);
        if clear {
            break;
        }
    }
    x
}

/// Run one spawn tick against the stage's caps. Returns the number spawned.
pub fn spawn_wave(world: &mut World, stage: &StageConfig, config: &GameConfig) -> usize {
    let cap = difficulty::max_enemies(stage.max_enemies, world.level, world.bonus_round) as usize;
    let room = cap.saturating_sub(world.enemies.len());
    if room == 0 {
        return 0;
    }

    let choice = match roll_wave_choice(world.rng.random()) {
        WaveChoice::Single => WaveChoice::Single,
        _ if room < 2 => WaveChoice::Single,
        formation => formation,
    };

    let spawned = match choice {
        WaveChoice::Single => spawn_single(world, stage, config),
        WaveChoice::VFormation => {
            spawn_formation(world, stage, config, FormationKind::V, V_FORMATION_SIZE.min(room))
        }
        WaveChoice::LineFormation => spawn_formation(
            world,
            stage,
            config,
            FormationKind::Line,
            LINE_FORMATION_SIZE.min(room),
        ),
    };

    world.spawned_this_stage += spawned as u32;
    log::debug!(
        "Spawned {:?} x{} ({} this stage)",
        choice,
        spawned,
        world.spawned_this_stage
    );
    spawned
}

fn spawn_single(world: &mut World, stage: &StageConfig, config: &GameConfig) -> usize {
    let kind = select_enemy_kind(&mut world.rng, &stage.enemy_types);
    let profile = config.enemy_type(kind);
    let pattern = if stage.patterns.is_empty() {
        MovementPattern::Straight
    } else {
        stage.patterns[world.rng.random_range(0..stage.patterns.len())]
    };
    let x = pick_spawn_x(&mut world.rng, &world.enemies, profile.size);
    let id = world.next_entity_id();
    let enemy = build_enemy(
        id,
        kind,
        Vec2::new(x, -profile.size),
        pattern,
        stage,
        &profile,
        world.level,
        world.bonus_round,
        &mut world.rng,
    );
    world.enemies.push(enemy);
    1
}

fn spawn_formation(
    world: &mut World,
    stage: &StageConfig,
    config: &GameConfig,
    kind: FormationKind,
    count: usize,
) -> usize {
    let half_width = (count as f32 - 1.0) * FORMATION_SPACING * 0.5;
    let margin = half_width + 32.0;
    let center_x = if PLAYFIELD_WIDTH - margin > margin {
        world.rng.random_range(margin..PLAYFIELD_WIDTH - margin)
    } else {
        PLAYFIELD_WIDTH / 2.0
    };
    let center_y = world.rng.random_range(90.0..220.0);

    let mut formation = create_formation(
        kind,
        FormationOptions {
            count,
            spacing: FORMATION_SPACING,
            center: Vec2::new(center_x, center_y),
            ..Default::default()
        },
    );
    formation.id = world.next_entity_id();

    for (index, member) in formation.members.iter().enumerate() {
        let enemy_kind = select_enemy_kind(&mut world.rng, &stage.enemy_types);
        let profile = config.enemy_type(enemy_kind);
        let id = world.next_entity_id();
        let anchor = member.pos - Vec2::splat(profile.size * 0.5);
        // Members fly in from above, staggered so they arrive one after another
        let start = Vec2::new(anchor.x, -profile.size - index as f32 * 24.0);
        let mut enemy = build_enemy(
            id,
            enemy_kind,
            start,
            MovementPattern::Formation,
            stage,
            &profile,
            world.level,
            world.bonus_round,
            &mut world.rng,
        );
        enemy.base_pos = anchor;
        enemy.behavior = EnemyBehavior::Return;
        enemy.formation = Some(FormationSlot {
            formation_id: formation.id,
            index,
        });
        world.enemies.push(enemy);
    }

    world.formations.push(formation);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_roll_table_boundaries() {
        assert_eq!(roll_enemy_kind(0.0), EnemyKind::Elite);
        assert_eq!(roll_enemy_kind(0.049), EnemyKind::Elite);
        assert_eq!(roll_enemy_kind(0.05), EnemyKind::Tank);
        assert_eq!(roll_enemy_kind(0.12), EnemyKind::Kamikaze);
        assert_eq!(roll_enemy_kind(0.2), EnemyKind::Scout);
        assert_eq!(roll_enemy_kind(0.3), EnemyKind::Shooter);
        assert_eq!(roll_enemy_kind(0.5), EnemyKind::Dive);
        assert_eq!(roll_enemy_kind(0.6), EnemyKind::Grunt);
        assert_eq!(roll_enemy_kind(0.999), EnemyKind::Grunt);
    }

    #[test]
    fn test_roll_distribution() {
        let mut rng = Pcg32::seed_from_u64(3);
        let trials = 20_000;
        let grunts = (0..trials)
            .filter(|_| select_enemy_kind(&mut rng, &EnemyKind::ALL) == EnemyKind::Grunt)
            .count();
        let share = grunts as f32 / trials as f32;
        assert!((share - 0.40).abs() < 0.02, "{share}");
    }

    #[test]
    fn test_disallowed_roll_uses_first_allowed() {
        let mut rng = Pcg32::seed_from_u64(8);
        for _ in 0..500 {
            let kind = select_enemy_kind(&mut rng, &[EnemyKind::Scout, EnemyKind::Tank]);
            assert!(matches!(kind, EnemyKind::Scout | EnemyKind::Tank));
        }
    }

    #[test]
    fn test_wave_choice_split() {
        assert_eq!(roll_wave_choice(0.1), WaveChoice::VFormation);
        assert_eq!(roll_wave_choice(0.45), WaveChoice::LineFormation);
        assert_eq!(roll_wave_choice(0.6), WaveChoice::Single);
        assert_eq!(roll_wave_choice(0.99), WaveChoice::Single);
    }

    #[test]
    fn test_fire_cooldown_ranges() {
        let mut rng = Pcg32::seed_from_u64(21);
        for _ in 0..200 {
            let elite = enemy_fire_cooldown(EnemyKind::Elite, 1, &mut rng);
            assert!((0.4..0.7).contains(&elite));
            let early = enemy_fire_cooldown(EnemyKind::Shooter, 1, &mut rng);
            assert!((1.2..2.4).contains(&early));
            let late = enemy_fire_cooldown(EnemyKind::Shooter, 20, &mut rng);
            assert!(late < 2.4 * 0.5);
        }
    }

    #[test]
    fn test_bullet_leaves_center_bottom() {
        let config = GameConfig::default();
        let stage = config.stage("stage1").unwrap();
        let mut rng = Pcg32::seed_from_u64(2);
        let profile = config.enemy_type(EnemyKind::Shooter);
        let shooter = build_enemy(
            1,
            EnemyKind::Shooter,
            Vec2::new(100.0, 100.0),
            MovementPattern::Straight,
            stage,
            &profile,
            1,
            false,
            &mut rng,
        );
        let bullet = enemy_bullet(&shooter, Vec2::new(400.0, 600.0), 200.0);
        assert_eq!(bullet.center(), shooter.muzzle());
        assert_eq!(bullet.vel, Vec2::new(0.0, 200.0));

        let profile = config.enemy_type(EnemyKind::Elite);
        let elite = build_enemy(
            2,
            EnemyKind::Elite,
            Vec2::new(100.0, 100.0),
            MovementPattern::Straight,
            stage,
            &profile,
            1,
            false,
            &mut rng,
        );
        let aimed = enemy_bullet(&elite, Vec2::new(400.0, 600.0), 200.0);
        assert!(aimed.vel.x > 0.0);
        assert!((aimed.vel.length() - 200.0).abs() < 1e-2);
    }

    #[test]
    fn test_kamikaze_profile_chases() {
        let config = GameConfig::default();
        let stage = config.stage("stage2").unwrap();
        let mut rng = Pcg32::seed_from_u64(2);
        let profile = config.enemy_type(EnemyKind::Kamikaze);
        let enemy = build_enemy(
            1,
            EnemyKind::Kamikaze,
            Vec2::ZERO,
            MovementPattern::Zigzag,
            stage,
            &profile,
            1,
            false,
            &mut rng,
        );
        assert_eq!(enemy.pattern, MovementPattern::Chase);
        assert!(!enemy.can_shoot);
    }

    #[test]
    fn test_spawn_wave_respects_cap() {
        let config = GameConfig::default();
        let stage = config.stage("stage1").unwrap().clone();
        let mut world = World::new(77);
        let cap = difficulty::max_enemies(stage.max_enemies, world.level, false) as usize;

        for _ in 0..50 {
            spawn_wave(&mut world, &stage, &config);
            assert!(world.enemies.len() <= cap);
        }
        assert_eq!(world.enemies.len(), cap);
        assert_eq!(world.spawned_this_stage as usize, cap);
        for enemy in &world.enemies {
            assert!(stage.enemy_types.contains(&enemy.kind));
            assert!(enemy.pos.y < 0.0);
        }
    }

    #[test]
    fn test_formation_members_reference_their_slots() {
        let config = GameConfig::default();
        let stage = config.stage("stage1").unwrap().clone();
        let mut world = World::new(4);
        for _ in 0..100 {
            if !world.formations.is_empty() {
                break;
            }
            world.enemies.clear();
            spawn_wave(&mut world, &stage, &config);
        }
        let formation = &world.formations[0];
        for enemy in &world.enemies {
            let slot = enemy.formation.unwrap();
            assert_eq!(slot.formation_id, formation.id);
            assert_eq!(enemy.behavior, EnemyBehavior::Return);
            let anchor = formation.slot_position(slot.index).unwrap();
            let center = enemy.base_pos + Vec2::splat(enemy.size * 0.5);
            assert!((center - anchor).length() < 1e-3);
        }
    }

    #[test]
    fn test_pick_spawn_x_stays_on_screen() {
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..200 {
            let x = pick_spawn_x(&mut rng, &[], 20.0);
            assert!((0.0..=PLAYFIELD_WIDTH - 20.0).contains(&x));
        }
    }
}
