//! Difficulty scaling
//!
//! Pure functions mapping a stage's base tuning, the current level and the
//! bonus-round flag onto the numbers the spawner and collision code use.
//! No hidden state: identical inputs always give identical outputs.

/// Kills required to clear `level`
pub fn level_target(level: u32) -> u32 {
    match level {
        0 | 1 => 4,
        2 => 6,
        3 => 8,
        n => n.saturating_mul(3).saturating_add(6),
    }
}

/// Global difficulty scale in (0, 1]
pub fn difficulty_multiplier(level: u32) -> f32 {
    match level {
        0 | 1 => 0.6,
        2 => 0.7,
        3 => 0.8,
        4 => 0.9,
        n => (0.9 + 0.05 * (n - 4) as f32).min(1.0),
    }
}

/// Levels above the first (0 for level 0 and 1)
#[inline]
fn levels_past_first(level: u32) -> f32 {
    level.saturating_sub(1) as f32
}

/// Seconds between spawn ticks
pub fn spawn_interval(base: f32, level: u32, in_bonus_round: bool) -> f32 {
    let bonus = if in_bonus_round { 0.6 } else { 1.0 };
    let interval = (base / difficulty_multiplier(level) - 0.03 * levels_past_first(level)) * bonus;
    interval.max(0.5)
}

/// Concurrent enemy cap
pub fn max_enemies(base: u32, level: u32, in_bonus_round: bool) -> u32 {
    let scaled = (base as f32 * difficulty_multiplier(level)).floor() as u32;
    let bonus = if in_bonus_round { 3 } else { 0 };
    scaled
        .saturating_add(level.saturating_sub(1).saturating_mul(2))
        .saturating_add(bonus)
        .max(3)
}

/// Enemy movement speed (pixels/s)
pub fn enemy_speed(base: f32, level: u32, in_bonus_round: bool) -> f32 {
    let bonus = if in_bonus_round { 1.25 } else { 1.0 };
    base * difficulty_multiplier(level) * (1.0 + 0.08 * levels_past_first(level)) * bonus
}

/// Enemy bullet speed (pixels/s)
pub fn enemy_bullet_speed(base: f32, level: u32) -> f32 {
    base * difficulty_multiplier(level) * (1.0 + 0.06 * levels_past_first(level))
}

/// Score multiplier for the given consecutive-kill count
pub fn combo_multiplier(combo: u32) -> f32 {
    match combo {
        c if c >= 5 => 2.0,
        c if c >= 3 => 1.5,
        2 => 1.25,
        _ => 1.0,
    }
}

/// Factor applied to regular enemy fire cooldowns (shorter at higher levels)
pub fn enemy_fire_cooldown_scale(level: u32) -> f32 {
    (1.0 - 0.06 * levels_past_first(level)).max(0.4)
}

/// Whether `level` opens with a bonus round
pub fn is_bonus_level(level: u32, every: u32) -> bool {
    every > 0 && level > 0 && level % every == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_level_targets() {
        assert_eq!(level_target(1), 4);
        assert_eq!(level_target(2), 6);
        assert_eq!(level_target(3), 8);
        assert_eq!(level_target(5), 21);
        assert_eq!(level_target(10), 36);
    }

    #[test]
    fn test_difficulty_table() {
        assert_eq!(difficulty_multiplier(1), 0.6);
        assert_eq!(difficulty_multiplier(4), 0.9);
        assert!((difficulty_multiplier(5) - 0.95).abs() < 1e-6);
        assert!((difficulty_multiplier(6) - 1.0).abs() < 1e-6);
        assert_eq!(difficulty_multiplier(50), 1.0);
    }

    #[test]
    fn test_huge_levels_saturate() {
        assert_eq!(level_target(u32::MAX / 2), u32::MAX);
        assert_eq!(level_target(u32::MAX), u32::MAX);
        assert_eq!(max_enemies(10, u32::MAX, false), u32::MAX);
        assert_eq!(max_enemies(u32::MAX, u32::MAX, true), u32::MAX);
    }

    #[test]
    fn test_combo_breakpoints() {
        assert_eq!(combo_multiplier(0), 1.0);
        assert_eq!(combo_multiplier(1), 1.0);
        assert_eq!(combo_multiplier(2), 1.25);
        assert_eq!(combo_multiplier(3), 1.5);
        assert_eq!(combo_multiplier(4), 1.5);
        assert_eq!(combo_multiplier(5), 2.0);
        assert_eq!(combo_multiplier(40), 2.0);
    }

    #[test]
    fn test_spawn_interval_floor_and_bonus() {
        // 2.0 / 0.6 = 3.333...
        assert!((spawn_interval(2.0, 1, false) - 3.3333333).abs() < 1e-4);
        assert!((spawn_interval(2.0, 1, true) - 2.0).abs() < 1e-4);
        assert_eq!(spawn_interval(0.1, 20, true), 0.5);
    }

    #[test]
    fn test_max_enemies() {
        // floor(8 * 0.6) = 4
        assert_eq!(max_enemies(8, 1, false), 4);
        // floor(8 * 0.7) + 2 + 3 = 5 + 5
        assert_eq!(max_enemies(8, 2, true), 10);
        assert_eq!(max_enemies(0, 1, false), 3);
    }

    #[test]
    fn test_speeds() {
        assert!((enemy_speed(100.0, 1, false) - 60.0).abs() < 1e-4);
        assert!((enemy_speed(100.0, 1, true) - 75.0).abs() < 1e-4);
        assert!((enemy_bullet_speed(200.0, 2) - 200.0 * 0.7 * 1.06).abs() < 1e-3);
    }

    #[test]
    fn test_bonus_levels() {
        assert!(!is_bonus_level(1, 3));
        assert!(is_bonus_level(3, 3));
        assert!(is_bonus_level(6, 3));
        assert!(!is_bonus_level(3, 0));
    }

    proptest! {
        #[test]
        fn prop_multiplier_in_unit_range(level in 1u32..10_000) {
            let m = difficulty_multiplier(level);
            prop_assert!(m > 0.0 && m <= 1.0);
        }

        #[test]
        fn prop_multiplier_non_decreasing_after_four(level in 4u32..10_000) {
            prop_assert!(difficulty_multiplier(level + 1) >= difficulty_multiplier(level));
        }

        #[test]
        fn prop_outputs_reproducible(base in 0.1f32..10.0, level in 1u32..100, bonus in any::<bool>()) {
            prop_assert_eq!(spawn_interval(base, level, bonus), spawn_interval(base, level, bonus));
            prop_assert!(spawn_interval(base, level, bonus) >= 0.5);
            prop_assert!(max_enemies(base as u32, level, bonus) >= 3);
        }

        #[test]
        fn prop_total_over_every_level(level in any::<u32>(), base in any::<u32>(), bonus in any::<bool>()) {
            prop_assert!(level_target(level) >= 4);
            prop_assert!(max_enemies(base, level, bonus) >= 3);
        }
    }
}
