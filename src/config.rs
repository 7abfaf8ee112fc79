//! Stage, boss and enemy-type configuration
//!
//! [`GameConfig::default`] carries the built-in tuning for three stages.
//! [`GameConfig::load_partial`] overlays a JSON document on those defaults
//! record by record: a record that fails to parse or validate is reported as a
//! [`ValidationError`] and skipped, and everything else is applied. Only a
//! document that is not JSON at all (or cannot be read) is a hard
//! [`ConfigError`].
//!
//! Document shape:
//!
//! ```json
//! {
//!   "stages":      { "stage1": { "name": "...", "spawn_interval": 2.0, ... } },
//!   "bosses":      { "stage1": { "name": "...", "max_hp": 120, ... } },
//!   "enemy_types": { "grunt":  { "hp": 1, "speed_multiplier": 1.0, ... } }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sim::state::{BossPattern, EnemyBehavior, EnemyKind, MovementPattern};

/// Hard failures while loading a configuration document
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config root must be a JSON object")]
    NotAnObject,
}

/// One problem found in one configuration record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{config_name}: {path}: {message}")]
pub struct ValidationError {
    /// Section the record belongs to (`stages`, `bosses`, `enemy_types`)
    pub config_name: String,
    /// Record key plus field, e.g. `stage2.max_enemies`
    pub path: String,
    pub message: String,
}

impl ValidationError {
    fn new(config_name: &str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            config_name: config_name.to_string(),
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Wave tuning for one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,
    /// Base seconds between spawn ticks
    pub spawn_interval: f32,
    /// Base concurrent enemy cap
    pub max_enemies: u32,
    /// Base enemy speed (pixels/s)
    pub enemy_speed: f32,
    /// Base enemy bullet speed (pixels/s)
    pub enemy_bullet_speed: f32,
    /// Movement patterns single enemies may use
    pub patterns: Vec<MovementPattern>,
    /// Enemy archetypes this stage may spawn
    pub enemy_types: Vec<EnemyKind>,
}

/// One boss phase: active while the health percentage is above the threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BossPhase {
    pub hp_threshold_percent: f32,
    pub pattern: BossPattern,
}

fn default_fire_interval() -> f32 {
    1.2
}

/// Boss tuning for one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossConfig {
    pub name: String,
    pub max_hp: u32,
    /// Y of the entry (hold) position
    pub entry_y: f32,
    /// Movement speed (pixels/s)
    pub speed: f32,
    /// Base bullet speed (pixels/s)
    pub bullet_speed: f32,
    /// Seconds between volleys
    #[serde(default = "default_fire_interval")]
    pub fire_interval: f32,
    /// Ordered by descending threshold
    pub phases: Vec<BossPhase>,
    #[serde(default)]
    pub swoop_enabled: bool,
}

/// Per-archetype enemy profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyTypeConfig {
    pub hp: u32,
    pub speed_multiplier: f32,
    pub score: u32,
    /// Square side length
    pub size: f32,
    /// 0xRRGGBB display color
    pub color: u32,
    pub behavior: EnemyBehavior,
}

/// Complete configuration set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub stages: BTreeMap<String, StageConfig>,
    pub bosses: BTreeMap<String, BossConfig>,
    pub enemy_types: BTreeMap<EnemyKind, EnemyTypeConfig>,
}

/// Key of the 1-based stage number
pub fn stage_key(stage: u32) -> String {
    format!("stage{}", stage)
}

impl GameConfig {
    /// Config with no records at all
    pub fn empty() -> Self {
        Self {
            stages: BTreeMap::new(),
            bosses: BTreeMap::new(),
            enemy_types: BTreeMap::new(),
        }
    }

    pub fn stage(&self, key: &str) -> Option<&StageConfig> {
        self.stages.get(key)
    }

    /// Boss for a stage key; `None` means the stage has no boss
    pub fn boss(&self, key: &str) -> Option<&BossConfig> {
        self.bosses.get(key)
    }

    /// Wave config for a 1-based stage number. Stages past the last defined
    /// one reuse the highest defined stage below them.
    pub fn stage_for(&self, stage: u32) -> Option<&StageConfig> {
        (1..=stage.max(1)).rev().find_map(|n| self.stages.get(&stage_key(n)))
    }

    /// Boss for a 1-based stage number with the same fallback as
    /// [`stage_for`](Self::stage_for). Returns the key the boss is defined under.
    pub fn boss_for(&self, stage: u32) -> Option<(String, &BossConfig)> {
        (1..=stage.max(1)).rev().find_map(|n| {
            let key = stage_key(n);
            self.bosses.get(&key).map(|boss| (key, boss))
        })
    }

    /// Profile for an archetype, falling back to the built-in one
    pub fn enemy_type(&self, kind: EnemyKind) -> EnemyTypeConfig {
        self.enemy_types
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| default_enemy_type(kind))
    }

    /// Semantic checks over every record
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for (key, stage) in &self.stages {
            errors.extend(validate_stage(key, stage));
        }
        for (key, boss) in &self.bosses {
            errors.extend(validate_boss(key, boss));
        }
        for (kind, profile) in &self.enemy_types {
            errors.extend(validate_enemy_type(&format!("{:?}", kind).to_lowercase(), profile));
        }
        errors
    }

    /// Overlay a JSON document on the built-in defaults
    pub fn load_partial(json: &str) -> Result<(Self, Vec<ValidationError>), ConfigError> {
        let root: Value = serde_json::from_str(json)?;
        let Value::Object(root) = root else {
            return Err(ConfigError::NotAnObject);
        };

        let mut config = Self::default();
        let mut errors = Vec::new();

        for (section, value) in &root {
            match section.as_str() {
                "stages" => merge_section(section, value, &mut config.stages, &mut errors, |k, v| {
                    validate_stage(k, v)
                }),
                "bosses" => merge_section(section, value, &mut config.bosses, &mut errors, |k, v| {
                    validate_boss(k, v)
                }),
                "enemy_types" => merge_enemy_types(value, &mut config.enemy_types, &mut errors),
                other => errors.push(ValidationError::new(other, other, "unknown config section")),
            }
        }

        for error in &errors {
            log::warn!("config: {}", error);
        }
        log::info!(
            "Config loaded: {} stages, {} bosses, {} enemy types ({} problems)",
            config.stages.len(),
            config.bosses.len(),
            config.enemy_types.len(),
            errors.len()
        );

        Ok((config, errors))
    }

    /// Read and overlay a JSON file
    pub fn load_file(path: impl AsRef<Path>) -> Result<(Self, Vec<ValidationError>), ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_partial(&json)
    }
}

fn merge_section<T: DeserializeOwned>(
    section: &str,
    value: &Value,
    target: &mut BTreeMap<String, T>,
    errors: &mut Vec<ValidationError>,
    validate: impl Fn(&str, &T) -> Vec<ValidationError>,
) {
    let Value::Object(records) = value else {
        errors.push(ValidationError::new(section, section, "expected an object of records"));
        return;
    };

    for (key, raw) in records {
        match serde_json::from_value::<T>(raw.clone()) {
            Ok(record) => {
                let problems = validate(key, &record);
                if problems.is_empty() {
                    target.insert(key.clone(), record);
                } else {
                    errors.extend(problems);
                }
            }
            Err(e) => errors.push(ValidationError::new(section, key.clone(), e.to_string())),
        }
    }
}

fn merge_enemy_types(
    value: &Value,
    target: &mut BTreeMap<EnemyKind, EnemyTypeConfig>,
    errors: &mut Vec<ValidationError>,
) {
    const SECTION: &str = "enemy_types";
    let Value::Object(records) = value else {
        errors.push(ValidationError::new(SECTION, SECTION, "expected an object of records"));
        return;
    };

    for (key, raw) in records {
        let kind = match serde_json::from_value::<EnemyKind>(Value::String(key.clone())) {
            Ok(kind) => kind,
            Err(_) => {
                errors.push(ValidationError::new(SECTION, key.clone(), "unknown enemy type"));
                continue;
            }
        };
        match serde_json::from_value::<EnemyTypeConfig>(raw.clone()) {
            Ok(profile) => {
                let problems = validate_enemy_type(key, &profile);
                if problems.is_empty() {
                    target.insert(kind, profile);
                } else {
                    errors.extend(problems);
                }
            }
            Err(e) => errors.push(ValidationError::new(SECTION, key.clone(), e.to_string())),
        }
    }
}

fn validate_stage(key: &str, stage: &StageConfig) -> Vec<ValidationError> {
    const SECTION: &str = "stages";
    let mut errors = Vec::new();
    let mut check = |ok: bool, field: &str, message: &str| {
        if !ok {
            errors.push(ValidationError::new(SECTION, format!("{key}.{field}"), message));
        }
    };
    check(stage.spawn_interval > 0.0, "spawn_interval", "must be positive");
    check(stage.max_enemies >= 1, "max_enemies", "must be at least 1");
    check(stage.enemy_speed > 0.0, "enemy_speed", "must be positive");
    check(stage.enemy_bullet_speed > 0.0, "enemy_bullet_speed", "must be positive");
    check(!stage.patterns.is_empty(), "patterns", "must not be empty");
    check(!stage.enemy_types.is_empty(), "enemy_types", "must not be empty");
    errors
}

fn validate_boss(key: &str, boss: &BossConfig) -> Vec<ValidationError> {
    const SECTION: &str = "bosses";
    let mut errors = Vec::new();
    let mut check = |ok: bool, field: &str, message: &str| {
        if !ok {
            errors.push(ValidationError::new(SECTION, format!("{key}.{field}"), message));
        }
    };
    check(boss.max_hp >= 1, "max_hp", "must be at least 1");
    check(boss.speed > 0.0, "speed", "must be positive");
    check(boss.bullet_speed > 0.0, "bullet_speed", "must be positive");
    check(boss.fire_interval > 0.0, "fire_interval", "must be positive");
    check(!boss.phases.is_empty(), "phases", "must not be empty");
    check(
        boss.phases
            .iter()
            .all(|p| (0.0..=100.0).contains(&p.hp_threshold_percent)),
        "phases",
        "thresholds must be within 0-100",
    );
    check(
        boss.phases
            .windows(2)
            .all(|w| w[0].hp_threshold_percent >= w[1].hp_threshold_percent),
        "phases",
        "thresholds must be in descending order",
    );
    errors
}

fn validate_enemy_type(key: &str, profile: &EnemyTypeConfig) -> Vec<ValidationError> {
    const SECTION: &str = "enemy_types";
    let mut errors = Vec::new();
    let mut check = |ok: bool, field: &str, message: &str| {
        if !ok {
            errors.push(ValidationError::new(SECTION, format!("{key}.{field}"), message));
        }
    };
    check(profile.hp >= 1, "hp", "must be at least 1");
    check(profile.speed_multiplier > 0.0, "speed_multiplier", "must be positive");
    check(profile.size > 0.0, "size", "must be positive");
    check(profile.color <= 0xFF_FF_FF, "color", "must be a 24-bit RGB value");
    errors
}

/// Built-in profile for an archetype
pub fn default_enemy_type(kind: EnemyKind) -> EnemyTypeConfig {
    let (hp, speed_multiplier, score, size, color, behavior) = match kind {
        EnemyKind::Grunt => (1, 1.0, 100, 20.0, 0x66ccff, EnemyBehavior::Normal),
        EnemyKind::Scout => (1, 1.6, 150, 16.0, 0x99ff66, EnemyBehavior::Normal),
        EnemyKind::Shooter => (2, 0.8, 200, 22.0, 0xffcc33, EnemyBehavior::Normal),
        EnemyKind::Dive => (1, 1.2, 200, 20.0, 0xff6699, EnemyBehavior::Swoop),
        EnemyKind::Elite => (3, 1.0, 500, 26.0, 0xcc66ff, EnemyBehavior::Normal),
        EnemyKind::Tank => (5, 0.6, 400, 32.0, 0x888888, EnemyBehavior::Normal),
        EnemyKind::Kamikaze => (1, 1.8, 250, 18.0, 0xff3300, EnemyBehavior::Chase),
    };
    EnemyTypeConfig {
        hp,
        speed_multiplier,
        score,
        size,
        color,
        behavior,
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        use BossPattern::*;
        use EnemyKind::*;
        use MovementPattern::*;

        let phase = |hp_threshold_percent, pattern| BossPhase {
            hp_threshold_percent,
            pattern,
        };

        let mut config = Self::empty();

        config.stages.insert(
            stage_key(1),
            StageConfig {
                name: "Outer Rim".into(),
                spawn_interval: 2.0,
                max_enemies: 8,
                enemy_speed: 100.0,
                enemy_bullet_speed: 180.0,
                patterns: vec![Straight, Zigzag],
                enemy_types: vec![Grunt, Scout, Shooter, Dive],
            },
        );
        config.stages.insert(
            stage_key(2),
            StageConfig {
                name: "Debris Field".into(),
                spawn_interval: 1.6,
                max_enemies: 10,
                enemy_speed: 120.0,
                enemy_bullet_speed: 210.0,
                patterns: vec![Straight, Zigzag, Sine],
                enemy_types: vec![Grunt, Scout, Shooter, Dive, Tank, Kamikaze],
            },
        );
        config.stages.insert(
            stage_key(3),
            StageConfig {
                name: "Rift Core".into(),
                spawn_interval: 1.3,
                max_enemies: 12,
                enemy_speed: 140.0,
                enemy_bullet_speed: 240.0,
                patterns: vec![Straight, Zigzag, Sine, Chase],
                enemy_types: EnemyKind::ALL.to_vec(),
            },
        );

        config.bosses.insert(
            stage_key(1),
            BossConfig {
                name: "Sentinel".into(),
                max_hp: 120,
                entry_y: 100.0,
                speed: 80.0,
                bullet_speed: 200.0,
                fire_interval: 1.4,
                phases: vec![phase(66.0, Spread), phase(33.0, Aimed), phase(0.0, Radial)],
                swoop_enabled: false,
            },
        );
        config.bosses.insert(
            stage_key(2),
            BossConfig {
                name: "Warden".into(),
                max_hp: 200,
                entry_y: 110.0,
                speed: 100.0,
                bullet_speed: 230.0,
                fire_interval: 1.2,
                phases: vec![
                    phase(75.0, Spread),
                    phase(50.0, Burst),
                    phase(25.0, Spiral),
                    phase(0.0, Radial),
                ],
                swoop_enabled: true,
            },
        );
        config.bosses.insert(
            stage_key(3),
            BossConfig {
                name: "Overmind".into(),
                max_hp: 320,
                entry_y: 120.0,
                speed: 120.0,
                bullet_speed: 260.0,
                fire_interval: 1.0,
                phases: vec![
                    phase(80.0, Radial),
                    phase(60.0, Burst),
                    phase(40.0, Spiral),
                    phase(20.0, Aimed),
                    phase(0.0, Spread),
                ],
                swoop_enabled: true,
            },
        );

        for kind in EnemyKind::ALL {
            config.enemy_types.insert(kind, default_enemy_type(kind));
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate_cleanly() {
        let config = GameConfig::default();
        assert!(config.validate().is_empty(), "{:?}", config.validate());
        assert_eq!(config.stages.len(), 3);
        assert_eq!(config.enemy_types.len(), EnemyKind::ALL.len());
    }

    #[test]
    fn test_unknown_stage_is_absent() {
        let config = GameConfig::default();
        assert!(config.boss("stage99").is_none());
        assert!(config.stage("nope").is_none());
    }

    #[test]
    fn test_stage_for_falls_back_to_last_defined() {
        let config = GameConfig::default();
        assert_eq!(config.stage_for(1).map(|s| s.name.as_str()), Some("Outer Rim"));
        assert_eq!(config.stage_for(7).map(|s| s.name.as_str()), Some("Rift Core"));
        assert!(GameConfig::empty().stage_for(1).is_none());
    }

    #[test]
    fn test_boss_for_falls_back_to_last_defined() {
        let config = GameConfig::default();
        let (key, boss) = config.boss_for(2).unwrap();
        assert_eq!(key, "stage2");
        assert_eq!(boss.name, "Warden");

        let (key, boss) = config.boss_for(5).unwrap();
        assert_eq!(key, "stage3");
        assert_eq!(boss.name, "Overmind");

        // Exact lookup stays strict
        assert!(config.boss("stage5").is_none());
        assert!(GameConfig::empty().boss_for(4).is_none());
    }

    #[test]
    fn test_partial_load_skips_bad_records() {
        let json = r#"{
            "stages": {
                "stage1": {
                    "name": "Custom", "spawn_interval": 1.0, "max_enemies": 6,
                    "enemy_speed": 90.0, "enemy_bullet_speed": 150.0,
                    "patterns": ["straight"], "enemy_types": ["grunt"]
                },
                "stage2": { "name": "Broken", "spawn_interval": "fast" },
                "stage4": {
                    "name": "Empty", "spawn_interval": 1.0, "max_enemies": 0,
                    "enemy_speed": 90.0, "enemy_bullet_speed": 150.0,
                    "patterns": [], "enemy_types": ["grunt"]
                }
            },
            "bosses": {
                "stage1": {
                    "name": "Bad", "max_hp": 10, "entry_y": 80.0, "speed": 50.0,
                    "bullet_speed": 100.0, "phases": [{"hp_threshold_percent": 50, "pattern": "laser"}]
                }
            },
            "enemy_types": { "wyvern": { "hp": 1 } }
        }"#;
        let (config, errors) = GameConfig::load_partial(json).unwrap();

        assert_eq!(config.stage("stage1").map(|s| s.name.as_str()), Some("Custom"));
        // Bad record keeps the built-in default
        assert_eq!(config.stage("stage2").map(|s| s.name.as_str()), Some("Debris Field"));
        assert!(config.stage("stage4").is_none());
        assert_eq!(config.boss("stage1").map(|b| b.name.as_str()), Some("Sentinel"));

        assert!(errors.iter().any(|e| e.config_name == "stages" && e.path == "stage2"));
        assert!(errors.iter().any(|e| e.path == "stage4.max_enemies"));
        assert!(errors.iter().any(|e| e.path == "stage4.patterns"));
        assert!(errors.iter().any(|e| e.config_name == "bosses" && e.path == "stage1"));
        assert!(errors.iter().any(|e| e.config_name == "enemy_types" && e.path == "wyvern"));
    }

    #[test]
    fn test_phase_order_is_validated() {
        let mut config = GameConfig::default();
        if let Some(boss) = config.bosses.get_mut("stage2") {
            boss.phases.reverse();
        }
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "stage2.phases");
    }

    #[test]
    fn test_fire_interval_defaults_when_missing() {
        let json = r#"{ "bosses": { "stage5": {
            "name": "Late", "max_hp": 400, "entry_y": 100.0, "speed": 90.0,
            "bullet_speed": 250.0, "phases": [{"hp_threshold_percent": 0, "pattern": "aimed"}]
        } } }"#;
        let (config, errors) = GameConfig::load_partial(json).unwrap();
        assert!(errors.is_empty());
        let boss = config.boss("stage5").unwrap();
        assert_eq!(boss.fire_interval, 1.2);
        assert!(!boss.swoop_enabled);
    }

    #[test]
    fn test_hard_errors() {
        assert!(matches!(GameConfig::load_partial("not json"), Err(ConfigError::Json(_))));
        assert!(matches!(GameConfig::load_partial("[1, 2]"), Err(ConfigError::NotAnObject)));
        assert!(matches!(
            GameConfig::load_file("/definitely/not/here.json"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = GameConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let (loaded, errors) = GameConfig::load_partial(&json).unwrap();
        assert!(errors.is_empty());
        assert_eq!(loaded, config);
    }
}
