//! Runtime settings and per-collection entity limits
//!
//! Settings are plain serde records; a host persists them however it likes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Maximum particles for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 100,
            QualityPreset::Medium => 300,
            QualityPreset::High => 800,
        }
    }

    /// Maximum simultaneous explosions for this preset
    pub fn max_explosions(&self) -> usize {
        match self {
            QualityPreset::Low => 8,
            QualityPreset::Medium => 20,
            QualityPreset::High => 40,
        }
    }

    /// Entity caps for this preset
    pub fn limits(&self) -> EntityLimits {
        EntityLimits {
            particles: self.max_particles(),
            explosions: self.max_explosions(),
            ..EntityLimits::default()
        }
    }
}

/// Hard caps per collection; the oldest entries go first when exceeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityLimits {
    pub bullets: usize,
    pub enemy_bullets: usize,
    pub enemies: usize,
    pub powerups: usize,
    pub particles: usize,
    pub explosions: usize,
    pub score_texts: usize,
}

impl Default for EntityLimits {
    fn default() -> Self {
        Self {
            bullets: 100,
            enemy_bullets: 200,
            enemies: 50,
            powerups: 10,
            particles: 300,
            explosions: 20,
            score_texts: 20,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,

    // === Visual Effects ===
    /// Screen shake on explosions/impacts
    pub screen_shake: bool,
    /// Particle effects (explosions, sparks, etc.)
    pub particles: bool,

    // === Accessibility ===
    /// Reduced motion (no shake)
    pub reduced_motion: bool,

    /// Collection caps (overrides the preset's when loaded from a file)
    pub limits: EntityLimits,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_preset(QualityPreset::Medium)
    }
}

impl Settings {
    /// Create settings from a quality preset (applies preset defaults)
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            screen_shake: true,
            particles: true,
            reduced_motion: false,
            limits: preset.limits(),
        }
    }

    /// Apply a quality preset (updates quality-dependent limits)
    pub fn apply_preset(&mut self, preset: QualityPreset) {
        self.quality = preset;
        self.limits.particles = preset.max_particles();
        self.limits.explosions = preset.max_explosions();
    }

    /// Effective screen shake (respects reduced_motion)
    pub fn effective_screen_shake(&self) -> bool {
        self.screen_shake && !self.reduced_motion
    }

    /// Caps the simulation should enforce
    pub fn effective_limits(&self) -> EntityLimits {
        let mut limits = self.limits;
        if !self.particles {
            limits.particles = 0;
        }
        limits
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}
