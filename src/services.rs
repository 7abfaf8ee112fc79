//! Outbound side effects
//!
//! The simulation never plays sounds or shakes the screen itself. Each step
//! queues [`GameEvent`]s on the world; the orchestrator drains them into a
//! [`GameServices`] implementation that owns whatever backend (audio device,
//! renderer, achievement tracker) the host provides.

use serde::{Deserialize, Serialize};

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundEffect {
    /// Player fires
    PlayerShot,
    /// Regular enemy destroyed
    EnemyDestroyed,
    /// Bullet hits an enemy that survives
    EnemyHit,
    /// Bullet hits the boss
    BossHit,
    /// Boss destroyed
    BossDefeated,
    /// Boss enters the playfield
    BossWarning,
    /// Player loses a life
    PlayerHit,
    /// Shield absorbs a hit
    ShieldBreak,
    /// Powerup collected
    PowerupCollect,
    /// Level target reached
    LevelUp,
    /// Run ended
    GameOver,
}

impl SoundEffect {
    /// Asset name handed to the audio backend
    pub fn name(&self) -> &'static str {
        match self {
            SoundEffect::PlayerShot => "player_shot",
            SoundEffect::EnemyDestroyed => "enemy_destroyed",
            SoundEffect::EnemyHit => "enemy_hit",
            SoundEffect::BossHit => "boss_hit",
            SoundEffect::BossDefeated => "boss_defeated",
            SoundEffect::BossWarning => "boss_warning",
            SoundEffect::PlayerHit => "player_hit",
            SoundEffect::ShieldBreak => "shield_break",
            SoundEffect::PowerupCollect => "powerup_collect",
            SoundEffect::LevelUp => "level_up",
            SoundEffect::GameOver => "game_over",
        }
    }
}

/// Background music tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MusicTrack {
    Stage,
    Boss,
    Bonus,
    Victory,
    GameOver,
}

/// Session statistics increments for the achievement system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatEvent {
    Kill,
    BossDefeated,
    PowerupCollected,
    /// New combo value after a kill
    Combo(u32),
    HitTaken,
}

/// A queued outbound side effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Sound(SoundEffect),
    Music(MusicTrack),
    /// Shake intensity (0-1)
    ScreenShake(f32),
    Stat(StatEvent),
    /// Score, combo and achievement pop-up text
    Popup(String),
}

/// Fire-and-forget collaborators the orchestrator talks to
pub trait GameServices {
    /// Called once before the first tick
    fn init(&mut self) {}

    fn handle(&mut self, event: &GameEvent);

    /// Called once when the orchestrator shuts down
    fn teardown(&mut self) {}
}

/// Discards every event (headless runs)
#[derive(Debug, Default)]
pub struct NullServices;

impl GameServices for NullServices {
    fn handle(&mut self, _event: &GameEvent) {}
}

/// Routes events to the `log` facade
#[derive(Debug, Default)]
pub struct LogServices {
    handled: u64,
}

impl LogServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handled(&self) -> u64 {
        self.handled
    }
}

impl GameServices for LogServices {
    fn init(&mut self) {
        log::info!("Services online");
    }

    fn handle(&mut self, event: &GameEvent) {
        self.handled += 1;
        match event {
            GameEvent::Sound(effect) => log::trace!("sound: {}", effect.name()),
            GameEvent::Music(track) => log::debug!("music: {:?}", track),
            GameEvent::ScreenShake(intensity) => log::trace!("shake: {:.2}", intensity),
            GameEvent::Stat(stat) => log::trace!("stat: {:?}", stat),
            GameEvent::Popup(text) => log::info!("{}", text),
        }
    }

    fn teardown(&mut self) {
        log::info!("Services shut down after {} events", self.handled);
    }
}

/// Captures events for inspection in tests
#[derive(Debug, Default)]
pub struct RecordingServices {
    pub events: Vec<GameEvent>,
    pub initialized: bool,
    pub torn_down: bool,
}

impl RecordingServices {
    pub fn sounds(&self) -> impl Iterator<Item = SoundEffect> + '_ {
        self.events.iter().filter_map(|event| match event {
            GameEvent::Sound(effect) => Some(*effect),
            _ => None,
        })
    }
}

impl GameServices for RecordingServices {
    fn init(&mut self) {
        self.initialized = true;
    }

    fn handle(&mut self, event: &GameEvent) {
        self.events.push(event.clone());
    }

    fn teardown(&mut self) {
        self.torn_down = true;
    }
}
