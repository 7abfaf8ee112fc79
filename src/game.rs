//! Orchestrator
//!
//! [`GameLoop`] owns the world snapshot, the configuration and the outbound
//! services. Each display tick it threads the world through [`step`] and
//! hands the queued events to the services.

use crate::config::GameConfig;
use crate::consts::*;
use crate::services::{GameEvent, GameServices};
use crate::settings::Settings;
use crate::sim::{Rules, SessionStats, TickInput, World, step};

/// Most steps a single `advance` call will run
const MAX_SUBSTEPS: u32 = 6;

pub struct GameLoop<S: GameServices> {
    world: World,
    config: GameConfig,
    settings: Settings,
    services: S,
    input: TickInput,
    accumulator: f32,
}

impl<S: GameServices> GameLoop<S> {
    /// Build a loop for a fresh run and bring the services up
    pub fn new(seed: u64, config: GameConfig, settings: Settings, mut services: S) -> Self {
        services.init();
        log::info!("New run (seed {})", seed);
        Self {
            world: World::new(seed),
            config,
            settings,
            services,
            input: TickInput::default(),
            accumulator: 0.0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn services(&self) -> &S {
        &self.services
    }

    pub fn stats(&self) -> &SessionStats {
        &self.world.stats
    }

    /// Input used by subsequent ticks. `pause` is one-shot and cleared after use.
    pub fn set_input(&mut self, input: TickInput) {
        self.input = input;
    }

    /// Run exactly one step with `dt` (clamped inside the step)
    pub fn tick(&mut self, dt: f32) {
        let rules = Rules::new(&self.config, self.settings.effective_limits());
        let world = std::mem::take(&mut self.world);
        self.world = step(world, &self.input, dt, &rules);
        self.input.pause = false;
        self.dispatch_events();
    }

    /// Fixed-step driver for a variable frame delta
    pub fn advance(&mut self, frame_dt: f32) {
        self.accumulator += frame_dt.min(MAX_FRAME_DT);
        let mut substeps = 0;
        while self.accumulator >= FRAME_DT && substeps < MAX_SUBSTEPS {
            self.tick(FRAME_DT);
            self.accumulator -= FRAME_DT;
            substeps += 1;
        }
    }

    fn dispatch_events(&mut self) {
        let shake = self.settings.effective_screen_shake();
        for event in self.world.events.drain(..) {
            if !shake && matches!(event, GameEvent::ScreenShake(_)) {
                continue;
            }
            self.services.handle(&event);
        }
    }

    /// Tear the services down; returns them for inspection
    pub fn shutdown(mut self) -> S {
        self.services.teardown();
        log::info!(
            "Run ended: score {}, stage {}, level {}",
            self.world.score,
            self.world.stage,
            self.world.level
        );
        self.services
    }
}
