//! Dive-attack ("swoop") sub-state machine
//!
//! inactive -> active (outbound curve toward a target) -> returning (back to
//! the anchor) -> inactive. Progress is `elapsed / duration`: the outbound leg
//! covers progress 0..1, the return leg covers 1..1.5 and is parameterised as
//! `(progress - 1) * 2`. The anchor is re-read every tick so hosts whose
//! anchor drifts (formations, a patrolling boss) land in the right place.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{Boss, BossState, Enemy, EnemyBehavior};

/// Sideways offset of the arc control point
const ARC_BEND: f32 = 140.0;
/// Starting corkscrew radius (decays to zero at the target)
const CORKSCREW_RADIUS: f32 = 60.0;
const CORKSCREW_TURNS: f32 = 2.5;
/// The return leg lasts half the outbound duration
const RETURN_FRACTION: f32 = 0.5;

/// Dive curve shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwoopPattern {
    Straight,
    ArcLeft,
    ArcRight,
    Corkscrew,
}

impl SwoopPattern {
    pub const ALL: [SwoopPattern; 4] = [
        SwoopPattern::Straight,
        SwoopPattern::ArcLeft,
        SwoopPattern::ArcRight,
        SwoopPattern::Corkscrew,
    ];

    /// Outbound duration in seconds
    pub fn duration(&self) -> f32 {
        match self {
            SwoopPattern::Straight => 1.2,
            SwoopPattern::ArcLeft | SwoopPattern::ArcRight => 1.6,
            SwoopPattern::Corkscrew => 2.0,
        }
    }

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    /// -1 bends toward -x, +1 toward +x
    fn side(&self) -> f32 {
        match self {
            SwoopPattern::ArcLeft => -1.0,
            SwoopPattern::ArcRight => 1.0,
            _ => 0.0,
        }
    }
}

/// Which leg of the swoop is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwoopPhase {
    Active,
    Returning,
}

/// An in-flight swoop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Swoop {
    pub pattern: SwoopPattern,
    pub start: Vec2,
    pub target: Vec2,
    /// Latest known anchor
    pub base: Vec2,
    pub elapsed: f32,
    pub duration: f32,
}

impl Swoop {
    pub fn new(pattern: SwoopPattern, start: Vec2, target: Vec2, base: Vec2) -> Self {
        Self {
            pattern,
            start,
            target,
            base,
            elapsed: 0.0,
            duration: pattern.duration(),
        }
    }

    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0 + RETURN_FRACTION
        } else {
            self.elapsed / self.duration
        }
    }

    pub fn phase(&self) -> SwoopPhase {
        if self.progress() < 1.0 {
            SwoopPhase::Active
        } else {
            SwoopPhase::Returning
        }
    }

    pub fn is_complete(&self) -> bool {
        self.progress() >= 1.0 + RETURN_FRACTION
    }

    /// Position for the current progress
    pub fn position(&self) -> Vec2 {
        let progress = self.progress();
        if progress < 1.0 {
            self.outbound(progress.max(0.0))
        } else {
            let u = ((progress - 1.0) / RETURN_FRACTION).clamp(0.0, 1.0);
            self.inbound(u)
        }
    }

    fn outbound(&self, t: f32) -> Vec2 {
        match self.pattern {
            SwoopPattern::Straight => self.start.lerp(self.target, t),
            SwoopPattern::ArcLeft | SwoopPattern::ArcRight => {
                let control = (self.start + self.target) * 0.5
                    + Vec2::new(self.pattern.side() * ARC_BEND, 0.0);
                quadratic(self.start, control, self.target, t)
            }
            SwoopPattern::Corkscrew => {
                let along = self.start.lerp(self.target, t);
                let theta = t * CORKSCREW_TURNS * TAU;
                let radius = CORKSCREW_RADIUS * (1.0 - t);
                along + Vec2::new(theta.sin(), 1.0 - theta.cos()) * radius
            }
        }
    }

    fn inbound(&self, u: f32) -> Vec2 {
        match self.pattern {
            SwoopPattern::ArcLeft | SwoopPattern::ArcRight => {
                // Mirror the outbound bend so the loop closes on the other side
                let control = (self.target + self.base) * 0.5
                    - Vec2::new(self.pattern.side() * ARC_BEND, 0.0);
                quadratic(self.target, control, self.base, u)
            }
            SwoopPattern::Straight | SwoopPattern::Corkscrew => self.target.lerp(self.base, u),
        }
    }
}

fn quadratic(a: Vec2, control: Vec2, b: Vec2, t: f32) -> Vec2 {
    let inv = 1.0 - t;
    a * (inv * inv) + control * (2.0 * inv * t) + b * (t * t)
}

/// Anything that can break off into a swoop
pub trait SwoopHost {
    fn swoop(&self) -> Option<&Swoop>;
    fn swoop_mut(&mut self) -> &mut Option<Swoop>;
    /// Where the host returns to
    fn anchor(&self) -> Vec2;
    fn position(&self) -> Vec2;
    fn set_position(&mut self, pos: Vec2);
    /// Called with the phase each tick, and with `None` once the swoop ends
    fn on_swoop_phase(&mut self, phase: Option<SwoopPhase>);
}

/// Begin a swoop from the host's current position toward `target`.
/// Returns false if the host is already swooping.
pub fn start_swoop<H: SwoopHost>(host: &mut H, pattern: SwoopPattern, target: Vec2) -> bool {
    if host.swoop().is_some() {
        return false;
    }
    let swoop = Swoop::new(pattern, host.position(), target, host.anchor());
    *host.swoop_mut() = Some(swoop);
    host.on_swoop_phase(Some(SwoopPhase::Active));
    true
}

/// Advance the host's swoop by `dt`. Returns true while a swoop is still running.
/// On completion the host snaps exactly to its anchor.
pub fn advance_swoop<H: SwoopHost>(host: &mut H, dt: f32) -> bool {
    let anchor = host.anchor();
    let Some(swoop) = host.swoop_mut().as_mut() else {
        return false;
    };
    swoop.base = anchor;
    swoop.elapsed += dt;

    if swoop.is_complete() {
        *host.swoop_mut() = None;
        host.set_position(anchor);
        host.on_swoop_phase(None);
        return false;
    }

    let pos = swoop.position();
    let phase = swoop.phase();
    host.set_position(pos);
    host.on_swoop_phase(Some(phase));
    true
}

impl SwoopHost for Enemy {
    fn swoop(&self) -> Option<&Swoop> {
        self.swoop.as_ref()
    }

    fn swoop_mut(&mut self) -> &mut Option<Swoop> {
        &mut self.swoop
    }

    fn anchor(&self) -> Vec2 {
        self.base_pos
    }

    fn position(&self) -> Vec2 {
        self.pos
    }

    fn set_position(&mut self, pos: Vec2) {
        self.pos = pos;
    }

    fn on_swoop_phase(&mut self, phase: Option<SwoopPhase>) {
        self.behavior = match phase {
            Some(SwoopPhase::Active) => EnemyBehavior::Swoop,
            Some(SwoopPhase::Returning) => EnemyBehavior::Return,
            None => EnemyBehavior::Idle,
        };
    }
}

impl SwoopHost for Boss {
    fn swoop(&self) -> Option<&Swoop> {
        self.swoop.as_ref()
    }

    fn swoop_mut(&mut self) -> &mut Option<Swoop> {
        &mut self.swoop
    }

    fn anchor(&self) -> Vec2 {
        super::boss::patrol_anchor(self)
    }

    fn position(&self) -> Vec2 {
        self.pos
    }

    fn set_position(&mut self, pos: Vec2) {
        self.pos = pos;
    }

    fn on_swoop_phase(&mut self, phase: Option<SwoopPhase>) {
        if self.state == BossState::Defeated {
            return;
        }
        self.state = match phase {
            Some(_) => BossState::Swooping,
            None => BossState::Holding,
        };
    }
}
