//! Enemy formations
//!
//! [`offsets`] produces relative layouts; [`create_formation`] turns a layout
//! into absolute member slots; [`update_formation`] moves the slots each frame.
//! Enemies reference a slot through [`FormationSlot`](super::state::FormationSlot)
//! and treat the slot position as their anchor.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::EnemyBehavior;
use crate::consts::PLAYFIELD_WIDTH;

/// Formation layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormationKind {
    Grid,
    /// Chevron, apex at the center, outer members lower
    V,
    Line,
    /// Horizontal spread with alternating vertical offset
    Staggered,
    /// Sinusoidal sway with downward drift, entering from above the screen
    Wave,
    /// Members on a rotating circle
    Circle,
}

/// Relative (dx, dy) offsets for `count` members, symmetric about dx = 0.
/// Grid, wave and circle are built by [`create_formation`]; here they fall
/// back to a line.
pub fn offsets(kind: FormationKind, count: usize, spacing: f32) -> Vec<Vec2> {
    let mid = (count as f32 - 1.0) / 2.0;
    (0..count)
        .map(|i| {
            let rank = i as f32 - mid;
            let dx = rank * spacing;
            let dy = match kind {
                FormationKind::V => rank.abs() * spacing * 0.6,
                FormationKind::Staggered => {
                    if i % 2 == 1 {
                        spacing * 0.5
                    } else {
                        0.0
                    }
                }
                _ => 0.0,
            };
            Vec2::new(dx, dy)
        })
        .collect()
}

/// Layout parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormationOptions {
    /// Member count (V, line, staggered, wave, circle)
    pub count: usize,
    /// Grid dimensions
    pub rows: usize,
    pub cols: usize,
    pub spacing: f32,
    pub center: Vec2,
    /// Circle radius
    pub radius: f32,
    /// Wave sway amplitude (pixels) and frequency (rad/s)
    pub amplitude: f32,
    pub frequency: f32,
    /// Wave downward drift (pixels/s)
    pub drift_speed: f32,
    /// Circle rotation (rad/s)
    pub angular_speed: f32,
}

impl Default for FormationOptions {
    fn default() -> Self {
        Self {
            count: 5,
            rows: 3,
            cols: 6,
            spacing: 40.0,
            center: Vec2::new(PLAYFIELD_WIDTH / 2.0, 160.0),
            radius: 90.0,
            amplitude: 60.0,
            frequency: 2.0,
            drift_speed: 40.0,
            angular_speed: 0.8,
        }
    }
}

/// One slot in a formation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormationMember {
    /// Layout position before per-frame motion
    pub base: Vec2,
    /// Current slot position (the anchor enemies follow)
    pub pos: Vec2,
}

/// A live formation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formation {
    pub id: u32,
    pub kind: FormationKind,
    pub members: Vec<FormationMember>,
    /// Behavior tag members start with once seated
    pub behavior: EnemyBehavior,
    pub options: FormationOptions,
    /// Accumulated seconds
    pub time: f32,
    /// Circle rotation offset
    pub angle: f32,
}

impl Formation {
    pub fn slot_position(&self, index: usize) -> Option<Vec2> {
        self.members.get(index).map(|m| m.pos)
    }
}

/// Build a formation layout (id 0; the caller assigns one)
pub fn create_formation(kind: FormationKind, options: FormationOptions) -> Formation {
    let center = options.center;
    let bases: Vec<Vec2> = match kind {
        FormationKind::Grid => {
            let w = (options.cols.max(1) - 1) as f32 * options.spacing;
            let h = (options.rows.max(1) - 1) as f32 * options.spacing;
            let origin = center - Vec2::new(w, h) * 0.5;
            (0..options.rows)
                .flat_map(|r| (0..options.cols).map(move |c| (r, c)))
                .map(|(r, c)| origin + Vec2::new(c as f32, r as f32) * options.spacing)
                .collect()
        }
        FormationKind::V | FormationKind::Line | FormationKind::Staggered => {
            offsets(kind, options.count, options.spacing)
                .into_iter()
                .map(|o| center + o)
                .collect()
        }
        FormationKind::Wave => {
            // Anchored above the screen; drift brings it in
            let above = Vec2::new(center.x, -options.spacing);
            offsets(FormationKind::Line, options.count, options.spacing)
                .into_iter()
                .map(|o| above + o)
                .collect()
        }
        FormationKind::Circle => (0..options.count)
            .map(|i| center + circle_offset(i, options.count, 0.0, options.radius))
            .collect(),
    };

    let behavior = match kind {
        FormationKind::Wave => EnemyBehavior::Normal,
        _ => EnemyBehavior::Idle,
    };

    Formation {
        id: 0,
        kind,
        members: bases
            .into_iter()
            .map(|base| FormationMember { base, pos: base })
            .collect(),
        behavior,
        options,
        time: 0.0,
        angle: 0.0,
    }
}

fn circle_offset(index: usize, count: usize, angle: f32, radius: f32) -> Vec2 {
    let theta = angle + index as f32 * TAU / count.max(1) as f32;
    Vec2::new(theta.cos(), theta.sin()) * radius
}

/// Advance a formation by `dt`
pub fn update_formation(formation: &mut Formation, dt: f32) {
    formation.time += dt;
    let options = formation.options;

    match formation.kind {
        FormationKind::Grid | FormationKind::V | FormationKind::Line | FormationKind::Staggered => {
            for member in &mut formation.members {
                member.pos = member.base;
            }
        }
        FormationKind::Wave => {
            let time = formation.time;
            for (i, member) in formation.members.iter_mut().enumerate() {
                member.base.y += options.drift_speed * dt;
                let sway = (time * options.frequency + i as f32 * 0.5).sin() * options.amplitude;
                member.pos = Vec2::new(member.base.x + sway, member.base.y);
            }
        }
        FormationKind::Circle => {
            formation.angle = (formation.angle + options.angular_speed * dt) % TAU;
            let count = formation.members.len();
            let angle = formation.angle;
            for (i, member) in formation.members.iter_mut().enumerate() {
                member.pos = options.center + circle_offset(i, count, angle, options.radius);
            }
        }
    }
}
