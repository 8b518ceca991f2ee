//! Components attached to simulation entities. Pure data, composition
//! only; tag components carry no payload.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use formicary_core::impl_component;

/// Which trail type a sensor set is attracted to, and which trail type a
/// pheromone marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PheromoneKind {
    Food,
    Home,
}

/// World position. The ground plane is x/z; y is elevation and mostly
/// decorative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Vec3);

impl Position {
    /// Projection onto the ground plane, as used by the spatial indices.
    pub fn ground(&self) -> [f32; 2] {
        [self.0.x, self.0.z]
    }
}

/// Current and desired unit headings, plus the boundary-turnaround
/// cooldown timer.
#[derive(Debug, Clone, Copy)]
pub struct Direction {
    pub current: Vec3,
    pub desired: Vec3,
    pub time_since_turnaround: f32,
}

impl Direction {
    pub fn facing(heading: Vec3) -> Self {
        Self {
            current: heading,
            desired: heading,
            time_since_turnaround: 0.0,
        }
    }
}

/// Speed state; `current_speed` ramps linearly toward `max_speed` after a
/// stop.
#[derive(Debug, Clone, Copy)]
pub struct Move {
    pub max_speed: f32,
    pub current_speed: f32,
}

/// Three sensor-cone centers in ant-local space (+z forward), the
/// detection radius, and the trail type currently being sought.
#[derive(Debug, Clone, Copy)]
pub struct Sensors {
    pub front_offset: Vec3,
    pub left_offset: Vec3,
    pub right_offset: Vec3,
    pub radius: f32,
    pub looking_for: PheromoneKind,
}

/// Trail deposition state. `step_count` grows with every deposit and
/// resets whenever the carried state flips, so it doubles as the trail's
/// distance-from-goal stamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct PheromoneSpawner {
    pub time_since_last_drop: f32,
    pub step_count: u32,
}

/// A decaying trail marker. The entity is destroyed once intensity
/// reaches zero.
#[derive(Debug, Clone, Copy)]
pub struct Pheromone {
    pub intensity: f32,
    pub kind: PheromoneKind,
    pub steps_from_goal: u32,
}

/// Stochastic wander heading with its retiming counter.
#[derive(Debug, Clone, Copy)]
pub struct RandomDirection {
    pub direction: Vec3,
    pub time_since_update: f32,
}

// Tag components.

pub struct IsAnt;
pub struct IsFood;
pub struct IsColony;
/// Exempt from per-frame transform sync on the renderer side.
pub struct Static;
/// Food that has been delivered to the colony.
pub struct InColony;

impl_component!(
    Position,
    Direction,
    Move,
    Sensors,
    PheromoneSpawner,
    Pheromone,
    RandomDirection,
    IsAnt,
    IsFood,
    IsColony,
    Static,
    InColony,
);
