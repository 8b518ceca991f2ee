//! Serializable point-in-time view of the world, for hosts that render
//! or record the simulation.

use serde::Serialize;

use crate::components::PheromoneKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodState {
    Free,
    Carried,
    Delivered,
}

#[derive(Debug, Clone, Serialize)]
pub struct AntView {
    pub id: u64,
    pub position: [f32; 3],
    pub heading: [f32; 3],
    pub carrying: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FoodView {
    pub id: u64,
    pub position: [f32; 3],
    pub state: FoodState,
}

#[derive(Debug, Clone, Serialize)]
pub struct PheromoneView {
    pub id: u64,
    pub position: [f32; 3],
    pub kind: PheromoneKind,
    pub intensity: f32,
    pub steps_from_goal: u32,
}

/// Full world view at the end of a tick. Entity lists are ordered by id,
/// so two snapshots of identical worlds are byte-identical when
/// serialized.
#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub elapsed_seconds: f64,
    pub delivered: u64,
    pub colony: Option<[f32; 3]>,
    pub ants: Vec<AntView>,
    pub food: Vec<FoodView>,
    pub pheromones: Vec<PheromoneView>,
}
