//! Global resources stored in the world. All state is explicitly owned by
//! the simulation instance; nothing here is process-wide, so independent
//! simulations (and tests) never share spatial trees.

use formicary_config::Config;
use formicary_core::SpatialIndex;

use crate::components::PheromoneKind;

/// Delta time for the current tick plus accumulated elapsed time.
#[derive(Debug, Clone, Copy)]
pub struct Time {
    pub delta_seconds: f32,
    pub elapsed_seconds: f64,
}

impl Default for Time {
    fn default() -> Self {
        Self {
            delta_seconds: 1.0 / 60.0,
            elapsed_seconds: 0.0,
        }
    }
}

/// Simulation configuration as a resource for systems.
#[derive(Clone)]
pub struct SimulationConfigResource(pub Config);

/// Spatial index over free food items. Separate from the pheromone index
/// so pheromone churn never disturbs food lookups.
#[derive(Default)]
pub struct FoodIndex(pub SpatialIndex<()>);

/// Payload stored per pheromone entry, enough for sensor filtering
/// without a component lookup.
#[derive(Debug, Clone, Copy)]
pub struct PheromoneStamp {
    pub kind: PheromoneKind,
    pub steps_from_goal: u32,
}

/// Spatial index over live pheromones.
#[derive(Default)]
pub struct PheromoneIndex(pub SpatialIndex<PheromoneStamp>);

/// Running totals surfaced to hosts (e.g. a "total foraged" counter).
#[derive(Debug, Default, Clone, Copy)]
pub struct ForagingStats {
    pub delivered: u64,
}
