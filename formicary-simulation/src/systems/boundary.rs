//! Keeps ants inside the square world region.

use glam::Vec3;

use formicary_core::{System, World};

use crate::components::{Direction, IsAnt, Position};
use crate::math::direction_to;
use crate::resources::{SimulationConfigResource, Time};

/// Ants beyond the world half-extent on either ground axis are pointed
/// back toward the origin. A cooldown keeps an ant straddling the edge
/// from re-steering every tick, so it commits to the turn.
pub struct BoundaryTurnaround;

impl System for BoundaryTurnaround {
    fn name(&self) -> &'static str {
        "boundary_turnaround"
    }

    fn run(&mut self, world: &mut World) {
        let delta = match world.resource::<Time>() {
            Some(time) => time.delta_seconds,
            None => return,
        };
        let (half_extent, cooldown) = match world.resource::<SimulationConfigResource>() {
            Some(cfg) => (cfg.0.world.half_extent, cfg.0.movement.boundary_cooldown),
            None => return,
        };

        let ants = world
            .query()
            .with::<Position>()
            .with::<Direction>()
            .with::<IsAnt>()
            .entities();

        for ant in ants {
            let Some(pos) = world.get_component::<Position>(ant).copied() else {
                continue;
            };
            let outside = pos.0.x.abs() > half_extent || pos.0.z.abs() > half_extent;
            let homeward = direction_to(pos.0, Vec3::ZERO);

            if let Some(dir) = world.get_component_mut::<Direction>(ant) {
                dir.time_since_turnaround += delta;
                if outside && dir.time_since_turnaround >= cooldown {
                    if let Some(heading) = homeward {
                        dir.desired = heading;
                        dir.time_since_turnaround = 0.0;
                    }
                }
            }
        }
    }
}
