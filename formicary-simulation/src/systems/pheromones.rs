//! Pheromone trail deposition, decay, and sensing.

use std::f32::consts::FRAC_PI_4;

use glam::Vec3;

use formicary_core::{System, World};

use crate::components::{
    Direction, Pheromone, PheromoneKind, PheromoneSpawner, Position, Sensors, Static,
};
use crate::math::{rotate_y, sensor_world_positions};
use crate::relations::{Carrying, Targeting};
use crate::resources::{PheromoneIndex, PheromoneStamp, SimulationConfigResource, Time};

/// Every spawner drops a marker on its own interval. The marker is stamped
/// with the spawner's step count before that count is incremented, so the
/// first marker after a state flip reads zero steps from its goal.
pub struct DepositPheromones;

impl System for DepositPheromones {
    fn name(&self) -> &'static str {
        "deposit_pheromones"
    }

    fn run(&mut self, world: &mut World) {
        let delta = match world.resource::<Time>() {
            Some(time) => time.delta_seconds,
            None => return,
        };
        let Some(cfg) = world
            .resource::<SimulationConfigResource>()
            .map(|c| c.0.clone())
        else {
            return;
        };
        let Some(mut index) = world.remove_resource::<PheromoneIndex>() else {
            return;
        };

        let spawners = world
            .query()
            .with::<PheromoneSpawner>()
            .with::<Position>()
            .entities();

        for spawner in spawners {
            let Some(pos) = world.get_component::<Position>(spawner).copied() else {
                continue;
            };

            let steps = {
                let Some(state) = world.get_component_mut::<PheromoneSpawner>(spawner) else {
                    continue;
                };
                state.time_since_last_drop += delta;
                if state.time_since_last_drop < cfg.pheromones.drop_interval {
                    continue;
                }
                state.time_since_last_drop = 0.0;
                let steps = state.step_count;
                state.step_count += 1;
                steps
            };

            // Carrying ants mark the trail back to food; empty-handed ants
            // mark the trail back home.
            let kind = if world.has_relation::<Carrying>(spawner) {
                PheromoneKind::Food
            } else {
                PheromoneKind::Home
            };

            let marker = world.spawn();
            world.add_component(marker, Position(pos.0));
            world.add_component(
                marker,
                Pheromone {
                    intensity: cfg.pheromones.initial_intensity,
                    kind,
                    steps_from_goal: steps,
                },
            );
            world.add_component(marker, Static);
            index.0.insert(
                marker,
                pos.ground(),
                PheromoneStamp {
                    kind,
                    steps_from_goal: steps,
                },
            );
        }

        world.insert_resource(index);
    }
}

/// Linear intensity decay; markers are destroyed (and dropped from the
/// index in the same tick) once intensity reaches zero.
pub struct DecayPheromones;

impl System for DecayPheromones {
    fn name(&self) -> &'static str {
        "decay_pheromones"
    }

    fn run(&mut self, world: &mut World) {
        let delta = match world.resource::<Time>() {
            Some(time) => time.delta_seconds,
            None => return,
        };
        let decay_rate = match world.resource::<SimulationConfigResource>() {
            Some(cfg) => cfg.0.pheromones.decay_rate,
            None => return,
        };
        let Some(mut index) = world.remove_resource::<PheromoneIndex>() else {
            return;
        };

        let markers = world.query().with::<Pheromone>().entities();
        for marker in markers {
            let expired = {
                let Some(pheromone) = world.get_component_mut::<Pheromone>(marker) else {
                    continue;
                };
                pheromone.intensity -= decay_rate * delta;
                pheromone.intensity <= 0.0
            };
            if expired {
                index.0.remove(marker);
                world.despawn(marker);
            }
        }

        world.insert_resource(index);
    }
}

/// Untargeted ants steer along trails. Each of the three sensor cones is
/// queried for markers of the sought kind; the marker closest to its goal
/// (lowest step stamp) wins, and its cone decides the new desired heading.
/// Ties go to the earliest cone, front first.
pub struct SensePheromones;

impl System for SensePheromones {
    fn name(&self) -> &'static str {
        "sense_pheromones"
    }

    fn run(&mut self, world: &mut World) {
        let Some(index) = world.remove_resource::<PheromoneIndex>() else {
            return;
        };

        let ants = world
            .query()
            .with::<Position>()
            .with::<Direction>()
            .with::<Sensors>()
            .not_related::<Targeting>()
            .entities();

        let mut steered: Vec<(formicary_core::Entity, Vec3)> = Vec::new();

        for ant in ants {
            let (pos, current, sensors) = {
                let Some(pos) = world.get_component::<Position>(ant) else {
                    continue;
                };
                let Some(dir) = world.get_component::<Direction>(ant) else {
                    continue;
                };
                let Some(sensors) = world.get_component::<Sensors>(ant) else {
                    continue;
                };
                (*pos, dir.current, *sensors)
            };

            let cones = sensor_world_positions(
                pos.0,
                current,
                [
                    sensors.front_offset,
                    sensors.left_offset,
                    sensors.right_offset,
                ],
            );

            let mut best: Option<(u32, usize)> = None;
            for (cone, center) in cones.iter().enumerate() {
                for (_, _, stamp) in index.0.query([center.x, center.z], sensors.radius) {
                    if stamp.kind != sensors.looking_for {
                        continue;
                    }
                    let better = match best {
                        None => true,
                        Some((steps, _)) => stamp.steps_from_goal < steps,
                    };
                    if better {
                        best = Some((stamp.steps_from_goal, cone));
                    }
                }
            }

            if let Some((_, cone)) = best {
                let desired = match cone {
                    0 => current,
                    1 => rotate_y(current, -FRAC_PI_4),
                    _ => rotate_y(current, FRAC_PI_4),
                };
                steered.push((ant, desired.normalize_or_zero()));
            }
        }

        for (ant, desired) in steered {
            if desired == Vec3::ZERO {
                continue;
            }
            if let Some(dir) = world.get_component_mut::<Direction>(ant) {
                dir.desired = desired;
            }
        }

        world.insert_resource(index);
    }
}
