//! Steering, turning, speed ramp and position integration.

use glam::Vec3;
use rand::Rng;

use formicary_core::{Entity, System, World};

use crate::components::{Direction, IsAnt, Move, Position, RandomDirection};
use crate::math::{direction_to, rotate_y};
use crate::relations::Targeting;
use crate::resources::{SimulationConfigResource, Time};

/// Retimes each ant's stochastic wander heading. The jitter heading only
/// biases the turn blend; it never replaces the desired heading outright,
/// so trail-following and target steering stay dominant.
pub struct Wander;

impl System for Wander {
    fn name(&self) -> &'static str {
        "wander"
    }

    fn run(&mut self, world: &mut World) {
        let delta = match world.resource::<Time>() {
            Some(time) => time.delta_seconds,
            None => return,
        };
        let (interval, max_turn) = match world.resource::<SimulationConfigResource>() {
            Some(cfg) => (
                cfg.0.movement.wander_interval,
                cfg.0.movement.max_wander_turn_degrees.to_radians(),
            ),
            None => return,
        };

        let ants = world
            .query()
            .with::<IsAnt>()
            .with::<Direction>()
            .entities();

        let mut rng = rand::thread_rng();
        for ant in ants {
            if !world.has_component::<RandomDirection>(ant) {
                let angle = rng.gen_range(0.0..std::f32::consts::TAU);
                world.add_component(
                    ant,
                    RandomDirection {
                        direction: rotate_y(Vec3::Z, angle),
                        time_since_update: 0.0,
                    },
                );
                continue;
            }

            let turn = rng.gen_range(-max_turn..=max_turn);
            if let Some(jitter) = world.get_component_mut::<RandomDirection>(ant) {
                jitter.time_since_update += delta;
                if jitter.time_since_update >= interval {
                    jitter.time_since_update = 0.0;
                    jitter.direction = rotate_y(jitter.direction, turn);
                }
            }
        }
    }
}

/// Points targeted ants at their target; a dead or position-less target
/// releases the claim so the ant falls back to wandering.
pub struct SteerToTarget;

impl System for SteerToTarget {
    fn name(&self) -> &'static str {
        "steer_to_target"
    }

    fn run(&mut self, world: &mut World) {
        let ants = world
            .query()
            .with::<Position>()
            .with::<Direction>()
            .with::<IsAnt>()
            .related::<Targeting>()
            .entities();

        for ant in ants {
            let Some(target) = world.target::<Targeting>(ant) else {
                continue;
            };
            let target_pos = match world.get_component::<Position>(target) {
                Some(pos) => *pos,
                None => {
                    world.unrelate_all::<Targeting>(ant);
                    continue;
                }
            };
            let Some(pos) = world.get_component::<Position>(ant).copied() else {
                continue;
            };

            if let Some(heading) = direction_to(pos.0, target_pos.0) {
                if let Some(dir) = world.get_component_mut::<Direction>(ant) {
                    dir.desired = heading;
                }
            }
        }
    }
}

/// Blends the current heading toward desired plus weighted jitter, with
/// the turn fraction bounded by `turn_rate * delta`. The heading stays a
/// unit vector.
pub struct TurnTowardDesired;

impl System for TurnTowardDesired {
    fn name(&self) -> &'static str {
        "turn_toward_desired"
    }

    fn run(&mut self, world: &mut World) {
        let delta = match world.resource::<Time>() {
            Some(time) => time.delta_seconds,
            None => return,
        };
        let (turn_rate, jitter_weight) = match world.resource::<SimulationConfigResource>() {
            Some(cfg) => (cfg.0.movement.turn_rate, cfg.0.movement.jitter_weight),
            None => return,
        };

        let movers = world.query().with::<Direction>().entities();
        let fraction = (turn_rate * delta).clamp(0.0, 1.0);

        for mover in movers {
            let jitter = world
                .get_component::<RandomDirection>(mover)
                .map(|r| r.direction)
                .unwrap_or(Vec3::ZERO);

            let Some(dir) = world.get_component_mut::<Direction>(mover) else {
                continue;
            };

            let goal = dir.desired + jitter * jitter_weight;
            if goal.length_squared() <= f32::EPSILON {
                continue;
            }

            let blended = dir.current.lerp(goal.normalize(), fraction);
            if blended.length_squared() > f32::EPSILON {
                dir.current = blended.normalize();
            }
        }
    }
}

/// Linear acceleration toward each mover's max speed.
pub struct SpeedRamp;

impl System for SpeedRamp {
    fn name(&self) -> &'static str {
        "speed_ramp"
    }

    fn run(&mut self, world: &mut World) {
        let delta = match world.resource::<Time>() {
            Some(time) => time.delta_seconds,
            None => return,
        };
        let acceleration = match world.resource::<SimulationConfigResource>() {
            Some(cfg) => cfg.0.movement.acceleration,
            None => return,
        };

        let movers = world.query().with::<Move>().entities();
        for mover in movers {
            if let Some(movement) = world.get_component_mut::<Move>(mover) {
                movement.current_speed =
                    (movement.current_speed + acceleration * delta).min(movement.max_speed);
            }
        }
    }
}

/// Advances positions along the current heading.
pub struct Integrate;

impl System for Integrate {
    fn name(&self) -> &'static str {
        "integrate"
    }

    fn run(&mut self, world: &mut World) {
        let delta = match world.resource::<Time>() {
            Some(time) => time.delta_seconds,
            None => return,
        };

        let movers: Vec<Entity> = world
            .query()
            .with::<Position>()
            .with::<Direction>()
            .with::<Move>()
            .entities();

        for mover in movers {
            let velocity = {
                let Some(dir) = world.get_component::<Direction>(mover) else {
                    continue;
                };
                let Some(movement) = world.get_component::<Move>(mover) else {
                    continue;
                };
                dir.current * movement.current_speed
            };
            if let Some(pos) = world.get_component_mut::<Position>(mover) {
                pos.0 += velocity * delta;
            }
        }
    }
}
