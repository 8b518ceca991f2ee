//! Ant-colony foraging simulation: a deterministic system pipeline over an
//! entity world, driven tick by tick by a host.
//!
//! The [`Simulation`] facade owns the world, the resolved schedule and the
//! spatial indices. Hosts construct it from a [`formicary_config::Config`],
//! call [`Simulation::step`] with wall-clock deltas, and read state back
//! through [`Simulation::snapshot`] or the live-edit commands.

pub mod components;
pub mod math;
pub mod relations;
pub mod resources;
pub mod snapshot;
pub mod systems;

use glam::Vec3;
use rand::Rng;
use thiserror::Error;

use formicary_config::{Config, ConfigError};
use formicary_core::{Entity, Schedule, ScheduleError, World};

use crate::components::{
    Direction, InColony, IsAnt, IsColony, IsFood, Move, Pheromone, PheromoneKind,
    PheromoneSpawner, Position, RandomDirection, Sensors, Static,
};
use crate::math::rotate_y;
use crate::relations::{CarriedBy, Carrying};
use crate::resources::{
    FoodIndex, ForagingStats, PheromoneIndex, PheromoneStamp, SimulationConfigResource, Time,
};
use crate::snapshot::{AntView, FoodState, FoodView, PheromoneView, WorldSnapshot};
use crate::systems::{
    BoundaryTurnaround, DecayPheromones, DepositPheromones, DropOffFood, FindFood, Integrate,
    SensePheromones, SpeedRamp, SteerToTarget, SyncCarriedFood, TurnTowardDesired, Wander,
};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),
}

/// Owns the world and the fixed behavior pipeline.
pub struct Simulation {
    world: World,
    schedule: Schedule,
    config: Config,
    tick: u64,
}

impl Simulation {
    pub fn new(config: Config) -> Result<Self, SimulationError> {
        config.validate()?;

        let mut world = World::new();
        world.insert_resource(Time::default());
        world.insert_resource(SimulationConfigResource(config.clone()));
        world.insert_resource(FoodIndex::default());
        world.insert_resource(PheromoneIndex::default());
        world.insert_resource(ForagingStats::default());

        let schedule = build_schedule()?;

        let mut sim = Self {
            world,
            schedule,
            config,
            tick: 0,
        };

        sim.spawn_colony(sim.config.colony.position_vec());
        for _ in 0..sim.config.initial_state.ants {
            sim.spawn_ant();
        }
        for _ in 0..sim.config.initial_state.food {
            sim.spawn_food(None);
        }

        log::info!(
            "simulation ready: {} ants, {} food, half extent {}",
            sim.config.initial_state.ants,
            sim.config.initial_state.food,
            sim.config.world.half_extent
        );

        Ok(sim)
    }

    /// Advance the world by one tick. The delta is clamped to the
    /// configured maximum so a stalled host cannot teleport agents.
    pub fn step(&mut self, delta_seconds: f32) {
        let delta = delta_seconds.clamp(0.0, self.config.max_delta);
        if let Some(time) = self.world.resource_mut::<Time>() {
            time.delta_seconds = delta;
            time.elapsed_seconds += f64::from(delta);
        }
        self.schedule.run(&mut self.world);
        self.tick += 1;
    }

    // --- Live-edit commands ---

    /// Spawn one ant at a random position in the inner patrol area.
    pub fn spawn_ant(&mut self) -> Entity {
        let half = self.config.world.half_extent * 0.7;
        let mut rng = rand::thread_rng();
        let position = Vec3::new(
            rng.gen_range(-half..=half),
            0.0,
            rng.gen_range(-half..=half),
        );
        self.spawn_ant_at(position)
    }

    /// Spawn one ant at an exact position with a random heading.
    pub fn spawn_ant_at(&mut self, position: Vec3) -> Entity {
        let heading = {
            let mut rng = rand::thread_rng();
            rotate_y(Vec3::Z, rng.gen_range(0.0..std::f32::consts::TAU))
        };

        let sensors = &self.config.sensors;
        let ant = self.world.spawn();
        self.world.add_component(ant, IsAnt);
        self.world.add_component(ant, Position(position));
        self.world.add_component(ant, Direction::facing(heading));
        self.world.add_component(
            ant,
            Move {
                max_speed: self.config.movement.max_speed,
                current_speed: 0.0,
            },
        );
        self.world.add_component(
            ant,
            Sensors {
                front_offset: Vec3::from_array(sensors.front_offset),
                left_offset: Vec3::from_array(sensors.left_offset),
                right_offset: Vec3::from_array(sensors.right_offset),
                radius: sensors.radius,
                looking_for: PheromoneKind::Food,
            },
        );
        self.world.add_component(ant, PheromoneSpawner::default());
        self.world.add_component(
            ant,
            RandomDirection {
                direction: heading,
                time_since_update: 0.0,
            },
        );
        ant
    }

    /// Spawn one food item, randomly placed when no position is given.
    pub fn spawn_food(&mut self, position: Option<Vec3>) -> Entity {
        let position = position.unwrap_or_else(|| {
            let half = self.config.world.half_extent * 0.9;
            let mut rng = rand::thread_rng();
            Vec3::new(
                rng.gen_range(-half..=half),
                0.0,
                rng.gen_range(-half..=half),
            )
        });

        let food = self.world.spawn();
        self.world.add_component(food, IsFood);
        self.world.add_component(food, Position(position));
        self.world.add_component(food, Static);
        if let Some(index) = self.world.resource_mut::<FoodIndex>() {
            index.0.insert(food, [position.x, position.z], ());
        }
        food
    }

    /// Spawn a trail marker directly, stamped as zero steps from its goal.
    pub fn spawn_pheromone(&mut self, position: Vec3, kind: PheromoneKind) -> Entity {
        let marker = self.world.spawn();
        self.world.add_component(marker, Position(position));
        self.world.add_component(
            marker,
            Pheromone {
                intensity: self.config.pheromones.initial_intensity,
                kind,
                steps_from_goal: 0,
            },
        );
        self.world.add_component(marker, Static);
        if let Some(index) = self.world.resource_mut::<PheromoneIndex>() {
            index.0.insert(
                marker,
                [position.x, position.z],
                PheromoneStamp {
                    kind,
                    steps_from_goal: 0,
                },
            );
        }
        marker
    }

    /// Remove one ant. Food it was carrying is released where it lies and
    /// becomes discoverable again.
    pub fn remove_ant(&mut self) -> Option<Entity> {
        let ant = self.world.query().with::<IsAnt>().first()?;

        if let Some(food) = self.world.target::<Carrying>(ant) {
            self.world.unrelate_all::<Carrying>(ant);
            self.world.unrelate_all::<CarriedBy>(food);
            if let Some(pos) = self.world.get_component::<Position>(food).copied() {
                let ground = [pos.0.x, pos.0.z];
                if let Some(index) = self.world.resource_mut::<FoodIndex>() {
                    index.0.insert(food, ground, ());
                }
            }
        }

        self.world.despawn(ant);
        Some(ant)
    }

    /// Remove one free food item. Carried and delivered food is never
    /// taken out from under the colony.
    pub fn remove_food(&mut self) -> Option<Entity> {
        let food = self
            .world
            .query()
            .with::<IsFood>()
            .without::<InColony>()
            .not_related::<CarriedBy>()
            .first()?;

        if let Some(index) = self.world.resource_mut::<FoodIndex>() {
            index.0.remove(food);
        }
        self.world.despawn(food);
        Some(food)
    }

    // --- State access ---

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.world
            .resource::<Time>()
            .map(|t| t.elapsed_seconds)
            .unwrap_or(0.0)
    }

    pub fn ant_count(&self) -> usize {
        self.world.query().with::<IsAnt>().entities().len()
    }

    pub fn food_count(&self) -> usize {
        self.world.query().with::<IsFood>().entities().len()
    }

    pub fn pheromone_count(&self) -> usize {
        self.world.query().with::<Pheromone>().entities().len()
    }

    /// Total food delivered to the colony since the start.
    pub fn delivered(&self) -> u64 {
        self.world
            .resource::<ForagingStats>()
            .map(|s| s.delivered)
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let colony = self
            .world
            .query()
            .with::<IsColony>()
            .with::<Position>()
            .first()
            .and_then(|c| self.world.get_component::<Position>(c))
            .map(|p| p.0.to_array());

        let ants = self
            .world
            .query()
            .with::<IsAnt>()
            .with::<Position>()
            .entities()
            .into_iter()
            .filter_map(|ant| {
                let pos = self.world.get_component::<Position>(ant)?;
                let dir = self.world.get_component::<Direction>(ant)?;
                Some(AntView {
                    id: ant.id(),
                    position: pos.0.to_array(),
                    heading: dir.current.to_array(),
                    carrying: self.world.has_relation::<Carrying>(ant),
                })
            })
            .collect();

        let food = self
            .world
            .query()
            .with::<IsFood>()
            .with::<Position>()
            .entities()
            .into_iter()
            .filter_map(|item| {
                let pos = self.world.get_component::<Position>(item)?;
                let state = if self.world.has_component::<InColony>(item) {
                    FoodState::Delivered
                } else if self.world.has_relation::<CarriedBy>(item) {
                    FoodState::Carried
                } else {
                    FoodState::Free
                };
                Some(FoodView {
                    id: item.id(),
                    position: pos.0.to_array(),
                    state,
                })
            })
            .collect();

        let pheromones = self
            .world
            .query()
            .with::<Pheromone>()
            .with::<Position>()
            .entities()
            .into_iter()
            .filter_map(|marker| {
                let pos = self.world.get_component::<Position>(marker)?;
                let pheromone = self.world.get_component::<Pheromone>(marker)?;
                Some(PheromoneView {
                    id: marker.id(),
                    position: pos.0.to_array(),
                    kind: pheromone.kind,
                    intensity: pheromone.intensity,
                    steps_from_goal: pheromone.steps_from_goal,
                })
            })
            .collect();

        WorldSnapshot {
            tick: self.tick,
            elapsed_seconds: self.elapsed_seconds(),
            delivered: self.delivered(),
            colony,
            ants,
            food,
            pheromones,
        }
    }

    fn spawn_colony(&mut self, position: Vec3) -> Entity {
        let colony = self.world.spawn();
        self.world.add_component(colony, IsColony);
        self.world.add_component(colony, Position(position));
        self.world.add_component(colony, Static);
        colony
    }
}

/// The fixed pipeline. Foraging decisions run before steering so a pickup
/// or drop-off redirects the same tick; trail deposit and decay run after
/// integration so markers land on post-move positions.
fn build_schedule() -> Result<Schedule, ScheduleError> {
    let mut builder = Schedule::builder();
    builder.add(FindFood);
    builder.add(DropOffFood).after("find_food");
    builder.add(Wander).after("find_food");
    builder.add(SensePheromones).after("drop_off_food");
    builder.add(SteerToTarget).after("sense_pheromones");
    builder.add(TurnTowardDesired).after("steer_to_target");
    builder.add(SpeedRamp).after("turn_toward_desired");
    builder.add(Integrate).after("speed_ramp");
    builder.add(BoundaryTurnaround).after("integrate");
    builder.add(SyncCarriedFood).after("integrate");
    builder.add(DepositPheromones).after("integrate");
    builder.add(DecayPheromones).after("deposit_pheromones");
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> Config {
        Config {
            initial_state: formicary_config::InitialState { ants: 0, food: 0 },
            ..Default::default()
        }
    }

    #[test]
    fn schedule_order_satisfies_pipeline_constraints() {
        let schedule = build_schedule().unwrap();
        let order = schedule.order();
        let pos = |name: &str| order.iter().position(|n| *n == name).unwrap();

        assert_eq!(schedule.system_count(), 12);
        assert!(pos("find_food") < pos("drop_off_food"));
        assert!(pos("drop_off_food") < pos("sense_pheromones"));
        assert!(pos("sense_pheromones") < pos("steer_to_target"));
        assert!(pos("steer_to_target") < pos("turn_toward_desired"));
        assert!(pos("turn_toward_desired") < pos("speed_ramp"));
        assert!(pos("speed_ramp") < pos("integrate"));
        assert!(pos("integrate") < pos("boundary_turnaround"));
        assert!(pos("integrate") < pos("sync_carried_food"));
        assert!(pos("integrate") < pos("deposit_pheromones"));
        assert!(pos("deposit_pheromones") < pos("decay_pheromones"));
    }

    #[test]
    fn initial_population_matches_config() {
        let config = Config {
            initial_state: formicary_config::InitialState { ants: 7, food: 11 },
            ..Default::default()
        };
        let sim = Simulation::new(config).unwrap();

        assert_eq!(sim.ant_count(), 7);
        assert_eq!(sim.food_count(), 11);
        // Ants, food, and the colony.
        assert_eq!(sim.world().entity_count(), 19);
        assert_eq!(
            sim.world()
                .resource::<FoodIndex>()
                .map(|i| i.0.len())
                .unwrap(),
            11
        );
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = Config {
            framerate: 0,
            ..Default::default()
        };
        assert!(matches!(
            Simulation::new(config),
            Err(SimulationError::Config(_))
        ));
    }

    #[test]
    fn step_clamps_delta_and_accumulates_time() {
        let mut sim = Simulation::new(quiet_config()).unwrap();

        sim.step(0.1);
        sim.step(100.0);

        assert_eq!(sim.tick(), 2);
        // 0.1 plus the clamped 0.25 maximum.
        assert!((sim.elapsed_seconds() - 0.35).abs() < 1e-6);
    }

    #[test]
    fn remove_ant_releases_carried_food() {
        let mut sim = Simulation::new(quiet_config()).unwrap();
        let ant = sim.spawn_ant_at(Vec3::new(20.0, 0.0, 0.0));
        let food = sim.spawn_food(Some(Vec3::new(21.0, 0.0, 0.0)));

        sim.step(0.05);
        assert_eq!(sim.world().target::<Carrying>(ant), Some(food));
        assert!(!sim.world().resource::<FoodIndex>().unwrap().0.contains(food));

        sim.remove_ant();
        assert_eq!(sim.ant_count(), 0);
        assert!(sim.world().is_alive(food));
        assert!(sim.world().target::<CarriedBy>(food).is_none());
        assert!(sim.world().resource::<FoodIndex>().unwrap().0.contains(food));
    }

    #[test]
    fn remove_food_skips_carried_and_delivered_items() {
        let mut sim = Simulation::new(quiet_config()).unwrap();
        let ant = sim.spawn_ant_at(Vec3::new(30.0, 0.0, 0.0));
        let carried = sim.spawn_food(Some(Vec3::new(31.0, 0.0, 0.0)));
        sim.step(0.05);
        assert_eq!(sim.world().target::<Carrying>(ant), Some(carried));

        // The only food is in an ant's grip, so nothing is removable.
        assert!(sim.remove_food().is_none());

        let free = sim.spawn_food(Some(Vec3::new(-40.0, 0.0, -40.0)));
        assert_eq!(sim.remove_food(), Some(free));
        assert!(sim.world().is_alive(carried));
    }

    #[test]
    fn snapshot_reflects_world_state() {
        let mut sim = Simulation::new(quiet_config()).unwrap();
        sim.spawn_ant_at(Vec3::new(30.0, 0.0, 0.0));
        sim.spawn_food(Some(Vec3::new(-10.0, 0.0, 5.0)));
        sim.spawn_pheromone(Vec3::new(1.0, 0.0, 2.0), PheromoneKind::Home);

        let snap = sim.snapshot();
        assert_eq!(snap.ants.len(), 1);
        assert_eq!(snap.food.len(), 1);
        assert_eq!(snap.pheromones.len(), 1);
        assert_eq!(snap.food[0].state, snapshot::FoodState::Free);
        assert_eq!(snap.colony, Some([0.0, 0.0, 0.0]));
        assert_eq!(snap.delivered, 0);

        // Snapshots serialize for wire transport.
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"state\":\"free\""));
    }
}
