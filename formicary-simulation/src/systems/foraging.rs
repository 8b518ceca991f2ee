//! Food discovery, pickup, carry and drop-off behavior.

use glam::Vec3;
use ordered_float::OrderedFloat;

use formicary_core::{Entity, System, World};

use crate::components::{
    Direction, InColony, IsAnt, IsColony, IsFood, Move, PheromoneKind, PheromoneSpawner,
    Position, Sensors, Static,
};
use crate::math::ground_distance;
use crate::relations::{CarriedBy, Carrying, Targeting};
use crate::resources::{FoodIndex, ForagingStats, SimulationConfigResource};

/// Vertical lift applied to carried food so it rides above the ant.
const CARRY_LIFT: f32 = 0.5;

fn ground_distance_to(pos: &Position, point: [f32; 2]) -> f32 {
    let dx = pos.0.x - point[0];
    let dz = pos.0.z - point[1];
    (dx * dx + dz * dz).sqrt()
}

/// Applies every pickup side effect in one place: possession relations,
/// sensing flip, trail restart, speed restart, and synchronous removal
/// from the food index.
fn pick_up(
    world: &mut World,
    food_index: &mut FoodIndex,
    ant: Entity,
    food: Entity,
    restart_speed: f32,
) {
    world.relate::<Carrying>(ant, food);
    world.relate::<CarriedBy>(food, ant);
    world.unrelate_all::<Targeting>(ant);
    food_index.0.remove(food);

    if let Some(dir) = world.get_component_mut::<Direction>(ant) {
        dir.desired = -dir.current;
    }
    if let Some(sensors) = world.get_component_mut::<Sensors>(ant) {
        sensors.looking_for = PheromoneKind::Home;
    }
    if let Some(spawner) = world.get_component_mut::<PheromoneSpawner>(ant) {
        spawner.step_count = 0;
    }
    if let Some(movement) = world.get_component_mut::<Move>(ant) {
        movement.current_speed = restart_speed.min(movement.max_speed);
    }

    log::debug!("ant {} picked up food {}", ant.id(), food.id());
}

/// For each ant not carrying food: prune stale food claims, pick up food
/// within pickup range (first match wins), otherwise target the closest
/// detected food that no other ant has claimed.
pub struct FindFood;

impl System for FindFood {
    fn name(&self) -> &'static str {
        "find_food"
    }

    fn run(&mut self, world: &mut World) {
        let Some(cfg) = world
            .resource::<SimulationConfigResource>()
            .map(|c| c.0.clone())
        else {
            return;
        };
        let Some(mut food_index) = world.remove_resource::<FoodIndex>() else {
            return;
        };

        let ants = world
            .query()
            .with::<Position>()
            .with::<IsAnt>()
            .not_related::<Carrying>()
            .entities();

        'ants: for ant in ants {
            let Some(pos) = world.get_component::<Position>(ant).copied() else {
                continue;
            };

            // A claim on food some other ant now holds is stale; drop it so
            // the ant re-evaluates instead of converging on claimed food.
            if let Some(target) = world.target::<Targeting>(ant) {
                if !world.is_alive(target) {
                    world.unrelate_all::<Targeting>(ant);
                } else if let Some(carrier) = world.target::<CarriedBy>(target) {
                    if carrier != ant {
                        world.unrelate_all::<Targeting>(ant);
                    }
                }
            }

            let mut hits = food_index
                .0
                .query(pos.ground(), cfg.foraging.detection_range)
                .into_iter()
                .map(|(food, point, _)| (food, point))
                .collect::<Vec<_>>();

            // Anything already within pickup range is taken immediately,
            // first match wins; scanning stops for this ant.
            for (food, point) in &hits {
                if ground_distance_to(&pos, *point) < cfg.foraging.pickup_range {
                    let food = *food;
                    pick_up(
                        world,
                        &mut food_index,
                        ant,
                        food,
                        cfg.movement.restart_speed,
                    );
                    continue 'ants;
                }
            }

            // Otherwise walk toward the closest detected food, skipping
            // items another ant already claimed.
            hits.sort_by_key(|(_, point)| OrderedFloat(ground_distance_to(&pos, *point)));
            for (food, _) in hits {
                let claimed = world
                    .sources::<Targeting>(food)
                    .iter()
                    .any(|source| *source != ant);
                if !claimed {
                    world.relate::<Targeting>(ant, food);
                    break;
                }
            }
        }

        world.insert_resource(food_index);
    }
}

/// Carrying ants lock onto the colony once within detection range and
/// deliver once within drop-off range. Delivered food is retained and
/// tagged [`InColony`], which feeds the total-foraged counter.
pub struct DropOffFood;

impl System for DropOffFood {
    fn name(&self) -> &'static str {
        "drop_off_food"
    }

    fn run(&mut self, world: &mut World) {
        let Some(cfg) = world
            .resource::<SimulationConfigResource>()
            .map(|c| c.0.clone())
        else {
            return;
        };
        let Some(colony) = world.query().with::<Position>().with::<IsColony>().first() else {
            return;
        };
        let Some(colony_pos) = world.get_component::<Position>(colony).copied() else {
            return;
        };

        let carriers = world
            .query()
            .with::<Position>()
            .with::<IsAnt>()
            .related::<Carrying>()
            .entities();

        for ant in carriers {
            let Some(pos) = world.get_component::<Position>(ant).copied() else {
                continue;
            };
            let distance = ground_distance(pos.0, colony_pos.0);

            if distance < cfg.foraging.colony_detection_range {
                world.relate::<Targeting>(ant, colony);
            }

            if distance < cfg.foraging.drop_off_range {
                let Some(food) = world.target::<Carrying>(ant) else {
                    continue;
                };

                world.unrelate_all::<Carrying>(ant);
                world.unrelate_all::<CarriedBy>(food);
                world.unrelate_all::<Targeting>(ant);
                world.add_component(food, InColony);
                world.add_component(food, Static);

                if let Some(dir) = world.get_component_mut::<Direction>(ant) {
                    dir.desired = -dir.current;
                }
                if let Some(sensors) = world.get_component_mut::<Sensors>(ant) {
                    sensors.looking_for = PheromoneKind::Food;
                }
                if let Some(spawner) = world.get_component_mut::<PheromoneSpawner>(ant) {
                    spawner.step_count = 0;
                }
                if let Some(movement) = world.get_component_mut::<Move>(ant) {
                    movement.current_speed = cfg.movement.restart_speed.min(movement.max_speed);
                }
                if let Some(stats) = world.resource_mut::<ForagingStats>() {
                    stats.delivered += 1;
                }

                log::debug!("ant {} delivered food {}", ant.id(), food.id());
            }
        }
    }
}

/// Keeps carried food riding on its carrier.
pub struct SyncCarriedFood;

impl System for SyncCarriedFood {
    fn name(&self) -> &'static str {
        "sync_carried_food"
    }

    fn run(&mut self, world: &mut World) {
        let carried = world
            .query()
            .with::<Position>()
            .with::<IsFood>()
            .related::<CarriedBy>()
            .entities();

        for food in carried {
            let Some(ant) = world.target::<CarriedBy>(food) else {
                continue;
            };
            let Some(ant_pos) = world.get_component::<Position>(ant).copied() else {
                continue;
            };
            if let Some(pos) = world.get_component_mut::<Position>(food) {
                pos.0 = ant_pos.0 + Vec3::new(0.0, CARRY_LIFT, 0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::RandomDirection;
    use crate::resources::PheromoneIndex;
    use formicary_config::Config;

    fn test_world() -> World {
        let mut world = World::new();
        world.insert_resource(SimulationConfigResource(Config::default()));
        world.insert_resource(FoodIndex::default());
        world.insert_resource(PheromoneIndex::default());
        world.insert_resource(ForagingStats::default());
        world
    }

    fn spawn_ant(world: &mut World, position: Vec3) -> Entity {
        let ant = world.spawn();
        world.add_component(ant, IsAnt);
        world.add_component(ant, Position(position));
        world.add_component(ant, Direction::facing(Vec3::Z));
        world.add_component(
            ant,
            Move {
                max_speed: 4.0,
                current_speed: 4.0,
            },
        );
        world.add_component(
            ant,
            Sensors {
                front_offset: Vec3::new(0.0, 0.0, 2.0),
                left_offset: Vec3::new(-1.5, 0.0, 1.5),
                right_offset: Vec3::new(1.5, 0.0, 1.5),
                radius: 1.0,
                looking_for: PheromoneKind::Food,
            },
        );
        world.add_component(ant, PheromoneSpawner::default());
        world.add_component(
            ant,
            RandomDirection {
                direction: Vec3::Z,
                time_since_update: 0.0,
            },
        );
        ant
    }

    fn spawn_food(world: &mut World, position: Vec3) -> Entity {
        let food = world.spawn();
        world.add_component(food, IsFood);
        world.add_component(food, Position(position));
        let mut index = world.remove_resource::<FoodIndex>().unwrap();
        index.0.insert(food, [position.x, position.z], ());
        world.insert_resource(index);
        food
    }

    fn spawn_colony(world: &mut World, position: Vec3) -> Entity {
        let colony = world.spawn();
        world.add_component(colony, IsColony);
        world.add_component(colony, Position(position));
        world.add_component(colony, Static);
        colony
    }

    #[test]
    fn food_in_pickup_range_is_taken_immediately() {
        let mut world = test_world();
        let ant = spawn_ant(&mut world, Vec3::ZERO);
        let food = spawn_food(&mut world, Vec3::new(2.0, 0.0, 0.0));

        FindFood.run(&mut world);

        assert_eq!(world.target::<Carrying>(ant), Some(food));
        assert_eq!(world.target::<CarriedBy>(food), Some(ant));
        assert!(world.target::<Targeting>(ant).is_none());
        assert_eq!(
            world.get_component::<Sensors>(ant).unwrap().looking_for,
            PheromoneKind::Home
        );
        assert_eq!(
            world
                .get_component::<PheromoneSpawner>(ant)
                .unwrap()
                .step_count,
            0
        );
        // Speed ramp restarts low after the stop.
        assert_eq!(world.get_component::<Move>(ant).unwrap().current_speed, 1.0);
        // Heading flips 180 degrees.
        let dir = world.get_component::<Direction>(ant).unwrap();
        assert!((dir.desired + Vec3::Z).length() < 1e-5);
        // The food leaves the index in the same logical step.
        assert!(!world.resource::<FoodIndex>().unwrap().0.contains(food));
    }

    #[test]
    fn claimed_food_cannot_be_picked_up_twice() {
        let mut world = test_world();
        let first = spawn_ant(&mut world, Vec3::ZERO);
        let second = spawn_ant(&mut world, Vec3::new(4.0, 0.0, 0.0));
        let food = spawn_food(&mut world, Vec3::new(2.0, 0.0, 0.0));

        FindFood.run(&mut world);

        assert_eq!(world.target::<Carrying>(first), Some(food));
        assert!(world.target::<Carrying>(second).is_none());
        assert_eq!(world.target::<CarriedBy>(food), Some(first));

        // The second ant must not acquire it on a later tick either.
        FindFood.run(&mut world);
        assert!(world.target::<Carrying>(second).is_none());
    }

    #[test]
    fn distant_food_becomes_a_target_unless_claimed() {
        let mut world = test_world();
        let ant = spawn_ant(&mut world, Vec3::ZERO);
        let rival = spawn_ant(&mut world, Vec3::new(0.0, 0.0, 16.0));
        let food = spawn_food(&mut world, Vec3::new(0.0, 0.0, 8.0));

        FindFood.run(&mut world);

        // The closer ant claims it; the rival is out of detection range.
        assert_eq!(world.target::<Targeting>(ant), Some(food));
        assert!(world.target::<Targeting>(rival).is_none());

        // Move the rival into range: the food is claimed, so no pile-up.
        world.get_component_mut::<Position>(rival).unwrap().0 = Vec3::new(0.0, 0.0, 13.0);
        FindFood.run(&mut world);
        assert!(world.target::<Targeting>(rival).is_none());
    }

    #[test]
    fn stale_claim_on_carried_food_is_dropped() {
        let mut world = test_world();
        let carrier = spawn_ant(&mut world, Vec3::ZERO);
        let latecomer = spawn_ant(&mut world, Vec3::new(50.0, 0.0, 50.0));
        let food = spawn_food(&mut world, Vec3::new(2.0, 0.0, 0.0));

        world.relate::<Targeting>(latecomer, food);
        FindFood.run(&mut world);

        assert_eq!(world.target::<Carrying>(carrier), Some(food));
        assert!(world.target::<Targeting>(latecomer).is_none());
    }

    #[test]
    fn drop_off_delivers_and_resets_state() {
        let mut world = test_world();
        let colony = spawn_colony(&mut world, Vec3::ZERO);
        let ant = spawn_ant(&mut world, Vec3::new(20.0, 0.0, 0.0));
        let food = spawn_food(&mut world, Vec3::new(21.0, 0.0, 0.0));

        FindFood.run(&mut world);
        assert_eq!(world.target::<Carrying>(ant), Some(food));

        // Inside colony detection range: acquires the colony target.
        world.get_component_mut::<Position>(ant).unwrap().0 = Vec3::new(10.0, 0.0, 0.0);
        DropOffFood.run(&mut world);
        assert_eq!(world.target::<Targeting>(ant), Some(colony));
        assert!(world.target::<Carrying>(ant).is_some());

        // Inside drop-off range: delivers.
        world.get_component_mut::<Position>(ant).unwrap().0 = Vec3::new(3.0, 0.0, 0.0);
        DropOffFood.run(&mut world);

        assert!(world.target::<Carrying>(ant).is_none());
        assert!(world.target::<CarriedBy>(food).is_none());
        assert!(world.target::<Targeting>(ant).is_none());
        assert!(world.has_component::<InColony>(food));
        assert!(world.is_alive(food));
        assert_eq!(
            world.get_component::<Sensors>(ant).unwrap().looking_for,
            PheromoneKind::Food
        );
        assert_eq!(world.resource::<ForagingStats>().unwrap().delivered, 1);
    }

    #[test]
    fn carried_food_tracks_its_carrier() {
        let mut world = test_world();
        let ant = spawn_ant(&mut world, Vec3::ZERO);
        let food = spawn_food(&mut world, Vec3::new(2.0, 0.0, 0.0));

        FindFood.run(&mut world);
        world.get_component_mut::<Position>(ant).unwrap().0 = Vec3::new(7.0, 0.0, -3.0);
        SyncCarriedFood.run(&mut world);

        let pos = world.get_component::<Position>(food).unwrap().0;
        assert!((pos - Vec3::new(7.0, CARRY_LIFT, -3.0)).length() < 1e-5);
    }
}
