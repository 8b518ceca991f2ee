//! Behavior systems, one unit struct per schedule node.

mod boundary;
mod foraging;
mod movement;
mod pheromones;

pub use boundary::BoundaryTurnaround;
pub use foraging::{DropOffFood, FindFood, SyncCarriedFood};
pub use movement::{Integrate, SpeedRamp, SteerToTarget, TurnTowardDesired, Wander};
pub use pheromones::{DecayPheromones, DepositPheromones, SensePheromones};
