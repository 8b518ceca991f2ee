//! Core simulation engine: entity/component/relation store, query
//! filters, dependency-ordered scheduler and the spatial index.

pub mod component;
pub mod entity;
pub mod query;
pub mod relation;
pub mod schedule;
pub mod spatial;
pub mod world;

pub use component::Component;
pub use entity::Entity;
pub use query::QueryBuilder;
pub use relation::Relation;
pub use schedule::{Schedule, ScheduleBuilder, ScheduleError, System};
pub use spatial::{Rect, SpatialIndex};
pub use world::World;
