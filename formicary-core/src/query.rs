use std::any::TypeId;

use crate::component::Component;
use crate::entity::Entity;
use crate::relation::Relation;
use crate::world::World;

enum Filter {
    HasComponent(TypeId),
    LacksComponent(TypeId),
    HasRelation(TypeId),
    LacksRelation(TypeId),
    RelatedTo(TypeId, Entity),
}

impl Filter {
    fn matches(&self, world: &World, entity: Entity) -> bool {
        match self {
            Filter::HasComponent(id) => world.components().has_by_type_id(*id, entity),
            Filter::LacksComponent(id) => !world.components().has_by_type_id(*id, entity),
            Filter::HasRelation(id) => world.relations().has_by_type_id(*id, entity),
            Filter::LacksRelation(id) => !world.relations().has_by_type_id(*id, entity),
            Filter::RelatedTo(id, target) => {
                world.relations().is_related_by_type_id(*id, entity, *target)
            }
        }
    }
}

/// Builds a query over entities by component presence, component absence
/// and relation predicates.
///
/// The first `with` clause seeds iteration from that component's storage;
/// every further clause narrows the candidate set. Matching entities are
/// collected up front, so systems may freely mutate *other* component sets
/// while walking the result. Mutating the sets matched by the active query
/// is the caller's responsibility to avoid.
pub struct QueryBuilder<'w> {
    world: &'w World,
    seed: Option<Vec<Entity>>,
    filters: Vec<Filter>,
}

impl<'w> QueryBuilder<'w> {
    pub(crate) fn new(world: &'w World) -> Self {
        Self {
            world,
            seed: None,
            filters: Vec::new(),
        }
    }

    /// Require the component `T` to be present.
    pub fn with<T: Component>(mut self) -> Self {
        if self.seed.is_none() {
            let world = self.world;
            self.seed = Some(
                world
                    .components()
                    .ids_by_type_id(TypeId::of::<T>())
                    .into_iter()
                    .filter_map(|id| world.live_entity(id))
                    .collect(),
            );
        } else {
            self.filters.push(Filter::HasComponent(TypeId::of::<T>()));
        }
        self
    }

    /// Require the component `T` to be absent.
    pub fn without<T: Component>(mut self) -> Self {
        self.filters.push(Filter::LacksComponent(TypeId::of::<T>()));
        self
    }

    /// Wildcard: require the relation `R` to point at any target.
    pub fn related<R: Relation>(mut self) -> Self {
        self.filters.push(Filter::HasRelation(TypeId::of::<R>()));
        self
    }

    /// Negated wildcard: require the relation `R` to point at no target.
    pub fn not_related<R: Relation>(mut self) -> Self {
        self.filters.push(Filter::LacksRelation(TypeId::of::<R>()));
        self
    }

    /// Require the relation `R` to point at this specific entity. A target
    /// that no longer exists simply matches nothing.
    pub fn related_to<R: Relation>(mut self, target: Entity) -> Self {
        self.filters
            .push(Filter::RelatedTo(TypeId::of::<R>(), target));
        self
    }

    /// Collect all matching entities, in ascending id order (stable within
    /// a tick).
    pub fn entities(self) -> Vec<Entity> {
        let world = self.world;
        let candidates = match self.seed {
            Some(seed) => seed,
            // No `with` clause: fall back to every live entity.
            None => {
                let mut all: Vec<Entity> =
                    world.query_all_live_ids().filter_map(|id| world.live_entity(id)).collect();
                all.sort();
                all
            }
        };

        candidates
            .into_iter()
            .filter(|entity| self.filters.iter().all(|f| f.matches(world, *entity)))
            .collect()
    }

    /// First matching entity, for singleton-like lookups.
    pub fn first(self) -> Option<Entity> {
        let world = self.world;
        let candidates = match self.seed {
            Some(seed) => seed,
            None => {
                let mut all: Vec<Entity> =
                    world.query_all_live_ids().filter_map(|id| world.live_entity(id)).collect();
                all.sort();
                all
            }
        };

        candidates
            .into_iter()
            .find(|entity| self.filters.iter().all(|f| f.matches(world, *entity)))
    }
}
