use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::component::{Component, ComponentStorage};
use crate::entity::Entity;
use crate::query::QueryBuilder;
use crate::relation::{Relation, RelationStore};

/// World stores entities, their components and relations, plus global
/// resources. Systems receive `&mut World` and mutate it in place.
///
/// Entity ids index directly into the per-slot generation list. A freed
/// id goes onto a stack and is handed out again with a bumped generation,
/// so the most recently despawned slot is reused first and every old
/// handle to it stops validating.
#[derive(Default)]
pub struct World {
    generations: Vec<u64>,
    free_ids: Vec<u64>,
    live: HashMap<u64, Entity>,
    components: ComponentStorage,
    relations: RelationStore,
    resources: HashMap<TypeId, Box<dyn Any>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a new empty entity and return its handle.
    pub fn spawn(&mut self) -> Entity {
        let id = match self.free_ids.pop() {
            Some(id) => {
                self.generations[id as usize] += 1;
                id
            }
            None => {
                self.generations.push(0);
                self.generations.len() as u64 - 1
            }
        };
        let entity = Entity::new(id, self.generations[id as usize]);
        self.live.insert(id, entity);
        entity
    }

    /// Destroy an entity: strips all components, drops every relation edge
    /// it participates in, and invalidates its handle. Safe to call twice.
    pub fn despawn(&mut self, entity: Entity) {
        if !self.is_alive(entity) {
            return;
        }
        self.components.strip(entity);
        self.relations.clear_entity(entity);
        self.live.remove(&entity.id());
        self.free_ids.push(entity.id());
    }

    /// A handle is live when it matches the current occupant of its slot,
    /// generation included.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.live.get(&entity.id()) == Some(&entity)
    }

    pub fn entity_count(&self) -> usize {
        self.live.len()
    }

    pub(crate) fn live_entity(&self, id: u64) -> Option<Entity> {
        self.live.get(&id).copied()
    }

    pub(crate) fn query_all_live_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.live.keys().copied()
    }

    // --- Components ---

    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) {
        if !self.is_alive(entity) {
            return;
        }
        self.components.add(entity, component);
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.components.get(entity)
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.components.get_mut(entity)
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.components.remove(entity)
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.is_alive(entity) && self.components.has::<T>(entity)
    }

    pub(crate) fn components(&self) -> &ComponentStorage {
        &self.components
    }

    // --- Relations ---

    pub fn relate<R: Relation>(&mut self, source: Entity, target: Entity) {
        if !self.is_alive(source) || !self.is_alive(target) {
            return;
        }
        self.relations.relate::<R>(source, target);
    }

    pub fn unrelate<R: Relation>(&mut self, source: Entity, target: Entity) {
        self.relations.unrelate::<R>(source, target);
    }

    pub fn unrelate_all<R: Relation>(&mut self, source: Entity) {
        self.relations.unrelate_all::<R>(source);
    }

    /// The target of an exclusive relation, or the first target otherwise.
    /// A despawned source or a relation that was never set yields `None`,
    /// never an error.
    pub fn target<R: Relation>(&self, source: Entity) -> Option<Entity> {
        self.relations.target::<R>(source)
    }

    pub fn targets<R: Relation>(&self, source: Entity) -> Vec<Entity> {
        self.relations.targets::<R>(source)
    }

    pub fn sources<R: Relation>(&self, target: Entity) -> Vec<Entity> {
        self.relations.sources::<R>(target)
    }

    pub fn has_relation<R: Relation>(&self, source: Entity) -> bool {
        self.relations.has::<R>(source)
    }

    pub fn is_related<R: Relation>(&self, source: Entity, target: Entity) -> bool {
        self.relations.is_related::<R>(source, target)
    }

    pub(crate) fn relations(&self) -> &RelationStore {
        &self.relations
    }

    // --- Queries ---

    /// Begin a query over entities by component presence and relations.
    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    // --- Resources ---

    pub fn insert_resource<T: 'static>(&mut self, resource: T) {
        self.resources.insert(TypeId::of::<T>(), Box::new(resource));
    }

    pub fn resource<T: 'static>(&self) -> Option<&T> {
        self.resources
            .get(&TypeId::of::<T>())
            .and_then(|res| res.downcast_ref::<T>())
    }

    pub fn resource_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.resources
            .get_mut(&TypeId::of::<T>())
            .and_then(|res| res.downcast_mut::<T>())
    }

    /// Take a resource out of the world, typically so a system can mutate
    /// it alongside components, then re-insert it when done.
    pub fn remove_resource<T: 'static>(&mut self) -> Option<T> {
        self.resources
            .remove(&TypeId::of::<T>())
            .and_then(|res| res.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{impl_component, impl_relation};

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Pos {
        x: f32,
        y: f32,
    }
    impl_component!(Pos);

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Health(i32);
    impl_component!(Health);

    struct Marker;
    impl_component!(Marker);

    struct Targeting;
    impl_relation!(Targeting, exclusive);

    struct Carrying;
    impl_relation!(Carrying, exclusive);

    #[test]
    fn add_get_and_mutate_components() {
        let mut world = World::new();
        let e1 = world.spawn();
        world.add_component(e1, Pos { x: 0.0, y: 0.0 });
        let e2 = world.spawn();
        world.add_component(e2, Pos { x: 10.0, y: 5.0 });
        world.add_component(e2, Health(100));

        assert_eq!(world.get_component::<Pos>(e1).unwrap().x, 0.0);
        assert_eq!(world.get_component::<Pos>(e2).unwrap().x, 10.0);

        if let Some(health) = world.get_component_mut::<Health>(e2) {
            health.0 -= 30;
        }
        assert_eq!(world.get_component::<Health>(e2).unwrap().0, 70);
    }

    #[test]
    fn despawn_strips_components_and_relations() {
        let mut world = World::new();
        let ant = world.spawn();
        let food = world.spawn();
        world.add_component(food, Pos { x: 1.0, y: 1.0 });
        world.relate::<Carrying>(ant, food);

        world.despawn(food);

        assert!(!world.is_alive(food));
        assert!(world.get_component::<Pos>(food).is_none());
        assert!(world.target::<Carrying>(ant).is_none());
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn stale_handles_stop_validating_on_reuse() {
        let mut world = World::new();
        let a = world.spawn();
        let b = world.spawn();
        assert_ne!(a, b);

        world.despawn(a);
        assert!(!world.is_alive(a));
        // Double despawn is a no-op.
        world.despawn(a);
        assert_eq!(world.entity_count(), 1);

        // The freed slot is reused with a newer generation; only the fresh
        // handle validates.
        let c = world.spawn();
        assert_eq!(c.id(), a.id());
        assert!(c.generation() > a.generation());
        assert!(!world.is_alive(a));
        assert!(world.is_alive(c));
        assert_eq!(world.entity_count(), 2);
    }

    #[test]
    fn recycled_entity_starts_clean() {
        let mut world = World::new();
        let old = world.spawn();
        world.add_component(old, Health(50));
        world.despawn(old);

        let fresh = world.spawn();
        assert_eq!(fresh.id(), old.id());
        assert!(world.get_component::<Health>(fresh).is_none());
        assert!(world.get_component::<Health>(old).is_none());
    }

    #[test]
    fn query_filters_by_presence_and_absence() {
        let mut world = World::new();
        let a = world.spawn();
        world.add_component(a, Pos { x: 0.0, y: 0.0 });
        world.add_component(a, Marker);
        let b = world.spawn();
        world.add_component(b, Pos { x: 1.0, y: 0.0 });

        let both: Vec<_> = world.query().with::<Pos>().with::<Marker>().entities();
        assert_eq!(both, vec![a]);

        let unmarked: Vec<_> = world.query().with::<Pos>().without::<Marker>().entities();
        assert_eq!(unmarked, vec![b]);
    }

    #[test]
    fn query_relation_wildcards() {
        let mut world = World::new();
        let ant = world.spawn();
        world.add_component(ant, Marker);
        let idle = world.spawn();
        world.add_component(idle, Marker);
        let food = world.spawn();

        world.relate::<Targeting>(ant, food);

        let targeting: Vec<_> = world
            .query()
            .with::<Marker>()
            .related::<Targeting>()
            .entities();
        assert_eq!(targeting, vec![ant]);

        let idlers: Vec<_> = world
            .query()
            .with::<Marker>()
            .not_related::<Targeting>()
            .entities();
        assert_eq!(idlers, vec![idle]);

        let at_food: Vec<_> = world
            .query()
            .with::<Marker>()
            .related_to::<Targeting>(food)
            .entities();
        assert_eq!(at_food, vec![ant]);
    }

    #[test]
    fn first_returns_singleton() {
        let mut world = World::new();
        assert!(world.query().with::<Marker>().first().is_none());

        let colony = world.spawn();
        world.add_component(colony, Marker);
        assert_eq!(world.query().with::<Marker>().first(), Some(colony));
    }

    #[test]
    fn relating_to_dead_entity_is_a_noop() {
        let mut world = World::new();
        let ant = world.spawn();
        let food = world.spawn();
        world.despawn(food);

        world.relate::<Carrying>(ant, food);
        assert!(world.target::<Carrying>(ant).is_none());
    }
}
