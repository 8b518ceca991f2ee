use std::any::TypeId;
use std::collections::HashMap;

use smallvec::SmallVec;

use crate::entity::Entity;

/// Marker trait for directed entity-to-entity relation types.
///
/// Exclusive relations hold at most one target per source entity; relating
/// to a new target replaces the previous edge.
pub trait Relation: 'static + Send + Sync {
    const EXCLUSIVE: bool;

    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}

/// Implements [`Relation`] for a struct.
#[macro_export]
macro_rules! impl_relation {
    ($relation:ty) => {
        impl $crate::relation::Relation for $relation {
            const EXCLUSIVE: bool = false;
        }
    };
    ($relation:ty, exclusive) => {
        impl $crate::relation::Relation for $relation {
            const EXCLUSIVE: bool = true;
        }
    };
}

type EdgeList = SmallVec<[Entity; 1]>;

/// Forward and reverse indices for one relation type. Existence checks are
/// O(1) map lookups rather than scans.
#[derive(Default)]
struct RelationTable {
    forward: HashMap<Entity, EdgeList>,
    reverse: HashMap<Entity, EdgeList>,
}

impl RelationTable {
    fn relate(&mut self, source: Entity, target: Entity, exclusive: bool) {
        if exclusive {
            self.unrelate_all(source);
        }

        let targets = self.forward.entry(source).or_default();
        if targets.contains(&target) {
            return;
        }
        targets.push(target);
        self.reverse.entry(target).or_default().push(source);
    }

    fn unrelate(&mut self, source: Entity, target: Entity) {
        if let Some(targets) = self.forward.get_mut(&source) {
            targets.retain(|t| *t != target);
            if targets.is_empty() {
                self.forward.remove(&source);
            }
        }
        if let Some(sources) = self.reverse.get_mut(&target) {
            sources.retain(|s| *s != source);
            if sources.is_empty() {
                self.reverse.remove(&target);
            }
        }
    }

    fn unrelate_all(&mut self, source: Entity) {
        if let Some(targets) = self.forward.remove(&source) {
            for target in targets {
                if let Some(sources) = self.reverse.get_mut(&target) {
                    sources.retain(|s| *s != source);
                    if sources.is_empty() {
                        self.reverse.remove(&target);
                    }
                }
            }
        }
    }

    /// Drops every edge in which the entity appears, as source or target.
    fn clear_entity(&mut self, entity: Entity) {
        self.unrelate_all(entity);
        if let Some(sources) = self.reverse.remove(&entity) {
            for source in sources {
                if let Some(targets) = self.forward.get_mut(&source) {
                    targets.retain(|t| *t != entity);
                    if targets.is_empty() {
                        self.forward.remove(&source);
                    }
                }
            }
        }
    }
}

/// All relation tables, keyed by relation type.
#[derive(Default)]
pub struct RelationStore {
    tables: HashMap<TypeId, RelationTable>,
}

impl RelationStore {
    fn table<R: Relation>(&self) -> Option<&RelationTable> {
        self.tables.get(&TypeId::of::<R>())
    }

    fn table_mut<R: Relation>(&mut self) -> &mut RelationTable {
        self.tables.entry(TypeId::of::<R>()).or_default()
    }

    pub fn relate<R: Relation>(&mut self, source: Entity, target: Entity) {
        self.table_mut::<R>().relate(source, target, R::EXCLUSIVE);
    }

    pub fn unrelate<R: Relation>(&mut self, source: Entity, target: Entity) {
        self.table_mut::<R>().unrelate(source, target);
    }

    pub fn unrelate_all<R: Relation>(&mut self, source: Entity) {
        self.table_mut::<R>().unrelate_all(source);
    }

    /// The first (for exclusive relations: the only) target of the source.
    pub fn target<R: Relation>(&self, source: Entity) -> Option<Entity> {
        self.table::<R>()
            .and_then(|table| table.forward.get(&source))
            .and_then(|targets| targets.first().copied())
    }

    pub fn targets<R: Relation>(&self, source: Entity) -> Vec<Entity> {
        self.table::<R>()
            .and_then(|table| table.forward.get(&source))
            .map(|targets| targets.to_vec())
            .unwrap_or_default()
    }

    /// All entities holding this relation to the given target.
    pub fn sources<R: Relation>(&self, target: Entity) -> Vec<Entity> {
        self.table::<R>()
            .and_then(|table| table.reverse.get(&target))
            .map(|sources| sources.to_vec())
            .unwrap_or_default()
    }

    /// Wildcard check: does the source hold this relation to any target?
    pub fn has<R: Relation>(&self, source: Entity) -> bool {
        self.table::<R>()
            .map(|table| table.forward.contains_key(&source))
            .unwrap_or(false)
    }

    pub fn is_related<R: Relation>(&self, source: Entity, target: Entity) -> bool {
        self.table::<R>()
            .and_then(|table| table.forward.get(&source))
            .map(|targets| targets.contains(&target))
            .unwrap_or(false)
    }

    /// Type-erased variants used by query filters.
    pub(crate) fn has_by_type_id(&self, type_id: TypeId, source: Entity) -> bool {
        self.tables
            .get(&type_id)
            .map(|table| table.forward.contains_key(&source))
            .unwrap_or(false)
    }

    pub(crate) fn is_related_by_type_id(
        &self,
        type_id: TypeId,
        source: Entity,
        target: Entity,
    ) -> bool {
        self.tables
            .get(&type_id)
            .and_then(|table| table.forward.get(&source))
            .map(|targets| targets.contains(&target))
            .unwrap_or(false)
    }

    /// Removes the entity from every table, both directions.
    pub fn clear_entity(&mut self, entity: Entity) {
        for table in self.tables.values_mut() {
            table.clear_entity(entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Follows;
    impl_relation!(Follows);

    struct Holds;
    impl_relation!(Holds, exclusive);

    fn entity(id: u64) -> Entity {
        Entity::new(id, 0)
    }

    #[test]
    fn exclusive_relation_replaces_target() {
        let mut store = RelationStore::default();
        let (a, b, c) = (entity(0), entity(1), entity(2));

        store.relate::<Holds>(a, b);
        store.relate::<Holds>(a, c);

        assert_eq!(store.target::<Holds>(a), Some(c));
        assert_eq!(store.targets::<Holds>(a).len(), 1);
        assert!(store.sources::<Holds>(b).is_empty());
        assert_eq!(store.sources::<Holds>(c), vec![a]);
    }

    #[test]
    fn non_exclusive_relation_accumulates() {
        let mut store = RelationStore::default();
        let (a, b, c) = (entity(0), entity(1), entity(2));

        store.relate::<Follows>(a, b);
        store.relate::<Follows>(a, c);

        assert_eq!(store.targets::<Follows>(a), vec![b, c]);
        assert!(store.has::<Follows>(a));
        assert!(!store.has::<Follows>(b));
    }

    #[test]
    fn clear_entity_removes_both_directions() {
        let mut store = RelationStore::default();
        let (a, b, c) = (entity(0), entity(1), entity(2));

        store.relate::<Follows>(a, b);
        store.relate::<Follows>(c, a);
        store.clear_entity(a);

        assert!(!store.has::<Follows>(a));
        assert!(!store.has::<Follows>(c));
        assert!(store.sources::<Follows>(b).is_empty());
    }

    #[test]
    fn unrelate_removes_single_edge() {
        let mut store = RelationStore::default();
        let (a, b, c) = (entity(0), entity(1), entity(2));

        store.relate::<Follows>(a, b);
        store.relate::<Follows>(a, c);
        store.unrelate::<Follows>(a, b);

        assert_eq!(store.targets::<Follows>(a), vec![c]);
        assert!(store.sources::<Follows>(b).is_empty());
    }
}
