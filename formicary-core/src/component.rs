use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::entity::Entity;

/// Marker trait for component types. Components are pure data with no
/// behavior; one optional instance per entity.
pub trait Component: 'static + Send + Sync {
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}

/// Implements [`Component`] for a struct.
#[macro_export]
macro_rules! impl_component {
    ($component:ty) => {
        impl $crate::component::Component for $component {}
    };
    ($($component:ty),+ $(,)?) => {
        $($crate::impl_component!($component);)+
    };
}

/// Dense per-type storage indexed by entity id.
pub struct ComponentVec<T: Component> {
    data: Vec<Option<T>>,
}

impl<T: Component> Default for ComponentVec<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

impl<T: Component> ComponentVec<T> {
    pub fn insert(&mut self, entity: Entity, component: T) {
        let idx = entity.index();
        if idx >= self.data.len() {
            self.data.resize_with(idx + 1, || None);
        }
        self.data[idx] = Some(component);
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.data.get(entity.index()).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.data
            .get_mut(entity.index())
            .and_then(|slot| slot.as_mut())
    }

    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        self.data
            .get_mut(entity.index())
            .and_then(|slot| slot.take())
    }

    /// Iterates over all entity indices that hold this component, in
    /// ascending id order.
    pub fn indices(&self) -> impl Iterator<Item = u64> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|_| idx as u64))
    }
}

/// Type-erased view over a [`ComponentVec`], so that despawning an entity
/// can strip every component without knowing the concrete types.
trait AnyComponentVec: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn remove_entity(&mut self, entity: Entity);
    fn contains(&self, entity: Entity) -> bool;
    fn entity_ids(&self) -> Vec<u64>;
}

impl<T: Component> AnyComponentVec for ComponentVec<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove_entity(&mut self, entity: Entity) {
        self.remove(entity);
    }

    fn contains(&self, entity: Entity) -> bool {
        self.get(entity).is_some()
    }

    fn entity_ids(&self) -> Vec<u64> {
        self.indices().collect()
    }
}

/// Container mapping component types to their storage.
#[derive(Default)]
pub struct ComponentStorage {
    storages: HashMap<TypeId, Box<dyn AnyComponentVec>>,
}

impl ComponentStorage {
    fn storage<T: Component>(&self) -> Option<&ComponentVec<T>> {
        self.storages
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.as_any().downcast_ref::<ComponentVec<T>>())
    }

    fn storage_mut<T: Component>(&mut self) -> &mut ComponentVec<T> {
        self.storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(ComponentVec::<T>::default()))
            .as_any_mut()
            .downcast_mut::<ComponentVec<T>>()
            .expect("component storage type mismatch")
    }

    pub fn add<T: Component>(&mut self, entity: Entity, component: T) {
        self.storage_mut::<T>().insert(entity, component);
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.storage::<T>().and_then(|storage| storage.get(entity))
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.storage_mut::<T>().get_mut(entity)
    }

    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.storage_mut::<T>().remove(entity)
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.get::<T>(entity).is_some()
    }

    /// Removes every component attached to the entity.
    pub fn strip(&mut self, entity: Entity) {
        for storage in self.storages.values_mut() {
            storage.remove_entity(entity);
        }
    }

    /// Entity ids currently holding a component of type `T`, ascending.
    pub fn ids_with<T: Component>(&self) -> Vec<u64> {
        self.storage::<T>()
            .map(|storage| storage.indices().collect())
            .unwrap_or_default()
    }

    /// Type-erased presence check, used by query filters.
    pub fn has_by_type_id(&self, type_id: TypeId, entity: Entity) -> bool {
        self.storages
            .get(&type_id)
            .map(|storage| storage.contains(entity))
            .unwrap_or(false)
    }

    /// Type-erased id listing, used to seed queries.
    pub fn ids_by_type_id(&self, type_id: TypeId) -> Vec<u64> {
        self.storages
            .get(&type_id)
            .map(|storage| storage.entity_ids())
            .unwrap_or_default()
    }
}
