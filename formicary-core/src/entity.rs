/// Opaque handle to an entity. Stable for the entity's lifetime; the
/// generation invalidates handles once the underlying id is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    id: u64,
    generation: u64,
}

impl Entity {
    pub fn new(id: u64, generation: u64) -> Self {
        Entity { id, generation }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn index(&self) -> usize {
        self.id as usize
    }
}
