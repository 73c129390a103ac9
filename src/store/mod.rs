//! Synchronous entity store used by the valuation engine.
//!
//! Entities are loaded by id and saved whole. Within one store instance
//! every `save` is visible to the next `load` (read-your-writes).

use std::fmt;
use std::hash::Hash;

pub mod memory;

pub use memory::{ChangeSet, MemoryStore, Table};

/// A record with a stable id that lives in one `MemoryStore` table.
pub trait Entity: Clone + fmt::Debug {
    type Id: Clone + Eq + Ord + Hash + fmt::Debug;

    fn entity_id(&self) -> Self::Id;

    fn table(store: &MemoryStore) -> &Table<Self>;

    fn table_mut(store: &mut MemoryStore) -> &mut Table<Self>;
}

/// Load/save access to entities.
pub trait EntityStore {
    fn load<E: Entity>(&self, id: &E::Id) -> Option<E>;

    fn save<E: Entity>(&mut self, entity: E);

    /// Load the entity, or build a fresh one with `create`. Nothing is saved.
    fn get_or_create<E: Entity>(&self, id: &E::Id, create: impl FnOnce() -> E) -> E {
        self.load(id).unwrap_or_else(create)
    }
}
