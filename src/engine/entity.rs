//! # Entity Identity and Location Tracking
//!
//! Entities are opaque 64-bit ids handed out in allocation order. The
//! world-owned [`EntityTable`] maps each live id to the archetype row that
//! holds its components and keeps a recycled stack of released ids, which
//! are reused before any new id is minted.
//!
//! ## Model
//!
//! Ids are plain integers without generation counters: releasing an id and
//! spawning again hands the same id to a new entity, and stale handles to
//! the old one simply resolve to the new occupant's row. The table is the
//! single authority on liveness: an entity is alive iff it has a recorded
//! location.

use crate::engine::types::{ArchetypeId, ChunkId, EntityId, RowId};


/// Opaque identifier for an ECS entity.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Entity(pub EntityId);

/// Physical storage location of an entity's component row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityLocation {
    /// Archetype containing the entity.
    pub archetype: ArchetypeId,

    /// Chunk index within the archetype.
    pub chunk: ChunkId,

    /// Row index within the chunk.
    pub row: RowId,
}

/// A batch of ids handed out by [`EntityTable::allocate`].
///
/// Remembers how many ids came from the recycled stack so a failed spawn
/// can restore the table exactly.
pub struct EntityAllocation {
    /// Allocated ids, recycled ids first (LIFO), then fresh ids ascending.
    pub ids: Vec<Entity>,

    /// How many leading entries of `ids` were drawn from the recycled
    /// stack.
    pub reused: usize,
}

/// World-owned table of entity locations and recycled ids.
#[derive(Default)]
pub struct EntityTable {
    locations: Vec<Option<EntityLocation>>,
    recycled: Vec<Entity>,
    next: EntityId,
    live: usize,
}

impl EntityTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws `count` ids, reusing recycled ids before minting new ones.
    pub fn allocate(&mut self, count: usize) -> EntityAllocation {
        let mut ids = Vec::with_capacity(count);

        let reused = count.min(self.recycled.len());
        for _ in 0..reused {
            let id = self
                .recycled
                .pop()
                .expect("recycled length was checked above");
            ids.push(id);
        }

        for _ in reused..count {
            ids.push(Entity(self.next));
            self.next += 1;
        }

        EntityAllocation { ids, reused }
    }

    /// Undoes an allocation whose spawn failed: recycled ids go back in
    /// their original stack order and fresh ids are unminted.
    pub fn rollback_allocation(&mut self, allocation: &EntityAllocation) {
        for &id in allocation.ids[..allocation.reused].iter().rev() {
            self.recycled.push(id);
        }
        self.next -= (allocation.ids.len() - allocation.reused) as EntityId;
    }

    /// Returns the location of `entity`, if it is alive.
    #[inline]
    pub fn location(&self, entity: Entity) -> Option<EntityLocation> {
        self.locations.get(entity.0 as usize).copied().flatten()
    }

    /// Returns `true` if `entity` currently owns a row.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.location(entity).is_some()
    }

    /// Records the location of `entity`, growing the table as needed.
    ///
    /// Returns the previous location if the entity already owned a row.
    pub fn set_location(&mut self, entity: Entity, location: EntityLocation) -> Option<EntityLocation> {
        let index = entity.0 as usize;
        if index >= self.locations.len() {
            self.locations.resize(index + 1, None);
        }
        let previous = self.locations[index].replace(location);
        if previous.is_none() {
            self.live += 1;
        }
        previous
    }

    /// Clears the location of `entity`, returning it for row recycling.
    pub fn clear_location(&mut self, entity: Entity) -> Option<EntityLocation> {
        let slot = self.locations.get_mut(entity.0 as usize)?;
        let previous = slot.take();
        if previous.is_some() {
            self.live -= 1;
        }
        previous
    }

    /// Pushes a released id onto the recycled stack.
    pub fn release(&mut self, entity: Entity) {
        self.recycled.push(entity);
    }

    /// Number of live entities.
    #[inline]
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Number of ids waiting on the recycled stack.
    #[inline]
    pub fn recycled_len(&self) -> usize {
        self.recycled.len()
    }
}
