//! # The World
//!
//! The world owns every piece of ECS state: the type registry, the
//! archetype table and its signature index, the system table and its name
//! index, and the entity location table. All public operations go through
//! it; nothing is process-global.
//!
//! ## Control Flow
//!
//! Register types, then systems, then spawn. Systems match existing
//! archetypes at registration; archetypes match existing systems at
//! creation, so the archetype↔system relation is complete after every
//! public call no matter the interleaving.
//!
//! ## Spawning
//!
//! `spawn` resolves the composition string to a signature, finds or creates
//! the archetype, draws entity ids (recycled first), reserves rows through
//! the storage region protocol, writes locations, and commits. Any failure
//! before the commit rolls back id allocation, the reservation, and any
//! archetype created for the call, leaving the world exactly as it was.
//! The returned slice of new ids is owned by the world and borrowed to the
//! caller, so it is valid precisely until the next `&mut self` call; the
//! compiler enforces the "until the next spawn" lifetime the API promises.
//!
//! `respawn` re-declares a live entity's composition wholesale: the entity
//! moves to the new archetype, shared component bytes migrate to the new
//! row, and the old row is recycled.

use std::collections::HashMap;
use std::ptr::NonNull;

use log::{debug, warn};

use crate::engine::archetype::{copy_shared_row, is_match, Archetype};
use crate::engine::component::{TypeDesc, TypeRegistry};
use crate::engine::entity::{Entity, EntityLocation, EntityTable};
use crate::engine::error::{ECSResult, EntityError, SystemError};
use crate::engine::requirements::{parse_composition, parse_system_requirements};
use crate::engine::signature::Signature;
use crate::engine::storage::RowSlot;
use crate::engine::systems::{System, SystemCtx, SystemDesc};
use crate::engine::types::{ArchetypeId, ComponentId, SystemId};


/// Top-level ECS container.
#[derive(Default)]
pub struct World {
    registry: TypeRegistry,
    archetypes: Vec<Archetype>,
    archetype_index: HashMap<Signature, ArchetypeId>,
    systems: Vec<System>,
    system_index: HashMap<String, SystemId>,
    entities: EntityTable,
    last_spawned: Vec<Entity>,
}

impl World {
    /// Creates an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component type.
    ///
    /// ## Errors
    /// `AlreadyRegistered` on identifier collision (registry unchanged),
    /// `InvalidAlignment` for a non-power-of-two alignment.
    pub fn register_type(&mut self, desc: TypeDesc) -> ECSResult<ComponentId> {
        Ok(self.registry.register(desc)?)
    }

    /// Registers a system and matches it against every existing archetype.
    ///
    /// ## Errors
    /// `AlreadyRegistered` on identifier collision; `UnknownType` or
    /// `TooManyRequirements` if the requirement expression is rejected. On
    /// error nothing is registered.
    pub fn register_system(&mut self, desc: SystemDesc) -> ECSResult<SystemId> {
        let SystemDesc { identifier, requirements, func, user_data } = desc;

        if self.system_index.contains_key(&identifier) {
            return Err(SystemError::AlreadyRegistered { identifier }.into());
        }

        let parsed = parse_system_requirements(&self.registry, &requirements)?;
        let id = self.systems.len() as SystemId;

        let mut system = System {
            identifier: identifier.clone(),
            must_have: parsed.must_have,
            must_not_have: parsed.must_not_have,
            offsets: Vec::with_capacity(parsed.types.len()),
            types: parsed.types,
            func,
            user_data,
            archetypes: Vec::new(),
        };

        for archetype in &mut self.archetypes {
            if is_match(&archetype.signature, &system.must_have, &system.must_not_have) {
                archetype.systems.push(id);
                system.archetypes.push(archetype.id);
            }
        }

        debug!(
            "system registered ({identifier}, id {id}, {} archetype match(es))",
            system.archetypes.len()
        );

        self.system_index.insert(identifier, id);
        self.systems.push(system);
        Ok(id)
    }

    /// Finds the archetype for `mask`, creating it (and matching it against
    /// every registered system) on first use.
    ///
    /// The flag is `true` when this call created the archetype; a failed
    /// operation uses it to decide whether [`World::remove_archetype`] must
    /// run.
    fn get_or_create_archetype(&mut self, mask: Signature) -> (ArchetypeId, bool) {
        if let Some(&id) = self.archetype_index.get(&mask) {
            return (id, false);
        }

        let id = self.archetypes.len() as ArchetypeId;
        let mut archetype = Archetype::new(id, mask.clone(), &self.registry);

        for (system_id, system) in self.systems.iter_mut().enumerate() {
            if is_match(&archetype.signature, &system.must_have, &system.must_not_have) {
                system.archetypes.push(id);
                archetype.systems.push(system_id as SystemId);
            }
        }

        debug!(
            "archetype created (id {id}, family size {}, {} system match(es))",
            archetype.layout.family_size,
            archetype.systems.len()
        );

        self.archetype_index.insert(mask, id);
        self.archetypes.push(archetype);
        (id, true)
    }

    /// Undoes `get_or_create_archetype` for the archetype created by a call
    /// that subsequently failed: the table entry, the signature index
    /// entry, and every matching-index pair are removed, so no
    /// half-registered state survives the failure.
    fn remove_archetype(&mut self, id: ArchetypeId) {
        let archetype = self
            .archetypes
            .pop()
            .expect("rollback targets the archetype created by this call");
        debug_assert_eq!(archetype.id, id);

        self.archetype_index.remove(&archetype.signature);
        for &system_id in &archetype.systems {
            self.systems[system_id as usize].archetypes.retain(|&a| a != id);
        }

        debug!("rolled back archetype {id}");
    }

    /// Spawns `count` entities with the given composition.
    ///
    /// Component bytes of the new rows are all zero. The returned slice is
    /// world-owned and valid until the next `&mut self` call.
    ///
    /// ## Errors
    /// Requirement errors for a bad composition; `AllocFailed` if chunk
    /// allocation fails. On error the world is left unchanged: id
    /// allocation, the row reservation, and any archetype (with its
    /// matching-index entries) created for this call are all rolled back.
    pub fn spawn(&mut self, count: usize, composition: &str) -> ECSResult<&[Entity]> {
        let mask = parse_composition(&self.registry, composition)?;
        let (archetype_id, created) = self.get_or_create_archetype(mask);

        let allocation = self.entities.allocate(count);
        let request = match self.archetypes[archetype_id as usize].store.request_rows(count) {
            Ok(request) => request,
            Err(e) => {
                warn!("spawn of {count} ({composition}) failed; rolling back");
                self.entities.rollback_allocation(&allocation);
                if created {
                    self.remove_archetype(archetype_id);
                }
                return Err(e.into());
            }
        };

        // Assign rows in region order. Released ids have their locations
        // cleared before they reach the recycled stack, so no id handed out
        // by `allocate` can still own a row.
        let slots: Vec<RowSlot> = request.row_slots().collect();
        for (&entity, slot) in allocation.ids.iter().zip(slots) {
            let location =
                EntityLocation { archetype: archetype_id, chunk: slot.chunk, row: slot.row };
            let previous = self.entities.set_location(entity, location);
            debug_assert!(previous.is_none(), "allocated id already owned a row");
        }

        self.archetypes[archetype_id as usize].store.commit(request);
        debug!("spawned {count} entities into archetype {archetype_id} ({composition})");

        self.last_spawned = allocation.ids;
        Ok(&self.last_spawned)
    }

    /// Moves a live entity to the archetype for `composition`.
    ///
    /// Components present in both the old and new compositions carry their
    /// bytes over; components only in the new composition start zeroed;
    /// components only in the old composition are dropped with the old row,
    /// which is recycled.
    ///
    /// ## Errors
    /// Requirement errors for a bad composition; `StaleEntity` if the
    /// entity owns no row; `AllocFailed` if row reservation fails. On error
    /// the entity keeps its old row and any archetype created for this call
    /// is rolled back.
    pub fn respawn(&mut self, entity: Entity, composition: &str) -> ECSResult<()> {
        let mask = parse_composition(&self.registry, composition)?;
        let Some(old) = self.entities.location(entity) else {
            return Err(EntityError::StaleEntity { entity: entity.0 }.into());
        };

        let (archetype_id, created) = self.get_or_create_archetype(mask);
        let request = match self.archetypes[archetype_id as usize].store.request_rows(1) {
            Ok(request) => request,
            Err(e) => {
                warn!("respawn of entity {} ({composition}) failed; rolling back", entity.0);
                if created {
                    self.remove_archetype(archetype_id);
                }
                return Err(e.into());
            }
        };

        let slot = request
            .row_slots()
            .next()
            .expect("a one-row request yields exactly one slot");
        let new = EntityLocation { archetype: archetype_id, chunk: slot.chunk, row: slot.row };

        self.entities.set_location(entity, new);
        self.migrate_row(old, new);
        self.archetypes[archetype_id as usize].store.commit(request);

        debug!("respawned entity {} into archetype {archetype_id} ({composition})", entity.0);
        Ok(())
    }

    /// Moves the component intersection from an entity's previous row to a
    /// freshly assigned one and recycles the old row.
    fn migrate_row(&mut self, old: EntityLocation, new: EntityLocation) {
        let src = self.archetypes[old.archetype as usize].store.row_ptr(old.chunk, old.row);
        let dst = self.archetypes[new.archetype as usize].store.row_ptr(new.chunk, new.row);

        if let (Some(src), Some(dst)) = (src, dst) {
            let src_layout = &self.archetypes[old.archetype as usize].layout;
            let dst_layout = &self.archetypes[new.archetype as usize].layout;
            // SAFETY: both pointers address live rows of their layouts and
            // refer to distinct row slots.
            unsafe { copy_shared_row(&self.registry, src_layout, src, dst_layout, dst) };
        }

        self.archetypes[old.archetype as usize]
            .store
            .recycle_row(RowSlot { chunk: old.chunk, row: old.row });
    }

    /// Despawns an entity: its row is zeroed and recycled, and its id goes
    /// onto the recycled stack for the next spawn.
    ///
    /// Returns `false` if the entity was not alive.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        let Some(location) = self.entities.clear_location(entity) else {
            return false;
        };

        self.archetypes[location.archetype as usize]
            .store
            .recycle_row(RowSlot { chunk: location.chunk, row: location.row });
        self.entities.release(entity);

        debug!("despawned entity {} from archetype {}", entity.0, location.archetype);
        true
    }

    /// Pointer to the named component's bytes within the entity's row.
    ///
    /// Returns `None` if the entity has no storage, the type is
    /// unregistered, or the entity's archetype lacks the type. For a
    /// zero-sized family the pointer is dangling and must not be
    /// dereferenced.
    pub fn get_component(&self, entity: Entity, identifier: &str) -> Option<NonNull<u8>> {
        let type_id = self.registry.lookup(identifier)?;
        let location = self.entities.location(entity)?;
        let archetype = &self.archetypes[location.archetype as usize];

        if !archetype.signature.has(type_id) {
            return None;
        }

        let offset = archetype.layout.offset_of(type_id)?;
        let row = archetype.store.row_ptr(location.chunk, location.row)?;
        // SAFETY: the offset lies within the row per the family layout.
        Some(unsafe { NonNull::new_unchecked(row.as_ptr().add(offset)) })
    }

    /// Typed shared view of a component.
    ///
    /// ## Safety
    /// `T` must match the size and alignment the component was registered
    /// with, and no mutable reference to the same bytes may be live.
    pub unsafe fn component_ref<T>(&self, entity: Entity, identifier: &str) -> Option<&T> {
        // SAFETY: forwarded to the caller's contract.
        self.get_component(entity, identifier)
            .map(|ptr| unsafe { &*ptr.as_ptr().cast::<T>() })
    }

    /// Typed exclusive view of a component.
    ///
    /// ## Safety
    /// `T` must match the size and alignment the component was registered
    /// with. Exclusivity against other raw-pointer access is the caller's
    /// responsibility; taking `&mut self` rules out aliasing through the
    /// world itself.
    pub unsafe fn component_mut<T>(&mut self, entity: Entity, identifier: &str) -> Option<&mut T> {
        // SAFETY: forwarded to the caller's contract.
        self.get_component(entity, identifier)
            .map(|ptr| unsafe { &mut *ptr.as_ptr().cast::<T>() })
    }

    /// Invokes the named system once per matching row.
    ///
    /// ## Errors
    /// `UnknownSystem` if no system has this identifier.
    pub fn run(&mut self, identifier: &str, dt: f64) -> ECSResult<()> {
        let &id = self
            .system_index
            .get(identifier)
            .ok_or_else(|| SystemError::UnknownSystem { identifier: identifier.into() })?;
        self.run_system(id, dt)
    }

    /// Invokes every registered system in registration order.
    pub fn step(&mut self, dt: f64) -> ECSResult<()> {
        for id in 0..self.systems.len() {
            self.run_system(id as SystemId, dt)?;
        }
        Ok(())
    }

    fn run_system(&mut self, id: SystemId, dt: f64) -> ECSResult<()> {
        let system = &mut self.systems[id as usize];
        let System { types, offsets, func, user_data, archetypes: matched, .. } = system;

        for &archetype_id in matched.iter() {
            let archetype = &self.archetypes[archetype_id as usize];

            // Rebuild the per-requirement offsets for this archetype.
            offsets.clear();
            for &type_id in types.iter() {
                let offset = archetype
                    .layout
                    .offset_of(type_id)
                    .ok_or(SystemError::MissingOffset { component_id: type_id, archetype_id })?;
                offsets.push(offset);
            }

            let family_size = archetype.layout.family_size;
            for chunk in archetype.store.chunks().iter().rev() {
                for row in 0..chunk.count() {
                    let base = chunk.row_ptr(row, family_size);
                    let mut ctx = SystemCtx::new(base, offsets, user_data.as_deref_mut());
                    func(&mut ctx, dt);
                }
            }
        }

        Ok(())
    }

    /// Number of registered component types.
    pub fn type_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of archetypes created so far.
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Number of registered systems.
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.live_count()
    }

    /// Returns `true` if the entity currently owns a row.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// The entity ids produced by the most recent spawn.
    pub fn last_spawned(&self) -> &[Entity] {
        &self.last_spawned
    }

    /// The type registry (read-only).
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The archetype with the given id, if it exists.
    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id as usize)
    }

    /// The system registered under `identifier`, if any.
    pub fn system(&self, identifier: &str) -> Option<&System> {
        self.system_index
            .get(identifier)
            .map(|&id| &self.systems[id as usize])
    }
}
