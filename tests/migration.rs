use std::cell::Cell;
use std::rc::Rc;

use strata::engine::archetype::copy_shared_row;
use strata::engine::component::{TypeDesc, TypeRegistry};
use strata::engine::layout::FamilyLayout;
use strata::engine::signature::Signature;
use strata::engine::storage::{RowSlot, RowStore};
use strata::{ECSError, EntityError, StorageError, SystemDesc, World};

fn registry_pqr() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register(TypeDesc::new("p", 8, 8)).unwrap();
    registry.register(TypeDesc::new("q", 4, 4)).unwrap();
    registry.register(TypeDesc::new("r", 2, 2)).unwrap();
    registry
}

fn store_for(registry: &TypeRegistry, ids: &[u32]) -> (FamilyLayout, RowStore) {
    let layout = FamilyLayout::compute(registry, &Signature::from_ids(ids));
    let store = RowStore::new(&layout);
    (layout, store)
}

#[test]
fn region_request_draws_recycled_rows_first() {
    let registry = registry_pqr();
    let (_, mut store) = store_for(&registry, &[0, 1]);

    let request = store.request_rows(3).unwrap();
    assert_eq!(request.row_count(), 3);
    store.commit(request);
    assert_eq!(store.chunks()[0].count(), 3);

    store.recycle_row(RowSlot { chunk: 0, row: 1 });
    assert_eq!(store.recycled_len(), 1);

    let request = store.request_rows(2).unwrap();
    let regions = request.regions();
    assert_eq!(regions.len(), 2);
    assert_eq!((regions[0].chunk, regions[0].row, regions[0].count), (0, 1, 1), "recycled slot first");
    assert_eq!((regions[1].chunk, regions[1].row, regions[1].count), (0, 3, 1), "then the chunk tail");

    store.commit(request);
    assert_eq!(store.recycled_len(), 0, "commit consumes the drawn slots");
    assert_eq!(store.chunk_count(), 1);
}

#[test]
fn aborted_request_returns_fresh_rows_to_the_free_list() {
    let registry = registry_pqr();
    let (_, mut store) = store_for(&registry, &[0, 1]);

    let request = store.request_rows(5).unwrap();
    store.abort(request);

    assert_eq!(store.chunk_count(), 1, "chunk memory is kept on abort");
    assert_eq!(store.recycled_len(), 5, "abandoned rows become free slots");

    // The next request is served entirely from the free list, newest first.
    let request = store.request_rows(5).unwrap();
    assert_eq!(request.regions().len(), 5);
    assert_eq!(request.regions()[0].row, 4);
    assert_eq!(request.new_recycled_len(), 0);
    store.commit(request);
    assert_eq!(store.recycled_len(), 0);
}

#[test]
fn recycled_slots_survive_an_aborted_request() {
    let registry = registry_pqr();
    let (_, mut store) = store_for(&registry, &[0, 1]);

    let request = store.request_rows(2).unwrap();
    store.commit(request);
    store.recycle_row(RowSlot { chunk: 0, row: 0 });

    // Reservation peeks the stack without popping, so aborting costs
    // nothing and the slot is still available afterwards.
    let request = store.request_rows(1).unwrap();
    assert_eq!(request.regions()[0].row, 0);
    store.abort(request);
    assert_eq!(store.recycled_len(), 1);

    let request = store.request_rows(1).unwrap();
    assert_eq!(request.regions()[0].row, 0);
    store.commit(request);
    assert_eq!(store.recycled_len(), 0);
}

#[test]
fn copy_shared_row_translates_offsets_between_layouts() {
    let registry = registry_pqr();

    // Source family {p, q}: p anchors at 0, q at 8.
    let (src_layout, mut src_store) = store_for(&registry, &[0, 1]);
    // Destination family {q, r}: q anchors at 0, r at 4.
    let (dst_layout, mut dst_store) = store_for(&registry, &[1, 2]);

    assert_eq!(src_layout.offset_of(1), Some(8));
    assert_eq!(dst_layout.offset_of(1), Some(0));

    let request = src_store.request_rows(1).unwrap();
    src_store.commit(request);
    let request = dst_store.request_rows(1).unwrap();
    dst_store.commit(request);

    let src_row = src_store.row_ptr(0, 0).unwrap();
    let dst_row = dst_store.row_ptr(0, 0).unwrap();

    unsafe {
        src_row.as_ptr().cast::<u64>().write(0x0123_4567_89AB_CDEF);
        src_row.as_ptr().add(8).cast::<u32>().write(0xDEAD_BEEF);

        copy_shared_row(&registry, &src_layout, src_row, &dst_layout, dst_row);

        // q moved from source offset 8 to destination offset 0; r was never
        // in the source and keeps its zero bytes.
        assert_eq!(dst_row.as_ptr().cast::<u32>().read(), 0xDEAD_BEEF);
        assert_eq!(dst_row.as_ptr().add(4).cast::<u16>().read(), 0);

        // The source row is untouched by the copy itself.
        assert_eq!(src_row.as_ptr().cast::<u64>().read(), 0x0123_4567_89AB_CDEF);
    }
}

#[test]
fn respawn_migrates_shared_components_through_the_public_api() {
    let mut world = World::new();
    world.register_type(TypeDesc::new("int", 4, 4)).unwrap();
    world.register_type(TypeDesc::new("float", 4, 4)).unwrap();

    let entity = world.spawn(1, "int").unwrap().to_vec()[0];
    let old_ptr = world.get_component(entity, "int").unwrap().as_ptr() as usize;
    unsafe {
        *world.component_mut::<i32>(entity, "int").unwrap() = 41;
    }

    world.respawn(entity, "int, float").unwrap();

    assert!(world.is_alive(entity));
    assert_eq!(world.entity_count(), 1);
    assert_eq!(world.archetype_count(), 2);

    unsafe {
        assert_eq!(
            *world.component_ref::<i32>(entity, "int").unwrap(),
            41,
            "shared component bytes must move to the new row"
        );
        assert_eq!(
            *world.component_ref::<f32>(entity, "float").unwrap(),
            0.0,
            "components new to the entity start zeroed"
        );
    }

    // The vacated row went onto the old archetype's recycled stack and is
    // zeroed for its next occupant.
    let next = world.spawn(1, "int").unwrap().to_vec()[0];
    let next_ptr = world.get_component(next, "int").unwrap().as_ptr() as usize;
    assert_eq!(next_ptr, old_ptr);
    unsafe {
        assert_eq!(*world.component_ref::<i32>(next, "int").unwrap(), 0);
    }
}

#[test]
fn respawned_entity_matches_new_predicates() {
    let mut world = World::new();
    world.register_type(TypeDesc::new("int", 4, 4)).unwrap();
    world.register_type(TypeDesc::new("float", 4, 4)).unwrap();

    let invocations = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&invocations);
    world
        .register_system(SystemDesc::new("wants_float", "float", move |_ctx, _dt| {
            counter.set(counter.get() + 1);
        }))
        .unwrap();

    let entity = world.spawn(1, "int").unwrap().to_vec()[0];
    world.run("wants_float", 0.0).unwrap();
    assert_eq!(invocations.get(), 0);

    world.respawn(entity, "int, float").unwrap();
    world.run("wants_float", 0.0).unwrap();
    assert_eq!(invocations.get(), 1, "the entity must be visible to newly matched systems");
}

#[test]
fn respawn_of_a_dead_entity_fails() {
    let mut world = World::new();
    world.register_type(TypeDesc::new("int", 4, 4)).unwrap();

    let entity = world.spawn(1, "int").unwrap().to_vec()[0];
    world.despawn(entity);

    let err = world.respawn(entity, "int").unwrap_err();
    assert_eq!(err, ECSError::Entity(EntityError::StaleEntity { entity: entity.0 }));
}

#[test]
fn failed_respawn_leaves_the_entity_untouched() {
    let mut world = World::new();
    world.register_type(TypeDesc::new("int", 4, 4)).unwrap();
    world.register_type(TypeDesc::new("huge", 32_768, 8)).unwrap();

    let entity = world.spawn(1, "int").unwrap().to_vec()[0];
    unsafe {
        *world.component_mut::<i32>(entity, "int").unwrap() = 9;
    }

    let err = world.respawn(entity, "huge").unwrap_err();
    assert_eq!(
        err,
        ECSError::Storage(StorageError::AllocFailed { bytes: 32_768, alignment: 8 })
    );

    assert_eq!(world.archetype_count(), 1, "the unusable archetype must be rolled back");
    assert!(world.is_alive(entity));
    assert_eq!(world.entity_count(), 1);
    unsafe {
        assert_eq!(*world.component_ref::<i32>(entity, "int").unwrap(), 9);
    }
}

#[test]
fn despawn_recycles_id_and_zeroed_row() {
    let mut world = World::new();
    world.register_type(TypeDesc::new("int", 4, 4)).unwrap();

    let entities = world.spawn(3, "int").unwrap().to_vec();
    let victim = entities[1];
    let victim_ptr = world.get_component(victim, "int").unwrap().as_ptr() as usize;

    unsafe {
        *world.component_mut::<i32>(victim, "int").unwrap() = 7;
    }

    assert!(world.despawn(victim));
    assert!(!world.is_alive(victim));
    assert!(world.get_component(victim, "int").is_none());
    assert_eq!(world.entity_count(), 2);

    // The next spawn reuses both the id and the row slot, and the row
    // reads as freshly zeroed despite the earlier write.
    let respawned = world.spawn(1, "int").unwrap().to_vec();
    assert_eq!(respawned[0], victim);
    let new_ptr = world.get_component(respawned[0], "int").unwrap().as_ptr() as usize;
    assert_eq!(new_ptr, victim_ptr);
    unsafe {
        assert_eq!(*world.component_ref::<i32>(respawned[0], "int").unwrap(), 0);
    }
    assert_eq!(world.entity_count(), 3);
}

#[test]
fn despawning_twice_is_a_no_op() {
    let mut world = World::new();
    world.register_type(TypeDesc::new("int", 4, 4)).unwrap();

    let entities = world.spawn(1, "int").unwrap().to_vec();
    assert!(world.despawn(entities[0]));
    assert!(!world.despawn(entities[0]));
    assert_eq!(world.entity_count(), 0);
}
