//! # Archetypes
//!
//! An archetype is the storage for every entity sharing exactly the same
//! component set. It binds together the identifying [`Signature`], the
//! packed row [`FamilyLayout`], the chunked [`RowStore`], and the set of
//! systems whose predicates it satisfies.
//!
//! ## Matching
//!
//! An archetype matches a system when the system's `must_have` mask is a
//! subset of the archetype signature and the signature shares no id with
//! the system's `must_not_have` mask. The relation is kept in both
//! directions, [`Archetype::systems`] and the system's archetype list,
//! and is maintained incrementally whenever either side is created.
//!
//! ## Row Migration
//!
//! When an entity that still owns a row is assigned a row in another
//! archetype, the component intersection is carried over byte-for-byte:
//! each shared component is read at its source-layout offset and written at
//! its destination-layout offset. Recorded slot sizes include absorbed pad
//! and differ between layouts, so the copy width is the registry's true
//! component size.

use std::ptr::NonNull;

use crate::engine::component::TypeRegistry;
use crate::engine::layout::FamilyLayout;
use crate::engine::signature::Signature;
use crate::engine::storage::RowStore;
use crate::engine::types::{ArchetypeId, SystemId};


/// Storage and matching state for one component set.
pub struct Archetype {
    /// Creation-order identifier.
    pub id: ArchetypeId,

    /// The exact component set stored here.
    pub signature: Signature,

    /// Packed row layout computed from the signature.
    pub layout: FamilyLayout,

    /// Chunked row storage.
    pub store: RowStore,

    /// Systems this archetype matches, in match-insertion order.
    pub systems: Vec<SystemId>,
}

impl Archetype {
    /// Creates an empty archetype for `signature`, computing its layout
    /// from the registry.
    pub fn new(id: ArchetypeId, signature: Signature, registry: &TypeRegistry) -> Self {
        let layout = FamilyLayout::compute(registry, &signature);
        let store = RowStore::new(&layout);
        Self { id, signature, layout, store, systems: Vec::new() }
    }
}

/// The matching predicate: `must_have ⊆ mask ∧ mask ∩ must_not_have = ∅`.
#[inline]
pub fn is_match(mask: &Signature, must_have: &Signature, must_not_have: &Signature) -> bool {
    must_have.is_subset_of(mask) && !mask.intersects(must_not_have)
}

/// Copies the component intersection of two layouts from one row to
/// another.
///
/// For every component present in both layouts, `registry.size_of` bytes
/// are copied from `src_row + src_offset` to `dst_row + dst_offset`.
/// Components absent from either side are skipped; zero-sized components
/// copy nothing.
///
/// ## Safety
/// - `src_row` and `dst_row` must address live rows laid out by
///   `src_layout` and `dst_layout` respectively.
/// - The rows must not overlap (they are distinct row slots).
/// - No references into either row may be live across the call.
pub unsafe fn copy_shared_row(
    registry: &TypeRegistry,
    src_layout: &FamilyLayout,
    src_row: NonNull<u8>,
    dst_layout: &FamilyLayout,
    dst_row: NonNull<u8>,
) {
    for slot in &src_layout.slots {
        let Some(dst_offset) = dst_layout.offset_of(slot.type_id) else {
            continue;
        };

        let size = registry.size_of(slot.type_id);
        if size == 0 {
            continue;
        }

        // SAFETY: both offsets lie within their rows per the layout
        // contract, and distinct rows cannot overlap.
        unsafe {
            std::ptr::copy_nonoverlapping(
                src_row.as_ptr().add(slot.offset),
                dst_row.as_ptr().add(dst_offset),
                size,
            );
        }
    }
}
