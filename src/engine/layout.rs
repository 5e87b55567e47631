//! # Family Layout Computation
//!
//! A *family* is one packed row of component bytes for one entity. Given an
//! archetype signature, this module computes where each component lives
//! inside the row, the row stride (`family_size`), and the row alignment.
//!
//! ## Packing Strategy
//!
//! The widest type anchors the row at offset 0. Each emplaced type leaves a
//! tail pad inside the current alignment window; the algorithm greedily
//! fills that pad with the largest remaining type that fits (ties broken by
//! lowest id). When nothing fits, the pad is absorbed into the previously
//! placed slot, whose recorded size grows to cover the slack, and the next
//! type by ascending id opens a fresh window. Offsets are therefore always
//! sequential: `offset[i + 1] = offset[i] + size[i]`.
//!
//! After the last slot, the trailing pad up to the next multiple of the
//! family alignment is absorbed the same way, so `family_size` is the sum of
//! recorded sizes and a multiple of the alignment.
//!
//! ## Alignment Guarantee
//!
//! The family alignment is the maximum component alignment. Absorption
//! always lands the next slot on a multiple of the family alignment, and
//! greedy fill places strictly smaller types behind larger ones, so every
//! offset is a multiple of its component's alignment whenever component
//! sizes are multiples of their alignments (which the registry's
//! power-of-two alignment rule makes the practical case). Chunk bases are
//! allocated at the family alignment, extending the guarantee to absolute
//! addresses.

use crate::engine::component::TypeRegistry;
use crate::engine::signature::Signature;
use crate::engine::types::{align_up, ComponentId};


/// One placed component within a family row.
///
/// `size` is the *recorded* size: the component's registered size plus any
/// absorbed pad. The next slot's offset is always `offset + size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSlot {
    /// Component occupying this slot.
    pub type_id: ComponentId,

    /// Recorded size in bytes, including absorbed pad.
    pub size: usize,

    /// Byte offset of the component from the row base.
    pub offset: usize,
}

/// Packed byte layout for one archetype's component family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyLayout {
    /// Slots in placement order (widest first, then greedy fill).
    pub slots: Vec<LayoutSlot>,

    /// Row stride in bytes; a multiple of `alignment`. Zero when every
    /// component in the family is zero-sized.
    pub family_size: usize,

    /// Maximum component alignment in the family (1 for an empty family).
    pub alignment: usize,
}

impl FamilyLayout {
    /// Computes the layout for `signature` using the registry's per-type
    /// size and alignment.
    pub fn compute(registry: &TypeRegistry, signature: &Signature) -> Self {
        let mut remaining: Vec<ComponentId> = signature.iter().collect();
        if remaining.is_empty() {
            return Self { slots: Vec::new(), family_size: 0, alignment: 1 };
        }

        let alignment = remaining
            .iter()
            .map(|&t| registry.alignment_of(t))
            .max()
            .unwrap_or(1);

        let mut slots: Vec<LayoutSlot> = Vec::with_capacity(remaining.len());

        // Slot 0: widest type; `remaining` is ascending by id, so a strict
        // comparison keeps the lowest id on ties.
        let mut widest = 0;
        for (i, &t) in remaining.iter().enumerate() {
            if registry.size_of(t) > registry.size_of(remaining[widest]) {
                widest = i;
            }
        }
        let first = remaining.remove(widest);
        let first_size = registry.size_of(first);
        slots.push(LayoutSlot { type_id: first, size: first_size, offset: 0 });

        let mut offset = first_size;
        let mut pad = alignment - (first_size % alignment);

        while !remaining.is_empty() {
            let mut fit: Option<usize> = None;
            for (i, &t) in remaining.iter().enumerate() {
                let size = registry.size_of(t);
                if size <= pad {
                    match fit {
                        Some(best) if registry.size_of(remaining[best]) >= size => {}
                        _ => fit = Some(i),
                    }
                }
            }

            let index = match fit {
                Some(i) => i,
                None => {
                    // Nothing fits the pad: the previous slot absorbs it and
                    // the lowest remaining id opens the next window.
                    let last = slots
                        .last_mut()
                        .expect("slot 0 is placed before the fill loop");
                    last.size += pad;
                    offset += pad;
                    0
                }
            };

            let type_id = remaining.remove(index);
            let size = registry.size_of(type_id);
            slots.push(LayoutSlot { type_id, size, offset });
            offset += size;

            pad = alignment - (size % alignment);
        }

        // Trailing pad keeps the stride a multiple of the family alignment.
        let family_size = align_up(offset, alignment);
        if family_size > offset {
            let last = slots
                .last_mut()
                .expect("slot 0 is placed before the fill loop");
            last.size += family_size - offset;
        }

        Self { slots, family_size, alignment }
    }

    /// Byte offset of `type_id` within a row, if the family contains it.
    pub fn offset_of(&self, type_id: ComponentId) -> Option<usize> {
        self.slots
            .iter()
            .find(|slot| slot.type_id == type_id)
            .map(|slot| slot.offset)
    }

    /// Number of components in the family.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the family contains no components.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
