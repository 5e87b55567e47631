//! Core ECS Types, Identifiers, and Capacities
//!
//! This module defines the **fundamental identifier types and compile-time
//! constants** shared across all subsystems: the type registry, signatures,
//! archetype storage, system execution, and the world.
//!
//! ## Design Philosophy
//!
//! The ECS is designed around:
//!
//! - **Packed row storage** — one contiguous byte row per entity,
//! - **Signature-based matching** — bitsets over dense component ids,
//! - **Stable numeric identifiers** — small, copyable ids for every concept,
//! - **Fixed-size chunks** — 16 KiB aligned allocations carved into rows.
//!
//! ## Identifier Model
//!
//! All identifiers are plain integers assigned in registration or creation
//! order. They are dense, stable for the lifetime of the world, and never
//! reused except for entity ids, which are drawn from a recycled stack
//! before new ids are allocated.
//!
//! Component ids double as bit positions in [`Signature`] masks and as keys
//! into archetype layouts, so keeping them dense is load-bearing rather than
//! cosmetic.
//!
//! [`Signature`]: crate::engine::signature::Signature

/// Globally unique entity identifier.
pub type EntityId = u64;

/// Unique identifier for a registered component type, equal to its
/// registration order.
pub type ComponentId = u32;

/// Unique identifier for an archetype, equal to its creation order.
pub type ArchetypeId = u32;

/// Unique identifier for a system, equal to its registration order.
pub type SystemId = u32;

/// Chunk index within an archetype's chunk list.
pub type ChunkId = u32;

/// Row index within a chunk.
pub type RowId = u32;

/// Size in bytes of a single storage chunk.
///
/// Every chunk is exactly this large regardless of the family size it is
/// carved into; the row capacity is `CHUNK_BYTE_SIZE / family_size`.
pub const CHUNK_BYTE_SIZE: usize = 16 * 1024;

/// Number of bits per signature word.
pub const WORD_BITS: usize = u64::BITS as usize;

/// Returns `value` rounded up to the next multiple of `alignment`.
///
/// `alignment` must be a nonzero power of two.
#[inline]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}
