//! # Strata
//!
//! Archetype-based Entity-Component-System (ECS) core with
//! runtime-registered component types and packed row storage.
//!
//! ## Design Goals
//! - Archetype storage: entities grouped by exact component set
//! - Packed rows in fixed-size aligned chunks for cache-friendly iteration
//! - String-described component types: size and alignment, no Rust types
//! - Incremental archetype↔system matching
//! - Single-threaded, transactional world operations
//!
//! ## Usage Sketch
//! ```rust
//! use strata::prelude::*;
//!
//! let mut world = World::new();
//! world.register_type(TypeDesc::new("position", 8, 4)).unwrap();
//! world.register_type(TypeDesc::new("velocity", 8, 4)).unwrap();
//!
//! world
//!     .register_system(SystemDesc::new("integrate", "position, velocity", |ctx, dt| {
//!         let velocity = unsafe { *ctx.component_ref::<[f32; 2]>(1).unwrap() };
//!         let position = unsafe { ctx.component_mut::<[f32; 2]>(0).unwrap() };
//!         position[0] += velocity[0] * dt as f32;
//!         position[1] += velocity[1] * dt as f32;
//!     }))
//!     .unwrap();
//!
//! world.spawn(64, "position, velocity").unwrap();
//! world.step(0.016).unwrap();
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![deny(dead_code)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Core ECS types

pub use engine::world::World;

pub use engine::entity::{
    Entity,
    EntityLocation,
};

pub use engine::component::{
    TypeDesc,
    TypeRegistry,
};

pub use engine::signature::Signature;

pub use engine::layout::{
    FamilyLayout,
    LayoutSlot,
};

pub use engine::systems::{
    SystemCtx,
    SystemDesc,
    SystemFn,
};

pub use engine::error::{
    ECSError,
    ECSResult,
    EntityError,
    RegistryError,
    RequirementError,
    StorageError,
    SystemError,
};

pub use engine::types::{
    ArchetypeId,
    ComponentId,
    EntityId,
    SystemId,
    CHUNK_BYTE_SIZE,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude (Optional but recommended)
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used ECS types.
///
/// Import with:
/// ```rust
/// use strata::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ECSError,
        ECSResult,
        Entity,
        SystemCtx,
        SystemDesc,
        TypeDesc,
        World,
    };
}
