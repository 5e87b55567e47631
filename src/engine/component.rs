//! # Component Type Registry
//!
//! This module provides the world-owned registry that assigns dense
//! [`ComponentId`] values to component types described at runtime by a
//! string identifier, a size, and an alignment.
//!
//! ## Purpose
//! The registry decouples component identity from any compile-time type:
//! components are *descriptions*, not Rust types, which lets compositions
//! and system requirements be written as strings and resolved against
//! whatever the embedding application registered during setup.
//!
//! ## Design
//! - Types are registered once and assigned ids in registration order.
//! - The registry is append-only; types cannot be unregistered.
//! - Identifier lookup is a linear scan. Registration and requirement
//!   parsing are setup-phase operations, so the scan never sits on a hot
//!   path.
//!
//! ## Invariants
//! - Identifiers are unique.
//! - Ids are dense: `0..len()` are all valid.
//! - Every registered alignment is a nonzero power of two.

use log::debug;

use crate::engine::error::RegistryError;
use crate::engine::types::ComponentId;


/// Describes a component type registered with the world.
///
/// The identifier is copied on registration; the caller keeps ownership of
/// whatever storage the input string came from.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDesc {
    /// Unique identifier used in requirement and composition expressions.
    pub identifier: String,

    /// Size of the component in bytes. Zero is allowed.
    pub size: usize,

    /// Alignment of the component in bytes; a nonzero power of two.
    pub alignment: usize,
}

impl TypeDesc {
    /// Creates a descriptor from explicit metadata.
    pub fn new(identifier: impl Into<String>, size: usize, alignment: usize) -> Self {
        Self { identifier: identifier.into(), size, alignment }
    }
}

/// Append-only table of registered component types.
///
/// ## Invariants
/// - `types[id]` is the descriptor for component `id`.
/// - No two descriptors share an identifier.

#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: Vec<TypeDesc>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component type and returns its assigned id.
    ///
    /// ## Errors
    /// - `AlreadyRegistered` if the identifier collides with an existing
    ///   type; the registry is left unchanged.
    /// - `InvalidAlignment` if the alignment is zero or not a power of two.

    pub fn register(&mut self, desc: TypeDesc) -> Result<ComponentId, RegistryError> {
        if self.lookup(&desc.identifier).is_some() {
            return Err(RegistryError::AlreadyRegistered { identifier: desc.identifier });
        }

        if desc.alignment == 0 || !desc.alignment.is_power_of_two() {
            return Err(RegistryError::InvalidAlignment {
                identifier: desc.identifier,
                alignment: desc.alignment,
            });
        }

        let id = self.types.len() as ComponentId;
        debug!("type registered ({}, id {id})", desc.identifier);
        self.types.push(desc);
        Ok(id)
    }

    /// Resolves an identifier to its component id.
    pub fn lookup(&self, identifier: &str) -> Option<ComponentId> {
        self.types
            .iter()
            .position(|t| t.identifier == identifier)
            .map(|i| i as ComponentId)
    }

    /// Returns the descriptor for `id`, if registered.
    #[inline]
    pub fn get(&self, id: ComponentId) -> Option<&TypeDesc> {
        self.types.get(id as usize)
    }

    /// Size in bytes of component `id`.
    ///
    /// ## Panics
    /// Panics if `id` is unregistered; callers hold ids obtained from this
    /// registry, so an out-of-range id is a programming error.
    #[inline]
    pub fn size_of(&self, id: ComponentId) -> usize {
        self.types[id as usize].size
    }

    /// Alignment in bytes of component `id`.
    ///
    /// ## Panics
    /// Panics if `id` is unregistered.
    #[inline]
    pub fn alignment_of(&self, id: ComponentId) -> usize {
        self.types[id as usize].alignment
    }

    /// Number of registered types.
    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no types are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterates over `(id, descriptor)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, &TypeDesc)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, t)| (i as ComponentId, t))
    }
}
