//! Error types for registration, storage, and system execution.
//!
//! This module declares focused, composable error types used across the
//! type registry, the requirement parser, archetype storage, and system
//! execution. Each error carries enough context to make failures actionable
//! while remaining small and cheap to pass around or convert into the
//! crate-level aggregate [`ECSError`].
//!
//! ## Goals
//! * **Specificity:** Each enum models the failure modes of a single
//!   subsystem (identifier collisions, unknown tokens, chunk allocation
//!   failures, matching-invariant violations).
//! * **Ergonomics:** All errors implement [`std::error::Error`] and
//!   [`fmt::Display`], and provide `From<T>` conversions into [`ECSError`]
//!   so world-level code can use `?` throughout.
//! * **Actionability:** Structured fields (the offending identifier, the
//!   requested byte count, the component and archetype involved) make logs
//!   useful without reproducing the issue.
//!
//! ## Display vs. Debug
//! * [`fmt::Display`] is optimized for operator logs (short, imperative
//!   phrasing).
//! * [`fmt::Debug`] (derived) retains full structure for diagnostics.

use std::fmt;

use crate::engine::types::{ArchetypeId, ComponentId, EntityId};


/// Errors raised while registering or resolving component types.
///
/// ### Variants
/// * `AlreadyRegistered` — A type with the same identifier exists; the
///   registry is left unchanged.
/// * `InvalidAlignment` — The declared alignment is zero or not a power of
///   two, so no layout containing the type could be computed.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {

    /// A type with this identifier is already registered.
    AlreadyRegistered {
        /// Identifier that collided.
        identifier: String,
    },

    /// The declared alignment is not a nonzero power of two.
    InvalidAlignment {
        /// Identifier of the offending type.
        identifier: String,

        /// Alignment that was rejected.
        alignment: usize,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::AlreadyRegistered { identifier } => {
                write!(f, "type with identifier already registered ({identifier})")
            }
            RegistryError::InvalidAlignment { identifier, alignment } => {
                write!(
                    f,
                    "type {identifier} declares alignment {alignment}; alignment must be a nonzero power of two"
                )
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Errors raised while parsing a requirement or composition expression.
///
/// Requirement expressions are comma-separated identifier lists, each token
/// optionally prefixed with `!`. Composition expressions accept positive
/// tokens only; a `!`-prefixed token fails identifier resolution and is
/// reported as [`RequirementError::UnknownType`], matching how the entity
/// mask populator treats it.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementError {

    /// A token did not resolve to a registered type identifier.
    UnknownType {
        /// The token as written (after whitespace stripping).
        token: String,
    },

    /// The expression names more types than are registered.
    TooManyRequirements {
        /// Number of tokens in the expression.
        requested: usize,

        /// Number of registered types.
        registered: usize,
    },
}

impl fmt::Display for RequirementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementError::UnknownType { token } => {
                write!(f, "required type does not exist in the world ({token})")
            }
            RequirementError::TooManyRequirements { requested, registered } => {
                write!(
                    f,
                    "more types requested than registered ({requested} requested; {registered} registered)"
                )
            }
        }
    }
}

impl std::error::Error for RequirementError {}

/// Errors raised by archetype row storage.
///
/// Chunk memory comes from the raw allocator; this is the one place the
/// crate can observe allocation failure rather than aborting, so it is the
/// one place an `AllocFailed` survives as a value.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {

    /// The raw allocator returned null for a chunk request.
    AllocFailed {
        /// Requested allocation size in bytes.
        bytes: usize,

        /// Requested allocation alignment.
        alignment: usize,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::AllocFailed { bytes, alignment } => {
                write!(f, "chunk allocation failed ({bytes} bytes, alignment {alignment})")
            }
        }
    }
}

impl std::error::Error for StorageError {}

/// Errors raised when an operation names an entity that owns no storage.
///
/// An entity is stale once it has been despawned (or was never spawned);
/// its id may already belong to a different, live entity.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityError {

    /// The entity does not own a row.
    StaleEntity {
        /// Id that failed to resolve.
        entity: EntityId,
    },
}

impl fmt::Display for EntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityError::StaleEntity { entity } => {
                write!(f, "stale or dead entity reference ({entity})")
            }
        }
    }
}

impl std::error::Error for EntityError {}

/// Errors raised while registering or invoking systems.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemError {

    /// A system with this identifier is already registered.
    AlreadyRegistered {
        /// Identifier that collided.
        identifier: String,
    },

    /// No system with this identifier exists.
    UnknownSystem {
        /// Identifier that failed to resolve.
        identifier: String,
    },

    /// A matched archetype's layout lacks an offset for a required type.
    ///
    /// This indicates a violated matching invariant rather than a
    /// recoverable runtime condition.
    MissingOffset {
        /// Component whose offset was absent.
        component_id: ComponentId,

        /// Archetype that was being visited.
        archetype_id: ArchetypeId,
    },
}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemError::AlreadyRegistered { identifier } => {
                write!(f, "system with identifier already registered ({identifier})")
            }
            SystemError::UnknownSystem { identifier } => {
                write!(f, "no system registered with identifier ({identifier})")
            }
            SystemError::MissingOffset { component_id, archetype_id } => {
                write!(
                    f,
                    "archetype {archetype_id} matched a system but has no offset for component {component_id}"
                )
            }
        }
    }
}

impl std::error::Error for SystemError {}

/// Aggregate error for all world-level operations.
///
/// `From<T>` conversions are implemented for every subsystem error so
/// orchestration code can write `?` and still return a single, expressive
/// type. Callers that need control flow can match on the variant; callers
/// that only log can use `Display`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ECSError {

    /// Type registration or resolution failed.
    Registry(RegistryError),

    /// A requirement or composition expression was rejected.
    Requirement(RequirementError),

    /// Archetype storage could not allocate a chunk.
    Storage(StorageError),

    /// An entity reference was stale.
    Entity(EntityError),

    /// System registration or invocation failed.
    System(SystemError),
}

impl fmt::Display for ECSError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ECSError::Registry(e) => write!(f, "{e}"),
            ECSError::Requirement(e) => write!(f, "{e}"),
            ECSError::Storage(e) => write!(f, "{e}"),
            ECSError::Entity(e) => write!(f, "{e}"),
            ECSError::System(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ECSError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ECSError::Registry(e) => Some(e),
            ECSError::Requirement(e) => Some(e),
            ECSError::Storage(e) => Some(e),
            ECSError::Entity(e) => Some(e),
            ECSError::System(e) => Some(e),
        }
    }
}

impl From<RegistryError> for ECSError {
    fn from(e: RegistryError) -> Self { ECSError::Registry(e) }
}
impl From<RequirementError> for ECSError {
    fn from(e: RequirementError) -> Self { ECSError::Requirement(e) }
}
impl From<StorageError> for ECSError {
    fn from(e: StorageError) -> Self { ECSError::Storage(e) }
}
impl From<EntityError> for ECSError {
    fn from(e: EntityError) -> Self { ECSError::Entity(e) }
}
impl From<SystemError> for ECSError {
    fn from(e: SystemError) -> Self { ECSError::System(e) }
}

/// Convenience alias used by all fallible world operations.
pub type ECSResult<T> = Result<T, ECSError>;
