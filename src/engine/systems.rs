//! # Systems and the Callback Context
//!
//! A **system** is a unit of user logic invoked once per entity row. At
//! registration it declares a requirement expression; the parsed masks
//! drive archetype matching, and the ordered positive requirements define
//! the component indices the callback sees.
//!
//! ## Execution Model
//!
//! Systems are closures over a [`SystemCtx`]: for every row of every
//! matching archetype the world builds a context bundling the row base
//! pointer, the per-requirement byte offsets (recomputed per archetype
//! visit into a preallocated scratch vector), and the system's user data,
//! then calls the closure with the caller-supplied `dt`.
//!
//! The context is deliberately thin: component access is pointer
//! arithmetic, `row_base + offsets[index]`, where `index` is the position
//! of the component in the system's positive requirement list. Typed
//! accessors are `unsafe` because the engine stores bytes, not Rust types;
//! the caller asserts the component was registered with the layout of `T`.
//!
//! ## User Data
//!
//! A system may carry one opaque `Box<dyn Any>` payload, set at
//! registration. Callbacks downcast it with [`SystemCtx::user_data_mut`];
//! sharing state with the embedder is done by storing an `Rc`.

use std::any::Any;
use std::ptr::NonNull;

use crate::engine::signature::Signature;
use crate::engine::types::{ArchetypeId, ComponentId};


/// Callback signature: one invocation per entity row.
pub type SystemFn = Box<dyn FnMut(&mut SystemCtx<'_>, f64)>;

/// Everything needed to register a system.
pub struct SystemDesc {
    /// Unique identifier the system is invoked by.
    pub identifier: String,

    /// Requirement expression, e.g. `"position, velocity, !frozen"`.
    pub requirements: String,

    /// The per-row callback.
    pub func: SystemFn,

    /// Optional opaque payload exposed to the callback.
    pub user_data: Option<Box<dyn Any>>,
}

impl SystemDesc {
    /// Creates a descriptor without user data.
    pub fn new(
        identifier: impl Into<String>,
        requirements: impl Into<String>,
        func: impl FnMut(&mut SystemCtx<'_>, f64) + 'static,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            requirements: requirements.into(),
            func: Box::new(func),
            user_data: None,
        }
    }

    /// Attaches an opaque payload retrievable via
    /// [`SystemCtx::user_data_mut`].
    pub fn with_user_data(mut self, user_data: impl Any) -> Self {
        self.user_data = Some(Box::new(user_data));
        self
    }
}

/// A registered system.
pub struct System {
    /// Unique identifier.
    pub identifier: String,

    /// Types every matched archetype must contain.
    pub must_have: Signature,

    /// Types every matched archetype must not contain.
    pub must_not_have: Signature,

    /// Positive requirements in expression order; defines callback
    /// component indices.
    pub types: Vec<ComponentId>,

    /// Per-requirement byte offsets, rewritten on each archetype visit.
    pub offsets: Vec<usize>,

    /// The per-row callback.
    pub func: SystemFn,

    /// Optional opaque payload.
    pub user_data: Option<Box<dyn Any>>,

    /// Archetypes this system matches, in match-insertion order.
    pub archetypes: Vec<ArchetypeId>,
}

/// Per-invocation view of one entity row.
///
/// Lives only for the duration of a single callback invocation.
pub struct SystemCtx<'a> {
    row: NonNull<u8>,
    offsets: &'a [usize],
    user_data: Option<&'a mut dyn Any>,
}

impl<'a> SystemCtx<'a> {
    pub(crate) fn new(
        row: NonNull<u8>,
        offsets: &'a [usize],
        user_data: Option<&'a mut dyn Any>,
    ) -> Self {
        Self { row, offsets, user_data }
    }

    /// Base pointer of the row being visited.
    #[inline]
    pub fn row_ptr(&self) -> NonNull<u8> {
        self.row
    }

    /// Number of positive requirements (valid component indices).
    #[inline]
    pub fn component_count(&self) -> usize {
        self.offsets.len()
    }

    /// Pointer to the `index`-th required component's bytes, or `None` if
    /// the index is out of range.
    #[inline]
    pub fn component_ptr(&self, index: usize) -> Option<NonNull<u8>> {
        let offset = *self.offsets.get(index)?;
        // SAFETY: the offset lies within the row per the family layout.
        Some(unsafe { NonNull::new_unchecked(self.row.as_ptr().add(offset)) })
    }

    /// Typed shared view of the `index`-th required component.
    ///
    /// ## Safety
    /// `T` must match the size and alignment the component was registered
    /// with, and no mutable reference to the same bytes may be live.
    #[inline]
    pub unsafe fn component_ref<T>(&self, index: usize) -> Option<&T> {
        // SAFETY: forwarded to the caller's contract.
        self.component_ptr(index).map(|ptr| unsafe { &*ptr.as_ptr().cast::<T>() })
    }

    /// Typed exclusive view of the `index`-th required component.
    ///
    /// ## Safety
    /// `T` must match the size and alignment the component was registered
    /// with, and no other reference to the same bytes may be live.
    #[inline]
    pub unsafe fn component_mut<T>(&mut self, index: usize) -> Option<&mut T> {
        // SAFETY: forwarded to the caller's contract.
        self.component_ptr(index).map(|ptr| unsafe { &mut *ptr.as_ptr().cast::<T>() })
    }

    /// Downcasts the system's user data payload.
    #[inline]
    pub fn user_data_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.user_data.as_mut().and_then(|data| data.downcast_mut::<T>())
    }
}
