//! Component trait and capability lookup

use std::any::{Any, TypeId};

use super::system::System;

/// Trait for entity component types
///
/// A component type is bound to exactly one system type for its whole
/// lifetime; the associated-type pairing (`Self::System::Component == Self`)
/// makes a mismatched binding a compile error rather than a runtime one.
///
/// Components are plain data owned by their system's collection. Behavior
/// lives in the paired [`System`]'s hooks.
pub trait Component: Sized + 'static {
    /// The system type that manages components of this type
    type System: System<Component = Self>;

    /// Look up a co-located capability by type id
    ///
    /// Capabilities model "does this entity additionally expose X" queries,
    /// such as another facet living on the same logical entity. The default
    /// implementation exposes nothing; component types override this to
    /// surface the facets they carry.
    fn capability(&self, _capability: TypeId) -> Option<&dyn Any> {
        None
    }

    /// Typed capability accessor
    ///
    /// Absence is not an error: the result is `None` whenever the entity
    /// does not carry the requested capability.
    fn try_capability<T: Any>(&self) -> Option<&T> {
        self.capability(TypeId::of::<T>())
            .and_then(|any| any.downcast_ref::<T>())
    }
}
