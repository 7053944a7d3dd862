//! Entity handles

use std::any::TypeId;

use slotmap::new_key_type;

new_key_type! {
    /// Stable identifier of one entity component within its system's collection
    pub struct EntityId;
}

/// External handle to a spawned entity component
///
/// Pairs the owning system's routing key (the component type) with the
/// entity's slot id, so the controller can despawn or access the entity
/// without knowing its concrete types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    route: TypeId,
    id: EntityId,
}

impl EntityRef {
    pub(crate) fn new(route: TypeId, id: EntityId) -> Self {
        Self { route, id }
    }

    /// Get the entity's slot id within its owning system
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub(crate) fn route(&self) -> TypeId {
        self.route
    }
}
