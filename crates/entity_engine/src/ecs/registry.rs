//! System registry
//!
//! The registry owns every live system instance, keyed by the component
//! type it manages. That key doubles as the spawn route: given a component
//! value, the owning system is found by type id, never by a global
//! singleton. Registration order is preserved and is the tick order.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

use super::component::Component;
use super::entity::EntityId;
use super::error::{EngineError, EngineResult};
use super::storage::EntityList;
use super::system::{System, SystemCell};

/// Object-safe view of a [`SystemCell`], used for erased ticking and routing
pub(crate) trait AnySystem: Any {
    fn setup(&mut self) -> EngineResult<()>;
    fn tick(&mut self) -> EngineResult<()>;
    fn set_enabled(&mut self, enabled: bool);
    fn is_enabled(&self) -> bool;
    fn entity_count(&self) -> usize;
    fn system_name(&self) -> &'static str;
    fn remove_entity(&mut self, id: EntityId) -> EngineResult<()>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: System> AnySystem for SystemCell<S> {
    fn setup(&mut self) -> EngineResult<()> {
        Self::setup(self)
    }

    fn tick(&mut self) -> EngineResult<()> {
        Self::tick(self)
    }

    fn set_enabled(&mut self, enabled: bool) {
        Self::set_enabled(self, enabled);
    }

    fn is_enabled(&self) -> bool {
        Self::is_enabled(self)
    }

    fn entity_count(&self) -> usize {
        self.entities().len()
    }

    fn system_name(&self) -> &'static str {
        type_name::<S>()
    }

    fn remove_entity(&mut self, id: EntityId) -> EngineResult<()> {
        match self.remove(id)? {
            Some(_) => Ok(()),
            None => Err(EngineError::StaleEntity),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Registry of live system instances, one per component type
#[derive(Default)]
pub struct SystemRegistry {
    cells: HashMap<TypeId, Box<dyn AnySystem>>,
    order: Vec<TypeId>,
}

impl SystemRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered systems
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no systems are registered
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Total live entities across all systems
    pub fn total_entities(&self) -> usize {
        self.cells.values().map(|cell| cell.entity_count()).sum()
    }

    /// Whether a system of the given type is registered
    pub fn is_registered<S: System>(&self) -> bool {
        self.cells.contains_key(&TypeId::of::<S::Component>())
    }

    /// Register a system instance
    ///
    /// At most one instance per system type is allowed; a second
    /// registration fails with [`EngineError::DuplicateSystem`] and leaves
    /// the existing instance in place.
    pub fn register<S: System>(&mut self, system: S) -> EngineResult<()> {
        let route = TypeId::of::<S::Component>();
        if self.cells.contains_key(&route) {
            return Err(EngineError::DuplicateSystem(type_name::<S>()));
        }
        log::debug!("registered system {}", type_name::<S>());
        self.cells.insert(route, Box::new(SystemCell::new(system)));
        self.order.push(route);
        Ok(())
    }

    /// Resolve the live instance of a system type
    ///
    /// Returns the same instance on every call for as long as the registry
    /// lives; fails with [`EngineError::UnresolvedSystem`] when no instance
    /// of the type was registered.
    pub fn resolve<S: System>(&self) -> EngineResult<&S> {
        self.cell::<S>().map(SystemCell::user)
    }

    /// Resolve the live instance of a system type, mutably
    pub fn resolve_mut<S: System>(&mut self) -> EngineResult<&mut S> {
        self.cell_mut::<S>().map(SystemCell::user_mut)
    }

    /// The live component collection of a system type
    pub fn entities<S: System>(&self) -> EngineResult<&EntityList<S::Component>> {
        self.cell::<S>().map(SystemCell::entities)
    }

    /// The live component collection of a system type, mutably
    pub fn entities_mut<S: System>(&mut self) -> EngineResult<&mut EntityList<S::Component>> {
        self.cell_mut::<S>().map(SystemCell::entities_mut)
    }

    /// Enable or disable a system; the matching hooks fire at its next tick
    pub fn set_enabled<S: System>(&mut self, enabled: bool) -> EngineResult<()> {
        self.cell_mut::<S>().map(|cell| cell.set_enabled(enabled))
    }

    /// Whether a system is currently enabled
    pub fn is_enabled<S: System>(&self) -> EngineResult<bool> {
        self.cell::<S>().map(SystemCell::is_enabled)
    }

    /// Run the one-time initialization hook of every system, in order.
    pub(crate) fn setup_all(&mut self) -> EngineResult<()> {
        for route in &self.order {
            if let Some(cell) = self.cells.get_mut(route) {
                cell.setup()?;
            }
        }
        Ok(())
    }

    /// Tick every system in registration order.
    pub(crate) fn tick_all(&mut self) -> EngineResult<()> {
        for route in &self.order {
            if let Some(cell) = self.cells.get_mut(route) {
                cell.tick()?;
            }
        }
        Ok(())
    }

    fn cell<S: System>(&self) -> EngineResult<&SystemCell<S>> {
        self.cells
            .get(&TypeId::of::<S::Component>())
            .and_then(|cell| cell.as_any().downcast_ref())
            .ok_or(EngineError::UnresolvedSystem(type_name::<S>()))
    }

    fn cell_mut<S: System>(&mut self) -> EngineResult<&mut SystemCell<S>> {
        self.cells
            .get_mut(&TypeId::of::<S::Component>())
            .and_then(|cell| cell.as_any_mut().downcast_mut())
            .ok_or(EngineError::UnresolvedSystem(type_name::<S>()))
    }

    /// The cell that spawns of the given component type route to.
    pub(crate) fn route_cell<C: Component>(&self) -> EngineResult<&SystemCell<C::System>> {
        self.cells
            .get(&TypeId::of::<C>())
            .and_then(|cell| cell.as_any().downcast_ref())
            .ok_or(EngineError::UnroutedComponent(type_name::<C>()))
    }

    /// Mutable counterpart of [`SystemRegistry::route_cell`].
    pub(crate) fn route_cell_mut<C: Component>(&mut self) -> EngineResult<&mut SystemCell<C::System>> {
        self.cells
            .get_mut(&TypeId::of::<C>())
            .and_then(|cell| cell.as_any_mut().downcast_mut())
            .ok_or(EngineError::UnroutedComponent(type_name::<C>()))
    }

    /// Erased routing by stored type id, for handle-based despawn.
    pub(crate) fn route_erased_mut(&mut self, route: TypeId) -> Option<&mut dyn AnySystem> {
        self.cells.get_mut(&route).map(|cell| cell.as_mut())
    }
}
