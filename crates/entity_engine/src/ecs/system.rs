//! System trait and per-system runtime
//!
//! A system is the per-type manager for one component type: it owns the
//! ordered collection of that type's live components and runs their shared
//! lifecycle. User code implements [`System`] and overrides the hooks it
//! cares about; the runtime drives them through [`SystemCell`], a small
//! state machine that guarantees
//!
//! - one-time initialization happens lazily on the first tick, never at
//!   construction, so construction order cannot trigger cross-system calls;
//! - enable/disable hooks fire exactly once per transition, at a tick
//!   boundary;
//! - per-entity hooks fire in registration order against an order snapshot
//!   taken at tick entry, so removals from inside hooks neither skip nor
//!   double-dispatch the remaining entities.

use super::component::Component;
use super::entity::EntityId;
use super::error::EngineResult;
use super::storage::{EntityFlags, EntityList};

/// Trait for system types
///
/// Every hook has a no-op default; a minimal system is just
/// `impl System for MySystem { type Component = MyComponent; }`. Hooks are
/// fallible: an `Err` aborts the current tick and reaches the controller
/// unmodified.
pub trait System: Sized + 'static {
    /// The component type this system manages
    type Component: Component<System = Self>;

    /// Invoked once, before any ticks, when the controller initializes
    fn on_initialize(&mut self) -> EngineResult<()> {
        Ok(())
    }

    /// Invoked on the system's first tick, before any entity dispatch
    fn on_initialized(&mut self) -> EngineResult<()> {
        Ok(())
    }

    /// Invoked when the system becomes enabled (including on the first
    /// tick, if it is enabled then)
    fn on_enabled(&mut self) -> EngineResult<()> {
        Ok(())
    }

    /// Invoked when the system becomes disabled
    fn on_disabled(&mut self) -> EngineResult<()> {
        Ok(())
    }

    /// Consulted each tick before [`System::on_update`] runs
    fn should_update(&self) -> bool {
        true
    }

    /// Per-frame update over the system's live components
    fn on_update(&mut self, _entities: &mut EntityList<Self::Component>) -> EngineResult<()> {
        Ok(())
    }

    /// Invoked when an entity is added, after the list bookkeeping updated
    fn on_entity_initialize(
        &mut self,
        _entities: &mut EntityList<Self::Component>,
        _entity: EntityId,
    ) -> EngineResult<()> {
        Ok(())
    }

    /// Invoked at an entity's first dispatch
    fn on_entity_initialized(
        &mut self,
        _entities: &mut EntityList<Self::Component>,
        _entity: EntityId,
    ) -> EngineResult<()> {
        Ok(())
    }

    /// Invoked when an entity becomes enabled
    fn on_entity_enabled(
        &mut self,
        _entities: &mut EntityList<Self::Component>,
        _entity: EntityId,
    ) -> EngineResult<()> {
        Ok(())
    }

    /// Invoked when an entity becomes disabled
    fn on_entity_disabled(
        &mut self,
        _entities: &mut EntityList<Self::Component>,
        _entity: EntityId,
    ) -> EngineResult<()> {
        Ok(())
    }

    /// Invoked while a destroyed entity is still in the collection
    ///
    /// At this point the list's count and emptiness already reflect the
    /// removal, but the entry itself is not yet gone and the cached head
    /// is not yet recomputed.
    fn on_entity_will_destroy(
        &mut self,
        _entities: &mut EntityList<Self::Component>,
        _entity: EntityId,
    ) -> EngineResult<()> {
        Ok(())
    }
}

/// Runtime state for one registered system
pub(crate) struct SystemCell<S: System> {
    user: S,
    entities: EntityList<S::Component>,
    enabled: bool,
    was_enabled: bool,
    initialized: bool,
    setup_done: bool,
}

impl<S: System> SystemCell<S> {
    pub(crate) fn new(user: S) -> Self {
        Self {
            user,
            entities: EntityList::new(),
            enabled: true,
            was_enabled: true,
            initialized: false,
            setup_done: false,
        }
    }

    pub(crate) fn user(&self) -> &S {
        &self.user
    }

    pub(crate) fn user_mut(&mut self) -> &mut S {
        &mut self.user
    }

    pub(crate) fn entities(&self) -> &EntityList<S::Component> {
        &self.entities
    }

    pub(crate) fn entities_mut(&mut self) -> &mut EntityList<S::Component> {
        &mut self.entities
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the system; pure state, hooks fire at tick time.
    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Run the controller-time initialization hook, once.
    pub(crate) fn setup(&mut self) -> EngineResult<()> {
        if !self.setup_done {
            self.user.on_initialize()?;
            self.setup_done = true;
        }
        Ok(())
    }

    /// Append a component and run the add protocol.
    pub(crate) fn add(&mut self, value: S::Component) -> EngineResult<EntityId> {
        let id = self.entities.insert(value);
        self.user.on_entity_initialize(&mut self.entities, id)?;
        self.drain_pending()?;
        Ok(id)
    }

    /// Run the destroy protocol for one entity right now.
    ///
    /// Returns the removed component, or `None` if the entity was already
    /// gone. Counts change before the hook, the entry is removed after it;
    /// a failing hook still completes the physical removal before its error
    /// propagates, so the collection is never left half-removed.
    pub(crate) fn remove(&mut self, id: EntityId) -> EngineResult<Option<S::Component>> {
        if !self.entities.begin_remove(id) {
            return Ok(None);
        }
        let hook = self.user.on_entity_will_destroy(&mut self.entities, id);
        let value = self.entities.finish_remove(id);
        hook?;
        Ok(value)
    }

    /// One frame of this system: lazy init, enable edges, entity dispatch,
    /// then the system-wide update.
    pub(crate) fn tick(&mut self) -> EngineResult<()> {
        self.drain_pending()?;

        if !self.initialized {
            self.user.on_initialized()?;
            if self.enabled {
                self.user.on_enabled()?;
            }
            self.initialized = true;
            self.was_enabled = self.enabled;
        } else if self.enabled != self.was_enabled {
            if self.enabled {
                self.user.on_enabled()?;
            } else {
                self.user.on_disabled()?;
            }
            self.was_enabled = self.enabled;
        }

        // Snapshot the order at loop entry: entities added mid-tick wait for
        // the next frame, removed ones are skipped by the liveness check.
        for id in self.entities.order_snapshot() {
            if !self.entities.is_live(id) {
                continue;
            }
            self.dispatch_entity(id)?;
            self.drain_pending()?;
        }

        if self.enabled && self.user.should_update() {
            self.user.on_update(&mut self.entities)?;
            self.drain_pending()?;
        }

        Ok(())
    }

    /// Per-entity lifecycle step: first-dispatch hooks, then enable edges.
    fn dispatch_entity(&mut self, id: EntityId) -> EngineResult<()> {
        let Some(flags) = self.entities.flags(id) else {
            return Ok(());
        };

        if !flags.contains(EntityFlags::INITIALIZED) {
            self.user.on_entity_initialized(&mut self.entities, id)?;
            // The hook may have despawned or re-toggled the entity.
            if !self.entities.is_live(id) {
                return Ok(());
            }
            let Some(flags) = self.entities.flags(id) else {
                return Ok(());
            };
            let enabled = flags.contains(EntityFlags::ENABLED);
            if enabled {
                self.user.on_entity_enabled(&mut self.entities, id)?;
            }
            self.entities.update_flags(id, |f| {
                f.insert(EntityFlags::INITIALIZED);
                f.set(EntityFlags::WAS_ENABLED, enabled);
            });
        } else {
            let enabled = flags.contains(EntityFlags::ENABLED);
            let was_enabled = flags.contains(EntityFlags::WAS_ENABLED);
            if enabled != was_enabled {
                if enabled {
                    self.user.on_entity_enabled(&mut self.entities, id)?;
                } else {
                    self.user.on_entity_disabled(&mut self.entities, id)?;
                }
                self.entities
                    .update_flags(id, |f| f.set(EntityFlags::WAS_ENABLED, enabled));
            }
        }
        Ok(())
    }

    /// Run the destroy protocol for every queued despawn request.
    fn drain_pending(&mut self) -> EngineResult<()> {
        while let Some(id) = self.entities.take_pending() {
            self.remove(id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::error::EngineError;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        fail_update: bool,
        despawn_on_visit: Option<u32>,
        updates_allowed: bool,
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Tag(u32);

    impl Component for Tag {
        type System = Recorder;
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                updates_allowed: true,
                ..Self::default()
            }
        }

        fn push(&mut self, event: impl Into<String>) {
            self.events.push(event.into());
        }

        fn count_of(&self, event: &str) -> usize {
            self.events.iter().filter(|e| e.as_str() == event).count()
        }
    }

    impl System for Recorder {
        type Component = Tag;

        fn on_initialize(&mut self) -> EngineResult<()> {
            self.push("initialize");
            Ok(())
        }

        fn on_initialized(&mut self) -> EngineResult<()> {
            self.push("initialized");
            Ok(())
        }

        fn on_enabled(&mut self) -> EngineResult<()> {
            self.push("enabled");
            Ok(())
        }

        fn on_disabled(&mut self) -> EngineResult<()> {
            self.push("disabled");
            Ok(())
        }

        fn should_update(&self) -> bool {
            self.updates_allowed
        }

        fn on_update(&mut self, _entities: &mut EntityList<Tag>) -> EngineResult<()> {
            if self.fail_update {
                return Err(EngineError::Hook("update failed".to_string()));
            }
            self.push("update");
            Ok(())
        }

        fn on_entity_initialize(
            &mut self,
            entities: &mut EntityList<Tag>,
            entity: EntityId,
        ) -> EngineResult<()> {
            let tag = entities.get(entity).expect("entity just added").0;
            self.push(format!("entity-initialize {tag}"));
            Ok(())
        }

        fn on_entity_initialized(
            &mut self,
            entities: &mut EntityList<Tag>,
            entity: EntityId,
        ) -> EngineResult<()> {
            let tag = entities.get(entity).expect("entity dispatched").0;
            self.push(format!("visit {tag}"));
            if self.despawn_on_visit == Some(tag) {
                entities.despawn(entity);
            }
            Ok(())
        }

        fn on_entity_enabled(
            &mut self,
            entities: &mut EntityList<Tag>,
            entity: EntityId,
        ) -> EngineResult<()> {
            let tag = entities.get(entity).expect("entity dispatched").0;
            self.push(format!("entity-enabled {tag}"));
            Ok(())
        }

        fn on_entity_disabled(
            &mut self,
            entities: &mut EntityList<Tag>,
            entity: EntityId,
        ) -> EngineResult<()> {
            let tag = entities.get(entity).expect("entity dispatched").0;
            self.push(format!("entity-disabled {tag}"));
            Ok(())
        }

        fn on_entity_will_destroy(
            &mut self,
            entities: &mut EntityList<Tag>,
            entity: EntityId,
        ) -> EngineResult<()> {
            let tag = entities.get(entity).expect("entry still present").0;
            self.push(format!(
                "will-destroy {tag} len={} has={}",
                entities.len(),
                entities.has_entities()
            ));
            Ok(())
        }
    }

    fn cell_with(tags: &[u32]) -> (SystemCell<Recorder>, Vec<EntityId>) {
        let mut cell = SystemCell::new(Recorder::new());
        let ids = tags
            .iter()
            .map(|tag| cell.add(Tag(*tag)).expect("add should succeed"))
            .collect();
        cell.user_mut().events.clear();
        (cell, ids)
    }

    #[test]
    fn test_initialization_runs_exactly_once() {
        let (mut cell, _) = cell_with(&[]);
        for _ in 0..1000 {
            cell.tick().expect("tick should succeed");
        }
        assert_eq!(cell.user().count_of("initialized"), 1);
        assert_eq!(cell.user().count_of("enabled"), 1);
    }

    #[test]
    fn test_disabled_system_skips_enabled_hook_and_update() {
        let (mut cell, _) = cell_with(&[]);
        cell.set_enabled(false);
        cell.tick().expect("tick should succeed");
        assert_eq!(cell.user().count_of("initialized"), 1);
        assert_eq!(cell.user().count_of("enabled"), 0);
        assert_eq!(cell.user().count_of("update"), 0);
    }

    #[test]
    fn test_enable_edges_fire_once_per_transition() {
        let (mut cell, _) = cell_with(&[]);
        cell.tick().expect("first tick");
        cell.tick().expect("second tick");
        assert_eq!(cell.user().count_of("enabled"), 1);

        cell.set_enabled(false);
        cell.tick().expect("tick after disable");
        cell.tick().expect("steady disabled tick");
        assert_eq!(cell.user().count_of("disabled"), 1);

        cell.set_enabled(true);
        // Toggling twice between ticks is one observable transition at most;
        // here the state matches the last observed one, so nothing fires.
        cell.set_enabled(false);
        cell.tick().expect("tick after toggle");
        assert_eq!(cell.user().count_of("enabled"), 1);
        assert_eq!(cell.user().count_of("disabled"), 1);
    }

    #[test]
    fn test_should_update_gates_on_update() {
        let (mut cell, _) = cell_with(&[]);
        cell.user_mut().updates_allowed = false;
        cell.tick().expect("tick");
        assert_eq!(cell.user().count_of("update"), 0);

        cell.user_mut().updates_allowed = true;
        cell.tick().expect("tick");
        assert_eq!(cell.user().count_of("update"), 1);
    }

    #[test]
    fn test_entities_visited_in_registration_order() {
        let (mut cell, _) = cell_with(&[10, 20, 30]);
        cell.tick().expect("tick");
        let visits: Vec<&String> = cell
            .user()
            .events
            .iter()
            .filter(|e| e.starts_with("visit"))
            .collect();
        assert_eq!(visits, ["visit 10", "visit 20", "visit 30"]);
    }

    #[test]
    fn test_add_protocol_order() {
        let mut cell = SystemCell::new(Recorder::new());
        cell.add(Tag(7)).expect("add");
        // The initialize hook observed the updated bookkeeping.
        assert_eq!(cell.user().events, ["entity-initialize 7"]);
        assert_eq!(cell.entities().len(), 1);
        assert!(cell.entities().has_entities());
    }

    #[test]
    fn test_will_destroy_sees_fresh_counts_stale_collection() {
        let (mut cell, ids) = cell_with(&[1, 2]);
        let removed = cell.remove(ids[0]).expect("remove").expect("value");
        assert_eq!(removed, Tag(1));
        // len was already decremented while both entries were still present.
        assert_eq!(cell.user().events, ["will-destroy 1 len=1 has=true"]);
        assert_eq!(cell.entities().first(), Some(&Tag(2)));

        let removed = cell.remove(ids[1]).expect("remove").expect("value");
        assert_eq!(removed, Tag(2));
        assert_eq!(
            cell.user().events[1],
            "will-destroy 2 len=0 has=false".to_string()
        );
        assert!(cell.entities().first().is_none());

        // Removing an entity that is already gone is not an error.
        assert_eq!(cell.remove(ids[0]).expect("remove"), None);
    }

    #[test]
    fn test_mid_tick_despawn_neither_skips_nor_revisits() {
        let (mut cell, _) = cell_with(&[1, 2, 3]);
        // Entity 2 despawns itself during its own visit.
        cell.user_mut().despawn_on_visit = Some(2);
        cell.tick().expect("tick");

        let visits: Vec<&String> = cell
            .user()
            .events
            .iter()
            .filter(|e| e.starts_with("visit"))
            .collect();
        assert_eq!(visits, ["visit 1", "visit 2", "visit 3"]);
        assert_eq!(cell.user().count_of("will-destroy 2 len=2 has=true"), 1);
        assert_eq!(cell.entities().len(), 2);

        // The next tick revisits nobody and dispatches the survivors only.
        cell.user_mut().events.clear();
        cell.user_mut().despawn_on_visit = None;
        cell.tick().expect("tick");
        assert!(cell.user().events.iter().all(|e| !e.starts_with("visit")));
        assert_eq!(cell.entities().len(), 2);
    }

    #[test]
    fn test_entity_enable_edges() {
        let (mut cell, ids) = cell_with(&[5]);
        cell.tick().expect("first tick");
        assert_eq!(cell.user().count_of("entity-enabled 5"), 1);

        cell.entities_mut().set_enabled(ids[0], false);
        cell.tick().expect("tick after disable");
        assert_eq!(cell.user().count_of("entity-disabled 5"), 1);

        // Steady state: no further edge events.
        cell.tick().expect("steady tick");
        assert_eq!(cell.user().count_of("entity-enabled 5"), 1);
        assert_eq!(cell.user().count_of("entity-disabled 5"), 1);
    }

    #[test]
    fn test_entity_disabled_before_first_dispatch() {
        let (mut cell, ids) = cell_with(&[5]);
        cell.entities_mut().set_enabled(ids[0], false);
        cell.tick().expect("tick");
        assert_eq!(cell.user().count_of("visit 5"), 1);
        assert_eq!(cell.user().count_of("entity-enabled 5"), 0);

        cell.entities_mut().set_enabled(ids[0], true);
        cell.tick().expect("tick");
        assert_eq!(cell.user().count_of("entity-enabled 5"), 1);
    }

    #[test]
    fn test_failing_hook_aborts_tick() {
        let (mut cell, _) = cell_with(&[1]);
        cell.user_mut().fail_update = true;
        let err = cell.tick().expect_err("tick should fail");
        assert_eq!(err, EngineError::Hook("update failed".to_string()));
    }
}
