//! Controller implementation
//!
//! The controller owns the system registry, drives the per-frame tick pass,
//! and routes entity traffic: spawning binds a component value to its
//! system's collection, despawning runs the destroy protocol through an
//! opaque handle. It also forwards deferred-task requests to the configured
//! [`TaskScheduler`] and, when enabled, samples per-tick statistics.

use std::any::TypeId;
use std::time::Duration;

use crate::config::ControllerConfig;
use crate::foundation::time::Stopwatch;
use crate::tasks::{FrameScheduler, TaskHandle, TaskRoutine, TaskScheduler};

use super::component::Component;
use super::entity::EntityRef;
use super::error::{EngineError, EngineResult};
use super::registry::SystemRegistry;
use super::storage::EntityList;
use super::system::System;

/// Frame driver owning the set of live systems
///
/// Systems tick in registration order, once per [`Controller::tick`] call.
/// The one-time `on_initialize` pass runs before the first tick — either
/// explicitly through [`Controller::initialize`] or lazily on the first
/// tick.
pub struct Controller {
    registry: SystemRegistry,
    scheduler: Box<dyn TaskScheduler>,
    config: ControllerConfig,
    stats: ControllerStats,
    initialized: bool,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    /// Create a controller with default configuration
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    /// Create a controller with custom configuration
    pub fn with_config(config: ControllerConfig) -> Self {
        Self {
            registry: SystemRegistry::new(),
            scheduler: Box::new(FrameScheduler::new()),
            config,
            stats: ControllerStats::default(),
            initialized: false,
        }
    }

    /// Replace the task scheduler collaborator
    pub fn with_scheduler(mut self, scheduler: Box<dyn TaskScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Register a system instance; at most one per system type
    ///
    /// Systems registered after initialization get their one-time
    /// `on_initialize` hook immediately.
    pub fn register<S: System>(&mut self, system: S) -> EngineResult<()> {
        self.registry.register(system)?;
        if self.initialized {
            self.registry.setup_all()?;
        }
        Ok(())
    }

    /// Run every system's one-time `on_initialize` hook, in order
    ///
    /// Idempotent; ticking calls this automatically if it has not run yet.
    pub fn initialize(&mut self) -> EngineResult<()> {
        if !self.initialized {
            log::info!("initializing {} systems", self.registry.len());
            self.registry.setup_all()?;
            self.initialized = true;
        }
        Ok(())
    }

    /// Drive one frame: tick every system in registration order, then let
    /// the task scheduler make progress
    ///
    /// A failing hook aborts the pass immediately and its error surfaces
    /// here unmodified; remaining systems are not ticked this frame.
    pub fn tick(&mut self) -> EngineResult<()> {
        if !self.initialized {
            self.initialize()?;
        }
        let watch = Stopwatch::start_new();
        self.registry.tick_all()?;
        self.scheduler.advance();
        if self.config.enable_stats {
            self.stats.record(
                watch.elapsed(),
                self.registry.len(),
                self.registry.total_entities(),
            );
        }
        Ok(())
    }

    /// Resolve the live instance of a system type
    pub fn resolve<S: System>(&self) -> EngineResult<&S> {
        self.registry.resolve::<S>()
    }

    /// Resolve the live instance of a system type, mutably
    pub fn resolve_mut<S: System>(&mut self) -> EngineResult<&mut S> {
        self.registry.resolve_mut::<S>()
    }

    /// The live component collection of a system type
    pub fn entities<S: System>(&self) -> EngineResult<&EntityList<S::Component>> {
        self.registry.entities::<S>()
    }

    /// The live component collection of a system type, mutably
    pub fn entities_mut<S: System>(&mut self) -> EngineResult<&mut EntityList<S::Component>> {
        self.registry.entities_mut::<S>()
    }

    /// Enable or disable a system; hooks fire at its next tick
    pub fn set_enabled<S: System>(&mut self, enabled: bool) -> EngineResult<()> {
        self.registry.set_enabled::<S>(enabled)
    }

    /// Whether a system is currently enabled
    pub fn is_enabled<S: System>(&self) -> EngineResult<bool> {
        self.registry.is_enabled::<S>()
    }

    /// Spawn a component, binding it to its system's collection
    ///
    /// Routing is by component type; fails with
    /// [`EngineError::UnroutedComponent`] when no system manages the type
    /// and with [`EngineError::EntityLimit`] when the configured cap is
    /// reached.
    pub fn spawn<C: Component>(&mut self, component: C) -> EngineResult<EntityRef> {
        if self.registry.total_entities() >= self.config.max_entities {
            return Err(EngineError::EntityLimit(self.config.max_entities));
        }
        let cell = self.registry.route_cell_mut::<C>()?;
        let id = cell.add(component)?;
        log::trace!("spawned entity {id:?}");
        Ok(EntityRef::new(TypeId::of::<C>(), id))
    }

    /// Spawn a component built from its `Default` value
    pub fn spawn_default<C: Component + Default>(&mut self) -> EngineResult<EntityRef> {
        self.spawn(C::default())
    }

    /// Spawn a copy of an existing entity's component
    ///
    /// The clone registers at the tail of its system's order, like any
    /// other spawn.
    pub fn spawn_cloned<C: Component + Clone>(&mut self, source: EntityRef) -> EngineResult<EntityRef> {
        if source.route() != TypeId::of::<C>() {
            return Err(EngineError::StaleEntity);
        }
        let value = self
            .registry
            .route_cell::<C>()?
            .entities()
            .get(source.id())
            .cloned()
            .ok_or(EngineError::StaleEntity)?;
        self.spawn(value)
    }

    /// Destroy an entity, running the will-destroy protocol
    pub fn despawn(&mut self, entity: EntityRef) -> EngineResult<()> {
        let cell = self
            .registry
            .route_erased_mut(entity.route())
            .ok_or(EngineError::StaleEntity)?;
        cell.remove_entity(entity.id())
    }

    /// Typed access to an entity's component
    pub fn component<C: Component>(&self, entity: EntityRef) -> EngineResult<&C> {
        if entity.route() != TypeId::of::<C>() {
            return Err(EngineError::StaleEntity);
        }
        self.registry
            .route_cell::<C>()?
            .entities()
            .get(entity.id())
            .ok_or(EngineError::StaleEntity)
    }

    /// Typed mutable access to an entity's component
    pub fn component_mut<C: Component>(&mut self, entity: EntityRef) -> EngineResult<&mut C> {
        if entity.route() != TypeId::of::<C>() {
            return Err(EngineError::StaleEntity);
        }
        self.registry
            .route_cell_mut::<C>()?
            .entities_mut()
            .get_mut(entity.id())
            .ok_or(EngineError::StaleEntity)
    }

    /// Forward a deferred routine to the task scheduler
    pub fn start_task(&mut self, routine: TaskRoutine) -> TaskHandle {
        self.scheduler.start_task(routine)
    }

    /// Forward a stop request to the task scheduler
    pub fn stop_task(&mut self, handle: TaskHandle) -> bool {
        self.scheduler.stop_task(handle)
    }

    /// Number of registered systems
    pub fn system_count(&self) -> usize {
        self.registry.len()
    }

    /// Total live entities across all systems
    pub fn entity_count(&self) -> usize {
        self.registry.total_entities()
    }

    /// Current tick statistics
    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }
}

/// Per-tick statistics sampled by the controller
#[derive(Debug, Clone, Default)]
pub struct ControllerStats {
    /// Ticks driven since creation
    pub tick_count: u64,

    /// Registered systems at the last tick
    pub system_count: usize,

    /// Live entities at the last tick
    pub entity_count: usize,

    /// Duration of the last tick in microseconds
    pub last_tick_us: u64,

    /// Recent tick durations for the rolling average
    tick_samples: Vec<Duration>,
}

impl ControllerStats {
    /// Number of samples kept for the rolling average
    const MAX_SAMPLES: usize = 60;

    fn record(&mut self, elapsed: Duration, systems: usize, entities: usize) {
        self.tick_count += 1;
        self.system_count = systems;
        self.entity_count = entities;
        self.last_tick_us = elapsed.as_micros() as u64;

        self.tick_samples.push(elapsed);
        if self.tick_samples.len() > Self::MAX_SAMPLES {
            self.tick_samples.remove(0);
        }
    }

    /// Rolling-average tick duration in microseconds
    pub fn average_tick_us(&self) -> u64 {
        if self.tick_samples.is_empty() {
            return 0;
        }
        let total: Duration = self.tick_samples.iter().sum();
        (total.as_micros() / self.tick_samples.len() as u128) as u64
    }
}
