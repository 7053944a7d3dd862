//! # Entity Engine
//!
//! A frame-driven entity-component lifecycle engine.
//!
//! ## Features
//!
//! - **Typed system/component pairing**: each component type belongs to
//!   exactly one system type, checked at compile time
//! - **Singleton-per-type registry**: one live system instance per type,
//!   resolved explicitly instead of through global state
//! - **Deterministic frame loop**: systems tick in registration order;
//!   entities dispatch in spawn order against a per-tick snapshot
//! - **Lifecycle hooks**: lazy one-time initialization, enable/disable
//!   edges, and per-entity add/destroy protocols
//! - **Deferred tasks**: frame-stepped routines behind a pluggable
//!   scheduler collaborator
//!
//! ## Quick Start
//!
//! ```rust
//! use entity_engine::prelude::*;
//!
//! struct Blinker {
//!     on: bool,
//! }
//!
//! impl Component for Blinker {
//!     type System = BlinkSystem;
//! }
//!
//! #[derive(Default)]
//! struct BlinkSystem;
//!
//! impl System for BlinkSystem {
//!     type Component = Blinker;
//!
//!     fn on_update(&mut self, entities: &mut EntityList<Blinker>) -> EngineResult<()> {
//!         for (_, blinker) in entities.iter_mut() {
//!             blinker.on = !blinker.on;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> EngineResult<()> {
//!     let mut controller = Controller::new();
//!     controller.register(BlinkSystem)?;
//!     let light = controller.spawn(Blinker { on: false })?;
//!     controller.tick()?;
//!     assert!(controller.component::<Blinker>(light)?.on);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod ecs;
pub mod foundation;
pub mod tasks;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ControllerConfig},
        ecs::{
            Component, Controller, ControllerStats, EngineError, EngineResult, EntityId,
            EntityList, EntityRef, System, SystemRegistry,
        },
        foundation::time::Timer,
        tasks::{FrameScheduler, TaskHandle, TaskRoutine, TaskScheduler, TaskStatus},
    };
}
