//! Error types for the ECS runtime

use thiserror::Error;

/// Convenience alias for results produced by the ECS runtime and user hooks.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-level errors
///
/// User hooks return [`EngineResult`] and may surface any of these variants;
/// the runtime itself never catches or retries a failing hook, so whatever a
/// hook returns reaches the controller's tick boundary unmodified.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// No live system instance is registered for the requested system type
    #[error("no system registered for {0}")]
    UnresolvedSystem(&'static str),

    /// A second instance of an already-registered system type was rejected
    #[error("system {0} is already registered")]
    DuplicateSystem(&'static str),

    /// No registered system manages the given component type
    #[error("no registered system manages components of type {0}")]
    UnroutedComponent(&'static str),

    /// The entity behind a handle has already been destroyed
    #[error("entity is no longer alive")]
    StaleEntity,

    /// Spawning would exceed the configured entity limit
    #[error("entity limit of {0} reached")]
    EntityLimit(usize),

    /// A user hook failed with a custom message
    #[error("system hook failed: {0}")]
    Hook(String),
}
