use std::collections::TryReserveError;

use thiserror::Error;

use crate::ecs::ComponentKind;
use crate::ecs::systems::SystemKind;

/// Recoverable failures surfaced by the engine.
///
/// Nothing in here terminates the process: allocation failures freeze entity
/// growth, missing dependencies disable the affected system, lookups miss
/// with a sentinel. Callers decide how degraded they are willing to run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Growing entity or component storage failed at the allocator.
    #[error("storage reallocation failed: {0}")]
    Alloc(#[from] TryReserveError),

    /// A previous growth failure disabled further entity creation.
    #[error("entity growth is disabled after an earlier allocation failure")]
    GrowthDisabled,

    /// The component kind is already registered for this scene.
    #[error("component kind {0:?} is already registered")]
    DuplicateComponent(ComponentKind),

    /// A required component table is not registered in the scene.
    #[error("scene has no {0:?} component table")]
    MissingComponent(ComponentKind),

    /// The scene has no isometric sub-engine (view + map) attached.
    #[error("scene has no isometric world attached")]
    MissingIsoWorld,

    /// The isometric world has no tile map.
    #[error("isometric world has no tile map")]
    MissingMap,

    /// Scene lookup by name missed.
    #[error("scene '{0}' was not found")]
    SceneNotFound(String),

    /// A system reported failure from its init hook.
    #[error("system {0:?} failed to initialize")]
    SystemInitFailed(SystemKind),
}
