pub mod animation;
pub mod collision;
pub mod entity_control;
pub mod movement;
pub mod render_iso;
pub mod world_control;

use crate::ecs::{EntityId, World};
use crate::error::EngineError;
use crate::input::InputState;
use crate::renderer::{Canvas, TextureCatalog};

pub use animation::AnimationSystem;
pub use collision::CollisionSystem;
pub use entity_control::{ControlAction, EntityControlSystem};
pub use movement::MovementSystem;
pub use render_iso::IsoRenderSystem;
pub use world_control::WorldControlSystem;

// ---------------------------------------------------------------------------
// Frame — per-frame collaborators handed to every system call
// ---------------------------------------------------------------------------

/// External collaborators for one frame: elapsed time, the polled input
/// snapshot, texture metadata, and the draw target. Systems receive this
/// fresh every call and never retain any of it.
pub struct Frame<'a> {
    pub dt: f32,
    pub input: &'a InputState,
    pub textures: &'a TextureCatalog,
    pub canvas: &'a mut dyn Canvas,
}

// ---------------------------------------------------------------------------
// System — the closed set of per-scene behaviors
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SystemKind {
    Movement,
    Collision,
    Animation,
    IsoRender,
    WorldControl,
    EntityControl,
}

/// Lifecycle and dispatch hooks shared by every system.
///
/// `init` runs once when the scene activates; a failure there permanently
/// disables the system (each hook becomes a no-op) and marks the scene's
/// registry failed. `update` runs once per frame before the entity pass;
/// `update_entity` once per live entity per frame, in registration order.
pub trait System {
    fn kind(&self) -> SystemKind;

    fn init(&mut self, world: &World) -> Result<(), EngineError>;

    fn update(&mut self, _world: &mut World, _frame: &mut Frame<'_>) {}

    fn update_entity(&mut self, _world: &mut World, _frame: &mut Frame<'_>, _entity: EntityId) {}

    /// Teardown hook; runs once when the scene is dropped.
    fn free(&mut self) {}
}

/// Construct the system variant for a kind.
pub fn build_system(kind: SystemKind) -> Box<dyn System> {
    match kind {
        SystemKind::Movement => Box::new(MovementSystem::new()),
        SystemKind::Collision => Box::new(CollisionSystem::new()),
        SystemKind::Animation => Box::new(AnimationSystem::new()),
        SystemKind::IsoRender => Box::new(IsoRenderSystem::new()),
        SystemKind::WorldControl => Box::new(WorldControlSystem::new()),
        SystemKind::EntityControl => Box::new(EntityControlSystem::new()),
    }
}
