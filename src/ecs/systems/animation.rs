use crate::ecs::{ComponentKind, EntityId, World};
use crate::ecs::systems::{Frame, System, SystemKind};
use crate::error::EngineError;

/// Advances the active animation clip of every animated entity.
pub struct AnimationSystem {
    failed: bool,
}

impl AnimationSystem {
    pub fn new() -> Self {
        Self { failed: true }
    }
}

impl Default for AnimationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for AnimationSystem {
    fn kind(&self) -> SystemKind {
        SystemKind::Animation
    }

    fn init(&mut self, world: &World) -> Result<(), EngineError> {
        log::debug!("initializing animation system...");
        self.failed = true;

        if world.animations().is_none() {
            return Err(EngineError::MissingComponent(ComponentKind::Animation));
        }

        self.failed = false;
        log::debug!("initializing animation system... done");
        Ok(())
    }

    fn update_entity(&mut self, world: &mut World, frame: &mut Frame<'_>, entity: EntityId) {
        if self.failed || !world.mask(entity).contains(ComponentKind::Animation) {
            return;
        }
        let Some(animations) = world.animations_mut() else {
            return;
        };

        let anim = &mut animations[entity as usize];
        if let Some(state) = anim.state {
            anim.clips[state].advance(frame.dt);
        }
    }
}
