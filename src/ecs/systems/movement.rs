use crate::ecs::world::Tables;
use crate::ecs::{ComponentKind, ComponentMask, EntityId, World};
use crate::ecs::systems::{Frame, System, SystemKind};
use crate::error::EngineError;

/// Integrates velocity into position and decays velocity toward zero.
///
/// Pushes the position history once per entity per frame *before* moving, so
/// the collision probe can roll a colliding entity back to where it stood at
/// the start of the frame.
pub struct MovementSystem {
    failed: bool,
}

fn required() -> ComponentMask {
    ComponentMask::of(&[ComponentKind::Position, ComponentKind::Velocity])
}

impl MovementSystem {
    pub fn new() -> Self {
        Self { failed: true }
    }
}

impl Default for MovementSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for MovementSystem {
    fn kind(&self) -> SystemKind {
        SystemKind::Movement
    }

    fn init(&mut self, world: &World) -> Result<(), EngineError> {
        log::debug!("initializing movement system...");
        self.failed = true;

        if world.positions().is_none() {
            return Err(EngineError::MissingComponent(ComponentKind::Position));
        }
        if world.velocities().is_none() {
            return Err(EngineError::MissingComponent(ComponentKind::Velocity));
        }

        self.failed = false;
        log::debug!("initializing movement system... done");
        Ok(())
    }

    fn update_entity(&mut self, world: &mut World, frame: &mut Frame<'_>, entity: EntityId) {
        if self.failed || !world.mask(entity).contains_all(required()) {
            return;
        }
        let Tables { position: Some(positions), velocity: Some(velocities), .. } =
            &mut world.tables
        else {
            return;
        };

        let idx = entity as usize;
        let vel = &mut velocities[idx];
        if vel.max_speed > 0.0 {
            vel.x = vel.x.clamp(-vel.max_speed, vel.max_speed);
            vel.y = vel.y.clamp(-vel.max_speed, vel.max_speed);
        }

        let pos = &mut positions[idx];
        pos.push_history();
        pos.x += vel.x * frame.dt;
        pos.y += vel.y * frame.dt;

        // Friction pulls each axis toward zero, clamped so it never
        // overshoots into the opposite direction.
        if vel.x > 0.0 {
            vel.x = (vel.x - vel.friction).max(0.0);
        } else if vel.x < 0.0 {
            vel.x = (vel.x + vel.friction).min(0.0);
        }
        if vel.y > 0.0 {
            vel.y = (vel.y - vel.friction).max(0.0);
        } else if vel.y < 0.0 {
            vel.y = (vel.y + vel.friction).min(0.0);
        }
    }
}
