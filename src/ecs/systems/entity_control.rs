use crate::ecs::components::Direction;
use crate::ecs::systems::{Frame, System, SystemKind};
use crate::ecs::world::Tables;
use crate::ecs::{ComponentKind, World};
use crate::error::EngineError;
use crate::input::{ActionMap, InputSource, KeyCode};

/// Logical inputs the controlled entity responds to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ControlAction {
    Up,
    Down,
    Left,
    Right,
}

/// Steers the controlled entity: maps held movement actions to the eight
/// isometric directions, writes the matching velocity, and switches between
/// the walk/idle animation states for the facing.
///
/// In the isometric projection "up" on screen means both world axes
/// decrease, so the cardinal actions set both velocity components.
pub struct EntityControlSystem {
    failed: bool,
    pub actions: ActionMap<ControlAction>,
}

impl EntityControlSystem {
    pub fn new() -> Self {
        let mut actions = ActionMap::new();
        actions.bind(ControlAction::Up, InputSource::Key(KeyCode::KeyW));
        actions.bind(ControlAction::Down, InputSource::Key(KeyCode::KeyS));
        actions.bind(ControlAction::Left, InputSource::Key(KeyCode::KeyA));
        actions.bind(ControlAction::Right, InputSource::Key(KeyCode::KeyD));
        actions.bind(ControlAction::Up, InputSource::Key(KeyCode::ArrowUp));
        actions.bind(ControlAction::Down, InputSource::Key(KeyCode::ArrowDown));
        actions.bind(ControlAction::Left, InputSource::Key(KeyCode::ArrowLeft));
        actions.bind(ControlAction::Right, InputSource::Key(KeyCode::ArrowRight));
        Self { failed: true, actions }
    }
}

impl Default for EntityControlSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn state_names(direction: Direction) -> (&'static str, &'static str) {
    match direction {
        Direction::Up => ("walkUp", "idleUp"),
        Direction::Down => ("walkDown", "idleDown"),
        Direction::Left => ("walkLeft", "idleLeft"),
        Direction::Right => ("walkRight", "idleRight"),
        Direction::UpLeft => ("walkUpLeft", "idleUpLeft"),
        Direction::UpRight => ("walkUpRight", "idleUpRight"),
        Direction::DownLeft => ("walkDownLeft", "idleDownLeft"),
        Direction::DownRight => ("walkDownRight", "idleDownRight"),
    }
}

impl System for EntityControlSystem {
    fn kind(&self) -> SystemKind {
        SystemKind::EntityControl
    }

    fn init(&mut self, world: &World) -> Result<(), EngineError> {
        log::debug!("initializing entity control system...");
        self.failed = true;

        for kind in [
            ComponentKind::Velocity,
            ComponentKind::Animation,
            ComponentKind::Collision,
        ] {
            if !world.tables.is_registered(kind) {
                return Err(EngineError::MissingComponent(kind));
            }
        }

        self.failed = false;
        log::debug!("initializing entity control system... done");
        Ok(())
    }

    fn update(&mut self, world: &mut World, frame: &mut Frame<'_>) {
        if self.failed {
            return;
        }
        let Some(ctrl) = world.controlled_entity() else {
            return;
        };
        let mask = world.mask(ctrl);
        if !mask.contains(ComponentKind::Velocity) {
            return;
        }

        let up = self.actions.is_held(ControlAction::Up, frame.input);
        let down = self.actions.is_held(ControlAction::Down, frame.input);
        let left = self.actions.is_held(ControlAction::Left, frame.input);
        let right = self.actions.is_held(ControlAction::Right, frame.input);

        let Tables {
            velocity: Some(velocities),
            animation: Some(animations),
            collision: Some(collisions),
            ..
        } = &mut world.tables
        else {
            return;
        };

        let idx = ctrl as usize;
        let colliding = mask.contains(ComponentKind::Collision) && collisions[idx].colliding;

        let direction = if right && down {
            velocities[idx].x = 100.0;
            Some(Direction::DownRight)
        } else if right && up {
            velocities[idx].y = -100.0;
            Some(Direction::UpRight)
        } else if left && up {
            velocities[idx].x = -100.0;
            Some(Direction::UpLeft)
        } else if left && down {
            velocities[idx].y = 100.0;
            Some(Direction::DownLeft)
        } else if up {
            velocities[idx].set(-100.0, -100.0);
            Some(Direction::Up)
        } else if down {
            velocities[idx].set(100.0, 100.0);
            Some(Direction::Down)
        } else if left {
            velocities[idx].set(-50.0, 50.0);
            Some(Direction::Left)
        } else if right {
            velocities[idx].set(50.0, -50.0);
            Some(Direction::Right)
        } else {
            None
        };

        if !mask.contains(ComponentKind::Animation) {
            return;
        }
        let anim = &mut animations[idx];
        match direction {
            Some(direction) => {
                anim.direction = direction;
                let (walk, idle) = state_names(direction);
                // A colliding entity is pushed back where it was; walking in
                // place looks wrong, so it shows the idle facing instead.
                anim.set_state(if colliding { idle } else { walk });
            }
            None => {
                let (_, idle) = state_names(anim.direction);
                anim.set_state(idle);
            }
        }
    }
}
