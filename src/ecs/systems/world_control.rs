use crate::ecs::systems::{Frame, System, SystemKind};
use crate::ecs::World;
use crate::error::EngineError;
use crate::input::KeyCode;
use crate::iso::ViewMode;

/// Camera control: wheel zoom, edge-of-screen scrolling in overview mode,
/// and the overview/follow toggle.
pub struct WorldControlSystem {
    failed: bool,
}

impl WorldControlSystem {
    pub fn new() -> Self {
        Self { failed: true }
    }
}

impl Default for WorldControlSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for WorldControlSystem {
    fn kind(&self) -> SystemKind {
        SystemKind::WorldControl
    }

    fn init(&mut self, world: &World) -> Result<(), EngineError> {
        log::debug!("initializing world control system...");
        self.failed = true;

        if world.iso.is_none() {
            return Err(EngineError::MissingIsoWorld);
        }

        self.failed = false;
        log::debug!("initializing world control system... done");
        Ok(())
    }

    fn update(&mut self, world: &mut World, frame: &mut Frame<'_>) {
        if self.failed {
            return;
        }
        let Some(iso) = world.iso.as_mut() else {
            return;
        };

        if frame.input.mouse_wheel > 0.0 {
            iso.view.zoom_in();
        } else if frame.input.mouse_wheel < 0.0 {
            iso.view.zoom_out();
        }

        if frame.input.is_key_pressed(KeyCode::Space) {
            iso.view.mode = match iso.view.mode {
                ViewMode::Overview => ViewMode::EntityFocus,
                ViewMode::EntityFocus => ViewMode::Overview,
            };
            log::debug!("view mode -> {:?}", iso.view.mode);
        }

        if iso.view.mode == ViewMode::Overview {
            let [mx, my] = frame.input.mouse_pos;
            iso.view.edge_scroll(mx, my, frame.dt);
        }
    }
}
