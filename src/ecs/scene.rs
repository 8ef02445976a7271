use crate::ecs::World;
use crate::ecs::systems::{Frame, System, SystemKind, build_system};
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Scene — a world plus its ordered system registry
// ---------------------------------------------------------------------------

pub struct Scene {
    pub world: World,
    systems: Vec<Box<dyn System>>,
    init_failed: bool,
}

impl Scene {
    pub fn new(name: &str) -> Self {
        Self {
            world: World::new(name),
            systems: Vec::new(),
            init_failed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.world.name
    }

    /// Append a system. Registration order is execution order, both for the
    /// per-frame update phase and for each entity in the entity phase.
    pub fn add_system(&mut self, kind: SystemKind) {
        self.systems.push(build_system(kind));
    }

    pub fn num_systems(&self) -> usize {
        self.systems.len()
    }

    /// Run every system's init in registration order. The first failure
    /// marks the whole registry failed: the scene will refuse to advance
    /// until it is rebuilt. Systems that failed individually also no-op all
    /// their later hooks.
    pub fn init_systems(&mut self) -> Result<(), EngineError> {
        self.init_failed = false;
        let mut systems = std::mem::take(&mut self.systems);
        let mut result = Ok(());

        for system in systems.iter_mut() {
            if let Err(e) = system.init(&self.world) {
                log::error!(
                    "scene '{}': {:?} failed to initialize: {e}",
                    self.world.name,
                    system.kind()
                );
                self.init_failed = true;
                result = Err(EngineError::SystemInitFailed(system.kind()));
                break;
            }
        }

        self.systems = systems;
        result
    }

    pub fn systems_failed(&self) -> bool {
        self.init_failed
    }

    /// Advance the scene by one frame.
    ///
    /// Phase 1: every system's `update()` in registration order — frame-wide
    /// work that must see a consistent snapshot (the draw pass consumes the
    /// depth index built by *last* frame's entity phase here).
    /// Phase 2: for every live entity index ascending, every system's
    /// `update_entity(id)` in registration order.
    pub fn run_frame(&mut self, frame: &mut Frame<'_>) {
        if self.init_failed {
            return;
        }
        let mut systems = std::mem::take(&mut self.systems);

        for system in systems.iter_mut() {
            system.update(&mut self.world, frame);
        }

        let mut entity = 0u32;
        while (entity as usize) < self.world.live_count() {
            for system in systems.iter_mut() {
                system.update_entity(&mut self.world, frame, entity);
            }
            entity += 1;
        }

        self.systems = systems;
        // Whoever needed the relocation signal has seen it by now.
        self.world.clear_tables_relocated();
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        for system in self.systems.iter_mut() {
            system.free();
        }
    }
}

// ---------------------------------------------------------------------------
// SceneManager
// ---------------------------------------------------------------------------

/// Named scene registry with one active scene.
#[derive(Default)]
pub struct SceneManager {
    scenes: Vec<Scene>,
    active: Option<usize>,
}

impl SceneManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scene and hand it out for assembly.
    pub fn create_scene(&mut self, name: &str) -> &mut Scene {
        self.scenes.push(Scene::new(name));
        self.scenes.last_mut().unwrap()
    }

    pub fn scene_mut(&mut self, name: &str) -> Option<&mut Scene> {
        let found = self.scenes.iter_mut().find(|s| s.world.name == name);
        if found.is_none() {
            log::error!("scene '{name}' was not found");
        }
        found
    }

    /// Activate a scene by name, (re-)initializing its systems. A scene
    /// whose systems fail to initialize does not become active.
    pub fn set_active(&mut self, name: &str) -> Result<(), EngineError> {
        let Some(idx) = self.scenes.iter().position(|s| s.world.name == name) else {
            log::error!("scene '{name}' was not found; active scene unchanged");
            return Err(EngineError::SceneNotFound(name.to_string()));
        };
        self.scenes[idx].init_systems()?;
        self.active = Some(idx);
        Ok(())
    }

    pub fn active_scene(&self) -> Option<&Scene> {
        self.scenes.get(self.active?)
    }

    pub fn active_scene_mut(&mut self) -> Option<&mut Scene> {
        let idx = self.active?;
        self.scenes.get_mut(idx)
    }

    /// Remove a scene by name (swap-remove). Dropping the active scene
    /// deactivates it.
    pub fn remove_scene(&mut self, name: &str) {
        let Some(idx) = self.scenes.iter().position(|s| s.world.name == name) else {
            log::warn!("scene '{name}' was not found; nothing removed");
            return;
        };
        self.scenes.swap_remove(idx);
        match self.active {
            Some(active) if active == idx => self.active = None,
            // The former last scene now lives at `idx`.
            Some(active) if active == self.scenes.len() => self.active = Some(idx),
            _ => {}
        }
    }

    /// Advance the active scene one frame, if there is one and its systems
    /// initialized.
    pub fn run_active(&mut self, frame: &mut Frame<'_>) {
        if let Some(scene) = self.active_scene_mut() {
            scene.run_frame(frame);
        }
    }

    pub fn active_exit_requested(&self) -> bool {
        self.active_scene()
            .is_some_and(|s| s.world.exit_requested())
    }

    pub fn active_consume_less_cpu(&self) -> bool {
        self.active_scene().is_some_and(|s| s.world.consume_less_cpu)
    }

    /// Propagate a viewport resize into every scene's camera.
    pub fn handle_resize(&mut self, width: u32, height: u32) {
        for scene in &mut self.scenes {
            if let Some(iso) = scene.world.iso.as_mut() {
                iso.view.viewport_w = width;
                iso.view.viewport_h = height;
            }
        }
    }
}
