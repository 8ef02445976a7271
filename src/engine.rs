use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use crate::ecs::SceneManager;
use crate::ecs::systems::Frame;
use crate::input::{InputState, KeyCode};
use crate::renderer::{Renderer, SpriteBatch, TextureCatalog};

// ---------------------------------------------------------------------------
// DeltaTimer
// ---------------------------------------------------------------------------

/// Wall-clock frame timer. Clamped so a stall (window drag, debugger pause)
/// never produces one giant simulation step.
pub struct DeltaTimer {
    last: Option<Instant>,
    dt: f32,
}

impl DeltaTimer {
    const MAX_DT: f32 = 0.25;

    pub fn new() -> Self {
        Self { last: None, dt: 0.0 }
    }

    /// Advance the timer and return the seconds since the previous tick.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        self.dt = match self.last {
            Some(prev) => now.duration_since(prev).as_secs_f32().min(Self::MAX_DT),
            None => 0.0,
        };
        self.last = Some(now);
        self.dt
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }
}

impl Default for DeltaTimer {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Folder of `.png` textures baked into the atlas at startup; `None`
    /// starts with an empty catalog.
    pub texture_folder: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "isogine".to_string(),
            width: 1280,
            height: 720,
            texture_folder: None,
        }
    }
}

/// Everything the game loop owns: the renderer, the texture catalog, the
/// polled input snapshot, and the scenes. Scene setup code receives this
/// once, before the first frame.
pub struct Engine {
    pub renderer: Renderer,
    pub textures: TextureCatalog,
    pub input: InputState,
    pub scenes: SceneManager,
    timer: DeltaTimer,
}

impl Engine {
    /// Run the engine: opens the window, calls `setup` once the GPU is up,
    /// then advances the active scene once per frame until the window closes
    /// or the active scene requests exit.
    pub fn run(config: EngineConfig, setup: impl FnOnce(&mut Engine) + 'static) {
        let event_loop = EventLoop::new().unwrap();
        let mut app = App {
            config,
            setup: Some(Box::new(setup)),
            engine: None,
        };
        event_loop.run_app(&mut app).unwrap();
    }
}

// ---------------------------------------------------------------------------
// App (winit ApplicationHandler)
// ---------------------------------------------------------------------------

struct App {
    config: EngineConfig,
    setup: Option<Box<dyn FnOnce(&mut Engine)>>,
    engine: Option<Engine>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title(&self.config.title)
                        .with_inner_size(winit::dpi::PhysicalSize::new(
                            self.config.width,
                            self.config.height,
                        ))
                        .with_resizable(false),
                )
                .unwrap(),
        );
        let mut renderer = pollster::block_on(Renderer::new(window));

        let mut textures = TextureCatalog::new();
        if let Some(folder) = &self.config.texture_folder {
            renderer.load_texture_folder(folder, &mut textures);
        }

        let mut engine = Engine {
            renderer,
            textures,
            input: InputState::new(),
            scenes: SceneManager::new(),
            timer: DeltaTimer::new(),
        };

        if let Some(setup) = self.setup.take() {
            setup(&mut engine);
        }
        self.engine = Some(engine);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(engine) = self.engine.as_ref() {
            engine.renderer.window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                engine.renderer.resize(size);
                engine.scenes.handle_resize(size.width, size.height);
            }

            WindowEvent::CursorMoved { position, .. } => {
                engine.input.mouse_pos = [position.x as f32, position.y as f32];
            }

            WindowEvent::MouseInput { button, state, .. } => match state {
                ElementState::Pressed => {
                    if engine.input.mouse_held.insert(button) {
                        engine.input.mouse_pressed.insert(button);
                    }
                }
                ElementState::Released => {
                    engine.input.mouse_held.remove(&button);
                    engine.input.mouse_released.insert(button);
                }
            },

            WindowEvent::MouseWheel { delta, .. } => {
                use winit::event::MouseScrollDelta;
                match delta {
                    MouseScrollDelta::LineDelta(_, y) => engine.input.mouse_wheel = y,
                    MouseScrollDelta::PixelDelta(pos) => {
                        engine.input.mouse_wheel = (pos.y / 100.0) as f32;
                    }
                }
            }

            WindowEvent::KeyboardInput {
                event: KeyEvent { physical_key: PhysicalKey::Code(code), state, .. },
                ..
            } => match state {
                ElementState::Pressed => {
                    if engine.input.keys_held.insert(code) {
                        engine.input.keys_pressed.insert(code);
                    }
                }
                ElementState::Released => {
                    engine.input.keys_held.remove(&code);
                    engine.input.keys_released.insert(code);
                }
            },

            WindowEvent::RedrawRequested => {
                let dt = engine.timer.tick();

                // A scene without its own exit binding can always be left
                // with Escape.
                if engine.input.is_key_pressed(KeyCode::Escape)
                    && let Some(scene) = engine.scenes.active_scene_mut()
                {
                    scene.world.request_exit();
                }

                let mut batch = SpriteBatch::new(&engine.textures);
                {
                    let mut frame = Frame {
                        dt,
                        input: &engine.input,
                        textures: &engine.textures,
                        canvas: &mut batch,
                    };
                    engine.scenes.run_active(&mut frame);
                }

                match engine.renderer.render(&batch.verts) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        let size = engine.renderer.window.inner_size();
                        engine.renderer.resize(size);
                    }
                    Err(e) => log::error!("render error: {e}"),
                }

                engine.input.clear_frame_state();

                // Exit is cooperative: the flag is checked once per frame.
                if engine.scenes.active_exit_requested() {
                    event_loop.exit();
                    return;
                }

                if engine.scenes.active_consume_less_cpu() {
                    std::thread::sleep(Duration::from_millis(1));
                }
            }

            _ => {}
        }
    }
}
