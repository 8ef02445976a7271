pub mod atlas;
pub mod pipeline;

use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

pub use atlas::{GpuAtlas, SheetManifest, TextureCatalog, TextureInfo};
use pipeline::{SpritePipeline, SpriteVertex, create_sprite_pipeline, orthographic_projection};

/// Handle into the [`TextureCatalog`].
pub type TextureId = usize;

/// Sub-rectangle of a texture, in pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClipRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

// ---------------------------------------------------------------------------
// Canvas — the draw boundary the core renders through
// ---------------------------------------------------------------------------

/// Where the isometric render system sends its draws.
///
/// Call order is draw order: the painter's algorithm lives entirely in the
/// caller, implementations just append. Tests substitute a recording canvas;
/// the engine uses [`SpriteBatch`] feeding the wgpu pipeline.
pub trait Canvas {
    fn draw_sprite(&mut self, texture: TextureId, x: f32, y: f32, clip: Option<ClipRect>, scale: f32);
}

/// Frame-scoped vertex accumulator. Quads are appended in call order, which
/// the single draw call preserves on the GPU.
pub struct SpriteBatch<'a> {
    catalog: &'a TextureCatalog,
    pub verts: Vec<SpriteVertex>,
}

impl<'a> SpriteBatch<'a> {
    pub fn new(catalog: &'a TextureCatalog) -> Self {
        Self { catalog, verts: Vec::new() }
    }
}

impl Canvas for SpriteBatch<'_> {
    fn draw_sprite(&mut self, texture: TextureId, x: f32, y: f32, clip: Option<ClipRect>, scale: f32) {
        let Some(info) = self.catalog.info(texture) else {
            return;
        };
        let Some((uv_min, uv_max)) = self.catalog.uv_rect(texture, clip) else {
            return;
        };
        let clip = clip.unwrap_or(ClipRect { x: 0, y: 0, w: info.width, h: info.height });
        let w = clip.w as f32 * scale;
        let h = clip.h as f32 * scale;
        let tint = [1.0, 1.0, 1.0, 1.0];

        let tl = SpriteVertex { position: [x, y], uv: [uv_min[0], uv_min[1]], tint };
        let tr = SpriteVertex { position: [x + w, y], uv: [uv_max[0], uv_min[1]], tint };
        let bl = SpriteVertex { position: [x, y + h], uv: [uv_min[0], uv_max[1]], tint };
        let br = SpriteVertex { position: [x + w, y + h], uv: [uv_max[0], uv_max[1]], tint };

        self.verts.extend_from_slice(&[tl, tr, bl, tr, br, bl]);
    }
}

// ---------------------------------------------------------------------------
// Renderer — wgpu surface + sprite pipeline
// ---------------------------------------------------------------------------

pub struct Renderer {
    pub window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: SpritePipeline,
    projection_buffer: wgpu::Buffer,
    projection_bind_group: wgpu::BindGroup,
    /// Bind group for the baked texture atlas; `None` until textures load.
    atlas_bind_group: Option<wgpu::BindGroup>,
    #[allow(dead_code)]
    atlas: Option<GpuAtlas>,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> Self {
        let size = window.inner_size();

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(Arc::clone(&window)).unwrap();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: Some(&surface),
                ..Default::default()
            })
            .await
            .expect("no suitable GPU adapter found");

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .expect("failed to create device");

        let caps = surface.get_capabilities(&adapter);
        let format = caps.formats[0];

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let pipeline = create_sprite_pipeline(&device, format);

        let proj = orthographic_projection(config.width as f32, config.height as f32);
        let projection_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("projection_buffer"),
            contents: bytemuck::cast_slice(&proj),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let projection_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("projection_bg"),
            layout: &pipeline.projection_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: projection_buffer.as_entire_binding(),
            }],
        });

        Self {
            window,
            surface,
            device,
            queue,
            config,
            pipeline,
            projection_buffer,
            projection_bind_group,
            atlas_bind_group: None,
            atlas: None,
        }
    }

    /// Load every `.png` under `path` into one baked atlas, registering each
    /// file stem in `catalog`. Call once during setup, before the game loop.
    pub fn load_texture_folder(&mut self, path: &str, catalog: &mut TextureCatalog) {
        let images = atlas::load_folder(path);
        if images.is_empty() {
            log::warn!("no textures found under '{path}'");
            return;
        }

        let by_id: Vec<(TextureId, image::RgbaImage)> = images
            .into_iter()
            .map(|(name, img)| {
                let id = catalog.register(&name, img.width(), img.height());
                (id, img)
            })
            .collect();

        let gpu = GpuAtlas::bake(&self.device, &self.queue, &by_id, catalog);

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("atlas_bg"),
            layout: &self.pipeline.atlas_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&gpu.texture_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&gpu.sampler),
                },
            ],
        });

        self.atlas_bind_group = Some(bind_group);
        self.atlas = Some(gpu);
        log::debug!("baked {} textures into the atlas", by_id.len());
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);

        let proj = orthographic_projection(new_size.width as f32, new_size.height as f32);
        self.queue
            .write_buffer(&self.projection_buffer, 0, bytemuck::cast_slice(&proj));
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Draw one frame's accumulated sprite batch.
    pub fn render(&mut self, verts: &[SpriteVertex]) -> Result<(), wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: None,
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.23,
                            g: 0.23,
                            b: 0.23,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if !verts.is_empty()
                && let Some(atlas_bg) = &self.atlas_bind_group
            {
                let vbuf = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("sprite_vertex_buffer"),
                    contents: bytemuck::cast_slice(verts),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                pass.set_pipeline(&self.pipeline.render_pipeline);
                pass.set_bind_group(0, &self.projection_bind_group, &[]);
                pass.set_bind_group(1, atlas_bg, &[]);
                pass.set_vertex_buffer(0, vbuf.slice(..));
                pass.draw(0..verts.len() as u32, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
