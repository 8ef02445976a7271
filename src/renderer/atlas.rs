use std::collections::HashMap;
use std::path::Path;

use image::RgbaImage;
use serde::Deserialize;
use wgpu::util::DeviceExt;

use super::{ClipRect, TextureId};

// ---------------------------------------------------------------------------
// TextureCatalog — pure metadata, no GPU
// ---------------------------------------------------------------------------

/// Pixel dimensions and packed-atlas placement for one named texture.
#[derive(Clone, Debug)]
pub struct TextureInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Top-left pixel of this texture inside the baked atlas.
    pub atlas_x: u32,
    pub atlas_y: u32,
}

/// Registry of every texture the engine knows about.
///
/// This is the metadata half of the texture provider: the render and
/// collision systems only ever need names, pixel dimensions and clip
/// rectangles, so the catalog is constructible without a GPU (tests rely on
/// that). The pixel data lives in the [`GpuAtlas`] baked by the renderer.
#[derive(Default)]
pub struct TextureCatalog {
    entries: Vec<TextureInfo>,
    by_name: HashMap<String, TextureId>,
    atlas_w: u32,
    atlas_h: u32,
}

impl TextureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a texture by name and pixel size. Re-registering a name
    /// returns the existing id unchanged.
    pub fn register(&mut self, name: &str, width: u32, height: u32) -> TextureId {
        if let Some(&id) = self.by_name.get(name) {
            log::warn!("texture '{name}' registered twice; keeping the first entry");
            return id;
        }
        let id = self.entries.len();
        self.entries.push(TextureInfo {
            name: name.to_string(),
            width,
            height,
            atlas_x: 0,
            atlas_y: 0,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<TextureId> {
        self.by_name.get(name).copied()
    }

    pub fn info(&self, id: TextureId) -> Option<&TextureInfo> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pixel size of the baked atlas; zero until [`GpuAtlas::bake`] ran.
    pub fn atlas_size(&self) -> (u32, u32) {
        (self.atlas_w, self.atlas_h)
    }

    /// UV rectangle for a clip of the given texture inside the baked atlas.
    /// Returns `None` before the atlas was baked or for unknown ids.
    pub fn uv_rect(&self, id: TextureId, clip: Option<ClipRect>) -> Option<([f32; 2], [f32; 2])> {
        if self.atlas_w == 0 || self.atlas_h == 0 {
            return None;
        }
        let info = self.info(id)?;
        let clip = clip.unwrap_or(ClipRect { x: 0, y: 0, w: info.width, h: info.height });

        let aw = self.atlas_w as f32;
        let ah = self.atlas_h as f32;
        let u0 = (info.atlas_x + clip.x) as f32 / aw;
        let v0 = (info.atlas_y + clip.y) as f32 / ah;
        let u1 = (info.atlas_x + clip.x + clip.w) as f32 / aw;
        let v1 = (info.atlas_y + clip.y + clip.h) as f32 / ah;
        Some(([u0, v0], [u1, v1]))
    }

    fn place(&mut self, id: TextureId, x: u32, y: u32) {
        if let Some(info) = self.entries.get_mut(id) {
            info.atlas_x = x;
            info.atlas_y = y;
        }
    }

    fn set_atlas_size(&mut self, w: u32, h: u32) {
        self.atlas_w = w;
        self.atlas_h = h;
    }
}

// ---------------------------------------------------------------------------
// Shelf packing (pure, GPU-free)
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
pub(crate) struct Placement {
    pub id: TextureId,
    pub x: u32,
    pub y: u32,
}

/// Pack `(id, width, height)` items into shelves of at most `max_width`
/// pixels. Items wider than a shelf are skipped with a diagnostic. Returns
/// the placements plus the atlas dimensions, rounded up to powers of two.
pub(crate) fn pack(items: &[(TextureId, u32, u32)], max_width: u32) -> (Vec<Placement>, u32, u32) {
    // Tallest first keeps the shelves dense.
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| items[b].2.cmp(&items[a].2));

    let mut placements = Vec::new();
    let mut cur_x = 0u32;
    let mut cur_y = 0u32;
    let mut shelf_h = 0u32;

    for &i in &order {
        let (id, w, h) = items[i];
        if w > max_width {
            log::error!("texture {id} is wider ({w}px) than the atlas ({max_width}px); skipped");
            continue;
        }
        if cur_x + w > max_width {
            cur_y += shelf_h;
            cur_x = 0;
            shelf_h = 0;
        }
        placements.push(Placement { id, x: cur_x, y: cur_y });
        cur_x += w;
        shelf_h = shelf_h.max(h);
    }

    let used_h = cur_y + shelf_h;
    (placements, max_width.next_power_of_two(), used_h.next_power_of_two().max(1))
}

// ---------------------------------------------------------------------------
// GpuAtlas
// ---------------------------------------------------------------------------

pub struct GpuAtlas {
    pub texture_view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl GpuAtlas {
    /// Width of the packed atlas texture in pixels.
    const ATLAS_WIDTH: u32 = 2048;

    /// Pack every image into one atlas texture, upload it, and record the
    /// placements into the catalog. `images` pairs catalog ids with decoded
    /// pixels.
    pub fn bake(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        images: &[(TextureId, RgbaImage)],
        catalog: &mut TextureCatalog,
    ) -> Self {
        let items: Vec<(TextureId, u32, u32)> = images
            .iter()
            .map(|(id, img)| (*id, img.width(), img.height()))
            .collect();
        let (placements, atlas_w, atlas_h) = pack(&items, Self::ATLAS_WIDTH);

        let mut pixels = RgbaImage::new(atlas_w, atlas_h);
        for placement in &placements {
            let Some((_, img)) = images.iter().find(|(id, _)| *id == placement.id) else {
                continue;
            };
            for (px, py, pixel) in img.enumerate_pixels() {
                pixels.put_pixel(placement.x + px, placement.y + py, *pixel);
            }
            catalog.place(placement.id, placement.x, placement.y);
        }
        catalog.set_atlas_size(atlas_w, atlas_h);

        let size = wgpu::Extent3d {
            width: atlas_w,
            height: atlas_h,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("texture_atlas"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &pixels,
        );

        let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self { texture_view, sampler }
    }
}

/// Decode every `.png` under `path` (recursively). Returns `(file stem,
/// pixels)` pairs; unreadable files are logged and skipped.
pub fn load_folder(path: &str) -> Vec<(String, RgbaImage)> {
    let mut images = Vec::new();
    for file in walkdir::WalkDir::new(path).into_iter().filter_map(Result::ok) {
        let file_path = file.path();
        if file_path.extension().and_then(|e| e.to_str()) != Some("png") {
            continue;
        }
        let Some(name) = file_path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match image::open(file_path) {
            Ok(img) => images.push((name.to_string(), img.to_rgba8())),
            Err(e) => log::error!("failed to load {}: {e}", file_path.display()),
        }
    }
    images
}

// ---------------------------------------------------------------------------
// Sheet manifest — frame-grid metadata for sprite sheets
// ---------------------------------------------------------------------------

/// JSON description of how a sprite sheet is cut into animation frames.
///
/// ```json
/// {
///   "frame_width": 70,
///   "frame_height": 70,
///   "sequences": [
///     { "name": "walkDown", "start": 8, "frames": 8, "frame_time_ms": 100 }
///   ]
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct SheetManifest {
    pub frame_width: u32,
    pub frame_height: u32,
    pub sequences: Vec<SheetSequence>,
}

#[derive(Debug, Deserialize)]
pub struct SheetSequence {
    pub name: String,
    /// First cell index of the sequence in row-major grid order.
    pub start: u32,
    pub frames: u32,
    pub frame_time_ms: u32,
}

impl SheetManifest {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> Option<Self> {
        let text = std::fs::read_to_string(path).ok()?;
        match Self::from_json(&text) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                log::error!("bad sheet manifest {}: {e}", path.display());
                None
            }
        }
    }
}
