use crate::renderer::{ClipRect, TextureCatalog, TextureId};

/// Distinct tile heights the terrain generator emits per layer.
pub const TILE_LEVELS_PER_LAYER: i32 = 6;

// ---------------------------------------------------------------------------
// Tile set
// ---------------------------------------------------------------------------

/// Tileset texture plus one clip rectangle per tile id.
pub struct TileSet {
    pub texture: TextureId,
    pub clips: Vec<ClipRect>,
}

// ---------------------------------------------------------------------------
// IsoMap
// ---------------------------------------------------------------------------

/// Layered tile grid. Tiles are plain `i32` ids; out-of-bounds lookups miss
/// with `None` so both the renderer and the collision probe can probe freely.
pub struct IsoMap {
    pub name: String,
    width: i32,
    height: i32,
    layers: i32,
    pub tile_size: i32,
    data: Vec<i32>,
    pub tile_set: Option<TileSet>,
    blocking: Vec<i32>,
}

impl IsoMap {
    pub fn new(name: &str, width: i32, height: i32, layers: i32, tile_size: i32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            layers,
            tile_size,
            data: vec![0; (width * height * layers) as usize],
            tile_set: None,
            blocking: Vec::new(),
        }
    }

    /// Seeded map with fractal value-noise terrain on layer 0. Higher
    /// `terrain_height` pushes more tiles toward the upper levels. Layers
    /// above the ground start empty (`-1`, skipped by the renderer).
    pub fn generate(
        name: &str,
        width: i32,
        height: i32,
        layers: i32,
        tile_size: i32,
        seed: i32,
        terrain_height: i32,
    ) -> Self {
        let mut map = Self::new(name, width, height, layers, tile_size);
        for layer in 1..layers {
            for y in 0..height {
                for x in 0..width {
                    map.set_tile(x, y, layer, -1);
                }
            }
        }
        for y in 0..height {
            for x in 0..width {
                let n = fractal_noise(x as f64 / 32.0, y as f64 / 32.0, 0.5, 4, seed);
                // n is in [-1, 1]; fold it onto the level range.
                let level = ((n + 1.0) * 0.5 * terrain_height as f64) as i32;
                map.set_tile(x, y, 0, level.clamp(0, TILE_LEVELS_PER_LAYER - 1));
            }
        }
        map
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn layers(&self) -> i32 {
        self.layers
    }

    fn index(&self, x: i32, y: i32, layer: i32) -> Option<usize> {
        if x < 0 || y < 0 || layer < 0 || x >= self.width || y >= self.height || layer >= self.layers
        {
            return None;
        }
        Some(((layer * self.height + y) * self.width + x) as usize)
    }

    pub fn tile(&self, x: i32, y: i32, layer: i32) -> Option<i32> {
        self.index(x, y, layer).map(|i| self.data[i])
    }

    pub fn set_tile(&mut self, x: i32, y: i32, layer: i32, value: i32) {
        match self.index(x, y, layer) {
            Some(i) => self.data[i] = value,
            None => log::error!(
                "set_tile({x},{y},{layer}) outside map '{}' ({}x{}x{})",
                self.name,
                self.width,
                self.height,
                self.layers
            ),
        }
    }

    /// Cut the tileset texture into a grid of `tile_w × tile_h` clip
    /// rectangles, in row-major tile-id order.
    pub fn load_tile_set(
        &mut self,
        texture: TextureId,
        catalog: &TextureCatalog,
        tile_w: u32,
        tile_h: u32,
    ) -> bool {
        let Some(info) = catalog.info(texture) else {
            log::error!("tileset texture {texture} is not in the catalog");
            return false;
        };
        let cols = info.width / tile_w;
        let rows = info.height / tile_h;
        if cols == 0 || rows == 0 {
            log::error!(
                "tileset texture '{}' ({}x{}) is smaller than one {tile_w}x{tile_h} tile",
                info.name,
                info.width,
                info.height
            );
            return false;
        }

        let mut clips = Vec::with_capacity((cols * rows) as usize);
        for row in 0..rows {
            for col in 0..cols {
                clips.push(ClipRect {
                    x: col * tile_w,
                    y: row * tile_h,
                    w: tile_w,
                    h: tile_h,
                });
            }
        }
        self.tile_set = Some(TileSet { texture, clips });
        true
    }

    /// Mark a tile id as impassable for the collision probe.
    pub fn set_blocking(&mut self, tile: i32) {
        if !self.blocking.contains(&tile) {
            self.blocking.push(tile);
        }
    }

    pub fn is_blocking(&self, tile: i32) -> bool {
        self.blocking.contains(&tile)
    }
}

// ---------------------------------------------------------------------------
// Value noise — terrain generation
// ---------------------------------------------------------------------------

fn raw_noise(n: i32) -> f64 {
    let n = (n << 13) ^ n;
    let n = n
        .wrapping_mul(n.wrapping_mul(n).wrapping_mul(15731).wrapping_add(789_221))
        .wrapping_add(1_376_312_589);
    1.0 - (n & 0x7fffffff) as f64 / 1_073_741_824.0
}

fn noise2d(x: i32, y: i32, seed: i32) -> f64 {
    raw_noise(x.wrapping_add(y.wrapping_mul(57)).wrapping_add(seed.wrapping_mul(131)))
}

fn interpolate(a: f64, b: f64, t: f64) -> f64 {
    // Cosine interpolation keeps the terrain free of axis-aligned creases.
    let f = (1.0 - (t * std::f64::consts::PI).cos()) * 0.5;
    a * (1.0 - f) + b * f
}

fn smooth2d(x: f64, y: f64, seed: i32) -> f64 {
    let ix = x.floor() as i32;
    let iy = y.floor() as i32;
    let fx = x - ix as f64;
    let fy = y - iy as f64;

    let top = interpolate(noise2d(ix, iy, seed), noise2d(ix + 1, iy, seed), fx);
    let bottom = interpolate(noise2d(ix, iy + 1, seed), noise2d(ix + 1, iy + 1, seed), fx);
    interpolate(top, bottom, fy)
}

/// Fractal brownian motion over value noise, normalized to roughly [-1, 1].
fn fractal_noise(x: f64, y: f64, persistence: f64, octaves: u32, seed: i32) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max = 0.0;
    for octave in 0..octaves {
        total += smooth2d(x * frequency, y * frequency, seed.wrapping_add(octave as i32))
            * amplitude;
        max += amplitude;
        amplitude *= persistence;
        frequency *= 2.0;
    }
    total / max
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_lookup_misses() {
        let map = IsoMap::new("m", 4, 4, 2, 64);
        assert_eq!(map.tile(-1, 0, 0), None);
        assert_eq!(map.tile(0, 4, 0), None);
        assert_eq!(map.tile(0, 0, 2), None);
        assert_eq!(map.tile(3, 3, 1), Some(0));
    }

    #[test]
    fn set_and_get_round_trip() {
        let mut map = IsoMap::new("m", 4, 4, 2, 64);
        map.set_tile(2, 1, 1, 7);
        assert_eq!(map.tile(2, 1, 1), Some(7));
        assert_eq!(map.tile(2, 1, 0), Some(0));
    }

    #[test]
    fn generation_is_deterministic_and_in_range() {
        let a = IsoMap::generate("a", 16, 16, 1, 64, 1232, TILE_LEVELS_PER_LAYER);
        let b = IsoMap::generate("b", 16, 16, 1, 64, 1232, TILE_LEVELS_PER_LAYER);
        for y in 0..16 {
            for x in 0..16 {
                let tile = a.tile(x, y, 0).unwrap();
                assert_eq!(Some(tile), b.tile(x, y, 0));
                assert!((0..TILE_LEVELS_PER_LAYER).contains(&tile));
            }
        }
    }

    #[test]
    fn blocking_set_is_idempotent() {
        let mut map = IsoMap::new("m", 4, 4, 1, 64);
        map.set_blocking(2);
        map.set_blocking(2);
        assert!(map.is_blocking(2));
        assert!(!map.is_blocking(1));
    }
}
