pub mod depth;
pub mod map;

use glam::Vec2;

use self::map::IsoMap;

// ---------------------------------------------------------------------------
// Projection math
// ---------------------------------------------------------------------------

/// Project a cartesian world point into isometric screen space.
pub fn world_to_iso(p: Vec2) -> Vec2 {
    Vec2::new(p.x - p.y, (p.x + p.y) * 0.5)
}

/// Inverse of [`world_to_iso`].
pub fn iso_to_world(p: Vec2) -> Vec2 {
    Vec2::new((2.0 * p.y + p.x) * 0.5, (2.0 * p.y - p.x) * 0.5)
}

/// Cartesian "height" of an isometric point: the vertical coordinate used to
/// order entities for the painter's algorithm. The x component is mirrored so
/// rows grow in map-sweep direction.
pub fn iso_point_to_cart(p: Vec2) -> Vec2 {
    let t = world_to_iso(p);
    Vec2::new(-(t.x * 0.5), t.y)
}

// ---------------------------------------------------------------------------
// IsoView — camera state over the isometric map
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ViewMode {
    /// Free camera; zoom re-centers on the focused tile.
    #[default]
    Overview,
    /// Camera follows the controlled entity.
    EntityFocus,
}

/// Scroll, zoom and mode state for rendering the isometric world.
///
/// `scroll_2d` is the authoritative cartesian camera position; the integer
/// `scroll_x`/`scroll_y` pair is re-derived from it whenever it moves and is
/// what the projection applies per tile/entity.
#[derive(Clone, Debug)]
pub struct IsoView {
    pub scroll_x: i32,
    pub scroll_y: i32,
    pub scroll_2d: Vec2,
    pub scroll_speed: f32,
    pub zoom: f32,
    /// World point the overview camera re-centers on when zooming.
    pub focus_tile: Vec2,
    pub mode: ViewMode,
    pub viewport_w: u32,
    pub viewport_h: u32,
}

impl IsoView {
    pub fn new(viewport_w: u32, viewport_h: u32) -> Self {
        Self {
            scroll_x: 0,
            scroll_y: 0,
            scroll_2d: Vec2::ZERO,
            scroll_speed: 1200.0,
            zoom: 1.0,
            focus_tile: Vec2::ZERO,
            mode: ViewMode::Overview,
            viewport_w,
            viewport_h,
        }
    }

    /// Screen position of a world point under the current scroll and zoom.
    pub fn project(&self, world: Vec2) -> Vec2 {
        let p = Vec2::new(
            world.x * self.zoom + self.scroll_x as f32,
            world.y * self.zoom + self.scroll_y as f32,
        );
        world_to_iso(p)
    }

    /// Re-derive the integer scroll offsets from the cartesian camera
    /// position.
    pub fn apply_scroll(&mut self) {
        let t = Vec2::new(-((self.scroll_2d.x as i32 * 2) as f32), self.scroll_2d.y);
        let w = iso_to_world(t);
        self.scroll_x = w.x as i32;
        self.scroll_y = w.y as i32;
    }

    /// Center the camera on a world point. `size` compensates for the sprite
    /// dimensions of a followed entity so it lands mid-screen.
    pub fn center_on(&mut self, point: Vec2, size: Option<Vec2>) {
        let offset_x = self.viewport_w as f32 / self.zoom * 0.5;
        let offset_y = self.viewport_h as f32 / self.zoom * 0.5;

        self.focus_tile = point;
        let iso = world_to_iso(point);

        self.scroll_2d.x = (iso.x * self.zoom).floor() * 0.5 - offset_x * self.zoom * 0.5;
        self.scroll_2d.y = -(iso.y * self.zoom).floor() + offset_y * self.zoom;

        if self.mode == ViewMode::EntityFocus
            && let Some(size) = size
        {
            self.scroll_2d.x += (size.x * self.zoom * 0.5).trunc() * 0.5;
            self.scroll_2d.y -= (size.y * self.zoom * 0.5).trunc();
        }

        self.apply_scroll();
    }

    pub fn zoom_in(&mut self) {
        if self.zoom < 3.0 {
            self.zoom += 0.25;
            if self.mode == ViewMode::Overview {
                self.center_on(self.focus_tile, None);
            }
        }
    }

    pub fn zoom_out(&mut self) {
        if self.zoom > 1.0 {
            self.zoom -= 0.25;
            if self.mode == ViewMode::Overview {
                self.center_on(self.focus_tile, None);
            }
        }
    }

    /// Scroll the camera while the cursor touches a screen edge.
    pub fn edge_scroll(&mut self, mouse_x: f32, mouse_y: f32, dt: f32) {
        let step = self.scroll_speed * dt;
        let zoom_edge_x = self.viewport_w as f32 * self.zoom - self.viewport_w as f32;
        let zoom_edge_y = self.viewport_h as f32 * self.zoom - self.viewport_h as f32;
        let mut moved = false;

        if mouse_x < 2.0 {
            self.scroll_2d.x -= step;
            moved = true;
        }
        if mouse_x > self.viewport_w as f32 - zoom_edge_x / self.zoom - 2.0 {
            self.scroll_2d.x += step;
            moved = true;
        }
        if mouse_y < 2.0 {
            self.scroll_2d.y += step;
            moved = true;
        }
        if mouse_y > self.viewport_h as f32 - zoom_edge_y / self.zoom - 2.0 {
            self.scroll_2d.y -= step;
            moved = true;
        }
        if moved {
            self.apply_scroll();
        }
    }

    /// Diagonal sweep bounds for the tile pass: `(start_x, start_y, width,
    /// height)` in diagonal coordinates, padded so sprites taller than one
    /// tile are not clipped at the screen edges.
    pub fn visible_tile_range(&self, tile_size: i32) -> (i32, i32, i32, i32) {
        let ts = tile_size as f32;
        let start_x = (-6.0 / self.zoom + (self.scroll_2d.x / self.zoom / ts) * 2.0) as i32;
        let start_y = (-20.0 / self.zoom + (self.scroll_2d.y / self.zoom / ts).abs() * 2.0) as i32;
        let width = 8 + (self.viewport_w as f32 / ts / self.zoom) as i32;
        let height = 28 + ((self.viewport_h as f32 / ts) / self.zoom) as i32 * 2;
        (start_x, start_y, width, height)
    }

    /// True when a screen-space sprite of `w × h` pixels at `pos` intersects
    /// the viewport.
    pub fn on_screen(&self, pos: Vec2, w: f32, h: f32) -> bool {
        pos.x + w * self.zoom > 0.0
            && pos.x < self.viewport_w as f32
            && pos.y + h * self.zoom > 0.0
            && pos.y < self.viewport_h as f32
    }
}

// ---------------------------------------------------------------------------
// IsoWorld — the scene-owned sub-engine
// ---------------------------------------------------------------------------

/// Camera plus map. Owned outright by the scene's world; systems reach it
/// through the world context they receive each call.
pub struct IsoWorld {
    pub view: IsoView,
    pub map: IsoMap,
}

impl IsoWorld {
    pub fn new(view: IsoView, map: IsoMap) -> Self {
        Self { view, map }
    }
}
