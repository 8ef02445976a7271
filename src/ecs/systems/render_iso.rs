//! Isometric world rendering.
//!
//! Entities must draw in order of their cartesian height and interleaved
//! correctly with the map tiles: behind the rows in front of them, in front
//! of the rows behind them. The entity pass (`update_entity`) builds a
//! per-layer list of on-screen entities sorted by height, tagged with the
//! map row each stands on. The draw pass (`update`) sweeps the map in
//! isometric order and, whenever it reaches a new row, drains that row's
//! entities from the front of the sorted list before drawing more tiles.
//!
//! The draw pass consumes the list built during the *previous* frame's
//! entity pass — plain `update()` hooks run before the entity loop — and the
//! collision system reads the retired list one frame later still. That
//! one-frame pipeline is load-bearing; do not reorder it.

use std::time::Instant;

use glam::Vec2;

use crate::ecs::components::{Animation, Position, Render2D};
use crate::ecs::systems::{Frame, System, SystemKind};
use crate::ecs::world::Tables;
use crate::ecs::{ComponentKind, ComponentMask, Entity, EntityId, World};
use crate::error::EngineError;
use crate::iso::depth::DepthEntry;
use crate::iso::{IsoView, iso_point_to_cart};
use crate::renderer::TextureCatalog;

pub struct IsoRenderSystem {
    failed: bool,
    drawn_entities: u32,
    frames: u32,
    last_report: Option<Instant>,
}

fn render_mask() -> ComponentMask {
    ComponentMask::of(&[ComponentKind::Position, ComponentKind::Render2D])
}

fn animated_mask() -> ComponentMask {
    ComponentMask::of(&[ComponentKind::Position, ComponentKind::Animation])
}

impl IsoRenderSystem {
    pub fn new() -> Self {
        Self {
            failed: true,
            drawn_entities: 0,
            frames: 0,
            last_report: None,
        }
    }
}

impl Default for IsoRenderSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for IsoRenderSystem {
    fn kind(&self) -> SystemKind {
        SystemKind::IsoRender
    }

    fn init(&mut self, world: &World) -> Result<(), EngineError> {
        log::debug!("initializing isometric render system...");
        self.failed = true;

        let Some(iso) = &world.iso else {
            return Err(EngineError::MissingIsoWorld);
        };
        if iso.map.layers() == 0 {
            return Err(EngineError::MissingMap);
        }
        for kind in [
            ComponentKind::Render2D,
            ComponentKind::Position,
            ComponentKind::Collision,
            ComponentKind::Animation,
        ] {
            if !world.tables.is_registered(kind) {
                return Err(EngineError::MissingComponent(kind));
            }
        }

        self.failed = false;
        self.last_report = Some(Instant::now());
        log::debug!("initializing isometric render system... done");
        Ok(())
    }

    /// Draw pass: tile sweep interleaved with entity drains.
    fn update(&mut self, world: &mut World, frame: &mut Frame<'_>) {
        if self.failed {
            return;
        }

        // Keep the camera glued to the controlled entity.
        let controlled = world.controlled_entity();
        if let Some(iso) = world.iso.as_mut()
            && iso.view.mode == crate::iso::ViewMode::EntityFocus
            && let Some(ctrl) = controlled
        {
            let size = sprite_size(
                ctrl,
                world.entities.as_slice(),
                world.tables.render2d.as_deref().unwrap_or(&[]),
                world.tables.animation.as_deref().unwrap_or(&[]),
                frame.textures,
            );
            if let Some(positions) = world.tables.position.as_deref()
                && (ctrl as usize) < positions.len()
            {
                let pos = &positions[ctrl as usize];
                iso.view
                    .center_on(Vec2::new(pos.x, pos.y), size.map(|(w, h)| Vec2::new(w, h)));
            }
        }

        let World { iso, depth, tables, entities, .. } = world;
        let Some(iso) = iso.as_ref() else {
            return;
        };
        let Tables {
            position: Some(positions),
            render2d: Some(renders),
            animation: Some(animations),
            ..
        } = tables
        else {
            return;
        };

        let map = &iso.map;
        let view = &iso.view;
        let Some(tile_set) = &map.tile_set else {
            return;
        };

        let (start_x, start_y, tiles_w, tiles_h) = view.visible_tile_range(map.tile_size);
        let tile_px = map.tile_size as f32;

        for layer in 0..map.layers() {
            // The diagonal index `i` is the cartesian row the sweep is on.
            for i in start_y..start_y + tiles_h {
                while let Some(entry) = depth.take_due(layer as usize, i) {
                    self.drawn_entities += draw_entity(
                        entry.entity,
                        entities,
                        positions,
                        renders,
                        animations,
                        view,
                        frame,
                    );
                }

                for j in start_x..start_x + tiles_w {
                    // The diagonal sweep only lands on tiles where the
                    // parities agree.
                    if (j & 1) != (i & 1) {
                        continue;
                    }
                    let x = (i + j) / 2;
                    let y = (i - j) / 2;
                    let Some(tile) = map.tile(x, y, layer) else {
                        continue;
                    };
                    if tile < 0 {
                        continue;
                    }

                    let p = view.project(Vec2::new(x as f32 * tile_px, y as f32 * tile_px));
                    if p.x + tile_px * view.zoom >= -128.0
                        && p.x < view.viewport_w as f32
                        && p.y + tile_px * view.zoom >= -128.0
                        && p.y < view.viewport_h as f32
                        && let Some(clip) = tile_set.clips.get(tile as usize)
                    {
                        frame
                            .canvas
                            .draw_sprite(tile_set.texture, p.x, p.y, Some(*clip), view.zoom);
                    }
                }
            }

            // Entities standing past the last swept row still owe a draw.
            while let Some(entry) = depth.take_remaining(layer as usize) {
                self.drawn_entities +=
                    draw_entity(entry.entity, entities, positions, renders, animations, view, frame);
            }
        }

        self.frames += 1;
        if let Some(report) = self.last_report
            && report.elapsed().as_secs() >= 1
        {
            log::debug!(
                "{} fps, {} entities drawn",
                self.frames,
                self.drawn_entities
            );
            self.frames = 0;
            self.last_report = Some(Instant::now());
        }
    }

    /// Sort pass: rebuild the per-layer depth index.
    fn update_entity(&mut self, world: &mut World, frame: &mut Frame<'_>, entity: EntityId) {
        if self.failed {
            return;
        }

        // Entity 0 marks the frame boundary: retire the previous index into
        // the collision snapshot and start over.
        if entity == 0 {
            world.depth.begin_frame();
            self.drawn_entities = 0;
        }

        let mask = world.mask(entity);
        if !mask.contains_all(render_mask()) && !mask.contains_all(animated_mask()) {
            return;
        }

        let World { iso, depth, tables, .. } = world;
        let Some(iso) = iso.as_ref() else {
            return;
        };
        let Tables {
            position: Some(positions),
            render2d: Some(renders),
            animation: Some(animations),
            ..
        } = tables
        else {
            return;
        };

        let idx = entity as usize;
        let view = &iso.view;
        let pos = &positions[idx];

        let mut point = view.project(Vec2::new(pos.x, pos.y));
        point.x += pos.x_offset * view.zoom;
        point.y += pos.y_offset * view.zoom;

        // Bounds-test against the sprite that will actually be drawn.
        let dims = if mask.contains(ComponentKind::Animation) {
            animations[idx]
                .current_frame()
                .map(|(_, clip)| (clip.w as f32, clip.h as f32))
        } else {
            render_dims(&renders[idx], frame.textures)
        };
        let Some((w, h)) = dims else {
            return;
        };
        // Off-screen entities are excluded from the index entirely; far-away
        // entities can neither draw nor collide this frame.
        if !view.on_screen(point, w, h) {
            return;
        }

        // Depth key: cartesian height of the zoomed world position.
        let cart = iso_point_to_cart(Vec2::new(pos.x, pos.y) * view.zoom);
        // Row bucket: diagonal map row under the entity's feet, in tile
        // units — directly comparable to the sweep row in the draw pass.
        let row = ((pos.x + pos.y) / iso.map.tile_size as f32) as i32;

        let layer = renders[idx].layer;
        if layer >= 0 {
            depth.insert(
                layer as usize,
                DepthEntry { entity, depth_key: cart.y as i32, row },
            );
        }
    }
}

/// Pixel dimensions of the sprite a Render2D component draws.
fn render_dims(render: &Render2D, textures: &TextureCatalog) -> Option<(f32, f32)> {
    let texture = render.texture?;
    match render.clip {
        Some(clip) => Some((clip.w as f32, clip.h as f32)),
        None => {
            let info = textures.info(texture)?;
            Some((info.width as f32, info.height as f32))
        }
    }
}

fn sprite_size(
    entity: EntityId,
    entities: &[Entity],
    renders: &[Render2D],
    animations: &[Animation],
    textures: &TextureCatalog,
) -> Option<(f32, f32)> {
    let idx = entity as usize;
    if idx >= entities.len() {
        return None;
    }
    let mask = entities[idx].mask;
    if mask.contains(ComponentKind::Animation) && idx < animations.len() {
        if let Some((_, clip)) = animations[idx].current_frame() {
            return Some((clip.w as f32, clip.h as f32));
        }
    }
    if mask.contains(ComponentKind::Render2D) && idx < renders.len() {
        return render_dims(&renders[idx], textures);
    }
    None
}

/// Draw one entity through the canvas collaborator. Returns how many sprites
/// were emitted (0 or 1).
fn draw_entity(
    entity: EntityId,
    entities: &[Entity],
    positions: &[Position],
    renders: &[Render2D],
    animations: &[Animation],
    view: &IsoView,
    frame: &mut Frame<'_>,
) -> u32 {
    let idx = entity as usize;
    if idx >= entities.len() {
        return 0;
    }
    let mask = entities[idx].mask;

    let (texture, clip) = if mask.contains(ComponentKind::Animation) {
        match animations[idx].current_frame() {
            Some((texture, clip)) => (texture, Some(clip)),
            None => return 0,
        }
    } else if mask.contains(ComponentKind::Render2D) {
        match renders[idx].texture {
            Some(texture) => (texture, renders[idx].clip),
            None => return 0,
        }
    } else {
        return 0;
    };

    let pos = &positions[idx];
    let mut point = view.project(Vec2::new(pos.x, pos.y));
    point.x += pos.x_offset * view.zoom;
    point.y += pos.y_offset * view.zoom;

    let dims = match clip {
        Some(clip) => Some((clip.w as f32, clip.h as f32)),
        None => frame
            .textures
            .info(texture)
            .map(|info| (info.width as f32, info.height as f32)),
    };
    let Some((w, h)) = dims else {
        return 0;
    };

    if view.on_screen(point, w, h) {
        frame.canvas.draw_sprite(texture, point.x, point.y, clip, view.zoom);
        return 1;
    }
    0
}
