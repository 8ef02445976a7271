use glam::Vec2;

use crate::ecs::components::{Collision, CollisionKind, Position, Render2D};
use crate::ecs::systems::{Frame, System, SystemKind};
use crate::ecs::world::Tables;
use crate::ecs::{ComponentKind, ComponentMask, Entity, EntityId, World};
use crate::error::EngineError;
use crate::geometry::Rect;
use crate::iso::IsoView;
use crate::renderer::TextureCatalog;

/// Entity-vs-world and entity-vs-entity collision.
///
/// World collision probes the tile grid under the corners of the entity's
/// collision rectangle; entity collision compares screen-space AABBs against
/// every entity in the **previous frame's** depth-sort snapshot for the
/// entity's layer. Either hit rolls the entity back to its most recently
/// recorded position and raises its `colliding` flag for the frame.
pub struct CollisionSystem {
    failed: bool,
}

fn required() -> ComponentMask {
    ComponentMask::of(&[
        ComponentKind::Position,
        ComponentKind::Velocity,
        ComponentKind::Collision,
        ComponentKind::Render2D,
    ])
}

impl CollisionSystem {
    pub fn new() -> Self {
        Self { failed: true }
    }
}

impl Default for CollisionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for CollisionSystem {
    fn kind(&self) -> SystemKind {
        SystemKind::Collision
    }

    fn init(&mut self, world: &World) -> Result<(), EngineError> {
        log::debug!("initializing collision system...");
        self.failed = true;

        let Some(iso) = &world.iso else {
            return Err(EngineError::MissingIsoWorld);
        };
        if iso.map.layers() == 0 {
            return Err(EngineError::MissingMap);
        }
        for kind in [
            ComponentKind::Position,
            ComponentKind::Velocity,
            ComponentKind::Collision,
            ComponentKind::Render2D,
        ] {
            if !world.tables.is_registered(kind) {
                return Err(EngineError::MissingComponent(kind));
            }
        }

        self.failed = false;
        log::debug!("initializing collision system... done");
        Ok(())
    }

    fn update_entity(&mut self, world: &mut World, frame: &mut Frame<'_>, entity: EntityId) {
        if self.failed || !world.mask(entity).contains_all(required()) {
            return;
        }

        let World { iso, depth, tables, entities, .. } = world;
        let Some(iso) = iso.as_ref() else {
            return;
        };
        let Tables {
            position: Some(positions),
            collision: Some(collisions),
            render2d: Some(renders),
            ..
        } = tables
        else {
            return;
        };

        let idx = entity as usize;
        collisions[idx].colliding = false;
        let kind = collisions[idx].kind;
        if kind == CollisionKind::Disabled {
            return;
        }

        if kind.against_world() {
            let rect = collisions[idx].rect;
            let layer = renders[idx].layer;
            // Probe both bottom corners, displaced each way.
            probe_tile(&iso.map, layer, positions, collisions, idx, 0.0, rect.h);
            probe_tile(&iso.map, layer, positions, collisions, idx, rect.w, 0.0);
        }

        if kind.against_entities() {
            entity_collision(
                entity,
                entities,
                positions,
                collisions,
                renders,
                &iso.view,
                depth,
                frame.textures,
            );
        }
    }
}

/// Check the tiles under `(x ± dx, y ± dy)`; a blocking tile rolls the
/// entity back.
#[allow(clippy::too_many_arguments)]
fn probe_tile(
    map: &crate::iso::map::IsoMap,
    layer: i32,
    positions: &mut [Position],
    collisions: &mut [Collision],
    idx: usize,
    dx: f32,
    dy: f32,
) {
    let tile_size = map.tile_size as f32;
    for sign in [1.0f32, -1.0] {
        let pos = &positions[idx];
        let tx = ((pos.x + sign * dx) / tile_size) as i32;
        let ty = ((pos.y + sign * dy) / tile_size) as i32;

        if let Some(tile) = map.tile(tx, ty, layer)
            && map.is_blocking(tile)
        {
            positions[idx].rollback();
            collisions[idx].colliding = true;
        }
    }
}

/// Screen-space collision rectangle for an entity: centered under its
/// sprite, anchored at the sprite's base.
fn world_rect(
    idx: usize,
    positions: &[Position],
    collisions: &[Collision],
    renders: &[Render2D],
    view: &IsoView,
    textures: &TextureCatalog,
) -> Option<Rect> {
    let pos = &positions[idx];
    let render = &renders[idx];

    let texture = render.texture?;
    let (sprite_w, sprite_h) = match render.clip {
        Some(clip) => (clip.w as f32, clip.h as f32),
        None => {
            let info = textures.info(texture)?;
            (info.width as f32, info.height as f32)
        }
    };

    let mut point = view.project(Vec2::new(pos.x, pos.y));
    point.x += pos.x_offset * view.zoom;
    point.y += pos.y_offset * view.zoom;

    let rect = collisions[idx].rect;
    Some(Rect {
        x: point.x + sprite_w * 0.5 * view.zoom - rect.w * 0.5 * view.zoom,
        y: point.y + sprite_h * view.zoom - rect.h * view.zoom,
        w: rect.w * view.zoom,
        h: rect.h * view.zoom,
    })
}

#[allow(clippy::too_many_arguments)]
fn entity_collision(
    entity: EntityId,
    entities: &[Entity],
    positions: &mut [Position],
    collisions: &mut [Collision],
    renders: &[Render2D],
    view: &IsoView,
    depth: &crate::iso::depth::DepthSortIndex,
    textures: &TextureCatalog,
) {
    let idx = entity as usize;
    let layer = renders[idx].layer;
    if layer < 0 {
        return;
    }

    let Some(my_rect) = world_rect(idx, positions, collisions, renders, view, textures) else {
        return;
    };
    collisions[idx].world_rect = my_rect;

    let rect_mask = ComponentMask::of(&[
        ComponentKind::Position,
        ComponentKind::Render2D,
        ComponentKind::Collision,
    ]);

    let mut hit = false;
    for entry in depth.snapshot(layer as usize) {
        if entry.entity == entity {
            continue;
        }
        let other = entry.entity as usize;
        // The snapshot is a frame old; the entity may have been removed or
        // repurposed since.
        if other >= entities.len() || !entities[other].mask.contains_all(rect_mask) {
            continue;
        }
        let Some(other_rect) = world_rect(other, positions, collisions, renders, view, textures)
        else {
            continue;
        };
        if my_rect.overlaps(&other_rect) {
            hit = true;
        }
    }

    if hit {
        positions[idx].rollback();
        collisions[idx].colliding = true;
    }
}
