use std::path::Path;

use isogine::ecs::components::{CollisionKind, Direction};
use isogine::ecs::systems::SystemKind;
use isogine::ecs::{ComponentKind, ComponentMask, EntityId, World};
use isogine::engine::{Engine, EngineConfig};
use isogine::geometry::Rect;
use isogine::iso::map::{IsoMap, TILE_LEVELS_PER_LAYER};
use isogine::iso::{IsoView, IsoWorld, ViewMode};
use isogine::renderer::{ClipRect, SheetManifest, TextureCatalog, TextureId};

const MAP_WIDTH: i32 = 640;
const MAP_HEIGHT: i32 = 640;
const TILE_SIZE: i32 = 64;
const NUM_TREES: usize = 500;

fn main() {
    env_logger::init();

    let config = EngineConfig {
        title: "isogine - isometric sandbox".to_string(),
        width: 1280,
        height: 720,
        texture_folder: Some("assets/textures".to_string()),
    };
    Engine::run(config, setup);
}

fn setup(engine: &mut Engine) {
    let (width, height) = engine.renderer.surface_size();

    let tiles_tex = engine.textures.lookup("isotiles");
    let character_tex = engine.textures.lookup("character");
    let tree_tex = engine.textures.lookup("isotree");

    let scene = engine.scenes.create_scene("overworld");

    for kind in ComponentKind::ALL {
        let _ = scene.world.add_component_kind(kind);
    }

    // Registration order is execution order. The render system must run
    // before the world control system or scrolling artifacts show up.
    scene.add_system(SystemKind::Movement);
    scene.add_system(SystemKind::Collision);
    scene.add_system(SystemKind::Animation);
    scene.add_system(SystemKind::IsoRender);
    scene.add_system(SystemKind::WorldControl);
    scene.add_system(SystemKind::EntityControl);

    let mut map = IsoMap::generate(
        "overworld",
        MAP_WIDTH,
        MAP_HEIGHT,
        2,
        TILE_SIZE,
        1232,
        TILE_LEVELS_PER_LAYER,
    );
    map.set_blocking(2);
    scatter_rocks(&mut map);
    if let Some(tex) = tiles_tex {
        map.load_tile_set(tex, &engine.textures, 64, 80);
    }

    let mut view = IsoView::new(width, height);
    view.mode = ViewMode::EntityFocus;
    scene.world.attach_iso(IsoWorld::new(view, map));

    spawn_player(&mut scene.world, character_tex, &engine.textures);
    spawn_trees(&mut scene.world, tree_tex);

    if let Err(e) = engine.scenes.set_active("overworld") {
        log::error!("could not activate the overworld scene: {e}");
    }
}

/// Blocking rock tiles on the object layer, so world collision has walls to
/// push against.
fn scatter_rocks(map: &mut IsoMap) {
    let mut state = 0x9e37_79b9_7f4a_7c15u64;
    for _ in 0..1500 {
        state ^= state >> 12;
        state ^= state << 25;
        state ^= state >> 27;
        let v = state.wrapping_mul(0x2545_f491_4f6c_dd1d);
        let x = (v % MAP_WIDTH as u64) as i32;
        let y = ((v >> 32) % MAP_HEIGHT as u64) as i32;
        // Keep the spawn area clear.
        if x < 4 && y < 4 {
            continue;
        }
        map.set_tile(x, y, 1, 2);
    }
}

fn spawn_player(world: &mut World, texture: Option<TextureId>, catalog: &TextureCatalog) {
    let mask = ComponentMask::of(&[
        ComponentKind::Position,
        ComponentKind::Velocity,
        ComponentKind::NameTag,
        ComponentKind::Render2D,
        ComponentKind::Collision,
        ComponentKind::Animation,
    ]);
    let player = match world.create_entity(mask) {
        Ok(id) => id,
        Err(e) => {
            log::error!("could not create the player entity: {e}");
            return;
        }
    };
    let idx = player as usize;

    if let Some(tags) = world.name_tags_mut() {
        tags[idx].name = "player1".to_string();
    }
    if let Some(positions) = world.positions_mut() {
        positions[idx].set(0.0, 0.0);
        positions[idx].set_offset(0.0, -4.0);
    }
    if let Some(velocities) = world.velocities_mut() {
        velocities[idx].friction = 100.0;
    }
    if let Some(collisions) = world.collisions_mut() {
        collisions[idx].kind = CollisionKind::WorldAndEntity;
        collisions[idx].rect = Rect::new(0.0, 0.0, 8.0, 8.0);
    }
    if let Some(renders) = world.renders_mut() {
        if let Some(tex) = texture {
            // Forward-facing frame of the character sheet.
            renders[idx].set_texture(tex, Some(ClipRect { x: 350, y: 0, w: 70, h: 70 }));
        }
        renders[idx].layer = 1;
    }

    if let Some(tex) = texture {
        load_player_animations(world, player, tex, catalog);
    }

    world.control_entity(player);
}

fn load_player_animations(
    world: &mut World,
    player: EntityId,
    texture: TextureId,
    catalog: &TextureCatalog,
) {
    let Some(animations) = world.animations_mut() else {
        return;
    };
    let anim = &mut animations[player as usize];

    let manifest = SheetManifest::load(Path::new("assets/character.json"));
    let (frame_w, frame_h) = manifest
        .as_ref()
        .map_or((70, 70), |m| (m.frame_width.max(1), m.frame_height.max(1)));
    let columns = catalog
        .info(texture)
        .map_or(1, |info| (info.width / frame_w).max(1));

    match manifest {
        Some(manifest) => {
            for seq in &manifest.sequences {
                let clip = anim.add_clip(&seq.name, texture);
                anim.add_frames(
                    clip,
                    columns,
                    frame_w,
                    frame_h,
                    seq.frames,
                    seq.start,
                    seq.frame_time_ms,
                );
            }
        }
        None => {
            // No manifest on disk: assume the stock sheet layout — one idle
            // frame per facing, then eight walk frames per facing.
            let idles = [
                "idleUpLeft", "idleUp", "idleUpRight", "idleRight", "idleDownRight", "idleDown",
                "idleDownLeft", "idleLeft",
            ];
            for (i, name) in idles.iter().enumerate() {
                let clip = anim.add_clip(name, texture);
                anim.add_frames(clip, columns, frame_w, frame_h, 1, i as u32, 100);
            }
            let walks = [
                "walkDown", "walkUp", "walkLeft", "walkRight", "walkDownLeft", "walkDownRight",
                "walkUpRight", "walkUpLeft",
            ];
            for (i, name) in walks.iter().enumerate() {
                let clip = anim.add_clip(name, texture);
                anim.add_frames(clip, columns, frame_w, frame_h, 8, 8 + (i as u32) * 8, 100);
            }
        }
    }

    anim.set_state("idleDown");
    anim.direction = Direction::Down;
}

fn spawn_trees(world: &mut World, texture: Option<TextureId>) {
    let mask = ComponentMask::of(&[
        ComponentKind::Position,
        ComponentKind::NameTag,
        ComponentKind::Render2D,
        ComponentKind::Velocity,
        ComponentKind::Collision,
    ]);

    let mut rng = 0x2545_f491_4f6c_dd1du64;
    let mut next = move || {
        // xorshift64*; plenty for scattering scenery.
        rng ^= rng >> 12;
        rng ^= rng << 25;
        rng ^= rng >> 27;
        rng.wrapping_mul(0x2545_f491_4f6c_dd1d)
    };

    log::debug!("adding {NUM_TREES} trees to the scene...");
    for i in 0..NUM_TREES {
        let tree = match world.create_entity(mask) {
            Ok(id) => id,
            Err(e) => {
                log::error!("tree spawning stopped after {i}: {e}");
                return;
            }
        };
        let idx = tree as usize;

        if let Some(tags) = world.name_tags_mut() {
            tags[idx].name = format!("tree {i}");
        }
        if let Some(positions) = world.positions_mut() {
            let x = (next() % MAP_WIDTH as u64) as f32 * 32.0;
            let y = (next() % MAP_HEIGHT as u64) as f32 * 32.0;
            positions[idx].set(x, y);
            positions[idx].set_offset(0.0, -96.0);
        }
        if let Some(collisions) = world.collisions_mut() {
            collisions[idx].rect = Rect::new(0.0, 0.0, 20.0, 20.0);
        }
        if let Some(renders) = world.renders_mut() {
            if let Some(tex) = texture {
                renders[idx].set_texture(tex, None);
            }
            renders[idx].layer = 1;
        }
    }
}
