mod common;

use common::RecordingCanvas;
use isogine::ecs::systems::{Frame, SystemKind};
use isogine::ecs::{ComponentKind, ComponentMask, EntityId, Scene};
use isogine::input::InputState;
use isogine::iso::map::IsoMap;
use isogine::iso::{IsoView, IsoWorld};
use isogine::renderer::{TextureCatalog, TextureId};

/// Scene with every component kind, the iso render system, and a small map.
/// Returns the scene plus the catalog id of a 16x16 test sprite.
fn sort_scene(catalog: &mut TextureCatalog) -> (Scene, TextureId) {
    let sprite = catalog.register("sprite", 16, 16);

    let mut scene = Scene::new("sort");
    for kind in ComponentKind::ALL {
        scene.world.add_component_kind(kind).unwrap();
    }
    scene.add_system(SystemKind::IsoRender);

    let map = IsoMap::new("m", 8, 8, 1, 64);
    let view = IsoView::new(640, 480);
    scene.world.attach_iso(IsoWorld::new(view, map));
    scene.init_systems().unwrap();

    (scene, sprite)
}

fn spawn_sprite(scene: &mut Scene, sprite: TextureId, x: f32, y: f32) -> EntityId {
    let id = scene
        .world
        .create_entity(ComponentMask::of(&[
            ComponentKind::Position,
            ComponentKind::Render2D,
        ]))
        .unwrap();
    let idx = id as usize;
    scene.world.positions_mut().unwrap()[idx].set(x, y);
    let renders = scene.world.renders_mut().unwrap();
    renders[idx].set_texture(sprite, None);
    renders[idx].layer = 0;
    id
}

fn run_frame(scene: &mut Scene, catalog: &TextureCatalog) {
    let input = InputState::new();
    let mut canvas = RecordingCanvas::new();
    let mut frame = Frame {
        dt: 1.0 / 60.0,
        input: &input,
        textures: catalog,
        canvas: &mut canvas,
    };
    scene.run_frame(&mut frame);
}

/// Three visible entities with increasing world Y must come out of the sort
/// pass ordered back-to-front: Y 5, then Y 10, then Y 20.
#[test]
fn sort_pass_orders_entities_by_cartesian_height() {
    let mut catalog = TextureCatalog::new();
    let (mut scene, sprite) = sort_scene(&mut catalog);

    let for_y10 = spawn_sprite(&mut scene, sprite, 10.0, 10.0);
    let for_y5 = spawn_sprite(&mut scene, sprite, 10.0, 5.0);
    let for_y20 = spawn_sprite(&mut scene, sprite, 10.0, 20.0);

    run_frame(&mut scene, &catalog);

    let order: Vec<EntityId> = scene
        .world
        .depth
        .entries(0)
        .iter()
        .map(|e| e.entity)
        .collect();
    assert_eq!(order, vec![for_y5, for_y10, for_y20]);
}

/// An entity projecting outside the viewport must be absent from the frame's
/// index entirely, not merely deprioritized.
#[test]
fn off_screen_entities_are_excluded() {
    let mut catalog = TextureCatalog::new();
    let (mut scene, sprite) = sort_scene(&mut catalog);

    let visible = spawn_sprite(&mut scene, sprite, 10.0, 10.0);
    // Projects to an isometric y of 5000 — far below a 480-pixel viewport.
    spawn_sprite(&mut scene, sprite, 5000.0, 5000.0);

    run_frame(&mut scene, &catalog);

    let entries = scene.world.depth.entries(0);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entity, visible);
}

/// Entities without the renderable component combinations never enter the
/// index.
#[test]
fn non_renderable_entities_are_skipped() {
    let mut catalog = TextureCatalog::new();
    let (mut scene, sprite) = sort_scene(&mut catalog);

    spawn_sprite(&mut scene, sprite, 10.0, 10.0);
    // Position only — nothing to draw.
    scene
        .world
        .create_entity(ComponentMask::of(&[ComponentKind::Position]))
        .unwrap();

    run_frame(&mut scene, &catalog);
    assert_eq!(scene.world.depth.entries(0).len(), 1);
}

/// Each frame rebuilds the index from scratch and retires the previous one
/// into the collision snapshot.
#[test]
fn index_is_rebuilt_every_frame() {
    let mut catalog = TextureCatalog::new();
    let (mut scene, sprite) = sort_scene(&mut catalog);

    spawn_sprite(&mut scene, sprite, 10.0, 10.0);
    spawn_sprite(&mut scene, sprite, 10.0, 20.0);

    run_frame(&mut scene, &catalog);
    assert_eq!(scene.world.depth.entries(0).len(), 2);
    assert_eq!(scene.world.depth.snapshot(0).len(), 0);

    run_frame(&mut scene, &catalog);
    assert_eq!(scene.world.depth.entries(0).len(), 2);
    assert_eq!(
        scene.world.depth.snapshot(0).len(),
        2,
        "previous frame's entries become the snapshot"
    );
}
