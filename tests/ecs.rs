use isogine::ecs::{ComponentKind, ComponentMask, World};
use isogine::error::EngineError;

fn mask(kinds: &[ComponentKind]) -> ComponentMask {
    ComponentMask::of(kinds)
}

/// Every registered table must always be exactly as long as the entity
/// array, through any sequence of creates, removes, and growth events.
#[test]
fn tables_stay_coherent_with_entity_array() {
    let mut world = World::new("coherence");
    world.add_component_kind(ComponentKind::Position).unwrap();
    world.add_component_kind(ComponentKind::Velocity).unwrap();
    world.add_component_kind(ComponentKind::NameTag).unwrap();

    let assert_coherent = |world: &World| {
        for (kind, len) in world.tables.lengths() {
            assert_eq!(
                len,
                world.capacity(),
                "{kind:?} table length diverged from entity capacity"
            );
        }
    };

    assert_coherent(&world);

    for _ in 0..5 {
        world.create_entity(mask(&[ComponentKind::Position])).unwrap();
        assert_coherent(&world);
    }
    world.remove_entity(2);
    assert_coherent(&world);
    world.remove_entity(0);
    assert_coherent(&world);

    // Push through another growth step.
    for _ in 0..1200 {
        world.create_entity(mask(&[ComponentKind::Position])).unwrap();
    }
    assert_coherent(&world);
}

/// Removing a middle entity moves the last live entity's record and
/// component data into its slot, with the id rewritten.
#[test]
fn swap_remove_relocates_the_last_entity() {
    let mut world = World::new("swap");
    world.add_component_kind(ComponentKind::Position).unwrap();

    let a = world.create_entity(mask(&[ComponentKind::Position])).unwrap();
    let b = world.create_entity(mask(&[ComponentKind::Position])).unwrap();
    let c = world
        .create_entity(mask(&[ComponentKind::Position, ComponentKind::NameTag]))
        .unwrap();

    {
        let positions = world.positions_mut().unwrap();
        positions[a as usize].set(1.0, 1.0);
        positions[b as usize].set(2.0, 2.0);
        positions[c as usize].set(3.0, 3.0);
    }

    world.remove_entity(a);

    assert_eq!(world.live_count(), 2);
    let moved = world.entity(a).unwrap();
    assert_eq!(moved.id, a, "survivor id must be rewritten to its new index");
    assert_eq!(
        moved.mask,
        mask(&[ComponentKind::Position, ComponentKind::NameTag]),
        "survivor keeps the removed-last entity's mask"
    );
    let positions = world.positions().unwrap();
    assert_eq!((positions[a as usize].x, positions[a as usize].y), (3.0, 3.0));
    // The untouched middle entity is untouched.
    assert_eq!((positions[b as usize].x, positions[b as usize].y), (2.0, 2.0));
}

#[test]
fn removing_last_entity_only_shrinks() {
    let mut world = World::new("last");
    world.add_component_kind(ComponentKind::Position).unwrap();
    world.create_entity(mask(&[ComponentKind::Position])).unwrap();
    let b = world.create_entity(mask(&[ComponentKind::Position])).unwrap();
    world.positions_mut().unwrap()[0].set(9.0, 9.0);

    world.remove_entity(b);
    assert_eq!(world.live_count(), 1);
    assert_eq!(world.positions().unwrap()[0].x, 9.0);

    // Dead ids are rejected without touching anything.
    world.remove_entity(b);
    assert_eq!(world.live_count(), 1);
}

/// The second entity exhausts the initial capacity of one and triggers the
/// 1000-step growth; existing component data must survive at its index.
#[test]
fn growth_extends_capacity_and_preserves_data() {
    let mut world = World::new("growth");
    world.add_component_kind(ComponentKind::Position).unwrap();
    world.add_component_kind(ComponentKind::Collision).unwrap();
    assert_eq!(world.capacity(), 1);

    let a = world.create_entity(mask(&[ComponentKind::Position])).unwrap();
    world.positions_mut().unwrap()[a as usize].set(11.0, 22.0);
    assert!(!world.tables_relocated());

    let b = world.create_entity(mask(&[ComponentKind::Position])).unwrap();
    assert_eq!(world.capacity(), 1001);
    assert!(world.tables_relocated(), "growth must raise the relocation signal");

    let positions = world.positions().unwrap();
    assert_eq!((positions[a as usize].x, positions[a as usize].y), (11.0, 22.0));
    assert_eq!(world.entity(b).unwrap().id, b);

    for (_, len) in world.tables.lengths() {
        assert_eq!(len, 1001);
    }
}

#[test]
fn duplicate_component_registration_is_a_no_op() {
    let mut world = World::new("dup");
    world.add_component_kind(ComponentKind::Animation).unwrap();
    world.create_entity(mask(&[ComponentKind::Animation])).unwrap();

    let err = world.add_component_kind(ComponentKind::Animation);
    assert!(matches!(
        err,
        Err(EngineError::DuplicateComponent(ComponentKind::Animation))
    ));
    // Scene state unchanged.
    assert_eq!(world.live_count(), 1);
    assert_eq!(world.animations().unwrap().len(), world.capacity());
}

#[test]
fn unregistered_tables_answer_none() {
    let world = World::new("none");
    assert!(world.positions().is_none());
    assert!(world.collisions().is_none());
}

#[test]
fn find_by_name_scans_live_entities() {
    let mut world = World::new("names");
    world.add_component_kind(ComponentKind::NameTag).unwrap();
    let a = world.create_entity(mask(&[ComponentKind::NameTag])).unwrap();
    let b = world.create_entity(mask(&[ComponentKind::NameTag])).unwrap();
    {
        let tags = world.name_tags_mut().unwrap();
        tags[a as usize].name = "alpha".to_string();
        tags[b as usize].name = "beta".to_string();
    }

    assert_eq!(world.find_by_name("beta"), Some(b));
    assert_eq!(world.find_by_name("gamma"), None);

    world.remove_entity(b);
    assert_eq!(world.find_by_name("beta"), None);
}
