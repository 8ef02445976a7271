use std::collections::TryReserveError;

use crate::ecs::components::{Animation, Collision, NameTag, Position, Render2D, Velocity};
use crate::ecs::{ComponentKind, ComponentMask, Entity, EntityId};
use crate::error::EngineError;
use crate::iso::IsoWorld;
use crate::iso::depth::DepthSortIndex;

/// Entities allocated when a world is created.
pub const INITIAL_ENTITIES: usize = 1;

/// Entities added per growth step once capacity is exhausted.
pub const ENTITY_GROWTH_STEP: usize = 1000;

// ---------------------------------------------------------------------------
// Tables — one dense array per registered component kind
// ---------------------------------------------------------------------------

/// Dense component storage. Every registered table has exactly the same
/// length as the entity array; they are registered, grown, and swap-removed
/// together, never individually.
#[derive(Default)]
pub struct Tables {
    pub render2d: Option<Vec<Render2D>>,
    pub position: Option<Vec<Position>>,
    pub velocity: Option<Vec<Velocity>>,
    pub name_tag: Option<Vec<NameTag>>,
    pub collision: Option<Vec<Collision>>,
    pub animation: Option<Vec<Animation>>,
}

/// Run `$body` once per registered table, binding the table vec as `$vec`.
/// The closed set of component kinds lives here and in the register match;
/// a new kind extends both.
macro_rules! each_table {
    ($tables:expr, $vec:ident => $body:expr) => {{
        if let Some($vec) = $tables.render2d.as_mut() {
            $body
        }
        if let Some($vec) = $tables.position.as_mut() {
            $body
        }
        if let Some($vec) = $tables.velocity.as_mut() {
            $body
        }
        if let Some($vec) = $tables.name_tag.as_mut() {
            $body
        }
        if let Some($vec) = $tables.collision.as_mut() {
            $body
        }
        if let Some($vec) = $tables.animation.as_mut() {
            $body
        }
    }};
}

impl Tables {
    fn register(&mut self, kind: ComponentKind, capacity: usize) -> Result<(), EngineError> {
        if self.is_registered(kind) {
            return Err(EngineError::DuplicateComponent(kind));
        }
        match kind {
            ComponentKind::Render2D => self.render2d = Some(vec![Render2D::default(); capacity]),
            ComponentKind::Position => self.position = Some(vec![Position::default(); capacity]),
            ComponentKind::Velocity => self.velocity = Some(vec![Velocity::default(); capacity]),
            ComponentKind::NameTag => self.name_tag = Some(vec![NameTag::default(); capacity]),
            ComponentKind::Collision => self.collision = Some(vec![Collision::default(); capacity]),
            ComponentKind::Animation => self.animation = Some(vec![Animation::default(); capacity]),
        }
        Ok(())
    }

    pub fn is_registered(&self, kind: ComponentKind) -> bool {
        match kind {
            ComponentKind::Render2D => self.render2d.is_some(),
            ComponentKind::Position => self.position.is_some(),
            ComponentKind::Velocity => self.velocity.is_some(),
            ComponentKind::NameTag => self.name_tag.is_some(),
            ComponentKind::Collision => self.collision.is_some(),
            ComponentKind::Animation => self.animation.is_some(),
        }
    }

    /// Length of every registered table, for diagnostics and the coherence
    /// invariant (all must equal the entity array's length).
    pub fn lengths(&self) -> Vec<(ComponentKind, usize)> {
        let mut out = Vec::new();
        if let Some(v) = &self.render2d {
            out.push((ComponentKind::Render2D, v.len()));
        }
        if let Some(v) = &self.position {
            out.push((ComponentKind::Position, v.len()));
        }
        if let Some(v) = &self.velocity {
            out.push((ComponentKind::Velocity, v.len()));
        }
        if let Some(v) = &self.name_tag {
            out.push((ComponentKind::NameTag, v.len()));
        }
        if let Some(v) = &self.collision {
            out.push((ComponentKind::Collision, v.len()));
        }
        if let Some(v) = &self.animation {
            out.push((ComponentKind::Animation, v.len()));
        }
        out
    }

    /// Fallibly reserve `additional` slots in every registered table without
    /// touching any length. All-or-nothing as far as lengths are concerned:
    /// a failure here leaves every table exactly as long as before.
    fn try_reserve_all(&mut self, additional: usize) -> Result<(), TryReserveError> {
        let mut result = Ok(());
        each_table!(self, vec => {
            if result.is_ok() {
                result = vec.try_reserve_exact(additional);
            }
        });
        result
    }

    /// Extend every registered table to `new_len` with default slots. Only
    /// valid after a successful [`Self::try_reserve_all`].
    fn resize_all(&mut self, new_len: usize) {
        each_table!(self, vec => vec.resize(new_len, Default::default()));
    }

    /// Copy the record at `last` over the record at `slot` in every
    /// registered table (the data half of a swap-remove).
    fn swap_from_last(&mut self, slot: usize, last: usize) {
        each_table!(self, vec => vec[slot] = vec[last].clone());
    }
}

// ---------------------------------------------------------------------------
// World — entities, tables, and shared per-frame state
// ---------------------------------------------------------------------------

/// Everything a scene simulates: the dense entity array, the component
/// tables, the isometric sub-engine, and the depth-sort index shared between
/// the render and collision systems. Passed to every system call; systems
/// hold no state of their own beyond what their init derived.
pub struct World {
    pub name: String,
    pub(crate) entities: Vec<Entity>,
    live: usize,
    pub tables: Tables,
    /// Camera + map. `None` until the scene attaches one; render and
    /// collision systems fail their init without it.
    pub iso: Option<IsoWorld>,
    /// Draw-order index rebuilt every frame by the render system.
    pub depth: DepthSortIndex,
    pub(crate) controlled: Option<EntityId>,
    growth_failed: bool,
    tables_relocated: bool,
    exit_requested: bool,
    /// Insert a small voluntary delay between frames.
    pub consume_less_cpu: bool,
}

impl World {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entities: vec![Entity::default(); INITIAL_ENTITIES],
            live: 0,
            tables: Tables::default(),
            iso: None,
            depth: DepthSortIndex::default(),
            controlled: None,
            growth_failed: false,
            tables_relocated: false,
            exit_requested: false,
            consume_less_cpu: false,
        }
    }

    // -- Scene configuration -------------------------------------------------

    /// Register a component kind, allocating its table at current capacity.
    /// Registering twice is rejected and leaves the scene unchanged.
    pub fn add_component_kind(&mut self, kind: ComponentKind) -> Result<(), EngineError> {
        let capacity = self.entities.len();
        match self.tables.register(kind, capacity) {
            Ok(()) => Ok(()),
            Err(e) => {
                log::error!("world '{}': {e}", self.name);
                Err(e)
            }
        }
    }

    /// Attach the isometric sub-engine and size the depth index to its map.
    pub fn attach_iso(&mut self, iso: IsoWorld) {
        self.depth.configure(iso.map.layers() as usize);
        self.iso = Some(iso);
    }

    // -- Entity lifecycle ----------------------------------------------------

    /// Append an entity owning the masked component kinds. Triggers a
    /// coordinated growth of the entity array and every table when capacity
    /// is exhausted; growth failure permanently disables further creation
    /// but never crashes.
    pub fn create_entity(&mut self, mask: ComponentMask) -> Result<EntityId, EngineError> {
        if self.growth_failed {
            return Err(EngineError::GrowthDisabled);
        }
        if self.live >= self.entities.len() {
            self.grow()?;
        }
        let id = self.live as EntityId;
        self.entities[self.live] = Entity { id, mask };
        self.live += 1;
        Ok(id)
    }

    fn grow(&mut self) -> Result<(), EngineError> {
        let new_cap = self.entities.len() + ENTITY_GROWTH_STEP;
        let additional = new_cap - self.entities.len();

        // Reserve everything before resizing anything, so a failure can
        // never leave the tables at different lengths than the entity array.
        let reserved = self
            .entities
            .try_reserve_exact(additional)
            .and_then(|()| self.tables.try_reserve_all(additional));
        if let Err(e) = reserved {
            self.growth_failed = true;
            log::error!("world '{}': growing to {new_cap} entities failed: {e}", self.name);
            return Err(EngineError::Alloc(e));
        }

        self.entities.resize(new_cap, Entity::default());
        self.tables.resize_all(new_cap);
        self.tables_relocated = true;
        Ok(())
    }

    /// Swap-remove: the last live entity's record and component data move
    /// into the freed slot (keeping live entities contiguous), and the moved
    /// record's id is rewritten to its new index. Removing the last or only
    /// entity just shrinks the live count.
    pub fn remove_entity(&mut self, id: EntityId) {
        let idx = id as usize;
        if self.live == 0 {
            return;
        }
        if idx >= self.live {
            log::warn!("world '{}': remove_entity({id}) is not a live entity", self.name);
            return;
        }
        if self.live == 1 || idx == self.live - 1 {
            // Slot is logically dead; the next create_entity overwrites it.
            self.live -= 1;
            return;
        }

        let last = self.live - 1;
        let moved = self.entities[last];
        self.entities[idx] = Entity { id, mask: moved.mask };
        self.tables.swap_from_last(idx, last);
        self.live -= 1;
    }

    // -- Lookup --------------------------------------------------------------

    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Allocated capacity; every registered table has this exact length.
    pub fn capacity(&self) -> usize {
        self.entities.len()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        let idx = id as usize;
        if idx < self.live { Some(&self.entities[idx]) } else { None }
    }

    /// Component mask of a live entity; empty for dead ids.
    pub fn mask(&self, id: EntityId) -> ComponentMask {
        self.entity(id).map_or(ComponentMask::EMPTY, |e| e.mask)
    }

    /// Find a live entity by its name tag.
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        let tags = self.tables.name_tag.as_deref()?;
        (0..self.live)
            .find(|&i| {
                self.entities[i].mask.contains(ComponentKind::NameTag) && tags[i].name == name
            })
            .map(|i| i as EntityId)
    }

    // -- Typed table access --------------------------------------------------
    //
    // Systems re-fetch these every call instead of caching anything across
    // frames; a miss is the lookup-miss sentinel from the error taxonomy.

    pub fn positions(&self) -> Option<&[Position]> {
        self.tables.position.as_deref()
    }

    pub fn positions_mut(&mut self) -> Option<&mut [Position]> {
        self.tables.position.as_deref_mut()
    }

    pub fn velocities(&self) -> Option<&[Velocity]> {
        self.tables.velocity.as_deref()
    }

    pub fn velocities_mut(&mut self) -> Option<&mut [Velocity]> {
        self.tables.velocity.as_deref_mut()
    }

    pub fn renders(&self) -> Option<&[Render2D]> {
        self.tables.render2d.as_deref()
    }

    pub fn renders_mut(&mut self) -> Option<&mut [Render2D]> {
        self.tables.render2d.as_deref_mut()
    }

    pub fn name_tags(&self) -> Option<&[NameTag]> {
        self.tables.name_tag.as_deref()
    }

    pub fn name_tags_mut(&mut self) -> Option<&mut [NameTag]> {
        self.tables.name_tag.as_deref_mut()
    }

    pub fn collisions(&self) -> Option<&[Collision]> {
        self.tables.collision.as_deref()
    }

    pub fn collisions_mut(&mut self) -> Option<&mut [Collision]> {
        self.tables.collision.as_deref_mut()
    }

    pub fn animations(&self) -> Option<&[Animation]> {
        self.tables.animation.as_deref()
    }

    pub fn animations_mut(&mut self) -> Option<&mut [Animation]> {
        self.tables.animation.as_deref_mut()
    }

    // -- Control / flags -----------------------------------------------------

    /// Mark the entity the control systems steer and the camera follows.
    pub fn control_entity(&mut self, id: EntityId) {
        self.controlled = Some(id);
    }

    pub fn controlled_entity(&self) -> Option<EntityId> {
        self.controlled
    }

    pub fn growth_failed(&self) -> bool {
        self.growth_failed
    }

    /// One-shot signal that storage was reallocated this frame. Cleared at
    /// the end of the frame by the scene.
    pub fn tables_relocated(&self) -> bool {
        self.tables_relocated
    }

    pub(crate) fn clear_tables_relocated(&mut self) {
        self.tables_relocated = false;
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_world_starts_at_initial_capacity() {
        let world = World::new("w");
        assert_eq!(world.capacity(), INITIAL_ENTITIES);
        assert_eq!(world.live_count(), 0);
    }

    #[test]
    fn duplicate_component_kind_is_rejected() {
        let mut world = World::new("w");
        world.add_component_kind(ComponentKind::Position).unwrap();
        assert!(matches!(
            world.add_component_kind(ComponentKind::Position),
            Err(EngineError::DuplicateComponent(ComponentKind::Position))
        ));
        // The scene is unchanged: the table is still there, still sized.
        assert_eq!(world.positions().unwrap().len(), world.capacity());
    }

    #[test]
    fn create_assigns_dense_ids() {
        let mut world = World::new("w");
        let a = world.create_entity(ComponentMask::EMPTY).unwrap();
        let b = world.create_entity(ComponentMask::EMPTY).unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(world.entity(b).unwrap().id, 1);
    }

    #[test]
    fn dead_ids_answer_with_sentinels() {
        let world = World::new("w");
        assert!(world.entity(5).is_none());
        assert!(world.mask(5).is_empty());
    }
}
