pub mod components;
pub mod scene;
pub mod systems;
pub mod world;

pub use scene::{Scene, SceneManager};
pub use world::World;

// ---------------------------------------------------------------------------
// Entity — a dense index plus the set of components it owns
// ---------------------------------------------------------------------------

/// Entity handle. Equals the entity's current index in the dense entity
/// array; rewritten when a swap-remove relocates the record.
pub type EntityId = u32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    /// Current index in the dense entity array.
    pub id: EntityId,
    /// One bit per owned component kind.
    pub mask: ComponentMask,
}

impl Default for Entity {
    fn default() -> Self {
        Self { id: 0, mask: ComponentMask::EMPTY }
    }
}

// ---------------------------------------------------------------------------
// ComponentKind — the closed set of component types
// ---------------------------------------------------------------------------

/// Every component type the engine knows about. One bit each in a
/// [`ComponentMask`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ComponentKind {
    Render2D,
    Position,
    Velocity,
    NameTag,
    Collision,
    Animation,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 6] = [
        ComponentKind::Render2D,
        ComponentKind::Position,
        ComponentKind::Velocity,
        ComponentKind::NameTag,
        ComponentKind::Collision,
        ComponentKind::Animation,
    ];

    /// Zero-based bit index of this kind inside a mask word.
    pub fn bit_index(self) -> u32 {
        match self {
            ComponentKind::Render2D => 0,
            ComponentKind::Position => 1,
            ComponentKind::Velocity => 2,
            ComponentKind::NameTag => 3,
            ComponentKind::Collision => 4,
            ComponentKind::Animation => 5,
        }
    }

    pub fn bit(self) -> u64 {
        1 << self.bit_index()
    }
}

// ---------------------------------------------------------------------------
// ComponentMask
// ---------------------------------------------------------------------------

/// Bitset of component kinds. A single `u64` word covers the closed kind set
/// with room to spare; widening it further only touches this newtype.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct ComponentMask(u64);

impl ComponentMask {
    pub const EMPTY: Self = Self(0);

    pub fn of(kinds: &[ComponentKind]) -> Self {
        let mut bits = 0;
        for kind in kinds {
            bits |= kind.bit();
        }
        Self(bits)
    }

    pub fn with(self, kind: ComponentKind) -> Self {
        Self(self.0 | kind.bit())
    }

    pub fn contains(self, kind: ComponentKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// True when every kind set in `required` is also set in `self`.
    pub fn contains_all(self, required: ComponentMask) -> bool {
        self.0 & required.0 == required.0
    }

    /// True when at least one kind is shared with `other`.
    pub fn intersects(self, other: ComponentMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<ComponentKind> for ComponentMask {
    fn from(kind: ComponentKind) -> Self {
        Self(kind.bit())
    }
}

impl std::ops::BitOr for ComponentMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
