use crate::geometry::Rect;
use crate::renderer::{ClipRect, TextureId};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Number of previous positions kept per entity. The collision probe rolls
/// back to the newest entry when an entity runs into something.
pub const POSITION_HISTORY: usize = 6;

/// World position for an entity that has not been placed yet. Far enough
/// outside any map that it never projects into the viewport.
pub const PARKED: f32 = -1000.0;

#[derive(Clone, Debug)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    /// Recent positions, newest first. Pushed once per move by the movement
    /// system, consumed by collision rollback.
    pub old_x: [f32; POSITION_HISTORY],
    pub old_y: [f32; POSITION_HISTORY],
    /// Draw offset marking where on the sprite the entity's base sits.
    pub x_offset: f32,
    pub y_offset: f32,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            x: PARKED,
            y: PARKED,
            old_x: [PARKED; POSITION_HISTORY],
            old_y: [PARKED; POSITION_HISTORY],
            x_offset: 0.0,
            y_offset: 0.0,
        }
    }
}

impl Position {
    pub fn set(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    pub fn set_offset(&mut self, x: f32, y: f32) {
        self.x_offset = x;
        self.y_offset = y;
    }

    /// Push the current position onto the history stack, dropping the oldest
    /// entry.
    pub fn push_history(&mut self) {
        self.old_x.copy_within(0..POSITION_HISTORY - 1, 1);
        self.old_y.copy_within(0..POSITION_HISTORY - 1, 1);
        self.old_x[0] = self.x;
        self.old_y[0] = self.y;
    }

    /// Restore the most recently recorded position.
    pub fn rollback(&mut self) {
        self.x = self.old_x[0];
        self.y = self.old_y[0];
    }
}

// ---------------------------------------------------------------------------
// Velocity
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
    /// Per-second decay applied toward zero each frame. Zero keeps the
    /// velocity constant.
    pub friction: f32,
    /// Speed cap per axis. Zero means uncapped.
    pub max_speed: f32,
}

impl Velocity {
    pub fn set(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }
}

// ---------------------------------------------------------------------------
// Render2D
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct Render2D {
    /// Texture to draw, or `None` while the entity has nothing renderable.
    pub texture: Option<TextureId>,
    /// Sub-rectangle of the texture to draw. `None` draws the whole texture.
    pub clip: Option<ClipRect>,
    /// Render layer of the isometric map this entity draws on.
    pub layer: i32,
}

impl Render2D {
    pub fn set_texture(&mut self, texture: TextureId, clip: Option<ClipRect>) {
        self.texture = Some(texture);
        self.clip = clip;
    }
}

// ---------------------------------------------------------------------------
// NameTag
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct NameTag {
    pub name: String,
}

// ---------------------------------------------------------------------------
// Collision
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CollisionKind {
    /// Fast path: the probe skips the entity entirely.
    #[default]
    Disabled,
    World,
    Entity,
    WorldAndEntity,
}

impl CollisionKind {
    pub fn against_world(self) -> bool {
        matches!(self, CollisionKind::World | CollisionKind::WorldAndEntity)
    }

    pub fn against_entities(self) -> bool {
        matches!(self, CollisionKind::Entity | CollisionKind::WorldAndEntity)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Collision {
    pub kind: CollisionKind,
    /// Collision rectangle in sprite-local pixels, anchored at the sprite
    /// base.
    pub rect: Rect,
    /// Screen-space rectangle rebuilt by the probe each frame it runs.
    pub world_rect: Rect,
    /// Set for one frame when the probe rolled this entity back.
    pub colliding: bool,
}

// ---------------------------------------------------------------------------
// Animation
// ---------------------------------------------------------------------------

/// Which way the entity is facing in the isometric world.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

#[derive(Clone, Debug)]
pub struct AnimationFrame {
    pub clip: ClipRect,
    pub duration_ms: u32,
}

#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub texture: TextureId,
    pub frames: Vec<AnimationFrame>,
    /// Index of the frame currently shown.
    pub current: usize,
    /// Milliseconds accumulated toward the current frame's duration.
    pub elapsed_ms: f32,
}

impl AnimationClip {
    /// Advance the clip by `dt` seconds, wrapping to the first frame after
    /// the last.
    pub fn advance(&mut self, dt: f32) {
        if self.frames.is_empty() {
            return;
        }
        self.elapsed_ms += dt * 1000.0;
        // Zero-length frames count as 1 ms so a bad manifest cannot spin
        // this loop forever.
        let mut duration = self.frames[self.current].duration_ms.max(1) as f32;
        while self.elapsed_ms >= duration {
            self.elapsed_ms -= duration;
            self.current = (self.current + 1) % self.frames.len();
            duration = self.frames[self.current].duration_ms.max(1) as f32;
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Animation {
    pub clips: Vec<AnimationClip>,
    /// Active clip index, or `None` before any state was selected.
    pub state: Option<usize>,
    pub direction: Direction,
}

impl Animation {
    /// Register an empty clip and return its index.
    pub fn add_clip(&mut self, name: &str, texture: TextureId) -> usize {
        self.clips.push(AnimationClip {
            name: name.to_string(),
            texture,
            frames: Vec::new(),
            current: 0,
            elapsed_ms: 0.0,
        });
        self.clips.len() - 1
    }

    /// Append `count` frames cut from a row-major grid of `columns` cells of
    /// `frame_w × frame_h` pixels, starting at cell `start`.
    pub fn add_frames(
        &mut self,
        clip: usize,
        columns: u32,
        frame_w: u32,
        frame_h: u32,
        count: u32,
        start: u32,
        duration_ms: u32,
    ) {
        let Some(clip) = self.clips.get_mut(clip) else {
            log::error!("animation clip index {clip} out of range");
            return;
        };
        let columns = columns.max(1);
        for i in start..start + count {
            clip.frames.push(AnimationFrame {
                clip: ClipRect {
                    x: (i % columns) * frame_w,
                    y: (i / columns) * frame_h,
                    w: frame_w,
                    h: frame_h,
                },
                duration_ms,
            });
        }
    }

    pub fn clip_index(&self, name: &str) -> Option<usize> {
        self.clips.iter().position(|c| c.name == name)
    }

    /// Switch to the named clip. Re-selecting the active clip keeps its
    /// frame position; switching resets to the first frame.
    pub fn set_state(&mut self, name: &str) {
        match self.clip_index(name) {
            Some(idx) => {
                if self.state != Some(idx) {
                    self.state = Some(idx);
                    self.clips[idx].current = 0;
                    self.clips[idx].elapsed_ms = 0.0;
                }
            }
            None => log::error!("animation state '{name}' does not exist"),
        }
    }

    pub fn active_clip(&self) -> Option<&AnimationClip> {
        self.state.and_then(|idx| self.clips.get(idx))
    }

    /// Clip rectangle of the frame currently shown by the active clip.
    pub fn current_frame(&self) -> Option<(TextureId, ClipRect)> {
        let clip = self.active_clip()?;
        let frame = clip.frames.get(clip.current)?;
        Some((clip.texture, frame.clip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_push_keeps_newest_first() {
        let mut pos = Position::default();
        pos.set(1.0, 10.0);
        pos.push_history();
        pos.set(2.0, 20.0);
        pos.push_history();

        assert_eq!(pos.old_x[0], 2.0);
        assert_eq!(pos.old_x[1], 1.0);
        assert_eq!(pos.old_y[0], 20.0);
        assert_eq!(pos.old_y[1], 10.0);
    }

    #[test]
    fn rollback_restores_latest_recorded() {
        let mut pos = Position::default();
        pos.set(5.0, 6.0);
        pos.push_history();
        pos.set(7.0, 8.0);
        pos.rollback();
        assert_eq!((pos.x, pos.y), (5.0, 6.0));
    }

    #[test]
    fn clip_advance_wraps() {
        let mut anim = Animation::default();
        let idx = anim.add_clip("walk", 0);
        anim.add_frames(idx, 4, 16, 16, 4, 0, 100);
        anim.set_state("walk");

        let clip = &mut anim.clips[idx];
        clip.advance(0.35); // 350 ms across 100 ms frames
        assert_eq!(clip.current, 3);
        clip.advance(0.1);
        assert_eq!(clip.current, 0);
    }

    #[test]
    fn frames_follow_grid_layout() {
        let mut anim = Animation::default();
        let idx = anim.add_clip("walk", 0);
        anim.add_frames(idx, 2, 8, 8, 3, 1, 50);

        let frames = &anim.clips[idx].frames;
        assert_eq!(frames[0].clip, ClipRect { x: 8, y: 0, w: 8, h: 8 });
        assert_eq!(frames[1].clip, ClipRect { x: 0, y: 8, w: 8, h: 8 });
        assert_eq!(frames[2].clip, ClipRect { x: 8, y: 8, w: 8, h: 8 });
    }

    #[test]
    fn unknown_state_is_ignored() {
        let mut anim = Animation::default();
        anim.set_state("missing");
        assert!(anim.state.is_none());
    }
}
