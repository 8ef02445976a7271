use isogine::renderer::{Canvas, ClipRect, TextureId};

/// Canvas that records draw calls in order instead of rendering.
#[derive(Default)]
pub struct RecordingCanvas {
    pub draws: Vec<Draw>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Draw {
    pub texture: TextureId,
    pub x: f32,
    pub y: f32,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draws_of(&self, texture: TextureId) -> Vec<Draw> {
        self.draws
            .iter()
            .copied()
            .filter(|d| d.texture == texture)
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn draw_sprite(
        &mut self,
        texture: TextureId,
        x: f32,
        y: f32,
        _clip: Option<ClipRect>,
        _scale: f32,
    ) {
        self.draws.push(Draw { texture, x, y });
    }
}
