//! Scene container (C3): the set of effects and palettes available under
//! one `scene_id`, plus the scene's own default selection.

use crate::effect::Effect;
use crate::palette::Palette;

/// One scene: a fixed LED count, a frame rate, a set of palettes, and a set
/// of effects, plus the default effect/palette this scene was authored with.
#[derive(Debug, Clone)]
pub struct Scene {
    pub scene_id: u32,
    pub led_count: usize,
    pub fps: u32,
    pub current_effect_id: u32,
    pub current_palette_id: u32,
    pub palettes: Vec<Palette>,
    pub effects: Vec<Effect>,
}

impl Scene {
    /// Look up an effect by id.
    #[must_use]
    pub fn effect(&self, id: u32) -> Option<&Effect> {
        self.effects.iter().find(|e| e.effect_id == id)
    }

    /// Look up a palette by index.
    #[must_use]
    pub fn palette(&self, id: u32) -> Option<Palette> {
        self.palettes.get(id as usize).copied()
    }
}
