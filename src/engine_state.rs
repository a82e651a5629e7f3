//! Scene manager / engine state (C4): owns every loaded scene, the
//! active/staged selection, dissolve state, and the playback controls
//! (speed, master brightness, pause). `Engine` (see `engine.rs`) is the only
//! thing that ever touches this directly, behind one mutex.

use std::collections::HashMap;

use embassy_time::Instant;
use log::{info, warn};

use crate::color::Rgb;
use crate::dissolve::Dissolve;
use crate::model::{DissolveBundle, Frame, SceneBundle};
use crate::scene::Scene;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct SelectionIds {
    scene_id: u32,
    effect_id: u32,
    palette_id: u32,
}

/// All mutable engine state: scenes, active/staged selection, dissolve,
/// and playback controls (§3, §4.4).
pub struct EngineState {
    scenes: HashMap<u32, Scene>,
    scene_order: Vec<u32>,

    active: SelectionIds,
    staged: SelectionIds,

    dissolve_patterns: DissolveBundle,
    active_dissolve_pattern_id: u32,
    dissolve: Option<Dissolve>,

    speed_percent: u32,
    master_brightness: u8,
    paused: bool,

    last_frame: Frame,
}

impl EngineState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scenes: HashMap::new(),
            scene_order: Vec::new(),
            active: SelectionIds::default(),
            staged: SelectionIds::default(),
            dissolve_patterns: DissolveBundle::default(),
            active_dissolve_pattern_id: 0,
            dissolve: None,
            speed_percent: 100,
            master_brightness: 255,
            paused: false,
            last_frame: Vec::new(),
        }
    }

    /// Replace every loaded scene, reset timing on every segment, and select
    /// the first scene in document order as active (§4.4).
    pub fn load_scenes(&mut self, mut bundle: SceneBundle, now: Instant) {
        for scene in &mut bundle.scenes {
            for effect in &mut scene.effects {
                for segment in &mut effect.segments {
                    segment.reset_timing(now);
                }
            }
        }

        self.scene_order = bundle.scenes.iter().map(|s| s.scene_id).collect();
        self.scenes = bundle.scenes.into_iter().map(|s| (s.scene_id, s)).collect();

        let first = self.scene_order.first().copied().unwrap_or(0);
        let (effect_id, palette_id) = self
            .scenes
            .get(&first)
            .map_or((0, 0), |s| (s.current_effect_id, s.current_palette_id));

        let ids = SelectionIds { scene_id: first, effect_id, palette_id };
        self.active = ids;
        self.staged = ids;
        self.dissolve = None;

        info!("loaded {} scene(s); active scene {first}", self.scene_order.len());
    }

    /// Stage a scene change. Returns `false` (and leaves staging untouched)
    /// if `id` names no loaded scene.
    pub fn cache_change_scene(&mut self, id: u32) -> bool {
        if self.scenes.contains_key(&id) {
            self.staged.scene_id = id;
            true
        } else {
            warn!("cache_change_scene: unknown scene {id}");
            false
        }
    }

    /// Stage an effect change within the staged scene. Returns `false` if
    /// `id` names no effect in that scene.
    pub fn cache_change_effect(&mut self, id: u32) -> bool {
        let Some(scene) = self.scenes.get(&self.staged.scene_id) else { return false };
        if scene.effect(id).is_some() {
            self.staged.effect_id = id;
            true
        } else {
            warn!("cache_change_effect: unknown effect {id} in scene {}", self.staged.scene_id);
            false
        }
    }

    /// Stage a palette change within the staged scene. Returns `false` if
    /// `id` names no palette in that scene.
    pub fn cache_change_palette(&mut self, id: u32) -> bool {
        let Some(scene) = self.scenes.get(&self.staged.scene_id) else { return false };
        if scene.palette(id).is_some() {
            self.staged.palette_id = id;
            true
        } else {
            warn!("cache_change_palette: unknown palette {id} in scene {}", self.staged.scene_id);
            false
        }
    }

    /// Atomically adopt every staged id as active, reset the newly active
    /// effect's segment timing, and begin a dissolve from the last rendered
    /// frame (§4.4, §4.5). A no-op if nothing was staged.
    pub fn commit_pattern(&mut self, now: Instant) {
        if self.staged == self.active {
            return;
        }

        let from_frame = self.last_frame.clone();
        self.active = self.staged;

        if let Some(scene) = self.scenes.get_mut(&self.active.scene_id) {
            if let Some(effect) = scene.effects.iter_mut().find(|e| e.effect_id == self.active.effect_id) {
                for segment in &mut effect.segments {
                    segment.reset_timing(now);
                }
            }
        }

        let pattern = self
            .dissolve_patterns
            .patterns
            .get(&self.active_dissolve_pattern_id)
            .cloned()
            .unwrap_or_default();
        self.dissolve = Some(Dissolve::begin(from_frame, now, pattern));

        info!(
            "committed pattern: scene {} effect {} palette {}",
            self.active.scene_id, self.active.effect_id, self.active.palette_id
        );
    }

    pub fn set_palette_color(&mut self, palette_id: u32, color_id: usize, rgb: Rgb) {
        let Some(scene) = self.scenes.get_mut(&self.active.scene_id) else { return };
        let Some(palette) = scene.palettes.get_mut(palette_id as usize) else {
            warn!("set_palette_color: palette {palette_id} out of range");
            return;
        };
        if !palette.set_color(color_id, rgb) {
            warn!("set_palette_color: color slot {color_id} out of range");
        }
    }

    /// Select the active dissolve pattern. Returns `false` if `id` names no
    /// loaded pattern.
    pub fn set_dissolve_pattern(&mut self, id: u32) -> bool {
        if self.dissolve_patterns.patterns.contains_key(&id) {
            self.active_dissolve_pattern_id = id;
            true
        } else {
            warn!("set_dissolve_pattern: unknown pattern {id}");
            false
        }
    }

    /// Record which pattern id to use once patterns are loaded, without
    /// requiring it to exist yet (the A3 config's startup default names a
    /// pattern that typically loads later via `/load_dissolve_json`).
    pub fn set_default_dissolve_pattern_id(&mut self, id: u32) {
        self.active_dissolve_pattern_id = id;
    }

    pub fn load_dissolve_patterns(&mut self, bundle: DissolveBundle) {
        info!("loaded {} dissolve pattern(s)", bundle.patterns.len());
        self.dissolve_patterns = bundle;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn set_speed(&mut self, percent: i64) {
        self.speed_percent = percent.clamp(0, 1023) as u32;
    }

    pub fn set_master_brightness(&mut self, brightness: i64) {
        self.master_brightness = brightness.clamp(0, 255) as u8;
    }

    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub const fn speed_percent(&self) -> u32 {
        self.speed_percent
    }

    #[must_use]
    pub fn active_scene_fps(&self) -> Option<u32> {
        self.scenes.get(&self.active.scene_id).map(|s| s.fps)
    }

    /// Advance the active effect's segments by `dt` virtual seconds. No-op
    /// while paused.
    pub fn update_animation(&mut self, dt: f32, now: Instant) {
        if self.paused {
            return;
        }
        let Some(scene) = self.scenes.get_mut(&self.active.scene_id) else { return };
        let Some(effect) = scene.effects.iter_mut().find(|e| e.effect_id == self.active.effect_id) else { return };
        for segment in &mut effect.segments {
            segment.advance_position(dt, now);
        }
    }

    /// Render the next frame: active effect additively composited, any
    /// in-flight dissolve blended in, master brightness applied last (§4.4).
    pub fn render(&mut self, now: Instant) -> Frame {
        let led_count = self.scenes.get(&self.active.scene_id).map_or(0, |s| s.led_count);

        if self.paused {
            let frame = vec![Rgb { r: 0, g: 0, b: 0 }; led_count];
            self.last_frame = frame.clone();
            return frame;
        }

        let mut frame = vec![Rgb { r: 0, g: 0, b: 0 }; led_count];
        if let Some(scene) = self.scenes.get(&self.active.scene_id) {
            let palette = scene.palette(self.active.palette_id).unwrap_or_default();
            if let Some(effect) = scene.effect(self.active.effect_id) {
                for segment in &effect.segments {
                    segment.render(&palette, now, &mut frame);
                }
            }
        }

        let frame = if let Some(dissolve) = &self.dissolve {
            let (blended, terminated) = dissolve.blend(&frame, now);
            if terminated {
                self.dissolve = None;
            }
            blended
        } else {
            frame
        };

        let mut frame = frame;
        crate::color::apply_master(&mut frame, self.master_brightness);
        self.last_frame = frame.clone();
        frame
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}
