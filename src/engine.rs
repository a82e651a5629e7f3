//! `Engine` (C4): the process-wide handle wrapping `EngineState` behind one
//! `std::sync::Mutex`, plus the error counters every collaborator bumps
//! instead of propagating errors up through the control/scheduler threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use embassy_time::Instant;

use crate::color::Rgb;
use crate::engine_state::EngineState;
use crate::error::EngineError;
use crate::model::{DissolveBundle, Frame, SceneBundle};

/// Process-wide error counters, one per §7 error kind.
#[derive(Debug, Default)]
pub struct ErrorCounters {
    pub malformed_input: AtomicU64,
    pub out_of_range: AtomicU64,
    pub missing_resource: AtomicU64,
    pub io_failure: AtomicU64,
    pub load_failure: AtomicU64,
}

impl ErrorCounters {
    fn record(&self, err: &EngineError) {
        let counter = match err {
            EngineError::MalformedInput { .. } => &self.malformed_input,
            EngineError::OutOfRange { .. } => &self.out_of_range,
            EngineError::MissingResource { .. } => &self.missing_resource,
            EngineError::IoFailure { .. } => &self.io_failure,
            EngineError::LoadFailure { .. } => &self.load_failure,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// The single process-wide engine instance (§5): one mutex guarding all
/// mutable playback state, reachable from the control-ingress thread and the
/// frame-scheduler thread alike.
pub struct Engine {
    state: Mutex<EngineState>,
    pub errors: ErrorCounters,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EngineState::new()),
            errors: ErrorCounters::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn load_scenes(&self, bundle: SceneBundle, now: Instant) {
        self.lock().load_scenes(bundle, now);
    }

    pub fn cache_change_scene(&self, id: u32) {
        if !self.lock().cache_change_scene(id) {
            self.record_error(&EngineError::MissingResource { kind: "scene", id: id.to_string() });
        }
    }

    pub fn cache_change_effect(&self, id: u32) {
        if !self.lock().cache_change_effect(id) {
            self.record_error(&EngineError::MissingResource { kind: "effect", id: id.to_string() });
        }
    }

    pub fn cache_change_palette(&self, id: u32) {
        if !self.lock().cache_change_palette(id) {
            self.record_error(&EngineError::MissingResource { kind: "palette", id: id.to_string() });
        }
    }

    pub fn commit_pattern(&self, now: Instant) {
        self.lock().commit_pattern(now);
    }

    pub fn set_palette_color(&self, palette_id: u32, color_id: usize, rgb: Rgb) {
        self.lock().set_palette_color(palette_id, color_id, rgb);
    }

    pub fn set_dissolve_pattern(&self, id: u32) {
        if !self.lock().set_dissolve_pattern(id) {
            self.record_error(&EngineError::MissingResource { kind: "dissolve_pattern", id: id.to_string() });
        }
    }

    /// Set the startup default dissolve pattern id without validating it
    /// against loaded patterns (A3 config time, before any bundle is loaded).
    pub fn set_default_dissolve_pattern_id(&self, id: u32) {
        self.lock().set_default_dissolve_pattern_id(id);
    }

    pub fn load_dissolve_patterns(&self, bundle: DissolveBundle) {
        self.lock().load_dissolve_patterns(bundle);
    }

    pub fn pause(&self) {
        self.lock().pause();
    }

    pub fn resume(&self) {
        self.lock().resume();
    }

    pub fn set_speed(&self, percent: i64) {
        self.lock().set_speed(percent);
    }

    pub fn set_master_brightness(&self, brightness: i64) {
        self.lock().set_master_brightness(brightness);
    }

    pub fn update_animation(&self, dt: f32, now: Instant) {
        self.lock().update_animation(dt, now);
    }

    pub fn render(&self, now: Instant) -> Frame {
        self.lock().render(now)
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.lock().is_paused()
    }

    #[must_use]
    pub fn speed_percent(&self) -> u32 {
        self.lock().speed_percent()
    }

    #[must_use]
    pub fn active_scene_fps(&self) -> Option<u32> {
        self.lock().active_scene_fps()
    }

    /// Record a non-fatal error reported by a collaborator (control ingress,
    /// output fan-out, loader) without interrupting its caller.
    pub fn record_error(&self, err: &EngineError) {
        self.errors.record(err);
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
