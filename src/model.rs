//! Loaded-document domain types (§3): the validated shapes that flow out of
//! the loader (A4) and into `EngineState`.

use std::collections::HashMap;

use crate::color::Rgb;
use crate::scene::Scene;

/// A fully rendered, ready-to-send frame buffer.
pub type Frame = Vec<Rgb>;

/// A validated set of scenes, as produced by loading one scene JSON document.
#[derive(Debug, Clone, Default)]
pub struct SceneBundle {
    pub scenes: Vec<Scene>,
}

/// One LED band within a dissolve pattern: a delayed, timed cross-fade
/// window over `[start_led, end_led]` (inclusive).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DissolveBand {
    pub delay_ms: u32,
    pub duration_ms: u32,
    pub start_led: i32,
    pub end_led: i32,
}

/// An ordered set of LED bands describing one pattern-change transition.
#[derive(Debug, Clone, Default)]
pub struct DissolvePattern {
    pub bands: Vec<DissolveBand>,
}

/// All known dissolve patterns, keyed by pattern id.
#[derive(Debug, Clone, Default)]
pub struct DissolveBundle {
    pub patterns: HashMap<u32, DissolvePattern>,
}
