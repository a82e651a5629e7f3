//! Scene/dissolve JSON loader (A4): parses the documented grammars (§6)
//! into validated domain types. File I/O and JSON decoding are both handled
//! here, deliberately kept separate from the renderer core (`engine_state`),
//! which only ever sees already-validated types.

use std::collections::HashMap;
use std::fs;

use embassy_time::Instant;
use serde::Deserialize;
use serde_json::Value;

use crate::color::Rgb;
use crate::effect::Effect;
use crate::error::EngineError;
use crate::model::{DissolveBand, DissolveBundle, DissolvePattern, SceneBundle};
use crate::palette::{Palette, PALETTE_SLOTS};
use crate::scene::Scene;
use crate::segment::{DimmerPhase, Segment};

#[derive(Debug, Deserialize)]
struct SceneBundleDoc {
    scenes: Vec<SceneDoc>,
}

#[derive(Debug, Deserialize)]
struct SceneDoc {
    scene_id: u32,
    #[serde(default = "default_led_count")]
    led_count: usize,
    #[serde(default = "default_fps")]
    fps: u32,
    #[serde(default)]
    current_effect_id: u32,
    #[serde(default)]
    current_palette_id: u32,
    #[serde(default)]
    palettes: Vec<[[u8; 3]; PALETTE_SLOTS]>,
    #[serde(default)]
    effects: Vec<EffectDoc>,
}

const fn default_led_count() -> usize {
    225
}

const fn default_fps() -> u32 {
    60
}

#[derive(Debug, Deserialize)]
struct EffectDoc {
    effect_id: u32,
    #[serde(default)]
    segments: Vec<SegmentDoc>,
}

#[derive(Debug, Deserialize)]
struct SegmentDoc {
    segment_id: u32,
    #[serde(default)]
    color: Vec<u16>,
    #[serde(default)]
    transparency: Vec<f32>,
    #[serde(default)]
    length: Vec<u32>,
    #[serde(default)]
    move_speed: f32,
    #[serde(default)]
    move_range: [i32; 2],
    #[serde(default)]
    current_position: i32,
    #[serde(default)]
    is_edge_reflect: bool,
    #[serde(default)]
    dimmer_time: Value,
}

#[derive(Debug, Deserialize)]
struct DissolveBundleDoc {
    dissolve_patterns: HashMap<String, Vec<[i64; 4]>>,
}

fn parse_dimmer_time(value: &Value, segment_id: u32) -> Result<Vec<DimmerPhase>, EngineError> {
    let malformed =
        |reason: String| EngineError::MalformedInput { reason: format!("segment {segment_id} dimmer_time: {reason}") };

    match value {
        Value::Null => Err(malformed("missing dimmer_time".into())),
        Value::Array(items) if items.iter().all(serde_json::Value::is_number) => {
            // Legacy flat brightness sequence: each adjacent pair becomes a
            // one-second ramp (§4.2's "legacy flat array" conversion rule).
            let values: Vec<f32> = items.iter().map(|v| v.as_f64().unwrap_or(0.0) as f32).collect();
            if values.len() < 2 {
                return Err(malformed("legacy dimmer_time needs at least 2 values".into()));
            }
            Ok(values.windows(2).map(|w| DimmerPhase::new(1000, w[0], w[1])).collect())
        }
        Value::Array(items) => {
            let mut phases = Vec::with_capacity(items.len());
            for item in items {
                let triple = item.as_array().ok_or_else(|| malformed("expected [duration, start, end]".into()))?;
                if triple.len() != 3 {
                    return Err(malformed("expected exactly 3 elements".into()));
                }
                let duration = triple[0]
                    .as_u64()
                    .ok_or_else(|| malformed("duration must be a non-negative integer".into()))?
                    as u32;
                let start = triple[1].as_f64().ok_or_else(|| malformed("start must be a number".into()))? as f32;
                let end = triple[2].as_f64().ok_or_else(|| malformed("end must be a number".into()))? as f32;
                phases.push(DimmerPhase::new(duration, start, end));
            }
            Ok(phases)
        }
        _ => Err(malformed("dimmer_time must be an array".into())),
    }
}

fn convert_segment(doc: SegmentDoc, now: Instant) -> Result<Segment, EngineError> {
    let dimmer_time = parse_dimmer_time(&doc.dimmer_time, doc.segment_id)?;
    if dimmer_time.is_empty() {
        return Err(EngineError::MalformedInput {
            reason: format!("segment {} has empty dimmer_time", doc.segment_id),
        });
    }

    let (lo, hi) = (doc.move_range[0], doc.move_range[1]);
    Ok(Segment::new(
        doc.segment_id,
        doc.color,
        doc.transparency,
        doc.length,
        doc.move_speed,
        (lo, hi),
        doc.current_position,
        doc.is_edge_reflect,
        dimmer_time,
        now,
    ))
}

fn convert_effect(doc: EffectDoc, now: Instant) -> Result<Effect, EngineError> {
    let segments = doc.segments.into_iter().map(|s| convert_segment(s, now)).collect::<Result<Vec<_>, _>>()?;
    Ok(Effect { effect_id: doc.effect_id, segments })
}

fn convert_scene(doc: SceneDoc, now: Instant) -> Result<Scene, EngineError> {
    if doc.led_count == 0 {
        return Err(EngineError::MalformedInput { reason: format!("scene {} has led_count 0", doc.scene_id) });
    }

    let mut palettes: Vec<Palette> = doc
        .palettes
        .into_iter()
        .map(|rows| {
            let mut colors = [Rgb { r: 0, g: 0, b: 0 }; PALETTE_SLOTS];
            for (slot, [r, g, b]) in colors.iter_mut().zip(rows) {
                *slot = Rgb { r, g, b };
            }
            Palette { colors }
        })
        .collect();
    if palettes.is_empty() {
        palettes.push(Palette::BLACK);
    }

    let effects = doc.effects.into_iter().map(|e| convert_effect(e, now)).collect::<Result<Vec<_>, _>>()?;

    Ok(Scene {
        scene_id: doc.scene_id,
        led_count: doc.led_count,
        fps: doc.fps.max(1),
        current_effect_id: doc.current_effect_id,
        current_palette_id: doc.current_palette_id,
        palettes,
        effects,
    })
}

/// Load and validate a scene bundle from a JSON file (§6).
pub fn load_scene_bundle(path: &str) -> Result<SceneBundle, EngineError> {
    let text = fs::read_to_string(path)
        .map_err(|e| EngineError::LoadFailure { path: path.to_owned(), reason: e.to_string() })?;
    load_scene_bundle_str(&text, path)
}

/// Parse a scene bundle from an in-memory JSON string (exposed for tests and
/// deterministic fixtures, A6).
pub fn load_scene_bundle_str(text: &str, path: &str) -> Result<SceneBundle, EngineError> {
    let doc: SceneBundleDoc = serde_json::from_str(text)
        .map_err(|e| EngineError::LoadFailure { path: path.to_owned(), reason: e.to_string() })?;

    let now = Instant::now();
    let scenes = doc
        .scenes
        .into_iter()
        .map(|s| convert_scene(s, now))
        .collect::<Result<Vec<_>, EngineError>>()
        .map_err(|e| EngineError::LoadFailure { path: path.to_owned(), reason: e.to_string() })?;

    Ok(SceneBundle { scenes })
}

fn convert_dissolve_pattern(bands: Vec<[i64; 4]>) -> Result<DissolvePattern, EngineError> {
    let mut out = Vec::with_capacity(bands.len());
    for [delay, duration, s, e] in bands {
        if s > e {
            return Err(EngineError::MalformedInput { reason: format!("dissolve band start {s} > end {e}") });
        }
        out.push(DissolveBand {
            delay_ms: delay.max(0) as u32,
            duration_ms: duration.max(0) as u32,
            start_led: s as i32,
            end_led: e as i32,
        });
    }
    Ok(DissolvePattern { bands: out })
}

/// Load and validate a dissolve pattern bundle from a JSON file (§6).
pub fn load_dissolve_bundle(path: &str) -> Result<DissolveBundle, EngineError> {
    let text = fs::read_to_string(path)
        .map_err(|e| EngineError::LoadFailure { path: path.to_owned(), reason: e.to_string() })?;
    load_dissolve_bundle_str(&text, path)
}

/// Parse a dissolve pattern bundle from an in-memory JSON string (exposed
/// for tests).
pub fn load_dissolve_bundle_str(text: &str, path: &str) -> Result<DissolveBundle, EngineError> {
    let doc: DissolveBundleDoc = serde_json::from_str(text)
        .map_err(|e| EngineError::LoadFailure { path: path.to_owned(), reason: e.to_string() })?;

    let mut patterns = HashMap::with_capacity(doc.dissolve_patterns.len());
    for (key, bands) in doc.dissolve_patterns {
        let id: u32 = key
            .parse()
            .map_err(|_| EngineError::LoadFailure { path: path.to_owned(), reason: format!("invalid pattern id {key}") })?;
        let pattern = convert_dissolve_pattern(bands)
            .map_err(|e| EngineError::LoadFailure { path: path.to_owned(), reason: e.to_string() })?;
        patterns.insert(id, pattern);
    }

    Ok(DissolveBundle { patterns })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_scene_bundle() {
        let json = r#"{
            "scenes": [{
                "scene_id": 1,
                "led_count": 10,
                "fps": 30,
                "palettes": [[[10,10,10],[0,0,0],[0,0,0],[0,0,0],[0,0,0],[0,0,0]]],
                "effects": [{
                    "effect_id": 1,
                    "segments": [{
                        "segment_id": 1,
                        "color": [0],
                        "transparency": [0.0],
                        "length": [10],
                        "move_speed": 0.0,
                        "move_range": [0, 9],
                        "current_position": 0,
                        "is_edge_reflect": false,
                        "dimmer_time": [[1000, 100, 100]]
                    }]
                }]
            }]
        }"#;
        let bundle = load_scene_bundle_str(json, "test.json").unwrap();
        assert_eq!(bundle.scenes.len(), 1);
        assert_eq!(bundle.scenes[0].led_count, 10);
        assert_eq!(bundle.scenes[0].fps, 30);
    }

    #[test]
    fn legacy_flat_dimmer_time_becomes_ramps() {
        let value: Value = serde_json::from_str("[0, 50, 100]").unwrap();
        let phases = parse_dimmer_time(&value, 1).unwrap();
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0], DimmerPhase::new(1000, 0.0, 50.0));
        assert_eq!(phases[1], DimmerPhase::new(1000, 50.0, 100.0));
    }

    #[test]
    fn zero_led_count_is_rejected() {
        let json = r#"{"scenes":[{"scene_id":1,"led_count":0,"effects":[]}]}"#;
        assert!(load_scene_bundle_str(json, "test.json").is_err());
    }

    #[test]
    fn dissolve_bundle_rejects_inverted_band() {
        let json = r#"{"dissolve_patterns":{"1":[[0,100,5,2]]}}"#;
        assert!(load_dissolve_bundle_str(json, "test.json").is_err());
    }

    #[test]
    fn dissolve_bundle_parses_bands() {
        let json = r#"{"dissolve_patterns":{"1":[[0,500,0,99]]}}"#;
        let bundle = load_dissolve_bundle_str(json, "test.json").unwrap();
        let pattern = bundle.patterns.get(&1).unwrap();
        assert_eq!(pattern.bands[0].duration_ms, 500);
    }
}
