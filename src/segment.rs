//! Segment rendering kernel (C2): dimmer timing, position update with
//! reflect/wrap boundary handling, and additive rendering into a frame.

use embassy_time::Instant;

use crate::color::{self, Rgb};
use crate::palette::Palette;

/// One linear brightness ramp in a segment's dimmer cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimmerPhase {
    pub duration_ms: u32,
    pub start_pct: f32,
    pub end_pct: f32,
}

impl DimmerPhase {
    #[must_use]
    pub fn new(duration_ms: u32, start_pct: f32, end_pct: f32) -> Self {
        Self {
            duration_ms: duration_ms.max(1),
            start_pct,
            end_pct,
        }
    }
}

fn normalize_range(range: (i32, i32)) -> (i32, i32) {
    if range.0 <= range.1 {
        range
    } else {
        (range.1, range.0)
    }
}

/// A single renderable segment: a sequence of colored parts that moves
/// along the strip and breathes through a repeating dimmer cycle.
#[derive(Debug, Clone)]
pub struct Segment {
    pub segment_id: u32,
    pub color: Vec<u16>,
    pub transparency: Vec<f32>,
    pub length: Vec<u32>,
    pub move_speed: f32,
    pub move_range: (i32, i32),
    pub is_edge_reflect: bool,
    pub dimmer_time: Vec<DimmerPhase>,

    current_position: i32,
    frac: f32,
    segment_start_time: Instant,
}

impl Segment {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        segment_id: u32,
        color: Vec<u16>,
        transparency: Vec<f32>,
        length: Vec<u32>,
        move_speed: f32,
        move_range: (i32, i32),
        current_position: i32,
        is_edge_reflect: bool,
        dimmer_time: Vec<DimmerPhase>,
        now: Instant,
    ) -> Self {
        Self {
            segment_id,
            color,
            transparency,
            length,
            move_speed,
            move_range: normalize_range(move_range),
            is_edge_reflect,
            dimmer_time,
            current_position,
            frac: 0.0,
            segment_start_time: now,
        }
    }

    /// Restart the dimmer cycle from `now`. Called on load and on every
    /// commit that brings this segment into the active effect.
    pub fn reset_timing(&mut self, now: Instant) {
        self.segment_start_time = now;
    }

    #[must_use]
    pub const fn current_position(&self) -> i32 {
        self.current_position
    }

    #[must_use]
    pub const fn fractional_position(&self) -> f32 {
        self.frac
    }

    /// Brightness factor in `[0.0, 1.0]` at the given instant, derived from
    /// `dimmer_time`'s repeating cycle.
    #[must_use]
    pub fn brightness_at(&self, now: Instant) -> f32 {
        let Some(last) = self.dimmer_time.last() else {
            return 1.0;
        };

        let cycle_ms: u64 = self
            .dimmer_time
            .iter()
            .map(|p| u64::from(p.duration_ms))
            .sum();
        if cycle_ms == 0 {
            return 1.0;
        }

        let elapsed_ms = now.duration_since(self.segment_start_time).as_millis();
        let mut phase_ms = elapsed_ms % cycle_ms;
        if phase_ms == 0 && elapsed_ms > 0 {
            phase_ms = cycle_ms;
        }

        let mut cursor_ms: u64 = 0;
        for phase in &self.dimmer_time {
            let duration = u64::from(phase.duration_ms);
            if phase_ms <= cursor_ms + duration {
                let progress = ((phase_ms - cursor_ms) as f32 / duration as f32).clamp(0.0, 1.0);
                let pct = phase.start_pct + (phase.end_pct - phase.start_pct) * progress;
                return (pct / 100.0).clamp(0.0, 1.0);
            }
            cursor_ms += duration;
        }

        (last.end_pct / 100.0).clamp(0.0, 1.0)
    }

    /// Advance the position accumulator by `dt` virtual seconds, applying
    /// the reflect/wrap boundary rule after any integer step.
    pub fn advance_position(&mut self, dt: f32, now: Instant) {
        if self.move_speed == 0.0 {
            return;
        }

        self.frac += self.move_speed * dt;
        if self.frac.abs() >= 1.0 {
            let step = self.frac.trunc();
            self.current_position += step as i32;
            self.frac -= step;
        }

        self.apply_boundary(now);
    }

    fn apply_boundary(&mut self, now: Instant) {
        let (lo, hi) = self.move_range;

        if self.is_edge_reflect {
            // Gated on direction of travel: without this, a segment resting
            // exactly at the boundary with already-corrected speed would
            // re-trigger the reset (and re-zero frac) every single tick.
            if self.current_position <= lo && self.move_speed <= 0.0 {
                self.current_position = lo;
                self.move_speed = self.move_speed.abs();
                self.frac = 0.0;
                self.reset_timing(now);
            } else if self.current_position >= hi && self.move_speed >= 0.0 {
                self.current_position = hi;
                self.move_speed = -self.move_speed.abs();
                self.frac = 0.0;
                self.reset_timing(now);
            }
        } else {
            let span = hi - lo + 1;
            let offset = (self.current_position - lo).rem_euclid(span);
            self.current_position = lo + offset;
        }
    }

    /// Render this segment additively into `frame` at the current instant.
    pub fn render(&self, palette: &Palette, now: Instant, frame: &mut [Rgb]) {
        let brightness_factor = self.brightness_at(now);
        if brightness_factor <= 0.0 {
            return;
        }

        let mut colors = self.expand_colors(palette, brightness_factor);
        if colors.is_empty() {
            return;
        }

        let mut base = self.current_position;
        let n = colors.len() as i32;

        if base < 0 {
            if base <= -n {
                return;
            }
            let drop = (-base) as usize;
            colors.drain(0..drop);
            base = 0;
        } else if colors.len() > 1 && self.frac > 0.0 {
            let last = colors.len() - 1;
            colors[0] = color::apply_brightness(colors[0], self.frac.max(0.1));
            colors[last] = color::apply_brightness(colors[last], (1.0 - self.frac).max(0.1));
        }

        for (i, c) in colors.into_iter().enumerate() {
            let led_index = base + i as i32;
            if led_index >= 0 && (led_index as usize) < frame.len() {
                color::add_saturating(&mut frame[led_index as usize], c);
            }
        }
    }

    /// Expand `color[]`/`transparency[]`/`length[]` into one shaded color
    /// per LED, honoring the excess-color tail rule.
    fn expand_colors(&self, palette: &Palette, brightness_factor: f32) -> Vec<Rgb> {
        let parts = self.color.len().max(self.length.len());
        let mut out = Vec::new();

        for i in 0..parts {
            let color_idx = self.color.get(i).copied();
            let transparency = self.transparency.get(i).copied().unwrap_or(0.0).clamp(0.0, 1.0);
            let base = color_idx
                .and_then(|idx| palette.color(idx))
                .unwrap_or(Rgb { r: 0, g: 0, b: 0 });
            let factor = (1.0 - transparency) * brightness_factor;
            let shaded = color::apply_brightness(base, factor);

            match self.length.get(i).copied() {
                Some(len) => {
                    for _ in 0..len {
                        out.push(shaded);
                    }
                }
                None if color_idx.is_some() => out.push(shaded),
                None => {}
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> Instant {
        Instant::from_millis(0)
    }

    fn seg(move_speed: f32, range: (i32, i32), pos: i32, reflect: bool) -> Segment {
        Segment::new(
            1,
            vec![0],
            vec![0.0],
            vec![1],
            move_speed,
            range,
            pos,
            reflect,
            vec![DimmerPhase::new(1000, 100.0, 100.0)],
            t0(),
        )
    }

    #[test]
    fn reflect_bounces_and_flips_direction() {
        let mut s = seg(10.0, (0, 9), 0, true);
        // 1 second at 60 fps worth of ticks, speed 10 LEDs/s.
        for _ in 0..60 {
            s.advance_position(1.0 / 60.0, t0());
        }
        assert!(s.current_position() >= 8);
        assert!(s.move_speed < 0.0);
    }

    #[test]
    fn reflect_does_not_get_stuck_at_boundary() {
        let mut s = seg(10.0, (0, 9), 9, true);
        s.move_speed = 10.0; // approaching hi already
        s.advance_position(1.0 / 60.0, t0());
        assert!(s.current_position() <= 9);
        let pos_after_bounce = s.current_position();
        let speed_after_bounce = s.move_speed;
        // Subsequent ticks must not keep re-triggering the reset.
        for _ in 0..5 {
            s.advance_position(1.0 / 60.0, t0());
        }
        assert!(speed_after_bounce < 0.0 || s.current_position() != pos_after_bounce);
    }

    #[test]
    fn wrap_uses_inclusive_span() {
        let mut s = seg(0.0, (0, 9), 9, false);
        s.move_speed = 1.0;
        s.frac = 2.0;
        s.advance_position(0.0, t0());
        assert_eq!(s.current_position(), 1);
    }

    #[test]
    fn wrap_pins_when_range_is_a_point() {
        let mut s = seg(0.0, (5, 5), 5, false);
        s.move_speed = 1.0;
        s.frac = 3.0;
        s.advance_position(0.0, t0());
        assert_eq!(s.current_position(), 5);
    }

    #[test]
    fn boundary_invariant_holds_after_update() {
        let mut s = seg(37.0, (0, 9), 0, false);
        for _ in 0..600 {
            s.advance_position(1.0 / 60.0, t0());
            assert!(s.current_position() >= 0 && s.current_position() <= 9);
        }
    }

    #[test]
    fn dimmer_cycles_through_phases() {
        let s = Segment::new(
            1,
            vec![0],
            vec![0.0],
            vec![1],
            0.0,
            (0, 0),
            0,
            false,
            vec![DimmerPhase::new(1000, 0.0, 100.0), DimmerPhase::new(1000, 100.0, 0.0)],
            t0(),
        );
        assert!((s.brightness_at(Instant::from_millis(0)) - 0.0).abs() < 0.01);
        assert!((s.brightness_at(Instant::from_millis(500)) - 0.5).abs() < 0.01);
        assert!((s.brightness_at(Instant::from_millis(1500)) - 0.5).abs() < 0.01);
        // Wraps back to the start of the cycle.
        assert!((s.brightness_at(Instant::from_millis(2000)) - 0.0).abs() < 0.01);
    }

    #[test]
    fn negative_base_drops_and_skips_fade() {
        let mut s = seg(0.0, (-5, 5), -2, false);
        s.length = vec![1, 1, 1, 1];
        s.color = vec![0, 0, 0, 0];
        s.transparency = vec![0.0, 0.0, 0.0, 0.0];
        s.frac = 0.5; // would normally trigger fade; must be skipped
        let palette = Palette::BLACK;
        let mut frame = vec![Rgb { r: 0, g: 0, b: 0 }; 4];
        s.render(&palette, t0(), &mut frame);
        // Nothing visible: palette is black, but this exercises the drop path
        // without panicking on out-of-range indices.
        assert_eq!(frame.len(), 4);
    }
}
