//! Dissolve engine (C5): per-LED-band timed cross-fade between the frame
//! captured at commit time and the newly active pattern's rendered frame.

use embassy_time::Instant;

use crate::color::{self, Rgb};
use crate::model::{DissolveBand, DissolvePattern, Frame};

/// An in-progress cross-fade from a captured `from_frame` toward whatever
/// the active pattern renders each tick.
#[derive(Debug, Clone)]
pub struct Dissolve {
    from_frame: Frame,
    start: Instant,
    pattern: DissolvePattern,
}

impl Dissolve {
    #[must_use]
    pub fn begin(from_frame: Frame, start: Instant, pattern: DissolvePattern) -> Self {
        Self { from_frame, start, pattern }
    }

    /// Blend `to_frame` against the stored `from_frame` using the union of
    /// every band's per-LED progress. Returns the composed frame and whether
    /// every band has reached progress 1 (the dissolve is over).
    pub fn blend(&self, to_frame: &[Rgb], now: Instant) -> (Frame, bool) {
        let led_count = to_frame.len();

        let band_spans: Vec<(usize, usize, f32)> = self
            .pattern
            .bands
            .iter()
            .map(|band| {
                let (s, e) = clip_band(band, led_count);
                (s, e, band_progress(band, self.start, now))
            })
            .collect();

        let mut out = Vec::with_capacity(led_count);
        for i in 0..led_count {
            let mut progress = 0.0f32;
            for &(s, e, p) in &band_spans {
                if i >= s && i <= e {
                    progress = progress.max(p);
                }
            }
            let from = self.from_frame.get(i).copied().unwrap_or(Rgb { r: 0, g: 0, b: 0 });
            out.push(color::blend(from, to_frame[i], progress));
        }

        let terminated = band_spans.iter().all(|&(_, _, p)| p >= 1.0);
        (out, terminated)
    }
}

fn clip_band(band: &DissolveBand, led_count: usize) -> (usize, usize) {
    if led_count == 0 {
        return (0, 0);
    }
    let last = led_count - 1;
    let s = band.start_led.max(0) as usize;
    let e = band.end_led.max(0) as usize;
    (s.min(last), e.min(last))
}

fn band_progress(band: &DissolveBand, start: Instant, now: Instant) -> f32 {
    let elapsed_ms = now.duration_since(start).as_millis();
    let Some(t) = elapsed_ms.checked_sub(u64::from(band.delay_ms)) else {
        return 0.0;
    };
    if band.duration_ms == 0 {
        return 1.0;
    }
    if t >= u64::from(band.duration_ms) {
        1.0
    } else {
        t as f32 / band.duration_ms as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Instant {
        Instant::from_millis(n)
    }

    #[test]
    fn zero_bands_terminates_immediately() {
        let d = Dissolve::begin(vec![Rgb { r: 0, g: 0, b: 0 }; 4], ms(0), DissolvePattern::default());
        let to = vec![Rgb { r: 255, g: 255, b: 255 }; 4];
        let (frame, terminated) = d.blend(&to, ms(0));
        assert!(terminated);
        assert_eq!(frame, to);
    }

    #[test]
    fn mid_dissolve_blends_by_progress() {
        let pattern = DissolvePattern {
            bands: vec![DissolveBand { delay_ms: 0, duration_ms: 100, start_led: 0, end_led: 3 }],
        };
        let from = vec![Rgb { r: 0, g: 0, b: 0 }; 4];
        let d = Dissolve::begin(from, ms(0), pattern);
        let to = vec![Rgb { r: 100, g: 100, b: 100 }; 4];
        let (frame, terminated) = d.blend(&to, ms(50));
        assert!(!terminated);
        assert_eq!(frame[0], Rgb { r: 50, g: 50, b: 50 });
    }

    #[test]
    fn terminates_once_every_band_reaches_one() {
        let pattern = DissolvePattern {
            bands: vec![DissolveBand { delay_ms: 0, duration_ms: 100, start_led: 0, end_led: 3 }],
        };
        let d = Dissolve::begin(vec![Rgb { r: 0, g: 0, b: 0 }; 4], ms(0), pattern);
        let to = vec![Rgb { r: 100, g: 100, b: 100 }; 4];
        let (frame, terminated) = d.blend(&to, ms(200));
        assert!(terminated);
        assert_eq!(frame, to);
    }

    #[test]
    fn leds_outside_every_band_are_unblended() {
        let pattern = DissolvePattern {
            bands: vec![DissolveBand { delay_ms: 0, duration_ms: 100, start_led: 0, end_led: 1 }],
        };
        let from = vec![Rgb { r: 0, g: 0, b: 0 }; 4];
        let d = Dissolve::begin(from, ms(0), pattern);
        let to = vec![Rgb { r: 255, g: 255, b: 255 }; 4];
        let (frame, _) = d.blend(&to, ms(50));
        assert_eq!(frame[3], to[3]);
    }
}
