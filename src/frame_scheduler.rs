//! Frame scheduler (C6): fixed-rate playback loop with drift correction,
//! speed-scaled virtual time, and pause handling. Generalized from the
//! teacher's caller-sleeps `tick()` API into a worker that owns its own
//! `thread::sleep`, since this is the body of a real background thread (T2)
//! rather than something driven by an external event loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

use embassy_time::{Duration, Instant};
use log::debug;

use crate::engine::Engine;
use crate::output::OutputFanout;

/// Fallback frame rate used until a scene reports one.
pub const DEFAULT_FPS: u32 = 60;

/// Fixed-rate playback loop over one [`Engine`], fanning rendered frames out
/// through an [`OutputFanout`] (§4.6).
pub struct FrameScheduler {
    engine: Arc<Engine>,
    output: OutputFanout,
    stop: Arc<AtomicBool>,
}

impl FrameScheduler {
    #[must_use]
    pub fn new(engine: Arc<Engine>, output: OutputFanout, stop: Arc<AtomicBool>) -> Self {
        Self { engine, output, stop }
    }

    /// Run the scheduler loop until the stop flag is set. Blocking; this is
    /// the body of the T2 worker thread.
    pub fn run(&mut self) {
        let mut last_tick = Instant::now();
        let mut next_frame = last_tick;

        while !self.stop.load(Ordering::Relaxed) {
            let fps = self.engine.active_scene_fps().unwrap_or(DEFAULT_FPS).max(1);
            let frame_ms = (1000 / u64::from(fps)).max(1);
            let frame_duration = Duration::from_millis(frame_ms);

            let now = Instant::now();
            let max_drift_ms = frame_ms * 2;
            if now.as_millis() > next_frame.as_millis() + max_drift_ms {
                next_frame = now;
            }

            let dt_real_ms = now.as_millis().saturating_sub(last_tick.as_millis());
            last_tick = now;

            self.tick(now, Duration::from_millis(dt_real_ms));

            next_frame += frame_duration;
            let now_after_tick = Instant::now();
            let sleep_ms = next_frame.as_millis().saturating_sub(now_after_tick.as_millis());
            if sleep_ms > 0 {
                thread::sleep(StdDuration::from_millis(sleep_ms));
            }
        }
    }

    /// Process exactly one frame. Exposed separately so tests (and the
    /// deterministic scenario fixtures, A6) can drive the scheduler with an
    /// injected clock and delta instead of real sleeps.
    pub fn tick(&mut self, now: Instant, dt_real: Duration) {
        if self.engine.is_paused() {
            let frame = self.engine.render(now);
            for err in self.output.send(&frame) {
                self.engine.record_error(&err);
            }
            return;
        }

        let speed_percent = self.engine.speed_percent();
        let dt = (dt_real.as_millis() as f32 / 1000.0) * (speed_percent as f32 / 100.0);

        self.engine.update_animation(dt, now);
        let frame = self.engine.render(now);
        debug!("rendered frame at t={}ms, dt={dt:.4}s", now.as_millis());
        for err in self.output.send(&frame) {
            self.engine.record_error(&err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SceneBundle;
    use crate::output::OutputFanout;

    #[test]
    fn pause_renders_black_without_advancing_segments() {
        let engine = Arc::new(Engine::new());
        engine.pause();
        let output = OutputFanout::new(Vec::new(), "/light/serial".to_owned());
        let mut scheduler = FrameScheduler::new(engine.clone(), output, Arc::new(AtomicBool::new(false)));
        scheduler.tick(Instant::from_millis(0), Duration::from_millis(16));
        // No scene loaded: render() already yields an empty frame; pause just
        // short-circuits before the render pipeline runs.
        assert!(engine.is_paused());
    }

    #[test]
    fn speed_zero_freezes_virtual_time() {
        let engine = Arc::new(Engine::new());
        engine.load_scenes(SceneBundle::default(), Instant::from_millis(0));
        engine.set_speed(0);
        let output = OutputFanout::new(Vec::new(), "/light/serial".to_owned());
        let mut scheduler = FrameScheduler::new(engine, output, Arc::new(AtomicBool::new(false)));
        scheduler.tick(Instant::from_millis(0), Duration::from_millis(1000));
        scheduler.tick(Instant::from_millis(1000), Duration::from_millis(1000));
    }
}
