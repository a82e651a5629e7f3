//! Desktop preview app for the LED playback engine.
//!
//! Drives `EngineState` directly with synthetic time and renders each frame
//! as a row of colored rectangles. Useful for eyeballing segment motion,
//! dimmer cycles, and dissolve transitions without any network plumbing.

use std::time::Instant as StdInstant;

use eframe::egui::{self};
use ledscene_engine::{DimmerPhase, Effect, EngineState, Instant, Palette, Rgb, Scene, SceneBundle, Segment};

const LED_SIZE: f32 = 14.0;
const LED_GAP: f32 = 2.0;

fn demo_bundle(now: Instant) -> SceneBundle {
    let mut chase_colors = [Rgb { r: 0, g: 0, b: 0 }; 6];
    chase_colors[0] = Rgb { r: 255, g: 60, b: 0 };
    chase_colors[1] = Rgb { r: 0, g: 140, b: 255 };

    let chase_segment = Segment::new(
        1,
        vec![0, 1],
        vec![0.0, 0.0],
        vec![4, 4],
        12.0,
        (0, 59),
        0,
        true,
        vec![DimmerPhase::new(1500, 40.0, 100.0), DimmerPhase::new(1500, 100.0, 40.0)],
        now,
    );
    let chase_scene = Scene {
        scene_id: 1,
        led_count: 60,
        fps: 60,
        current_effect_id: 1,
        current_palette_id: 0,
        palettes: vec![Palette { colors: chase_colors }],
        effects: vec![Effect { effect_id: 1, segments: vec![chase_segment] }],
    };

    let mut still_colors = [Rgb { r: 0, g: 0, b: 0 }; 6];
    still_colors[0] = Rgb { r: 255, g: 255, b: 255 };
    let still_segment = Segment::new(
        1,
        vec![0],
        vec![0.0],
        vec![60],
        0.0,
        (0, 0),
        0,
        true,
        vec![DimmerPhase::new(1000, 100.0, 100.0)],
        now,
    );
    let still_scene = Scene {
        scene_id: 2,
        led_count: 60,
        fps: 60,
        current_effect_id: 1,
        current_palette_id: 0,
        palettes: vec![Palette { colors: still_colors }],
        effects: vec![Effect { effect_id: 1, segments: vec![still_segment] }],
    };

    SceneBundle { scenes: vec![chase_scene, still_scene] }
}

fn main() -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([900.0, 400.0]).with_title("LED Scene Engine Preview"),
        ..Default::default()
    };

    eframe::run_native("ledscene-engine-preview", options, Box::new(|_cc| Ok(Box::new(PreviewApp::new()))))
}

struct PreviewApp {
    state: EngineState,
    t_ms: u64,
    last_frame: StdInstant,
    playing: bool,
    time_scale: f32,
    master_brightness: u8,
    selected_scene: u32,
}

impl PreviewApp {
    fn new() -> Self {
        let now = Instant::from_millis(0);
        let mut state = EngineState::new();
        state.load_scenes(demo_bundle(now), now);

        Self {
            state,
            t_ms: 0,
            last_frame: StdInstant::now(),
            playing: true,
            time_scale: 1.0,
            master_brightness: 255,
            selected_scene: 1,
        }
    }

    fn select_scene(&mut self, scene_id: u32) {
        self.selected_scene = scene_id;
        self.state.cache_change_scene(scene_id);
        self.state.commit_pattern(Instant::from_millis(self.t_ms));
    }

    fn advance_time(&mut self) {
        let now = StdInstant::now();
        let delta = now.duration_since(self.last_frame);
        self.last_frame = now;

        if !self.playing {
            return;
        }

        let delta_ms_f64 = delta.as_secs_f64() * 1000.0 * f64::from(self.time_scale);
        let delta_ms = if delta_ms_f64.is_finite() { delta_ms_f64.clamp(0.0, u64::MAX as f64) as u64 } else { 0 };
        self.t_ms = self.t_ms.wrapping_add(delta_ms);
    }
}

impl eframe::App for PreviewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.advance_time();
        let now = Instant::from_millis(self.t_ms);

        self.state.set_master_brightness(i64::from(self.master_brightness));
        self.state.update_animation(1.0 / 60.0, now);
        let frame = self.state.render(now);

        ctx.request_repaint();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button(if self.playing { "Pause" } else { "Play" }).clicked() {
                    self.playing = !self.playing;
                    if self.playing {
                        self.state.resume();
                    } else {
                        self.state.pause();
                    }
                }

                ui.add_space(8.0);
                ui.label("Speed:");
                ui.add(egui::Slider::new(&mut self.time_scale, 0.1..=5.0).logarithmic(true));

                ui.add_space(8.0);
                ui.label("Brightness:");
                ui.add(egui::DragValue::new(&mut self.master_brightness).range(0u8..=255u8));

                ui.add_space(8.0);
                ui.label("Scene:");
                let mut scene_choice = self.selected_scene;
                egui::ComboBox::from_id_salt("scene_selector").selected_text(format!("{scene_choice}")).show_ui(ui, |ui| {
                    ui.selectable_value(&mut scene_choice, 1, "1 - chase");
                    ui.selectable_value(&mut scene_choice, 2, "2 - static");
                });
                if scene_choice != self.selected_scene {
                    self.select_scene(scene_choice);
                }
            });

            ui.add_space(16.0);

            let available_width = ui.available_width();
            let led_pitch = LED_SIZE + LED_GAP;
            let leds_per_row = (available_width / led_pitch).floor().max(1.0) as usize;
            let rows = frame.len().div_ceil(leds_per_row);
            let height = rows as f32 * led_pitch;

            let (response, painter) = ui.allocate_painter(egui::vec2(available_width, height), egui::Sense::hover());
            let origin = response.rect.min;

            for (i, pixel) in frame.iter().enumerate() {
                let row = i / leds_per_row;
                let col = i % leds_per_row;
                let x = origin.x + col as f32 * led_pitch;
                let y = origin.y + row as f32 * led_pitch;
                let rect = egui::Rect::from_min_size(egui::pos2(x, y), egui::vec2(LED_SIZE, LED_SIZE));
                painter.rect_filled(rect, 3.0, egui::Color32::from_rgb(pixel.r, pixel.g, pixel.b));
            }
        });
    }
}
