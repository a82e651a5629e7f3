//! Control ingress (C8): decoded control events applied to the engine.
//! Wire decoding itself lives in `tokenizer` (A5); this module only ever
//! sees an already-tokenized [`ControlToken`].

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use embassy_time::Instant;
use log::{info, warn};

use crate::channel::Channel;
use crate::color::Rgb;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::loader;
use crate::tokenizer::{tokenize, ControlToken, TokenArg};

const DEFAULT_SCENE_EXTENSION: &str = "json";
const DEFAULT_DISSOLVE_EXTENSION: &str = "json";

/// Capacity of the ingress→apply hand-off queue.
pub const CONTROL_CHANNEL_SIZE: usize = 64;

/// One already-decoded control message (§6).
#[derive(Debug, Clone)]
pub enum ControlEvent {
    LoadScenes(String),
    ChangeScene(i64),
    ChangeEffect(i64),
    ChangePalette(i64),
    ChangePattern,
    Pause,
    Resume,
    PaletteColor { palette_id: i64, color_id: i64, r: i64, g: i64, b: i64 },
    LoadDissolvePatterns(String),
    SetDissolvePattern(i64),
    SetSpeedPercent(i64),
    MasterBrightness(i64),
}

/// Appends the loader's default extension if `path` has none (§4.8).
fn with_default_extension(path: &str, ext: &str) -> String {
    let has_extension = path.rsplit('/').next().is_some_and(|name| name.contains('.'));
    if has_extension {
        path.to_owned()
    } else {
        format!("{path}.{ext}")
    }
}

fn arg_int(args: &[TokenArg], i: usize) -> Option<i64> {
    match args.get(i)? {
        TokenArg::Int(v) => Some(*v),
        TokenArg::Float(v) => Some(*v as i64),
        TokenArg::Str(_) => None,
    }
}

fn arg_str(args: &[TokenArg], i: usize) -> Option<String> {
    match args.get(i)? {
        TokenArg::Str(s) => Some(s.clone()),
        TokenArg::Int(v) => Some(v.to_string()),
        TokenArg::Float(v) => Some(v.to_string()),
    }
}

/// Decode a tokenized control message into a [`ControlEvent`] (the A5/C8
/// boundary: everything past this point is already typed).
pub fn decode_event(token: &ControlToken) -> Result<ControlEvent, EngineError> {
    let malformed = |reason: &str| EngineError::MalformedInput { reason: format!("{}: {reason}", token.address) };

    if let Some(rest) = token.address.strip_prefix("/palette/") {
        let mut segs = rest.split('/');
        let palette_id = segs
            .next()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| malformed("bad palette id"))?;
        let color_id = segs
            .next()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| malformed("bad color id"))?;
        let r = arg_int(&token.args, 0).ok_or_else(|| malformed("missing r"))?;
        let g = arg_int(&token.args, 1).ok_or_else(|| malformed("missing g"))?;
        let b = arg_int(&token.args, 2).ok_or_else(|| malformed("missing b"))?;
        return Ok(ControlEvent::PaletteColor { palette_id, color_id, r, g, b });
    }

    match token.address.as_str() {
        "/load_json" => Ok(ControlEvent::LoadScenes(
            arg_str(&token.args, 0).ok_or_else(|| malformed("missing path"))?,
        )),
        "/change_scene" => Ok(ControlEvent::ChangeScene(
            arg_int(&token.args, 0).ok_or_else(|| malformed("missing id"))?,
        )),
        "/change_effect" => Ok(ControlEvent::ChangeEffect(
            arg_int(&token.args, 0).ok_or_else(|| malformed("missing id"))?,
        )),
        "/change_palette" => Ok(ControlEvent::ChangePalette(
            arg_int(&token.args, 0).ok_or_else(|| malformed("missing id"))?,
        )),
        "/change_pattern" => Ok(ControlEvent::ChangePattern),
        "/pause" => Ok(ControlEvent::Pause),
        "/resume" => Ok(ControlEvent::Resume),
        "/load_dissolve_json" => Ok(ControlEvent::LoadDissolvePatterns(
            arg_str(&token.args, 0).ok_or_else(|| malformed("missing path"))?,
        )),
        "/set_dissolve_pattern" => Ok(ControlEvent::SetDissolvePattern(
            arg_int(&token.args, 0).ok_or_else(|| malformed("missing id"))?,
        )),
        "/set_speed_percent" => Ok(ControlEvent::SetSpeedPercent(
            arg_int(&token.args, 0).ok_or_else(|| malformed("missing percent"))?,
        )),
        "/master_brightness" => Ok(ControlEvent::MasterBrightness(
            arg_int(&token.args, 0).ok_or_else(|| malformed("missing brightness"))?,
        )),
        other => Err(EngineError::MalformedInput { reason: format!("unknown address: {other}") }),
    }
}

/// Apply one decoded control event to the engine (C8's only in-scope job).
pub fn apply_control_event(engine: &Engine, event: ControlEvent, now: Instant) {
    match event {
        ControlEvent::LoadScenes(path) => {
            let path = with_default_extension(&path, DEFAULT_SCENE_EXTENSION);
            match loader::load_scene_bundle(&path) {
                Ok(bundle) => {
                    engine.load_scenes(bundle, now);
                    info!("loaded scene bundle from {path}");
                }
                Err(err) => {
                    warn!("failed to load scene bundle {path}: {err}");
                    engine.record_error(&err);
                }
            }
        }
        ControlEvent::ChangeScene(id) => engine.cache_change_scene(id.max(0) as u32),
        ControlEvent::ChangeEffect(id) => engine.cache_change_effect(id.max(0) as u32),
        ControlEvent::ChangePalette(id) => engine.cache_change_palette(id.max(0) as u32),
        ControlEvent::ChangePattern => engine.commit_pattern(now),
        ControlEvent::Pause => engine.pause(),
        ControlEvent::Resume => engine.resume(),
        ControlEvent::PaletteColor { palette_id, color_id, r, g, b } => {
            if !(0..=5).contains(&color_id) {
                let err = EngineError::OutOfRange { field: "color_id", value: color_id };
                warn!("{err}");
                engine.record_error(&err);
                return;
            }
            let rgb = Rgb {
                r: r.clamp(0, 255) as u8,
                g: g.clamp(0, 255) as u8,
                b: b.clamp(0, 255) as u8,
            };
            engine.set_palette_color(palette_id.max(0) as u32, color_id as usize, rgb);
        }
        ControlEvent::LoadDissolvePatterns(path) => {
            let path = with_default_extension(&path, DEFAULT_DISSOLVE_EXTENSION);
            match loader::load_dissolve_bundle(&path) {
                Ok(bundle) => {
                    engine.load_dissolve_patterns(bundle);
                    info!("loaded dissolve bundle from {path}");
                }
                Err(err) => {
                    warn!("failed to load dissolve bundle {path}: {err}");
                    engine.record_error(&err);
                }
            }
        }
        ControlEvent::SetDissolvePattern(id) => engine.set_dissolve_pattern(id.max(0) as u32),
        ControlEvent::SetSpeedPercent(p) => engine.set_speed(p),
        ControlEvent::MasterBrightness(b) => engine.set_master_brightness(b),
    }
}

/// Reads control datagrams from a UDP socket and applies them to the engine
/// in arrival order (T1's body).
pub struct ControlIngress {
    socket: UdpSocket,
    engine: Arc<Engine>,
    channel: Channel<ControlEvent, CONTROL_CHANNEL_SIZE>,
}

impl ControlIngress {
    /// Bind the ingress socket. The read timeout keeps `run` responsive to
    /// the stop flag even with no traffic.
    pub fn bind(addr: &str, engine: Arc<Engine>) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(StdDuration::from_millis(200)))?;
        Ok(Self { socket, engine, channel: Channel::new() })
    }

    /// Run until `stop` is set. Blocking; this is the body of the T1 worker
    /// thread.
    pub fn run(&self, stop: &AtomicBool) {
        let mut buf = [0u8; 2048];
        let sender = self.channel.sender();
        let receiver = self.channel.receiver();

        while !stop.load(Ordering::Relaxed) {
            match self.socket.recv_from(&mut buf) {
                Ok((len, _addr)) => self.ingest(&buf[..len], &sender),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(err) => {
                    warn!("control socket error, stopping ingress: {err}");
                    break;
                }
            }

            while let Ok(event) = receiver.try_receive() {
                apply_control_event(&self.engine, event, Instant::now());
            }
        }
    }

    fn ingest(&self, datagram: &[u8], sender: &crate::channel::Sender<'_, ControlEvent, CONTROL_CHANNEL_SIZE>) {
        let token = match tokenize(datagram) {
            Ok(token) => token,
            Err(err) => {
                warn!("malformed datagram: {err}");
                self.engine.record_error(&err);
                return;
            }
        };

        match decode_event(&token) {
            Ok(event) => {
                if sender.try_send(event).is_err() {
                    warn!("control channel full, dropping event for {}", token.address);
                }
            }
            Err(err) => {
                warn!("malformed control message: {err}");
                self.engine.record_error(&err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    #[test]
    fn decodes_change_scene() {
        let token = tokenize(b"/change_scene 3").unwrap();
        let event = decode_event(&token).unwrap();
        assert!(matches!(event, ControlEvent::ChangeScene(3)));
    }

    #[test]
    fn decodes_palette_color() {
        let token = tokenize(b"/palette/1/2 10 20 30").unwrap();
        let event = decode_event(&token).unwrap();
        assert!(matches!(
            event,
            ControlEvent::PaletteColor { palette_id: 1, color_id: 2, r: 10, g: 20, b: 30 }
        ));
    }

    #[test]
    fn unknown_address_is_malformed() {
        let token = tokenize(b"/unknown 1").unwrap();
        assert!(decode_event(&token).is_err());
    }

    #[test]
    fn extension_is_appended_when_missing() {
        assert_eq!(with_default_extension("scenes/morning", "json"), "scenes/morning.json");
        assert_eq!(with_default_extension("scenes/morning.json", "json"), "scenes/morning.json");
    }

    #[test]
    fn pause_then_change_pattern_applies_in_order() {
        let engine = Engine::new();
        apply_control_event(&engine, ControlEvent::Pause, Instant::from_millis(0));
        assert!(engine.is_paused());
        apply_control_event(&engine, ControlEvent::Resume, Instant::from_millis(0));
        assert!(!engine.is_paused());
    }

    #[test]
    fn out_of_range_palette_color_id_is_rejected() {
        let engine = Engine::new();
        apply_control_event(
            &engine,
            ControlEvent::PaletteColor { palette_id: 0, color_id: 9, r: 1, g: 1, b: 1 },
            Instant::from_millis(0),
        );
        assert_eq!(engine.errors.out_of_range.load(Ordering::Relaxed), 1);
    }
}
