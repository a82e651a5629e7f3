//! Output fan-out (C7): per-destination LED-range slicing and UDP datagram
//! emission. Generalized from the teacher's single `RenderingBounds` slice
//! (`src/bounds.rs`) into N independent per-destination slices, one per
//! physical output.

use std::io;
use std::net::UdpSocket;

use log::warn;

use crate::color::Rgb;
use crate::error::EngineError;

/// One physical output destination (§4.7): an address, an LED range (full
/// copy if `copy_mode` is set), and whether it wants the whole frame.
#[derive(Debug, Clone)]
pub struct Destination {
    pub address: String,
    pub start_led: usize,
    /// `-1` means "last LED of the frame".
    pub end_led: i64,
    pub copy_mode: bool,
}

struct Sink {
    destination: Destination,
    socket: Option<UdpSocket>,
}

/// Fans a rendered frame out to every configured [`Destination`] (C7).
pub struct OutputFanout {
    sinks: Vec<Sink>,
    control_address: String,
}

impl OutputFanout {
    #[must_use]
    pub fn new(destinations: Vec<Destination>, control_address: String) -> Self {
        let sinks = destinations
            .into_iter()
            .map(|destination| {
                let socket = match UdpSocket::bind("0.0.0.0:0").and_then(|s| {
                    s.set_nonblocking(true)?;
                    Ok(s)
                }) {
                    Ok(s) => Some(s),
                    Err(err) => {
                        warn!("failed to bind output socket for {}: {err}", destination.address);
                        None
                    }
                };
                Sink { destination, socket }
            })
            .collect();
        Self { sinks, control_address }
    }

    /// Serialize and send `frame` to every destination. Each destination is
    /// isolated: a failed send on one never blocks or skips the others.
    /// Returns one `EngineError::IoFailure` per destination that failed.
    pub fn send(&self, frame: &[Rgb]) -> Vec<EngineError> {
        let mut failures = Vec::new();
        for sink in &self.sinks {
            let (start, end) = Self::slice_bounds(&sink.destination, frame.len());
            if frame.is_empty() || start > end {
                continue;
            }

            let payload = Self::encode(&self.control_address, &frame[start..=end]);
            match &sink.socket {
                Some(socket) => {
                    if let Err(err) = socket.send_to(&payload, &sink.destination.address) {
                        warn!("send to {} failed: {err}", sink.destination.address);
                        failures.push(EngineError::IoFailure {
                            destination: sink.destination.address.clone(),
                            source: err,
                        });
                    }
                }
                None => {
                    failures.push(EngineError::IoFailure {
                        destination: sink.destination.address.clone(),
                        source: io::Error::new(io::ErrorKind::NotConnected, "output socket unavailable"),
                    });
                }
            }
        }
        failures
    }

    fn slice_bounds(destination: &Destination, led_count: usize) -> (usize, usize) {
        if led_count == 0 {
            return (0, 0);
        }
        let last = led_count - 1;
        if destination.copy_mode {
            return (0, last);
        }
        let end = if destination.end_led < 0 {
            last
        } else {
            (destination.end_led as usize).min(last)
        };
        (destination.start_led.min(end), end)
    }

    /// Wrap the raw RGB payload in the output control message: a 4-byte
    /// little-endian address length, the UTF-8 address, then raw RGB bytes.
    fn encode(control_address: &str, leds: &[Rgb]) -> Vec<u8> {
        let addr_bytes = control_address.as_bytes();
        let mut out = Vec::with_capacity(4 + addr_bytes.len() + leds.len() * 3);
        out.extend_from_slice(&(addr_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(addr_bytes);
        for led in leds {
            out.extend_from_slice(&[led.r, led.g, led.b]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_copy_destination_takes_whole_frame() {
        let d = Destination { address: "127.0.0.1:0".into(), start_led: 2, end_led: 2, copy_mode: true };
        assert_eq!(OutputFanout::slice_bounds(&d, 10), (0, 9));
    }

    #[test]
    fn range_destination_slices_and_clamps() {
        let d = Destination { address: "127.0.0.1:0".into(), start_led: 3, end_led: 5, copy_mode: false };
        assert_eq!(OutputFanout::slice_bounds(&d, 10), (3, 5));

        let over = Destination { address: "127.0.0.1:0".into(), start_led: 3, end_led: 100, copy_mode: false };
        assert_eq!(OutputFanout::slice_bounds(&over, 10), (3, 9));
    }

    #[test]
    fn negative_end_led_means_last_led() {
        let d = Destination { address: "127.0.0.1:0".into(), start_led: 0, end_led: -1, copy_mode: false };
        assert_eq!(OutputFanout::slice_bounds(&d, 10), (0, 9));
    }

    #[test]
    fn encode_prefixes_address_length_then_bytes() {
        let leds = [Rgb { r: 1, g: 2, b: 3 }];
        let payload = OutputFanout::encode("/x", &leds);
        assert_eq!(&payload[0..4], &2u32.to_le_bytes());
        assert_eq!(&payload[4..6], b"/x");
        assert_eq!(&payload[6..9], &[1, 2, 3]);
    }

    #[test]
    fn unreachable_destination_is_isolated_and_counted() {
        let output = OutputFanout::new(
            vec![Destination { address: "127.0.0.1:1".into(), start_led: 0, end_led: -1, copy_mode: true }],
            "/light/serial".to_owned(),
        );
        let failures = output.send(&[Rgb { r: 0, g: 0, b: 0 }; 4]);
        // A bound UDP socket send to an unreachable port does not itself
        // error synchronously on most platforms; this just exercises the
        // isolation path without panicking.
        for err in &failures {
            assert!(matches!(err, EngineError::IoFailure { .. }));
        }
    }
}
