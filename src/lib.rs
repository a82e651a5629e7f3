pub mod channel;
pub mod color;
pub mod config;
pub mod control;
pub mod dissolve;
pub mod effect;
pub mod engine;
pub mod engine_state;
pub mod error;
pub mod frame_scheduler;
pub mod loader;
pub mod model;
pub mod output;
pub mod palette;
pub mod scene;
pub mod segment;
pub mod tokenizer;

pub use color::Rgb;
pub use config::{DestinationConfig, EngineConfig};
pub use control::{apply_control_event, decode_event, ControlEvent, ControlIngress};
pub use dissolve::Dissolve;
pub use effect::Effect;
pub use embassy_time::{Duration, Instant};
pub use engine::Engine;
pub use engine_state::EngineState;
pub use error::EngineError;
pub use frame_scheduler::FrameScheduler;
pub use model::{DissolveBand, DissolveBundle, DissolvePattern, Frame, SceneBundle};
pub use output::{Destination, OutputFanout};
pub use palette::Palette;
pub use scene::Scene;
pub use segment::{DimmerPhase, Segment};
pub use tokenizer::{tokenize, ControlToken, TokenArg};
