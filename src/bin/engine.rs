//! Process entry point: loads `EngineConfig`, installs the logger, and
//! spawns the control-ingress (T1) and frame-scheduler (T2, which also owns
//! output fan-out — see DESIGN.md's Open Questions) worker threads.

use std::env;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use ledscene_engine::{ControlIngress, Engine, EngineConfig, FrameScheduler, OutputFanout};
use log::{error, info};

fn main() -> ExitCode {
    let config_path = env::args().nth(1).unwrap_or_else(|| "engine.json".to_owned());

    let config = match EngineConfig::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("failed to load config {config_path}: {err}");
            }
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter)).init();

    let engine = Arc::new(Engine::new());
    let stop = Arc::new(AtomicBool::new(false));

    let destinations = config.destinations.into_iter().map(ledscene_engine::DestinationConfig::into_destination).collect();
    let output = OutputFanout::new(destinations, config.output_control_address);
    engine.set_default_dissolve_pattern_id(config.default_dissolve_pattern_id);

    let ingress = match ControlIngress::bind(&config.listen_address, engine.clone()) {
        Ok(ingress) => ingress,
        Err(err) => {
            error!("failed to bind control socket {}: {err}", config.listen_address);
            return ExitCode::FAILURE;
        }
    };

    info!("listening for control messages on {}", config.listen_address);

    let ingress_stop = stop.clone();
    let ingress_thread = thread::Builder::new()
        .name("control-ingress".to_owned())
        .spawn(move || ingress.run(&ingress_stop))
        .expect("failed to spawn control-ingress thread");

    let scheduler_stop = stop.clone();
    let scheduler_thread = thread::Builder::new()
        .name("frame-scheduler".to_owned())
        .spawn(move || FrameScheduler::new(engine, output, scheduler_stop).run())
        .expect("failed to spawn frame-scheduler thread");

    // Both workers loop until `stop` is set; nothing in this process sets it
    // today, so the binary runs until the process is terminated externally.
    let _ = ingress_thread.join();
    let _ = scheduler_thread.join();

    ExitCode::SUCCESS
}
