//! # Gamepad Bridge
//!
//! Forwards Xbox controller axes and buttons to the RNBO runner as OSC
//! parameter messages, reconnecting whenever the controller drops out.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use rnbo_bridge::config::Config;
use rnbo_bridge::controller::{
    DeviceLocator, EvdevBackend, EventTranslator, Heartbeat, InputSession, RumbleEffect,
};
use rnbo_bridge::logging;
use rnbo_bridge::osc::{self, OscSender};

#[derive(Parser)]
#[command(name = "gamepad-bridge")]
#[command(about = "Forward gamepad input to RNBO over OSC")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let _log_guard = logging::init_logging(&config.logging, "gamepad-bridge", cli.verbose)?;
    info!("Gamepad bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let input = &config.input;
    let sender = OscSender::connect(config.osc.target_socket_addr()?).await?;

    if input.start_transport {
        if let Err(e) = osc::start_transport(&sender).await {
            warn!("Could not start transport: {}", e);
        }
    }

    let translator = EventTranslator::new(input.event_map()?, sender);
    let backend = EvdevBackend::new(DeviceLocator::new(&input.device_dir, &input.target_name));
    let heartbeat = Heartbeat::new(
        Duration::from_secs(input.heartbeat_interval_s),
        RumbleEffect {
            duration: Duration::from_millis(input.rumble_duration_ms),
            weak_magnitude: input.rumble_weak_magnitude,
            strong_magnitude: input.rumble_strong_magnitude,
        },
    );

    let mut session = InputSession::new(
        backend,
        translator,
        heartbeat,
        Duration::from_millis(input.retry_delay_ms),
    );

    info!("Press Ctrl+C to exit");
    tokio::select! {
        _ = session.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    info!("Total events forwarded: {}", session.events_forwarded());
    Ok(())
}
