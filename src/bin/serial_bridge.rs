//! # Serial Bridge
//!
//! Receives LED parameters from the RNBO runner over OSC and streams them to
//! the LED driver as 15-byte frames at a fixed rate.
//!
//! Failing to open the serial port or to bind the OSC port is fatal.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use rnbo_bridge::config::Config;
use rnbo_bridge::logging;
use rnbo_bridge::osc::{self, OscListener, OscSender};
use rnbo_bridge::scheduler::TransmissionScheduler;
use rnbo_bridge::serial::LedSerial;

#[derive(Parser)]
#[command(name = "serial-bridge")]
#[command(about = "Stream RNBO outport values to a serial LED driver")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial device, overrides the config file
    #[arg(short, long)]
    port: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(port) = cli.port {
        config.output.serial_port = port;
        config.validate()?;
    }

    let _log_guard = logging::init_logging(&config.logging, "serial-bridge", cli.verbose)?;
    info!("Serial bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let output = &config.output;
    let serial = LedSerial::open(&output.serial_port, output.baud_rate)?;

    let (frame, router) = output.build_router()?;
    info!("{} OSC routes registered", router.len());

    let listener = OscListener::bind_port(config.osc.listen_port).await?;
    tokio::spawn(listener.run(router));

    let sender = OscSender::connect(config.osc.target_socket_addr()?).await?;
    if let Err(e) = osc::register_listener(&sender, &config.osc.listener_url()).await {
        warn!("Could not register with RNBO: {}", e);
    }

    let mut scheduler = TransmissionScheduler::new(serial, frame, output.frame_rate_hz)
        .with_status_interval(output.status_interval_frames);

    info!("Press Ctrl+C to exit");
    tokio::select! {
        _ = scheduler.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    let stats = scheduler.stats();
    info!("Total frames sent: {} ({} failed)", stats.sent, stats.failed);
    Ok(())
}
