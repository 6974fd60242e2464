//! # Attitude Relay
//!
//! Relay yaw/pitch/roll from a sensor node to an MCP4728 DAC.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use attitude_relay::config::Config;
use attitude_relay::control::ControlSurface;
use attitude_relay::dac::log_sink::LoggingDac;
use attitude_relay::dac::DacSink;
use attitude_relay::http;
use attitude_relay::link::SensorLink;
use attitude_relay::logging;
use attitude_relay::pipeline::IngestPipeline;
use attitude_relay::relay::{Relay, RelayHandle};

/// Capacity of the link event queue
const LINK_QUEUE_CAPACITY: usize = 64;

/// Capacity of the control request queue
const CONTROL_QUEUE_CAPACITY: usize = 16;

#[derive(Debug, Parser)]
#[command(version, about = "Relay sensor node orientation to a 4-channel DAC")]
struct Args {
    /// Path to the TOML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Main entry point for the relay
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration and set up logging
///    - Open the DAC and drive every channel to 0
///    - Bind the control surface
///
/// 2. **Main Loop**
///    - Relay task owns the pipeline and serves link events and control requests
///    - Link task keeps the WebSocket connection to the sensor node alive
///    - HTTP task serves the control surface
///
/// 3. **Graceful Shutdown**
///    - Ctrl+C, or any task ending, stops the process
///
/// # Errors
///
/// Returns error if:
/// - The configuration file cannot be loaded
/// - The DAC cannot be opened
/// - The control surface address cannot be bound
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let _log_guard = logging::init(&config.logging);

    info!("Attitude Relay v{} starting...", env!("CARGO_PKG_VERSION"));

    let dac = open_dac(&config)?;
    run(config, dac).await
}

/// Open the configured DAC backend.
fn open_dac(config: &Config) -> Result<Box<dyn DacSink>> {
    match config.dac.backend.as_str() {
        "mcp4728" => open_mcp4728(config),
        _ => {
            info!("Using log-only DAC backend");
            Ok(Box::new(LoggingDac::new()))
        }
    }
}

#[cfg(target_os = "linux")]
fn open_mcp4728(config: &Config) -> Result<Box<dyn DacSink>> {
    use attitude_relay::dac::mcp4728::Mcp4728;
    use linux_embedded_hal::I2cdev;

    let bus = I2cdev::new(&config.dac.i2c_bus)
        .with_context(|| format!("Failed to open I2C bus {}", config.dac.i2c_bus))?;
    let dac = Mcp4728::open(bus, config.dac.address)?;
    info!(
        "MCP4728 opened on {} at 0x{:02X}",
        config.dac.i2c_bus,
        dac.address()
    );
    Ok(Box::new(dac))
}

#[cfg(not(target_os = "linux"))]
fn open_mcp4728(_config: &Config) -> Result<Box<dyn DacSink>> {
    anyhow::bail!("The mcp4728 backend needs Linux I2C; set dac.backend = \"log\"")
}

async fn run<D: DacSink + 'static>(config: Config, dac: D) -> Result<()> {
    let mut pipeline =
        IngestPipeline::with_update_interval(dac, config.channel_map()?, config.update_interval());
    pipeline.zero_outputs();

    let relay = Relay::new(pipeline, ControlSurface::new(config.test_dwell()));
    let (link_tx, link_rx) = mpsc::channel(LINK_QUEUE_CAPACITY);
    let (handle, requests) = RelayHandle::channel(CONTROL_QUEUE_CAPACITY);

    let listener = TcpListener::bind(&config.http.bind)
        .await
        .with_context(|| format!("Failed to bind control surface on {}", config.http.bind))?;

    let link = SensorLink::new(config.link.url.clone(), config.reconnect_interval());
    info!("Connecting to sensor node at {}", link.url());

    let mut relay_task = tokio::spawn(relay.run(link_rx, requests));
    let mut link_task = tokio::spawn(link.run(link_tx));
    let mut http_task = tokio::spawn(http::serve(listener, handle));

    info!("Press Ctrl+C to exit");

    tokio::select! {
        result = &mut http_task => match result {
            Ok(Ok(())) => warn!("Control surface stopped"),
            Ok(Err(e)) => error!("Control surface failed: {}", e),
            Err(e) => error!("Control surface task panicked: {}", e),
        },
        _ = &mut link_task => warn!("Sensor link task stopped"),
        result = &mut relay_task => match result {
            Ok(stats) => warn!("Relay loop stopped after {} messages", stats.accepted),
            Err(e) => error!("Relay task panicked: {}", e),
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    http_task.abort();
    link_task.abort();
    relay_task.abort();

    Ok(())
}
