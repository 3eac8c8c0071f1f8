//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so an empty file (or no file at all) gives the
//! stock setup: Xbox controller to `127.0.0.1:1234`, LED driver on
//! `/dev/ttyACM0` fed from port 4321.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::controller::translator::{default_event_bindings, EventBinding, EventMap, DEFAULT_BASE_PATH};
use crate::error::{BridgeError, Result};
use crate::frame::{FrameBuffer, PAYLOAD_LEN};
use crate::router::{default_route_bindings, RouteBinding, Router};

/// Baud rates the LED driver firmware accepts
const SUPPORTED_BAUD_RATES: [u32; 5] = [9600, 57600, 115200, 230400, 460800];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub osc: OscConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gamepad (input bridge) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default = "default_target_name")]
    pub target_name: String,

    #[serde(default = "default_device_dir")]
    pub device_dir: String,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_heartbeat_interval_s")]
    pub heartbeat_interval_s: u64,

    #[serde(default = "default_rumble_duration_ms")]
    pub rumble_duration_ms: u64,

    #[serde(default = "default_rumble_weak_magnitude")]
    pub rumble_weak_magnitude: u16,

    #[serde(default)]
    pub rumble_strong_magnitude: u16,

    #[serde(default = "default_base_path")]
    pub base_path: String,

    #[serde(default)]
    pub start_transport: bool,

    #[serde(default = "default_event_bindings")]
    pub events: Vec<EventBinding>,
}

/// OSC endpoints
#[derive(Debug, Deserialize, Clone)]
pub struct OscConfig {
    #[serde(default = "default_target_addr")]
    pub target_addr: String,

    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    #[serde(default = "default_listener_host")]
    pub listener_host: String,
}

/// LED driver (output bridge) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_serial_port")]
    pub serial_port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_frame_rate_hz")]
    pub frame_rate_hz: u32,

    #[serde(default = "default_status_interval_frames")]
    pub status_interval_frames: u64,

    #[serde(default)]
    pub clamp_payload: bool,

    #[serde(default)]
    pub initial_payload: Vec<u8>,

    #[serde(default = "default_route_bindings")]
    pub routes: Vec<RouteBinding>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub log_dir: Option<String>,
}

// Default value functions
fn default_target_name() -> String { crate::controller::locator::DEFAULT_TARGET_NAME.to_string() }
fn default_device_dir() -> String { crate::controller::locator::DEFAULT_DEVICE_DIR.to_string() }
fn default_retry_delay_ms() -> u64 { 3000 }
fn default_heartbeat_interval_s() -> u64 { 60 }
fn default_rumble_duration_ms() -> u64 { 200 }
fn default_rumble_weak_magnitude() -> u16 { 0x2000 }
fn default_base_path() -> String { DEFAULT_BASE_PATH.to_string() }

fn default_target_addr() -> String { "127.0.0.1:1234".to_string() }
fn default_listen_port() -> u16 { 4321 }
fn default_listener_host() -> String { "127.0.0.1".to_string() }

fn default_serial_port() -> String { crate::serial::DEFAULT_SERIAL_PORT.to_string() }
fn default_baud_rate() -> u32 { crate::serial::LED_BAUD_RATE }
fn default_frame_rate_hz() -> u32 { crate::scheduler::DEFAULT_FRAME_RATE_HZ }
fn default_status_interval_frames() -> u64 { crate::scheduler::DEFAULT_STATUS_INTERVAL_FRAMES }

fn default_log_level() -> String { "info".to_string() }

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            target_name: default_target_name(),
            device_dir: default_device_dir(),
            retry_delay_ms: default_retry_delay_ms(),
            heartbeat_interval_s: default_heartbeat_interval_s(),
            rumble_duration_ms: default_rumble_duration_ms(),
            rumble_weak_magnitude: default_rumble_weak_magnitude(),
            rumble_strong_magnitude: 0,
            base_path: default_base_path(),
            start_transport: false,
            events: default_event_bindings(),
        }
    }
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            target_addr: default_target_addr(),
            listen_port: default_listen_port(),
            listener_host: default_listener_host(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            serial_port: default_serial_port(),
            baud_rate: default_baud_rate(),
            frame_rate_hz: default_frame_rate_hz(),
            status_interval_frames: default_status_interval_frames(),
            clamp_payload: false,
            initial_payload: Vec::new(),
            routes: default_route_bindings(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

impl OscConfig {
    /// Parsed outbound target address
    ///
    /// # Errors
    ///
    /// Returns `Config` if `target_addr` is not `ip:port`
    pub fn target_socket_addr(&self) -> Result<SocketAddr> {
        self.target_addr.parse().map_err(|e| {
            BridgeError::Config(toml::de::Error::custom(format!(
                "target_addr '{}' is not a socket address: {}",
                self.target_addr, e
            )))
        })
    }

    /// Address announced in the `/rnbo/listeners/add` handshake
    pub fn listener_url(&self) -> String {
        format!("{}:{}", self.listener_host, self.listen_port)
    }
}

impl InputConfig {
    /// Build the event table from the configured bindings
    ///
    /// # Errors
    ///
    /// Returns `InvalidRoute` for unknown or duplicate codes
    pub fn event_map(&self) -> Result<EventMap> {
        EventMap::from_bindings(&self.base_path, &self.events)
    }
}

impl OutputConfig {
    /// Build the shared buffer and a router writing into it
    ///
    /// # Errors
    ///
    /// Returns `InvalidRoute` for bad slots or duplicate addresses
    pub fn build_router(&self) -> Result<(FrameBuffer, Router)> {
        let frame = FrameBuffer::with_payload(&self.initial_payload);
        let router = Router::from_bindings(frame.clone(), &self.routes, self.clamp_payload)?;
        Ok((frame, router))
    }
}

fn invalid(msg: impl std::fmt::Display) -> BridgeError {
    BridgeError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rnbo_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.input.target_name.is_empty() {
            return Err(invalid("target_name cannot be empty"));
        }

        if self.input.device_dir.is_empty() {
            return Err(invalid("device_dir cannot be empty"));
        }

        if self.input.retry_delay_ms == 0 || self.input.retry_delay_ms > 60000 {
            return Err(invalid("retry_delay_ms must be between 1 and 60000"));
        }

        if self.input.heartbeat_interval_s == 0 {
            return Err(invalid("heartbeat_interval_s must be greater than 0"));
        }

        if self.input.rumble_duration_ms == 0 || self.input.rumble_duration_ms > 5000 {
            return Err(invalid("rumble_duration_ms must be between 1 and 5000"));
        }

        if !self.input.base_path.starts_with('/') {
            return Err(invalid("base_path must start with '/'"));
        }

        self.input
            .event_map()
            .map_err(|e| invalid(format!("events: {}", e)))?;

        self.osc.target_socket_addr()?;

        if self.osc.listener_host.is_empty() {
            return Err(invalid("listener_host cannot be empty"));
        }

        if self.output.serial_port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.output.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {:?}",
                SUPPORTED_BAUD_RATES
            )));
        }

        if self.output.frame_rate_hz == 0 || self.output.frame_rate_hz > 1000 {
            return Err(invalid("frame_rate_hz must be between 1 and 1000"));
        }

        if self.output.initial_payload.len() > PAYLOAD_LEN {
            return Err(invalid(format!(
                "initial_payload holds at most {} values",
                PAYLOAD_LEN
            )));
        }

        self.output
            .build_router()
            .map_err(|e| invalid(format!("routes: {}", e)))?;

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(invalid(format!(
                "log level '{}' must be one of: trace, debug, info, warn, error",
                self.logging.level
            )));
        }

        if matches!(&self.logging.log_dir, Some(dir) if dir.is_empty()) {
            return Err(invalid("log_dir cannot be empty when set"));
        }

        Ok(())
    }
}
