//! # Serial Communication Module
//!
//! Handles the serial link to the LED driver microcontroller.
//!
//! This module handles:
//! - Opening the serial port at 115,200 baud, 8N1, no flow control
//! - Async frame writes through the [`SerialPortIO`] seam

pub mod port_trait;

use async_trait::async_trait;
use std::io;
use tokio_serial::SerialPortBuilderExt;
use tracing::info;

use crate::error::{BridgeError, Result};
pub use port_trait::SerialPortIO;

/// LED driver baud rate
pub const LED_BAUD_RATE: u32 = 115_200;

/// Default LED driver device path
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyACM0";

/// LED Driver Serial Port Handler
///
/// Owns the connection to the LED driver. Opening is done once at startup;
/// there is no reconnection.
pub struct LedSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyACM0)
    device_path: String,
}

impl std::fmt::Debug for LedSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl LedSerial {
    /// Open the LED driver
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyACM0")
    /// * `baud_rate` - Line rate, normally [`LED_BAUD_RATE`]
    ///
    /// # Errors
    ///
    /// Returns `Serial` if the port cannot be opened or configured
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rnbo_bridge::serial::{LedSerial, LED_BAUD_RATE};
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let serial = LedSerial::open("/dev/ttyACM0", LED_BAUD_RATE)?;
    ///     println!("Connected to: {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = Self::open_port(path, baud_rate)?;
        info!("Connected to serial device {} at {} baud", path, baud_rate);
        Ok(Self {
            port,
            device_path: path.to_string(),
        })
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| BridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[async_trait]
impl SerialPortIO for LedSerial {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.flush().await
    }
}
