//! Async serial port implementation using tokio-serial.
//!
//! Probing only ever reads from a port, so the trait here is read-side only.

use super::error::PortError;
use super::traits::PortConfiguration;
use async_trait::async_trait;
use tokio::io::AsyncReadExt;

/// Async trait for reading from an open serial port.
///
/// Dropping the value closes the port. `read_bytes` must be cancel safe:
/// probes race it against a deadline and drop the future when time runs out.
#[async_trait]
pub trait AsyncSerialPortAdapter: Send + std::fmt::Debug {
    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Waits until at least one byte is available. Returns `Ok(0)` only when
    /// the underlying stream has ended.
    async fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Get the configuration the port was opened with.
    fn config(&self) -> &PortConfiguration;
}

/// Native async serial port implementation using tokio-serial.
pub struct TokioSerialPort {
    /// The underlying tokio-serial stream.
    inner: tokio_serial::SerialStream,
    /// Port configuration for reference.
    config: PortConfiguration,
    /// Port name/path for identification.
    name: String,
}

impl TokioSerialPort {
    /// Open a serial port with async I/O support.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Example
    /// ```no_run
    /// use gps_port_bridge::port::{PortConfiguration, TokioSerialPort};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let port = TokioSerialPort::open("/dev/ttyUSB0", &PortConfiguration::nmea(4800))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(port_name: &str, config: &PortConfiguration) -> Result<Self, PortError> {
        let builder = tokio_serial::new(port_name, config.baud_rate)
            .data_bits(config.data_bits.into())
            .flow_control(config.flow_control.into())
            .parity(config.parity.into())
            .stop_bits(config.stop_bits.into())
            .timeout(config.timeout);

        let inner = tokio_serial::SerialStream::open(&builder)
            .map_err(|e| PortError::from_open(port_name, e))?;

        Ok(Self {
            inner,
            config: config.clone(),
            name: port_name.to_string(),
        })
    }
}

#[async_trait]
impl AsyncSerialPortAdapter for TokioSerialPort {
    async fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.inner.read(buffer).await.map_err(PortError::Io)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> &PortConfiguration {
        &self.config
    }
}

impl std::fmt::Debug for TokioSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioSerialPort")
            .field("name", &self.name)
            .field("baud_rate", &self.config.baud_rate)
            .finish()
    }
}
