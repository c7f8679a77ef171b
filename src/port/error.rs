//! Port-specific error types.
//!
//! Kept separate from discovery and application errors: a `PortError` only
//! ever describes what went wrong with one serial port.

use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Port configuration was rejected by the driver.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The operating system could not list its serial ports.
    #[error("Failed to enumerate serial ports: {0}")]
    Enumeration(String),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an Enumeration error from a message.
    pub fn enumeration(message: impl Into<String>) -> Self {
        Self::Enumeration(message.into())
    }

    /// Map a `serialport` open failure onto the variant callers care about.
    pub(crate) fn from_open(port_name: &str, err: serialport::Error) -> Self {
        match err.kind {
            serialport::ErrorKind::NoDevice => Self::not_found(port_name),
            serialport::ErrorKind::InvalidInput => Self::config(err.to_string()),
            _ => Self::Serial(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PortError::not_found("/dev/ttyUSB0");
        assert_eq!(err.to_string(), "Serial port not found: /dev/ttyUSB0");

        let err = PortError::config("Invalid baud rate");
        assert_eq!(err.to_string(), "Configuration error: Invalid baud rate");

        let err = PortError::enumeration("udev unavailable");
        assert_eq!(
            err.to_string(),
            "Failed to enumerate serial ports: udev unavailable"
        );
    }

    #[test]
    fn test_open_error_mapping() {
        let err = serialport::Error::new(serialport::ErrorKind::NoDevice, "gone");
        assert!(matches!(
            PortError::from_open("COM7", err),
            PortError::NotFound(name) if name == "COM7"
        ));

        let err = serialport::Error::new(serialport::ErrorKind::InvalidInput, "bad baud");
        assert!(matches!(
            PortError::from_open("COM7", err),
            PortError::Config(_)
        ));

        let err = serialport::Error::new(serialport::ErrorKind::Unknown, "busy");
        assert!(matches!(
            PortError::from_open("COM7", err),
            PortError::Serial(_)
        ));
    }
}
