use crate::config::ConfigError;
use crate::discovery::DiscoveryError;
use crate::port::PortError;
use std::fmt;

/// Top-level error for the `gps-bridge` binary.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Discovery(DiscoveryError),
    Port(PortError),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Discovery(e) => write!(f, "GPS discovery failed: {e}"),
            Self::Port(e) => write!(f, "Serial port error: {e}"),
            Self::Io(e) => write!(f, "An I/O error occurred: {e}"),
            Self::Json(e) => write!(f, "Could not render JSON output: {e}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Discovery(e) => Some(e),
            Self::Port(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
        }
    }
}

// `From` conversions so `?` works in the binary.
impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<DiscoveryError> for AppError {
    fn from(err: DiscoveryError) -> Self {
        AppError::Discovery(err)
    }
}

impl From<PortError> for AppError {
    fn from(err: PortError) -> Self {
        AppError::Port(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Json(err)
    }
}
