//! GPS Port Bridge
//!
//! Finds a GPS receiver attached to one of the machine's serial ports, works
//! out its baud rate, and streams its raw NMEA output to a consumer.
//!
//! # Modules
//!
//! - `discovery`: concurrent per-port probing and the winning-port bridge
//! - `port`: serial port abstraction (real ports via `tokio-serial`, plus a mock backend)
//! - `config`: TOML configuration with environment overrides
//! - `logging`: tracing subscriber setup
//! - `error`: top-level error type

pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod port;

// Re-export commonly used types for convenience
pub use discovery::{
    BoundPort, DiscoveryError, DiscoveryOptions, DiscoveryStatus, GpsReader, NmeaSink,
    PreambleMatcher, ProbeOutcome, ProbeReport, GPS_BAUD_RATES, SETTLE_WINDOW,
};
pub use error::AppError;
pub use port::{
    AsyncSerialPortAdapter, MockDevice, MockSerialBackend, PortConfiguration, PortError, PortInfo,
    PortKind, SerialBackend, SystemBackend,
};

pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
