//! GPS port discovery.
//!
//! Given a GPS receiver on an unknown serial port at an unknown baud rate,
//! find the port and rate that produce NMEA sentences, then bridge that
//! port's raw bytes to a consumer.
//!
//! Every port visible to the system gets its own probe task. A probe opens
//! its port 8N1 at each rate in [`GPS_BAUD_RATES`], in order, listens for
//! [`SETTLE_WINDOW`], and checks what arrived with a [`PreambleMatcher`].
//! The first port to match is recorded as the winner and keeps streaming;
//! other probes notice the winner before their next open and stop.

use crate::config::DiscoveryConfig;
use crate::port::PortError;
use thiserror::Error;

pub mod preamble;
pub mod probe;
pub mod reader;
pub mod sink;
pub mod winner;

pub use preamble::PreambleMatcher;
pub use probe::{ProbeOutcome, ProbeReport};
pub use reader::GpsReader;
pub use sink::NmeaSink;
pub use winner::{BoundPort, DiscoveryStatus};

use std::time::Duration;

/// Baud rates tried on every port, in order. 4800 is the NMEA 0183 default
/// and by far the most common, so it goes first.
pub const GPS_BAUD_RATES: [u32; 5] = [4800, 9600, 19200, 1200, 2400];

/// How long a probe listens at each baud rate before checking.
pub const SETTLE_WINDOW: Duration = Duration::from_secs(1);

/// Errors that stop discovery from starting at all.
///
/// Problems with individual ports never show up here; a probe logs them and
/// moves on to the next baud rate.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The system port list could not be read.
    #[error("Cannot list serial ports: {0}")]
    Enumeration(#[from] PortError),

    /// Probes are Tokio tasks and need a runtime to be spawned on.
    #[error("Discovery must be started from within a Tokio runtime")]
    NoRuntime,
}

/// Tunables for a discovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// How to recognise NMEA output.
    pub preamble: PreambleMatcher,
    /// System port names that are never probed.
    pub exclude_ports: Vec<String>,
}

impl DiscoveryOptions {
    pub fn with_preamble(mut self, preamble: PreambleMatcher) -> Self {
        self.preamble = preamble;
        self
    }

    /// Never probe `port_name`.
    pub fn exclude(mut self, port_name: impl Into<String>) -> Self {
        self.exclude_ports.push(port_name.into());
        self
    }

    pub fn is_excluded(&self, port_name: &str) -> bool {
        self.exclude_ports.iter().any(|p| p == port_name)
    }
}

impl From<&DiscoveryConfig> for DiscoveryOptions {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            preamble: config.preamble,
            exclude_ports: config.exclude_ports.clone(),
        }
    }
}
