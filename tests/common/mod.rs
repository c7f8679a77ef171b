//! Shared helpers for the discovery integration tests.

#![allow(dead_code)]

use gps_port_bridge::discovery::{DiscoveryOptions, GpsReader};
use gps_port_bridge::port::{MockSerialBackend, SerialBackend};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// A few seconds of a typical receiver's output, with line noise in front.
pub const GPS_BURST: &[u8] = b"\x00\xffjunk$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";

/// A GNSS receiver that reports with the `GN` talker only.
pub const GNSS_BURST: &[u8] = b"$GNRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n";

/// Start discovery over `backend`, streaming into a channel.
pub fn start(
    backend: &Arc<MockSerialBackend>,
    options: DiscoveryOptions,
) -> (GpsReader, UnboundedReceiver<Vec<u8>>) {
    let (tx, rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let backend: Arc<dyn SerialBackend> = backend.clone();
    let reader = GpsReader::discover_with(backend, Arc::new(tx), options)
        .expect("discovery should start");
    (reader, rx)
}

/// Everything already sitting in the channel.
pub fn drain(rx: &mut UnboundedReceiver<Vec<u8>>) -> Vec<u8> {
    let mut out = Vec::new();
    while let Ok(chunk) = rx.try_recv() {
        out.extend_from_slice(&chunk);
    }
    out
}

/// `history` is a leading slice of the baud rate list.
pub fn is_rate_prefix(history: &[u32]) -> bool {
    gps_port_bridge::GPS_BAUD_RATES.starts_with(history)
}
