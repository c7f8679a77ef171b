//! Discovery session orchestrator.

use super::probe::{run_probe, ProbeContext, ProbeReport};
use super::sink::NmeaSink;
use super::winner::{BoundPort, DiscoveryStatus, WinnerSlot};
use super::{DiscoveryError, DiscoveryOptions};
use crate::port::{PortInfo, SerialBackend, SystemBackend};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// A running search for a GPS receiver across every serial port.
///
/// One probe task is spawned per port. The first port found carrying NMEA
/// stays open and streams into the sink; use [`gps_port`](Self::gps_port),
/// [`wait_for_gps`](Self::wait_for_gps) or [`subscribe`](Self::subscribe)
/// to learn which one it was.
///
/// Dropping the reader closes it.
///
/// # Example
/// ```no_run
/// use gps_port_bridge::discovery::GpsReader;
/// use tokio::sync::mpsc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
/// let reader = GpsReader::discover(tx)?;
///
/// if let Some(port) = reader.wait_for_gps().await {
///     println!("GPS on {} at {} baud", port.port_name, port.baud_rate);
///     while let Some(chunk) = rx.recv().await {
///         print!("{}", String::from_utf8_lossy(&chunk));
///     }
/// }
/// reader.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct GpsReader {
    winner: Arc<WinnerSlot>,
    probes: Vec<JoinHandle<ProbeReport>>,
}

impl GpsReader {
    /// Probe every system serial port, streaming the GPS output into `sink`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn discover<S: NmeaSink>(sink: S) -> Result<Self, DiscoveryError> {
        Self::discover_with(
            Arc::new(SystemBackend),
            Arc::new(sink),
            DiscoveryOptions::default(),
        )
    }

    /// Probe the ports of `backend` with explicit options.
    pub fn discover_with(
        backend: Arc<dyn SerialBackend>,
        sink: Arc<dyn NmeaSink>,
        options: DiscoveryOptions,
    ) -> Result<Self, DiscoveryError> {
        let runtime = Handle::try_current().map_err(|_| DiscoveryError::NoRuntime)?;

        let ports: Vec<PortInfo> = backend
            .available_ports()?
            .into_iter()
            .filter(|port| {
                let excluded = options.is_excluded(&port.port_name);
                if excluded {
                    debug!("Skipping excluded port {}", port.port_name);
                }
                !excluded
            })
            .collect();

        if ports.is_empty() {
            info!("No serial ports to probe");
        }
        for port in &ports {
            info!("Detected port {}", port.port_name);
        }

        let winner = Arc::new(WinnerSlot::new(ports.len()));
        let ctx = ProbeContext {
            backend,
            sink,
            matcher: options.preamble,
            winner: Arc::clone(&winner),
        };

        let probes = ports
            .into_iter()
            .map(|port| runtime.spawn(run_probe(port, ctx.clone())))
            .collect();

        Ok(Self { winner, probes })
    }

    /// The port the GPS was found on, if any yet.
    pub fn gps_port(&self) -> Option<BoundPort> {
        self.winner.bound()
    }

    /// Watch the session's progress.
    pub fn subscribe(&self) -> watch::Receiver<DiscoveryStatus> {
        self.winner.subscribe()
    }

    /// Resolve once a GPS is found, or with `None` once every probe has given
    /// up without finding one.
    pub async fn wait_for_gps(&self) -> Option<BoundPort> {
        let mut status = self.winner.subscribe();
        let bound = match status
            .wait_for(|s| s.bound.is_some() || s.is_settled())
            .await
        {
            Ok(s) => s.bound.clone(),
            Err(_) => self.winner.bound(),
        };
        bound
    }

    /// Resolve once no probe is still searching.
    pub async fn wait_until_settled(&self) -> Option<BoundPort> {
        let mut status = self.winner.subscribe();
        let _ = status.wait_for(DiscoveryStatus::is_settled).await;
        self.winner.bound()
    }

    /// Release the GPS port, if one was found, and stop any probe from
    /// claiming one later. Safe to call any number of times.
    pub fn close(&self) {
        if !self.winner.close() {
            return;
        }
        match self.winner.bound() {
            Some(port) => info!("Closing GPS port {}", port.port_name),
            None => debug!("Discovery closed before a GPS was found"),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.winner.is_closed()
    }

    /// Close, then wait for every probe to finish.
    ///
    /// Probes in the middle of a listening window finish that window first.
    pub async fn shutdown(mut self) -> Vec<ProbeReport> {
        self.close();

        let probes = std::mem::take(&mut self.probes);
        let mut reports = Vec::with_capacity(probes.len());
        for probe in probes {
            match probe.await {
                Ok(report) => reports.push(report),
                Err(e) => error!("Probe task failed: {}", e),
            }
        }
        reports
    }
}

impl Drop for GpsReader {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for GpsReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpsReader")
            .field("probes", &self.probes.len())
            .field("gps_port", &self.winner.bound())
            .field("closed", &self.winner.is_closed())
            .finish()
    }
}
