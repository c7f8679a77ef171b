//! The per-port probe.
//!
//! A probe opens its port at each of [`GPS_BAUD_RATES`] in turn, listens for
//! [`SETTLE_WINDOW`], and looks for an NMEA preamble in what arrived. The
//! first probe to see one and claim the [`WinnerSlot`] keeps its port open
//! and becomes the bridge to the sink. Everyone else closes up.

use super::preamble::PreambleMatcher;
use super::sink::NmeaSink;
use super::winner::{BoundPort, WinnerSlot};
use super::{GPS_BAUD_RATES, SETTLE_WINDOW};
use crate::port::{AsyncSerialPortAdapter, PortConfiguration, PortInfo, SerialBackend};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

const READ_CHUNK: usize = 1024;

/// How a probe ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// This port was the GPS; it bridged until closed or disconnected.
    Bound { baud_rate: u32 },
    /// Every baud rate was tried without seeing NMEA.
    NotFound,
    /// Another port won (or the session was closed) first.
    StoodDown,
}

/// What one probe did, returned by [`GpsReader::shutdown`](super::GpsReader::shutdown).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub port_name: String,
    /// Baud rates an open was attempted at, in order.
    pub attempted: Vec<u32>,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
}

/// Everything a probe shares with its siblings.
#[derive(Clone)]
pub(crate) struct ProbeContext {
    pub(crate) backend: Arc<dyn SerialBackend>,
    pub(crate) sink: Arc<dyn NmeaSink>,
    pub(crate) matcher: PreambleMatcher,
    pub(crate) winner: Arc<WinnerSlot>,
}

/// Per-port scratch state, owned by the probe task.
#[derive(Debug, Default)]
pub(crate) struct ProbeState {
    /// Index into [`GPS_BAUD_RATES`].
    baud_index: usize,
    /// Bytes received during the current window.
    buffer: Vec<u8>,
    /// Once set, bytes go straight to the sink instead of the buffer.
    confirmed: bool,
}

impl ProbeState {
    fn baud_rate(&self) -> u32 {
        GPS_BAUD_RATES[self.baud_index]
    }

    fn ingest(&mut self, chunk: &[u8], sink: &dyn NmeaSink) {
        if self.confirmed {
            sink.push_data(chunk);
        } else {
            self.buffer.extend_from_slice(chunk);
        }
    }

    fn confirm(&mut self) {
        self.confirmed = true;
        self.buffer.clear();
    }
}

/// Marks the probe as no longer searching when dropped, however it exits.
struct SearchGuard(Arc<WinnerSlot>);

impl Drop for SearchGuard {
    fn drop(&mut self) {
        self.0.finish_search();
    }
}

pub(crate) async fn run_probe(port: PortInfo, ctx: ProbeContext) -> ProbeReport {
    let port_name = port.port_name;
    let search = SearchGuard(Arc::clone(&ctx.winner));
    let mut state = ProbeState::default();
    let mut attempted = Vec::with_capacity(GPS_BAUD_RATES.len());

    info!("Checking {} ({})", port_name, port.kind);

    for baud_index in 0..GPS_BAUD_RATES.len() {
        if ctx.winner.is_decided() {
            debug!(
                "{}: GPS already located elsewhere, stopping after {:?}",
                port_name, attempted
            );
            return ProbeReport {
                port_name,
                attempted,
                outcome: ProbeOutcome::StoodDown,
            };
        }

        state.baud_index = baud_index;
        let baud_rate = state.baud_rate();
        attempted.push(baud_rate);
        debug!("Trying {} at {} baud", port_name, baud_rate);

        let mut serial = match ctx
            .backend
            .open(&port_name, &PortConfiguration::nmea(baud_rate))
        {
            Ok(serial) => serial,
            Err(e) => {
                warn!("Failed to open {} at {} baud: {}", port_name, baud_rate, e);
                continue;
            }
        };

        listen(serial.as_mut(), &mut state, ctx.sink.as_ref()).await;

        if ctx.matcher.matches(&state.buffer) {
            state.confirm();
            let claim = ctx.winner.try_claim(BoundPort {
                port_name: port_name.clone(),
                baud_rate,
            });

            let Some(stop) = claim else {
                info!(
                    "{} talks NMEA at {} baud, but another port was recorded first",
                    port_name, baud_rate
                );
                return ProbeReport {
                    port_name,
                    attempted,
                    outcome: ProbeOutcome::StoodDown,
                };
            };

            info!("GPS found on {} at {} baud", port_name, baud_rate);
            drop(search);
            bridge(serial, &mut state, ctx.sink.as_ref(), stop).await;
            return ProbeReport {
                port_name,
                attempted,
                outcome: ProbeOutcome::Bound { baud_rate },
            };
        }

        debug!(
            "No NMEA preamble on {} at {} baud ({} bytes seen)",
            port_name,
            baud_rate,
            state.buffer.len()
        );
        drop(serial);
        state.buffer.clear();
    }

    debug!("{}: no GPS at any baud rate", port_name);
    ProbeReport {
        port_name,
        attempted,
        outcome: ProbeOutcome::NotFound,
    }
}

/// Collect whatever the port sends for [`SETTLE_WINDOW`].
///
/// Always takes the full window, even if the stream ends or errors early, so
/// every baud rate gets the same amount of wall time.
async fn listen(
    port: &mut dyn AsyncSerialPortAdapter,
    state: &mut ProbeState,
    sink: &dyn NmeaSink,
) {
    let deadline = Instant::now() + SETTLE_WINDOW;
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let read = time::timeout_at(deadline, port.read_bytes(&mut chunk)).await;
        match read {
            Err(_elapsed) => break,
            Ok(Ok(0)) => {
                debug!("{} ended its stream while listening", port.name());
                time::sleep_until(deadline).await;
                break;
            }
            Ok(Ok(n)) => state.ingest(&chunk[..n], sink),
            Ok(Err(e)) => {
                debug!("Read from {} failed while listening: {}", port.name(), e);
                time::sleep_until(deadline).await;
                break;
            }
        }
    }
}

/// Forward everything the winning port sends until `close()` or the device
/// goes away. The port is closed on return.
async fn bridge(
    mut port: Box<dyn AsyncSerialPortAdapter>,
    state: &mut ProbeState,
    sink: &dyn NmeaSink,
    mut stop: watch::Receiver<bool>,
) {
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let read = tokio::select! {
            _ = stop.wait_for(|closed| *closed) => break,
            read = port.read_bytes(&mut chunk) => read,
        };
        match read {
            Ok(0) => {
                warn!("{} stopped sending data", port.name());
                break;
            }
            Ok(n) => state.ingest(&chunk[..n], sink),
            Err(e) => {
                warn!("Read from {} failed: {}", port.name(), e);
                break;
            }
        }
    }

    info!("Closing {}", port.name());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{MockDevice, MockSerialBackend};
    use tokio::sync::mpsc;

    fn context(
        backend: Arc<MockSerialBackend>,
        sink: Arc<dyn NmeaSink>,
        probes: usize,
    ) -> ProbeContext {
        ProbeContext {
            backend,
            sink,
            matcher: PreambleMatcher::Gps,
            winner: Arc::new(WinnerSlot::new(probes)),
        }
    }

    fn info(backend: &MockSerialBackend, name: &str) -> PortInfo {
        backend
            .available_ports()
            .unwrap()
            .into_iter()
            .find(|p| p.port_name == name)
            .unwrap()
    }

    #[test]
    fn test_state_buffers_until_confirmed() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let mut state = ProbeState::default();

        state.ingest(b"junk$GP", &tx);
        state.ingest(b"GGA,", &tx);
        assert_eq!(state.buffer, b"junk$GPGGA,");
        assert!(rx.try_recv().is_err());

        state.confirm();
        assert!(state.buffer.is_empty());
        state.ingest(b"$GPRMC,", &tx);
        assert!(state.buffer.is_empty());
        assert_eq!(rx.try_recv().unwrap(), b"$GPRMC,".to_vec());
    }

    #[test]
    fn test_state_baud_rate_follows_index() {
        let mut state = ProbeState::default();
        assert_eq!(state.baud_rate(), 4800);
        state.baud_index = 3;
        assert_eq!(state.baud_rate(), 1200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_port_exhausts_every_rate() {
        let backend = Arc::new(MockSerialBackend::new());
        let device = backend.add_device(MockDevice::new("COM1"));
        let (tx, _rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let ctx = context(Arc::clone(&backend), Arc::new(tx), 1);

        let started = Instant::now();
        let report = run_probe(info(&backend, "COM1"), ctx.clone()).await;

        assert_eq!(report.outcome, ProbeOutcome::NotFound);
        assert_eq!(report.attempted, GPS_BAUD_RATES.to_vec());
        assert_eq!(device.open_history(), GPS_BAUD_RATES.to_vec());
        assert!(!device.is_open());
        assert_eq!(started.elapsed(), SETTLE_WINDOW * 5);
        assert!(ctx.winner.bound().is_none());
        assert!(ctx.winner.subscribe().borrow().is_settled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_failures_are_skipped() {
        let backend = Arc::new(MockSerialBackend::new());
        let device = backend.add_device(MockDevice::new("COM1").refusing_open());
        let (tx, _rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let ctx = context(Arc::clone(&backend), Arc::new(tx), 1);

        let report = run_probe(info(&backend, "COM1"), ctx).await;
        assert_eq!(report.outcome, ProbeOutcome::NotFound);
        assert_eq!(report.attempted, GPS_BAUD_RATES.to_vec());
        assert!(device.open_history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_decided_slot_stops_probe_before_opening() {
        let backend = Arc::new(MockSerialBackend::new());
        let device = backend.add_device(MockDevice::new("COM1").gps(4800, b"$GPGGA,\r\n"));
        let (tx, _rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let ctx = context(Arc::clone(&backend), Arc::new(tx), 1);
        ctx.winner.close();

        let report = run_probe(info(&backend, "COM1"), ctx).await;
        assert_eq!(report.outcome, ProbeOutcome::StoodDown);
        assert!(report.attempted.is_empty());
        assert!(device.open_history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gps_at_second_rate_is_bound() {
        let backend = Arc::new(MockSerialBackend::new());
        let device = backend.add_device(MockDevice::new("COM1").gps(9600, b"$GPGSV,3,1\r\n"));
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let ctx = context(Arc::clone(&backend), Arc::new(tx), 1);

        let probe = tokio::spawn(run_probe(info(&backend, "COM1"), ctx.clone()));

        let mut status = ctx.winner.subscribe();
        status.wait_for(|s| s.bound.is_some()).await.unwrap();
        assert_eq!(device.open_baud(), Some(9600));
        assert!(device.inject(b"$GPRMC,1\r\n"));
        assert_eq!(rx.recv().await.unwrap(), b"$GPRMC,1\r\n".to_vec());

        ctx.winner.close();
        let report = probe.await.unwrap();
        assert_eq!(report.outcome, ProbeOutcome::Bound { baud_rate: 9600 });
        assert_eq!(report.attempted, vec![4800, 9600]);
        assert!(!device.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bridge_ends_when_device_unplugged() {
        let backend = Arc::new(MockSerialBackend::new());
        let device = backend.add_device(MockDevice::new("COM1").gps(4800, b"$GPGGA,\r\n"));
        let (tx, _rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let ctx = context(Arc::clone(&backend), Arc::new(tx), 1);

        let probe = tokio::spawn(run_probe(info(&backend, "COM1"), ctx.clone()));
        ctx.winner
            .subscribe()
            .wait_for(|s| s.bound.is_some())
            .await
            .unwrap();

        device.unplug();
        let report = probe.await.unwrap();
        assert_eq!(report.outcome, ProbeOutcome::Bound { baud_rate: 4800 });
        assert!(!device.is_open());
    }
}
