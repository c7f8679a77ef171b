//! Mock serial backend for testing.
//!
//! Simulates serial hardware without touching the system. Each
//! [`MockDevice`] stands for something plugged into one port: a GPS
//! receiver talking at a fixed baud rate, a silent port, or a port that
//! refuses to open. Reading a device at the wrong baud rate yields garbled
//! bytes, the same way a real UART misframes a mismatched line.

use super::async_port::AsyncSerialPortAdapter;
use super::backend::{PortInfo, PortKind, SerialBackend};
use super::error::PortError;
use super::traits::PortConfiguration;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Mutable side of a device, shared with whichever port currently has it open.
#[derive(Debug, Default)]
struct DeviceState {
    /// Channel into the open port, if any.
    feed: Option<mpsc::UnboundedSender<Vec<u8>>>,
    /// Baud rate of the current open, if any.
    open_baud: Option<u32>,
    /// Every baud rate the device was opened at, in order.
    opens: Vec<u32>,
    /// How many times an open port was closed.
    closes: usize,
}

/// A simulated piece of hardware behind one serial port.
///
/// # Example
/// ```
/// use gps_port_bridge::port::{MockDevice, MockSerialBackend};
///
/// let backend = MockSerialBackend::new();
/// let gps = backend.add_device(MockDevice::new("COM3").gps(4800, b"$GPGGA,\r\n"));
/// assert!(!gps.is_open());
/// assert!(gps.open_history().is_empty());
/// ```
#[derive(Debug)]
pub struct MockDevice {
    name: String,
    kind: PortKind,
    native_baud: Option<u32>,
    burst: Vec<u8>,
    refuse_open: bool,
    state: Mutex<DeviceState>,
}

impl MockDevice {
    /// A port with nothing attached.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::Unknown,
            native_baud: None,
            burst: Vec::new(),
            refuse_open: false,
            state: Mutex::new(DeviceState::default()),
        }
    }

    /// Attach a device that talks at `baud_rate` and sends `burst` whenever
    /// the port is opened.
    pub fn gps(mut self, baud_rate: u32, burst: &[u8]) -> Self {
        self.native_baud = Some(baud_rate);
        self.burst = burst.to_vec();
        self
    }

    /// Make every open attempt fail, as a busy or forbidden port would.
    pub fn refusing_open(mut self) -> Self {
        self.refuse_open = true;
        self
    }

    /// Set the hardware kind reported by enumeration.
    pub fn with_kind(mut self, kind: PortKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a port currently has this device open.
    pub fn is_open(&self) -> bool {
        self.state.lock().open_baud.is_some()
    }

    /// Baud rate of the current open, if any.
    pub fn open_baud(&self) -> Option<u32> {
        self.state.lock().open_baud
    }

    /// Every baud rate the device was opened at, oldest first.
    pub fn open_history(&self) -> Vec<u32> {
        self.state.lock().opens.clone()
    }

    /// Number of times an open port on this device was closed.
    pub fn close_count(&self) -> usize {
        self.state.lock().closes
    }

    /// Transmit `data` from the device.
    ///
    /// Returns `false` when no port has the device open. A port opened at the
    /// wrong baud rate receives the bytes garbled.
    pub fn inject(&self, data: &[u8]) -> bool {
        let state = self.state.lock();
        let (Some(feed), Some(baud)) = (state.feed.as_ref(), state.open_baud) else {
            return false;
        };
        let chunk = if Some(baud) == self.native_baud {
            data.to_vec()
        } else {
            garble(data)
        };
        feed.send(chunk).is_ok()
    }

    /// Simulate the cable being pulled: the open port sees end of stream.
    pub fn unplug(&self) {
        self.state.lock().feed = None;
    }

    fn info(&self) -> PortInfo {
        PortInfo::new(self.name.clone(), self.kind.clone())
    }

    fn attach(
        device: &Arc<Self>,
        config: &PortConfiguration,
    ) -> Result<MockSerialPort, PortError> {
        let this = device.as_ref();
        if this.refuse_open {
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("{}: permission denied", this.name),
            )));
        }

        let mut state = this.state.lock();
        if state.open_baud.is_some() {
            return Err(PortError::Io(std::io::Error::other(format!(
                "{}: device busy",
                this.name
            ))));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        if !this.burst.is_empty() {
            let burst = if Some(config.baud_rate) == this.native_baud {
                this.burst.clone()
            } else {
                garble(&this.burst)
            };
            // The receiver is alive; it is returned below.
            let _ = tx.send(burst);
        }

        state.feed = Some(tx);
        state.open_baud = Some(config.baud_rate);
        state.opens.push(config.baud_rate);

        Ok(MockSerialPort {
            device: Arc::clone(device),
            config: config.clone(),
            rx,
            pending: Vec::new(),
        })
    }

    fn detach(&self) {
        let mut state = self.state.lock();
        state.feed = None;
        state.open_baud = None;
        state.closes += 1;
    }
}

/// Misframed rendition of `data`. The high bit is forced on, so no ASCII
/// byte (and in particular no `$`) survives.
fn garble(data: &[u8]) -> Vec<u8> {
    data.iter().map(|b| b.rotate_left(3) | 0x80).collect()
}

/// An in-memory [`SerialBackend`] holding a fixed set of devices.
#[derive(Debug, Default)]
pub struct MockSerialBackend {
    devices: Mutex<Vec<Arc<MockDevice>>>,
    enumeration_error: Mutex<Option<String>>,
}

impl MockSerialBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plug `device` in. Enumeration lists devices in insertion order.
    pub fn add_device(&self, device: MockDevice) -> Arc<MockDevice> {
        let device = Arc::new(device);
        self.devices.lock().push(Arc::clone(&device));
        device
    }

    /// Look a device up by port name.
    pub fn device(&self, port_name: &str) -> Option<Arc<MockDevice>> {
        self.devices
            .lock()
            .iter()
            .find(|d| d.name == port_name)
            .cloned()
    }

    /// Make `available_ports` fail with `message`.
    pub fn fail_enumeration(&self, message: impl Into<String>) {
        *self.enumeration_error.lock() = Some(message.into());
    }
}

impl SerialBackend for MockSerialBackend {
    fn available_ports(&self) -> Result<Vec<PortInfo>, PortError> {
        if let Some(message) = self.enumeration_error.lock().as_ref() {
            return Err(PortError::enumeration(message.clone()));
        }
        Ok(self.devices.lock().iter().map(|d| d.info()).collect())
    }

    fn open(
        &self,
        port_name: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn AsyncSerialPortAdapter>, PortError> {
        let device = self
            .device(port_name)
            .ok_or_else(|| PortError::not_found(port_name))?;
        Ok(Box::new(MockDevice::attach(&device, config)?))
    }
}

/// An open handle on a [`MockDevice`]. Dropping it closes the port.
pub struct MockSerialPort {
    device: Arc<MockDevice>,
    config: PortConfiguration,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    /// Remainder of a chunk that did not fit the caller's buffer.
    pending: Vec<u8>,
}

#[async_trait]
impl AsyncSerialPortAdapter for MockSerialPort {
    async fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        if self.pending.is_empty() {
            match self.rx.recv().await {
                Some(chunk) => self.pending = chunk,
                None => return Ok(0),
            }
        }

        let n = self.pending.len().min(buffer.len());
        buffer[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    fn name(&self) -> &str {
        &self.device.name
    }

    fn config(&self) -> &PortConfiguration {
        &self.config
    }
}

impl Drop for MockSerialPort {
    fn drop(&mut self) {
        self.device.detach();
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.device.name)
            .field("baud_rate", &self.config.baud_rate)
            .field("pending", &self.pending.len())
            .finish()
    }
}
