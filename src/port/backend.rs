//! The operating system boundary: listing serial ports and opening them.
//!
//! Discovery only talks to a [`SerialBackend`], so the whole probe loop can
//! run against [`MockSerialBackend`](super::MockSerialBackend) in tests.

use super::async_port::{AsyncSerialPortAdapter, TokioSerialPort};
use super::error::PortError;
use super::traits::PortConfiguration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A serial port as reported by the operating system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// System name, e.g. `/dev/ttyUSB0` or `COM3`.
    pub port_name: String,
    pub kind: PortKind,
}

impl PortInfo {
    pub fn new(port_name: impl Into<String>, kind: PortKind) -> Self {
        Self {
            port_name: port_name.into(),
            kind,
        }
    }
}

/// What kind of hardware sits behind a port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PortKind {
    Usb {
        vid: u16,
        pid: u16,
        manufacturer: Option<String>,
        product: Option<String>,
        serial_number: Option<String>,
    },
    Bluetooth,
    Pci,
    Unknown,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortKind::Usb {
                vid,
                pid,
                manufacturer,
                product,
                ..
            } => {
                write!(f, "USB {:04x}:{:04x}", vid, pid)?;
                if let Some(manufacturer) = manufacturer {
                    write!(f, " {}", manufacturer)?;
                }
                if let Some(product) = product {
                    write!(f, " {}", product)?;
                }
                Ok(())
            }
            PortKind::Bluetooth => write!(f, "Bluetooth"),
            PortKind::Pci => write!(f, "PCI"),
            PortKind::Unknown => write!(f, "Unknown"),
        }
    }
}

impl From<serialport::SerialPortInfo> for PortInfo {
    fn from(info: serialport::SerialPortInfo) -> Self {
        let kind = match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => PortKind::Usb {
                vid: usb.vid,
                pid: usb.pid,
                manufacturer: usb.manufacturer,
                product: usb.product,
                serial_number: usb.serial_number,
            },
            serialport::SerialPortType::BluetoothPort => PortKind::Bluetooth,
            serialport::SerialPortType::PciPort => PortKind::Pci,
            serialport::SerialPortType::Unknown => PortKind::Unknown,
        };
        Self {
            port_name: info.port_name,
            kind,
        }
    }
}

/// Enumerates and opens serial ports.
pub trait SerialBackend: Send + Sync + 'static {
    /// List the ports currently visible to the system.
    fn available_ports(&self) -> Result<Vec<PortInfo>, PortError>;

    /// Open `port_name` with the given line parameters.
    ///
    /// The port stays open until the returned value is dropped.
    fn open(
        &self,
        port_name: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn AsyncSerialPortAdapter>, PortError>;
}

/// Real hardware, via `serialport` enumeration and `tokio-serial` streams.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBackend;

impl SerialBackend for SystemBackend {
    fn available_ports(&self) -> Result<Vec<PortInfo>, PortError> {
        serialport::available_ports()
            .map(|ports| ports.into_iter().map(PortInfo::from).collect())
            .map_err(|e| PortError::enumeration(e.to_string()))
    }

    fn open(
        &self,
        port_name: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn AsyncSerialPortAdapter>, PortError> {
        let port = TokioSerialPort::open(port_name, config)?;
        Ok(Box::new(port))
    }
}
