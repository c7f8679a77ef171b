//! Port abstraction layer for serial communication.
//!
//! Everything discovery needs from the operating system goes through
//! [`SerialBackend`], with a real implementation over `serialport` /
//! `tokio-serial` and a scripted mock for tests.

pub mod async_port;
pub mod backend;
pub mod error;
pub mod mock;
pub mod traits;

pub use async_port::{AsyncSerialPortAdapter, TokioSerialPort};
pub use backend::{PortInfo, PortKind, SerialBackend, SystemBackend};
pub use error::PortError;
pub use mock::{MockDevice, MockSerialBackend, MockSerialPort};
pub use traits::*;
