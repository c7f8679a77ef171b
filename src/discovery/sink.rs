//! Where the winning port's bytes go.

use tokio::sync::mpsc;

/// Push-style consumer of raw NMEA bytes.
///
/// Chunks arrive exactly as read from the port, in order, with no framing:
/// a sentence can be split across calls. Called from the bridge task, so
/// implementations must not block for long.
pub trait NmeaSink: Send + Sync + 'static {
    fn push_data(&self, data: &[u8]);
}

impl<F> NmeaSink for F
where
    F: Fn(&[u8]) + Send + Sync + 'static,
{
    fn push_data(&self, data: &[u8]) {
        self(data)
    }
}

/// Forwards each chunk into a channel. A closed receiver drops the data.
impl NmeaSink for mpsc::UnboundedSender<Vec<u8>> {
    fn push_data(&self, data: &[u8]) {
        let _ = self.send(data.to_vec());
    }
}
