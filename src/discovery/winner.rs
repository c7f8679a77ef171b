//! The single "which port is the GPS" slot shared by every probe.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// The port a GPS was found on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundPort {
    pub port_name: String,
    pub baud_rate: u32,
}

/// Snapshot of a discovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryStatus {
    /// Probes still cycling through baud rates.
    pub searching: usize,
    /// The winner, once one has been recorded.
    pub bound: Option<BoundPort>,
}

impl DiscoveryStatus {
    /// Nothing more can change the outcome.
    pub fn is_settled(&self) -> bool {
        self.searching == 0
    }
}

struct Binding {
    port: BoundPort,
    stop: watch::Sender<bool>,
}

/// Set-once winner cell.
///
/// The first successful [`try_claim`](Self::try_claim) wins; every later
/// claim fails, as does any claim after [`close`](Self::close).
pub(crate) struct WinnerSlot {
    binding: Mutex<Option<Binding>>,
    closed: AtomicBool,
    status: watch::Sender<DiscoveryStatus>,
}

impl WinnerSlot {
    pub(crate) fn new(searching: usize) -> Self {
        let (status, _) = watch::channel(DiscoveryStatus {
            searching,
            bound: None,
        });
        Self {
            binding: Mutex::new(None),
            closed: AtomicBool::new(false),
            status,
        }
    }

    /// True once a winner is recorded or the session is closed; probes check
    /// this before every new open.
    pub(crate) fn is_decided(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.binding.lock().is_some()
    }

    /// Record `port` as the winner.
    ///
    /// On success returns the receiver the bridge watches for `close()`.
    pub(crate) fn try_claim(&self, port: BoundPort) -> Option<watch::Receiver<bool>> {
        let mut binding = self.binding.lock();
        if binding.is_some() || self.closed.load(Ordering::Acquire) {
            return None;
        }

        let (stop, stop_rx) = watch::channel(false);
        self.status
            .send_modify(|status| status.bound = Some(port.clone()));
        *binding = Some(Binding { port, stop });
        Some(stop_rx)
    }

    pub(crate) fn bound(&self) -> Option<BoundPort> {
        self.binding.lock().as_ref().map(|b| b.port.clone())
    }

    /// Stop the bridge, if any, and refuse further claims.
    ///
    /// Returns whether this call did the closing.
    pub(crate) fn close(&self) -> bool {
        let binding = self.binding.lock();
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(binding) = binding.as_ref() {
            binding.stop.send_replace(true);
        }
        true
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// A probe has stopped searching.
    pub(crate) fn finish_search(&self) {
        self.status
            .send_modify(|status| status.searching = status.searching.saturating_sub(1));
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<DiscoveryStatus> {
        self.status.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn port(name: &str, baud_rate: u32) -> BoundPort {
        BoundPort {
            port_name: name.to_string(),
            baud_rate,
        }
    }

    #[test]
    fn test_first_claim_wins() {
        let slot = WinnerSlot::new(2);
        assert!(!slot.is_decided());

        assert!(slot.try_claim(port("COM1", 4800)).is_some());
        assert!(slot.try_claim(port("COM2", 9600)).is_none());
        assert!(slot.is_decided());
        assert_eq!(slot.bound(), Some(port("COM1", 4800)));
        assert_eq!(slot.subscribe().borrow().bound, Some(port("COM1", 4800)));
    }

    #[test]
    fn test_concurrent_claims_have_one_winner() {
        for _ in 0..50 {
            let slot = Arc::new(WinnerSlot::new(8));
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let slot = Arc::clone(&slot);
                    std::thread::spawn(move || {
                        slot.try_claim(port(&format!("COM{}", i), 4800)).is_some()
                    })
                })
                .collect();

            let winners = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count();
            assert_eq!(winners, 1);
        }
    }

    #[test]
    fn test_close_without_winner_is_noop() {
        let slot = WinnerSlot::new(1);
        assert!(slot.close());
        assert!(!slot.close());
        assert!(slot.bound().is_none());
        assert!(slot.try_claim(port("COM1", 4800)).is_none());
    }

    #[test]
    fn test_close_signals_bridge() {
        let slot = WinnerSlot::new(1);
        let stop = slot.try_claim(port("COM1", 4800)).unwrap();
        assert!(!*stop.borrow());

        slot.close();
        assert!(*stop.borrow());
        assert!(slot.is_closed());
        // The record of where the GPS was survives closing.
        assert_eq!(slot.bound(), Some(port("COM1", 4800)));
    }

    #[test]
    fn test_finish_search_settles() {
        let slot = WinnerSlot::new(2);
        let status = slot.subscribe();
        slot.finish_search();
        assert!(!status.borrow().is_settled());
        slot.finish_search();
        slot.finish_search();
        assert!(status.borrow().is_settled());
        assert_eq!(status.borrow().searching, 0);
    }
}
