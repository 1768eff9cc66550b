//! Network connectivity monitoring

use tokio::sync::watch;

/// Reports current connectivity and emits connectivity transitions
pub trait NetworkMonitor: Send + Sync {
    /// Whether the network is currently reachable
    fn is_available(&self) -> bool;

    /// Subscribe to connectivity transitions
    fn observe(&self) -> watch::Receiver<bool>;
}

/// Watch-channel backed `NetworkMonitor`
///
/// Platform integration code feeds transitions in via `set_available`; the
/// sync engine and cache policy read the latest value.
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Create a monitor with the given initial state
    #[must_use]
    pub fn new(available: bool) -> Self {
        let (tx, _) = watch::channel(available);
        Self { tx }
    }

    /// Record a connectivity transition
    pub fn set_available(&self, available: bool) {
        if self.tx.send_if_modified(|current| {
            let changed = *current != available;
            *current = available;
            changed
        }) {
            tracing::debug!(available, "Connectivity changed");
        }
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

impl NetworkMonitor for ConnectivityMonitor {
    fn is_available(&self) -> bool {
        *self.tx.borrow()
    }

    fn observe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_current_state() {
        let monitor = ConnectivityMonitor::new(true);
        assert!(monitor.is_available());

        monitor.set_available(false);
        assert!(!monitor.is_available());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_observe_sees_transitions() {
        let monitor = ConnectivityMonitor::new(false);
        let mut rx = monitor.observe();

        monitor.set_available(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[test]
    fn test_unchanged_state_is_not_a_transition() {
        let monitor = ConnectivityMonitor::new(true);
        let rx = monitor.observe();

        monitor.set_available(true);
        assert!(!rx.has_changed().unwrap());
    }
}
