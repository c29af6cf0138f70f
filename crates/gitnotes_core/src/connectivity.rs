//! Connectivity tracking.
//!
//! The monitor holds the current online/offline flag and a thread-safe
//! registry of transition subscribers. The reconciliation engine subscribes
//! once at startup but re-checks [`ConnectivityMonitor::is_online`] at every
//! mutating call, since connectivity can change between queuing and
//! executing an operation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// A unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback invoked on every online/offline transition with the new state.
///
/// Callbacks should not block for extended periods.
pub type ConnectivityCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Tracks online/offline state and notifies subscribers on transitions.
pub struct ConnectivityMonitor {
    /// Current connectivity flag.
    online: AtomicBool,
    /// Map of subscription IDs to callbacks.
    callbacks: RwLock<HashMap<SubscriptionId, ConnectivityCallback>>,
    /// Counter for generating unique subscription IDs.
    next_id: AtomicU64,
}

impl ConnectivityMonitor {
    /// Create a monitor that starts online.
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            callbacks: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Current connectivity flag.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Record a connectivity change. Subscribers are only notified when the
    /// flag actually transitions.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return;
        }
        let callbacks = self.callbacks.read().unwrap();
        for callback in callbacks.values() {
            // a panicking subscriber must not break the others
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(online);
            }));
        }
    }

    /// Subscribe to connectivity transitions.
    ///
    /// Returns a subscription ID that can be used to unsubscribe later.
    pub fn subscribe(&self, callback: ConnectivityCallback) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut callbacks = self.callbacks.write().unwrap();
        callbacks.insert(id, callback);
        id
    }

    /// Unsubscribe from connectivity transitions.
    ///
    /// Returns `true` if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.callbacks.write().unwrap();
        callbacks.remove(&id).is_some()
    }

    /// Get the number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let callbacks = self.callbacks.read().unwrap();
        callbacks.len()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let callbacks = self.callbacks.read().unwrap();
        f.debug_struct("ConnectivityMonitor")
            .field("online", &self.is_online())
            .field("subscriber_count", &callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_starts_online() {
        let monitor = ConnectivityMonitor::new();
        assert!(monitor.is_online());
    }

    #[test]
    fn test_notifies_on_transition_only() {
        let monitor = ConnectivityMonitor::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_clone = Arc::clone(&calls);
        monitor.subscribe(Arc::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        monitor.set_online(true); // no transition
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        monitor.set_online(false);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!monitor.is_online());

        monitor.set_online(false); // still no transition
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        monitor.set_online(true);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let monitor = ConnectivityMonitor::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_clone = Arc::clone(&calls);
        let id = monitor.subscribe(Arc::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(monitor.subscriber_count(), 1);

        assert!(monitor.unsubscribe(id));
        assert!(!monitor.unsubscribe(id));
        assert_eq!(monitor.subscriber_count(), 0);

        monitor.set_online(false);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscriber_panic_isolation() {
        let monitor = ConnectivityMonitor::new();
        let calls = Arc::new(AtomicUsize::new(0));

        monitor.subscribe(Arc::new(|_| {
            panic!("bad subscriber");
        }));
        let calls_clone = Arc::clone(&calls);
        monitor.subscribe(Arc::new(move |online| {
            assert!(!online);
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        monitor.set_online(false);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
