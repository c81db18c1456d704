//! Shared-socket registry.
//!
//! Process-scoped mapping from physical URL to an established transport,
//! used to deduplicate connections when sharing is requested. The
//! registry is an explicit injectable store (one per [`SocketHub`]),
//! never a hidden static, so tests can construct and inspect their own.
//!
//! Entries are never removed by consumer teardown: a shared socket
//! outlives any single consumer, and stays available for future
//! subscribers to the same URL. This is a documented trade-off of the
//! sharing model, not a leak of the managers' making; see the crate
//! docs.
//!
//! [`SocketHub`]: crate::hub::SocketHub

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::state::{ReadyState, ReadyStateMap};
use crate::transport::Transport;

// ============================================================================
// SharedSocketRegistry
// ============================================================================

/// Keyed store of shared physical transports.
#[derive(Default)]
pub struct SharedSocketRegistry {
    sockets: Mutex<FxHashMap<String, Arc<dyn Transport>>>,
}

impl SharedSocketRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the transport for a physical URL, creating it on first
    /// acquisition.
    ///
    /// An existing entry is returned unchanged with `false`: no new
    /// connection, no state transition. Otherwise the URL's ready state
    /// is marked [`ReadyState::Connecting`], the factory is invoked, and
    /// the new transport is stored and returned with `true`.
    ///
    /// Check-and-insert happens under one lock, so two concurrent
    /// acquisitions of the same URL construct exactly one transport.
    /// The factory must therefore return promptly (the real factory only
    /// spawns the connect task).
    pub fn acquire(
        &self,
        url: &str,
        ready: &ReadyStateMap,
        factory: impl FnOnce() -> Arc<dyn Transport>,
    ) -> (Arc<dyn Transport>, bool) {
        let mut sockets = self.sockets.lock();

        if let Some(existing) = sockets.get(url) {
            debug!(url = %url, "Joining existing shared socket");
            return (Arc::clone(existing), false);
        }

        ready.set(url, ReadyState::Connecting);
        let transport = factory();
        sockets.insert(url.to_owned(), Arc::clone(&transport));
        debug!(url = %url, "Shared socket created");

        (transport, true)
    }

    /// Replaces the entry for a physical URL with a fresh transport.
    ///
    /// Used only by the manager that originally created the shared
    /// socket, when re-establishing after an unexpected close. Other
    /// sharers pick the replacement up through [`acquire`](Self::acquire).
    pub fn replace(
        &self,
        url: &str,
        ready: &ReadyStateMap,
        factory: impl FnOnce() -> Arc<dyn Transport>,
    ) -> Arc<dyn Transport> {
        let mut sockets = self.sockets.lock();

        ready.set(url, ReadyState::Connecting);
        let transport = factory();
        sockets.insert(url.to_owned(), Arc::clone(&transport));
        debug!(url = %url, "Shared socket replaced");

        transport
    }

    /// Returns `true` if a transport is registered for the URL.
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.sockets.lock().contains_key(url)
    }

    /// Returns the number of registered shared sockets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sockets.lock().len()
    }

    /// Returns `true` if no shared socket is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sockets.lock().is_empty()
    }
}

impl fmt::Debug for SharedSocketRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSocketRegistry")
            .field("sockets", &self.sockets.lock().keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::transport::mock::MockTransport;

    const URL: &str = "wss://example.test/socket";

    fn mock_factory(counter: &Arc<AtomicUsize>) -> impl FnOnce() -> Arc<dyn Transport> + use<> {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            MockTransport::new() as Arc<dyn Transport>
        }
    }

    #[test]
    fn test_first_acquire_creates_and_marks_connecting() {
        let registry = SharedSocketRegistry::new();
        let ready = ReadyStateMap::new();
        let created = Arc::new(AtomicUsize::new(0));

        let (_, was_created) = registry.acquire(URL, &ready, mock_factory(&created));

        assert!(was_created);
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(ready.get(URL), ReadyState::Connecting);
        assert!(registry.contains(URL));
    }

    #[test]
    fn test_second_acquire_returns_existing_unchanged() {
        let registry = SharedSocketRegistry::new();
        let ready = ReadyStateMap::new();
        let created = Arc::new(AtomicUsize::new(0));

        let (first, _) = registry.acquire(URL, &ready, mock_factory(&created));

        // A state transition between acquisitions must survive the join.
        ready.set(URL, ReadyState::Open);
        let (second, was_created) = registry.acquire(URL, &ready, mock_factory(&created));

        assert!(!was_created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(ready.get(URL), ReadyState::Open, "no state transition on join");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_urls_are_independent() {
        let registry = SharedSocketRegistry::new();
        let ready = ReadyStateMap::new();
        let created = Arc::new(AtomicUsize::new(0));

        registry.acquire("wss://a.test", &ready, mock_factory(&created));
        registry.acquire("wss://b.test", &ready, mock_factory(&created));

        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_replace_swaps_entry() {
        let registry = SharedSocketRegistry::new();
        let ready = ReadyStateMap::new();
        let created = Arc::new(AtomicUsize::new(0));

        let (first, _) = registry.acquire(URL, &ready, mock_factory(&created));
        ready.set(URL, ReadyState::Closed);

        let replacement = registry.replace(URL, &ready, mock_factory(&created));

        assert!(!Arc::ptr_eq(&first, &replacement));
        assert_eq!(ready.get(URL), ReadyState::Connecting);
        let (joined, was_created) = registry.acquire(URL, &ready, mock_factory(&created));
        assert!(!was_created);
        assert!(Arc::ptr_eq(&replacement, &joined));
    }

    /// Shared sockets deliberately outlive their consumers: nothing in
    /// the consumer-level teardown path removes registry entries.
    #[test]
    fn test_entries_are_never_removed() {
        let registry = SharedSocketRegistry::new();
        let ready = ReadyStateMap::new();
        let created = Arc::new(AtomicUsize::new(0));

        let (transport, _) = registry.acquire(URL, &ready, mock_factory(&created));
        drop(transport);

        assert!(registry.contains(URL));
        assert_eq!(registry.len(), 1);
    }
}
