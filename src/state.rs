//! Connection ready-state tracking.
//!
//! One [`ReadyStateMap`] is shared by every shared subscription created
//! from the same hub, while each exclusive subscription gets a private
//! map. It maps a physical URL to the most recent lifecycle phase
//! observed for that URL's socket, so all consumers sharing a socket see
//! the same state at the same time.
//!
//! Readers never mutate the map; only the connection managers driving a
//! URL's lifecycle events write to it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

// ============================================================================
// ReadyState
// ============================================================================

/// Lifecycle phase of a physical connection.
///
/// Discriminants match the browser `WebSocket.readyState` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadyState {
    /// Socket is being established (or has never connected).
    Connecting = 0,
    /// Socket is open and usable.
    Open = 1,
    /// Deliberate teardown has started.
    Closing = 2,
    /// Socket is closed.
    Closed = 3,
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// ReadyStateMap
// ============================================================================

/// Process-scoped map from physical URL to [`ReadyState`].
///
/// Cheap to clone; all clones observe the same underlying map. A URL that
/// was never connected is reported as [`ReadyState::Connecting`].
#[derive(Clone, Default)]
pub struct ReadyStateMap {
    inner: Arc<RwLock<FxHashMap<String, ReadyState>>>,
}

impl ReadyStateMap {
    /// Creates an empty map.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ready state for a physical URL.
    ///
    /// Absent URLs default to [`ReadyState::Connecting`] ("never
    /// connected").
    #[inline]
    #[must_use]
    pub fn get(&self, url: &str) -> ReadyState {
        self.inner
            .read()
            .get(url)
            .copied()
            .unwrap_or(ReadyState::Connecting)
    }

    /// Records a lifecycle transition for a physical URL.
    ///
    /// Called only from lifecycle event handling in the connection
    /// manager.
    pub fn set(&self, url: &str, state: ReadyState) {
        let mut map = self.inner.write();
        map.insert(url.to_owned(), state);
    }

    /// Returns the number of tracked URLs.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns `true` if no URL has been tracked yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl fmt::Debug for ReadyStateMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.read().iter()).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
