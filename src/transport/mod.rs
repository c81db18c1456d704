//! Physical transport layer.
//!
//! A [`Transport`] is one real bidirectional message socket. Connection
//! establishment is implicit on construction; afterwards the transport
//! exposes best-effort `send`, `close`, and lifecycle event fan-out to
//! any number of attached listeners.
//!
//! ```text
//! ┌──────────────┐  attach/detach   ┌───────────────┐
//! │  Manager A   │◄────────────────►│               │
//! ├──────────────┤     events       │  Transport    │◄──── server
//! │  Manager B   │◄────────────────►│  (one socket) │
//! └──────────────┘                  └───────────────┘
//! ```
//!
//! Events are delivered to every attached listener in the order the
//! transport emits them; no reordering or batching. Attaching to an
//! already-open transport does not replay past events; joiners read the
//! current phase from the shared ready-state map instead.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | tokio-tungstenite client implementation |
//! | `mock` | scripted transport for state-machine tests (test builds) |

// ============================================================================
// Submodules
// ============================================================================

/// tokio-tungstenite client transport.
pub mod websocket;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// Re-exports
// ============================================================================

pub use websocket::WsTransport;

// ============================================================================
// Types
// ============================================================================

/// Channel end a listener receives [`TransportEvent`]s on.
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// Creates a transport for a physical URL.
///
/// Injected into the hub so tests can substitute a scripted transport
/// for the real WebSocket client.
pub type TransportFactory = Arc<dyn Fn(&str) -> Arc<dyn Transport> + Send + Sync>;

// ============================================================================
// CloseEvent
// ============================================================================

/// Close information from the remote end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// Close status code.
    pub code: u16,
    /// Close reason text, possibly empty.
    pub reason: String,
}

impl CloseEvent {
    /// Creates a close event.
    #[inline]
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

// ============================================================================
// TransportEvent
// ============================================================================

/// Lifecycle event emitted by a physical transport.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Connection established.
    Open,
    /// Inbound data frame (text or binary).
    Message(Message),
    /// Connection ended; the close frame is absent when the transport
    /// terminated without one (connect failure, abrupt error).
    Close(Option<CloseEvent>),
    /// Transport-level error. May or may not be followed by a close.
    Error(String),
}

// ============================================================================
// ListenerId
// ============================================================================

/// Handle identifying one attached listener on a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Creates a listener id from its raw value.
    #[inline]
    #[must_use]
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }
}

// ============================================================================
// ListenerSet
// ============================================================================

/// Keyed set of attached listeners with ordered fan-out.
///
/// Shared plumbing for [`Transport`] implementations: ids are allocated
/// from a per-transport counter, and `broadcast` delivers one event to
/// every live listener, pruning those whose receiving end is gone.
pub struct ListenerSet {
    listeners: Mutex<FxHashMap<ListenerId, EventSender>>,
    next_id: AtomicU64,
}

impl ListenerSet {
    /// Creates an empty listener set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(FxHashMap::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Adds a listener and returns its id.
    pub fn attach(&self, listener: EventSender) -> ListenerId {
        let id = ListenerId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().insert(id, listener);
        id
    }

    /// Removes a listener. Unknown ids are ignored.
    pub fn detach(&self, id: ListenerId) {
        self.listeners.lock().remove(&id);
    }

    /// Delivers an event to every attached listener.
    ///
    /// Each listener has its own FIFO channel, so every listener sees
    /// events in emission order. Listeners whose receiving end has been
    /// dropped are pruned.
    pub fn broadcast(&self, event: &TransportEvent) {
        let mut listeners = self.listeners.lock();
        listeners.retain(|_, tx| tx.send(event.clone()).is_ok());
    }

    /// Returns the number of attached listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Returns `true` when no listener is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }
}

impl Default for ListenerSet {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// One physical message socket.
///
/// Implementations must deliver events to all attached listeners in
/// emission order and tolerate `send`/`close` in any lifecycle phase.
pub trait Transport: Send + Sync {
    /// Sends a frame, best-effort.
    ///
    /// Silently dropped when the socket is not open.
    fn send(&self, frame: Message);

    /// Closes the socket.
    ///
    /// Safe to call at any time, including before the connection is
    /// established and after it already closed. Teardown finishes with
    /// a `Close` event to the attached listeners; callers wait for that
    /// event rather than polling.
    fn close(&self);

    /// Attaches a listener for subsequent lifecycle events.
    fn attach(&self, listener: EventSender) -> ListenerId;

    /// Detaches a previously attached listener.
    ///
    /// Unknown ids are ignored.
    fn detach(&self, listener: ListenerId);
}
