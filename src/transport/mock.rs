//! Scripted transport for state-machine tests.
//!
//! Records best-effort sends and close calls, and lets a test drive the
//! lifecycle by emitting events directly. No I/O involved.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio_tungstenite::tungstenite::Message;

use super::{CloseEvent, EventSender, ListenerId, ListenerSet, Transport, TransportEvent};

// ============================================================================
// MockTransport
// ============================================================================

/// In-memory [`Transport`] driven by the test.
pub(crate) struct MockTransport {
    listeners: ListenerSet,
    sent: Mutex<Vec<Message>>,
    closed: AtomicBool,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            listeners: ListenerSet::new(),
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Emits `Open` to all attached listeners.
    pub(crate) fn emit_open(&self) {
        self.listeners.broadcast(&TransportEvent::Open);
    }

    /// Emits a data frame to all attached listeners.
    pub(crate) fn emit_message(&self, frame: Message) {
        self.listeners.broadcast(&TransportEvent::Message(frame));
    }

    /// Emits `Close` to all attached listeners.
    pub(crate) fn emit_close(&self, event: Option<CloseEvent>) {
        self.listeners.broadcast(&TransportEvent::Close(event));
    }

    /// Emits `Error` to all attached listeners.
    pub(crate) fn emit_error(&self, message: &str) {
        self.listeners
            .broadcast(&TransportEvent::Error(message.to_owned()));
    }

    /// Frames passed to [`Transport::send`] so far.
    pub(crate) fn sent(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }

    /// Whether [`Transport::close`] was called.
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of currently attached listeners.
    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Transport for MockTransport {
    fn send(&self, frame: Message) {
        self.sent.lock().push(frame);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.listeners.broadcast(&TransportEvent::Close(None));
    }

    fn attach(&self, listener: EventSender) -> ListenerId {
        self.listeners.attach(listener)
    }

    fn detach(&self, listener: ListenerId) {
        self.listeners.detach(listener);
    }
}
