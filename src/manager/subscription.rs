//! Consumer-facing subscription handle.
//!
//! A [`Subscription`] is one consumer's view of a logical connection. It
//! talks to its connection manager task over a command channel; the
//! manager owns the physical transport and the reconnection state
//! machine.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::envelope::Envelope;
use crate::state::{ReadyState, ReadyStateMap};

use super::core::Command;

// ============================================================================
// SocketMessage
// ============================================================================

/// A message as delivered to a consumer.
///
/// Raw transport frames are passed through unless envelope framing is
/// enabled for the subscription, in which case each frame is decoded
/// first (malformed frames become the sentinel envelope).
#[derive(Debug, Clone)]
pub enum SocketMessage {
    /// Raw transport frame.
    Frame(Message),
    /// Decoded envelope.
    Envelope(Envelope),
}

impl SocketMessage {
    /// Returns the raw frame, if this is one.
    #[inline]
    #[must_use]
    pub fn as_frame(&self) -> Option<&Message> {
        match self {
            Self::Frame(frame) => Some(frame),
            Self::Envelope(_) => None,
        }
    }

    /// Returns the decoded envelope, if this is one.
    #[inline]
    #[must_use]
    pub fn as_envelope(&self) -> Option<&Envelope> {
        match self {
            Self::Envelope(envelope) => Some(envelope),
            Self::Frame(_) => None,
        }
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// One consumer's logical connection.
///
/// Obtained from [`SocketHub::subscribe`]. Dropping the handle behaves
/// like [`unsubscribe`](Self::unsubscribe): the manager observes the
/// command channel closing and tears down (including cancelling a
/// pending reconnect).
///
/// [`SocketHub::subscribe`]: crate::hub::SocketHub::subscribe
pub struct Subscription {
    /// Fully-resolved physical URL this subscription is keyed by.
    url: String,
    /// Channel to the connection manager task.
    command_tx: mpsc::UnboundedSender<Command>,
    /// Shared ready-state map (read-only from here).
    ready_states: ReadyStateMap,
    /// Most recent delivered message (shared with the manager).
    last_message: Arc<RwLock<Option<SocketMessage>>>,
}

impl Subscription {
    pub(crate) fn new(
        url: String,
        command_tx: mpsc::UnboundedSender<Command>,
        ready_states: ReadyStateMap,
        last_message: Arc<RwLock<Option<SocketMessage>>>,
    ) -> Self {
        Self {
            url,
            command_tx,
            ready_states,
            last_message,
        }
    }

    /// Sends a frame over the physical connection, best-effort.
    ///
    /// Silently dropped when no physical connection is currently
    /// attached (during connect, during a reconnect delay, or after
    /// teardown). No error is raised.
    pub fn send(&self, frame: Message) {
        let _ = self.command_tx.send(Command::Send(frame));
    }

    /// Returns the most recently delivered message, if any.
    ///
    /// Messages suppressed by the subscription's filter never land here.
    #[must_use]
    pub fn last_message(&self) -> Option<SocketMessage> {
        self.last_message.read().clone()
    }

    /// Returns the current ready state of this subscription's physical
    /// URL.
    ///
    /// Reads the shared tracker, so all consumers of a shared socket
    /// observe the same state; a URL that never connected reports
    /// [`ReadyState::Connecting`].
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.ready_states.get(&self.url)
    }

    /// Returns the fully-resolved physical URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Detaches this consumer from the connection.
    ///
    /// Idempotent. For a non-shared connection the physical socket is
    /// closed; a shared socket is deliberately left open for other
    /// (including future) consumers. A reconnect pending at the time of
    /// the call is cancelled.
    pub fn unsubscribe(&self) {
        let _ = self.command_tx.send(Command::Dispose);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("url", &self.url)
            .field("ready_state", &self.ready_state())
            .finish()
    }
}
