//! tokio-tungstenite client transport.
//!
//! [`WsTransport::connect`] returns immediately; connection establishment
//! runs on a spawned I/O task which emits [`TransportEvent::Open`] once
//! the handshake completes, fans out inbound frames, and ends the event
//! stream with a single [`TransportEvent::Close`].
//!
//! # I/O Task
//!
//! The task is a `tokio::select!` loop over:
//!
//! - the WebSocket read half (inbound frames, remote close, errors)
//! - an mpsc command channel (outbound frames, local close)
//!
//! A local `close()` during the connect phase aborts the handshake. A
//! read error emits `Error` then `Close(None)`, matching the browser
//! behavior of an error event followed by a close event.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tracing::{debug, error, trace, warn};

use super::{CloseEvent, EventSender, ListenerId, ListenerSet, Transport, TransportEvent};

// ============================================================================
// SocketCommand
// ============================================================================

/// Commands for the I/O task.
enum SocketCommand {
    /// Write a frame to the socket.
    Send(Message),
    /// Close the socket (or abort the pending connect).
    Close,
}

// ============================================================================
// WsTransport
// ============================================================================

/// Physical WebSocket connection.
///
/// Cheap to share via `Arc`; all operations are non-blocking. Frames
/// sent before the handshake completes or after the socket closed are
/// silently dropped (best-effort send).
pub struct WsTransport {
    /// Channel to the I/O task.
    command_tx: mpsc::UnboundedSender<SocketCommand>,
    /// Attached lifecycle listeners (shared with the I/O task).
    listeners: Arc<ListenerSet>,
    /// Whether the socket is currently open (shared with the I/O task).
    open: Arc<AtomicBool>,
}

impl WsTransport {
    /// Starts connecting to a physical URL.
    ///
    /// Spawns the I/O task internally; listeners attached before the
    /// handshake completes observe the `Open` event.
    #[must_use]
    pub fn connect(url: &str) -> Arc<Self> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let listeners = Arc::new(ListenerSet::new());
        let open = Arc::new(AtomicBool::new(false));

        tokio::spawn(Self::run_io_loop(
            url.to_owned(),
            command_rx,
            Arc::clone(&listeners),
            Arc::clone(&open),
        ));

        Arc::new(Self {
            command_tx,
            listeners,
            open,
        })
    }

    /// Returns `true` while the socket is open.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// I/O task: connect, then pump frames and commands.
    async fn run_io_loop(
        url: String,
        mut command_rx: mpsc::UnboundedReceiver<SocketCommand>,
        listeners: Arc<ListenerSet>,
        open: Arc<AtomicBool>,
    ) {
        // Connect phase, abortable by a local close.
        let connect = connect_async(&url);
        tokio::pin!(connect);

        let ws_stream = loop {
            tokio::select! {
                result = &mut connect => match result {
                    Ok((stream, _response)) => break stream,
                    Err(e) => {
                        warn!(url = %url, error = %e, "WebSocket connect failed");
                        listeners.broadcast(&TransportEvent::Error(e.to_string()));
                        listeners.broadcast(&TransportEvent::Close(None));
                        return;
                    }
                },

                command = command_rx.recv() => match command {
                    Some(SocketCommand::Close) | None => {
                        debug!(url = %url, "Closed before connect completed");
                        listeners.broadcast(&TransportEvent::Close(None));
                        return;
                    }
                    // Not open yet, best-effort drop.
                    Some(SocketCommand::Send(_)) => {}
                }
            }
        };

        open.store(true, Ordering::SeqCst);
        debug!(url = %url, "WebSocket connected");
        listeners.broadcast(&TransportEvent::Open);

        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                message = ws_read.next() => match message {
                    Some(Ok(Message::Close(frame))) => {
                        debug!(url = %url, "WebSocket closed by remote");
                        listeners.broadcast(&TransportEvent::Close(
                            frame.map(close_event),
                        ));
                        break;
                    }

                    Some(Ok(frame @ (Message::Text(_) | Message::Binary(_)))) => {
                        trace!(url = %url, "Frame received");
                        listeners.broadcast(&TransportEvent::Message(frame));
                    }

                    // Ignore Ping, Pong, raw frames.
                    Some(Ok(_)) => {}

                    Some(Err(e)) => {
                        error!(url = %url, error = %e, "WebSocket error");
                        listeners.broadcast(&TransportEvent::Error(e.to_string()));
                        listeners.broadcast(&TransportEvent::Close(None));
                        break;
                    }

                    None => {
                        debug!(url = %url, "WebSocket stream ended");
                        listeners.broadcast(&TransportEvent::Close(None));
                        break;
                    }
                },

                command = command_rx.recv() => match command {
                    Some(SocketCommand::Send(frame)) => {
                        if let Err(e) = ws_write.send(frame).await {
                            warn!(url = %url, error = %e, "Send failed");
                        }
                    }

                    Some(SocketCommand::Close) => {
                        debug!(url = %url, "Local close");
                        let _ = ws_write.send(Message::Close(None)).await;
                        let _ = ws_write.flush().await;
                        listeners.broadcast(&TransportEvent::Close(None));
                        break;
                    }

                    None => {
                        // All handles dropped; close quietly.
                        let _ = ws_write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }

        open.store(false, Ordering::SeqCst);
        debug!(url = %url, "I/O loop terminated");
    }
}

impl Transport for WsTransport {
    fn send(&self, frame: Message) {
        if !self.is_open() {
            trace!("Dropping frame: socket not open");
            return;
        }
        let _ = self.command_tx.send(SocketCommand::Send(frame));
    }

    fn close(&self) {
        let _ = self.command_tx.send(SocketCommand::Close);
    }

    fn attach(&self, listener: EventSender) -> ListenerId {
        self.listeners.attach(listener)
    }

    fn detach(&self, listener: ListenerId) {
        self.listeners.detach(listener);
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Converts a tungstenite close frame into a [`CloseEvent`].
fn close_event(frame: CloseFrame) -> CloseEvent {
    CloseEvent::new(u16::from(frame.code), frame.reason.as_str())
}

// ============================================================================
// Tests
// ============================================================================
