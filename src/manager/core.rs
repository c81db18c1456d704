//! Reconnecting connection manager.
//!
//! One manager task runs per subscription and owns its lifecycle:
//! establish or attach to a physical transport, pump lifecycle events,
//! decide on reconnection after unexpected closure, and tear down
//! cleanly on disposal.
//!
//! # State Machine
//!
//! ```text
//!         ┌──────────────────── reconnect delay ◄─────────────┐
//!         ▼                     (cancellable)                 │
//!  ┌────────────┐   Open   ┌────────┐   unexpected Close   ┌──┴─────┐
//!  │ Connecting ├─────────►│  Open  ├─────────────────────►│ Closed │
//!  └────────────┘          └────────┘   (policy permits)   └────────┘
//!         ▲                                                     │
//!         └──────────── start(): fresh listeners ───────────────┘
//! ```
//!
//! Every (re)start attaches a fresh event channel and detaches the old
//! one, so listeners never leak and no event is delivered twice. The
//! reconnect delay is a pinned sleep raced against the command channel:
//! a dispose arriving mid-delay cancels the pending start.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};

use crate::config::{ConnectionConfig, StaticConfigGuard};
use crate::envelope;
use crate::registry::SharedSocketRegistry;
use crate::state::{ReadyState, ReadyStateMap};
use crate::transport::{CloseEvent, Transport, TransportEvent, TransportFactory};

use super::subscription::SocketMessage;

// ============================================================================
// Command
// ============================================================================

/// Commands from the subscription handle to its manager task.
pub(crate) enum Command {
    /// Forward a frame to the physical transport, best-effort.
    Send(Message),
    /// Detach from the connection and stop.
    Dispose,
}

// ============================================================================
// ManagerContext
// ============================================================================

/// Everything one manager task needs, injected by the hub.
pub(crate) struct ManagerContext {
    /// Fully-resolved physical URL.
    pub url: String,
    /// Subscription configuration, fixed for the manager's lifetime.
    pub config: Arc<ConnectionConfig>,
    /// Shared-socket registry (used when `config.share`).
    pub registry: Arc<SharedSocketRegistry>,
    /// Shared ready-state tracker.
    pub ready_states: ReadyStateMap,
    /// Creates physical transports.
    pub factory: TransportFactory,
    /// Last delivered message, shared with the subscription handle.
    pub last_message: Arc<RwLock<Option<SocketMessage>>>,
}

// ============================================================================
// SessionEnd
// ============================================================================

/// Why one transport session ended.
enum SessionEnd {
    /// Unexpected closure; evaluate reconnection policy.
    Unexpected(Option<CloseEvent>),
    /// Consumer disposed the subscription (or dropped the handle).
    Disposed,
    /// Deliberate close observed while `expecting_close` was set.
    Expected,
}

// ============================================================================
// Manager Task
// ============================================================================

/// Runs the session loop for one subscription until disposal, a policy
/// stop, or a fatal usage error.
pub(crate) async fn run(ctx: ManagerContext, mut command_rx: mpsc::UnboundedReceiver<Command>) {
    let mut guard = StaticConfigGuard::new();
    let mut attempt_count: u32 = 0;
    let mut is_creator = false;
    let mut first_start = true;
    let mut last_transport: Option<Arc<dyn Transport>> = None;

    loop {
        // The configuration must be identical at every (re)start; the
        // sharing and reconnection invariants assume it is fixed.
        if let Err(e) = guard.observe(&ctx.config) {
            error!(url = %ctx.url, error = %e, "Fatal usage error, terminating subscription");
            break;
        }

        // Establish or attach.
        let transport: Arc<dyn Transport> = if ctx.config.share {
            if first_start {
                let (transport, created) = ctx
                    .registry
                    .acquire(&ctx.url, &ctx.ready_states, || (ctx.factory)(&ctx.url));
                is_creator = created;
                transport
            } else if is_creator {
                // Only the creating manager replaces a shared socket on
                // reconnection; other sharers re-acquire and pick the
                // replacement up.
                ctx.registry
                    .replace(&ctx.url, &ctx.ready_states, || (ctx.factory)(&ctx.url))
            } else {
                let (transport, _) = ctx
                    .registry
                    .acquire(&ctx.url, &ctx.ready_states, || (ctx.factory)(&ctx.url));

                // A finished socket replays no events, so reattaching to
                // the transport the previous session ended on would
                // strand this consumer. Wait out another delay until the
                // creator has swapped the registry entry.
                if let Some(previous) = &last_transport
                    && Arc::ptr_eq(previous, &transport)
                {
                    debug!(url = %ctx.url, "Registry still holds the finished socket");
                    if attempt_count >= ctx.config.reconnect_attempts {
                        info!(
                            url = %ctx.url,
                            attempts = attempt_count,
                            "Reconnection ceiling reached, giving up"
                        );
                        break;
                    }
                    attempt_count += 1;
                    let delay = ctx.config.reconnect_interval.delay(attempt_count);
                    if !wait_reconnect_delay(delay, &mut command_rx).await {
                        debug!(url = %ctx.url, "Pending reconnect cancelled");
                        break;
                    }
                    continue;
                }
                transport
            }
        } else {
            ctx.ready_states.set(&ctx.url, ReadyState::Connecting);
            (ctx.factory)(&ctx.url)
        };
        first_start = false;
        last_transport = Some(Arc::clone(&transport));

        let end = run_session(&ctx, &mut command_rx, &transport, &mut attempt_count, is_creator)
            .await;

        let close_event = match end {
            SessionEnd::Disposed => {
                debug!(url = %ctx.url, "Subscription disposed");
                break;
            }
            SessionEnd::Expected => {
                debug!(url = %ctx.url, "Deliberate close observed");
                break;
            }
            SessionEnd::Unexpected(event) => event,
        };

        // The session is abandoned either way; an exclusive socket (or a
        // shared one this manager is about to replace) gets closed so it
        // cannot linger half-alive after an error promotion.
        if !ctx.config.share || is_creator {
            transport.close();
        }

        // Reconnection policy.
        if let Some(should_reconnect) = &ctx.config.should_reconnect
            && !should_reconnect(close_event.as_ref())
        {
            debug!(url = %ctx.url, "Reconnection declined by predicate");
            break;
        }

        if attempt_count >= ctx.config.reconnect_attempts {
            info!(
                url = %ctx.url,
                attempts = attempt_count,
                "Reconnection ceiling reached, giving up"
            );
            break;
        }

        attempt_count += 1;
        let delay = ctx.config.reconnect_interval.delay(attempt_count);
        debug!(
            url = %ctx.url,
            attempt = attempt_count,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );

        if !wait_reconnect_delay(delay, &mut command_rx).await {
            debug!(url = %ctx.url, "Pending reconnect cancelled");
            break;
        }
    }

    debug!(url = %ctx.url, "Manager task terminated");
}

/// Pumps one transport session: attaches a fresh listener, handles
/// lifecycle events and consumer commands until the session ends.
///
/// The listener is detached on every exit path, so a subsequent start
/// fully replaces it.
async fn run_session(
    ctx: &ManagerContext,
    command_rx: &mut mpsc::UnboundedReceiver<Command>,
    transport: &Arc<dyn Transport>,
    attempt_count: &mut u32,
    is_creator: bool,
) -> SessionEnd {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let listener = transport.attach(event_tx);
    let mut expecting_close = false;

    // A shared socket may still be live for other consumers when this
    // manager leaves it on its own initiative; only the socket's driving
    // manager records terminal states for a shared URL.
    let drives_socket_state = !ctx.config.share || is_creator;

    let end = loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(TransportEvent::Open) => {
                    ctx.ready_states.set(&ctx.url, ReadyState::Open);
                    *attempt_count = 0;
                    debug!(url = %ctx.url, "Connection open");
                    if let Some(on_open) = &ctx.config.on_open {
                        on_open();
                    }
                }

                Some(TransportEvent::Message(frame)) => {
                    deliver_message(ctx, frame);
                }

                Some(TransportEvent::Error(message)) => {
                    warn!(url = %ctx.url, error = %message, "Transport error");
                    if let Some(on_error) = &ctx.config.on_error {
                        on_error(&message);
                    }
                    // Some transport errors never produce a close event;
                    // optionally promote the error to one.
                    if ctx.config.retry_on_error {
                        if drives_socket_state {
                            ctx.ready_states.set(&ctx.url, ReadyState::Closed);
                        }
                        break SessionEnd::Unexpected(None);
                    }
                }

                Some(TransportEvent::Close(event)) => {
                    ctx.ready_states.set(&ctx.url, ReadyState::Closed);
                    debug!(url = %ctx.url, ?event, "Connection closed");
                    if let Some(on_close) = &ctx.config.on_close {
                        on_close(event.as_ref());
                    }
                    if expecting_close {
                        break SessionEnd::Expected;
                    }
                    break SessionEnd::Unexpected(event);
                }

                // Transport dropped its listener set without a close
                // frame; treat as unexpected closure.
                None => {
                    if drives_socket_state {
                        ctx.ready_states.set(&ctx.url, ReadyState::Closed);
                    }
                    if expecting_close {
                        break SessionEnd::Expected;
                    }
                    break SessionEnd::Unexpected(None);
                }
            },

            // Once teardown is requested the command channel is done
            // (it yields `None` on every poll after the handle drops);
            // only the transport's close event is awaited from here.
            command = command_rx.recv(), if !expecting_close => match command {
                Some(Command::Send(frame)) => {
                    transport.send(frame);
                }

                Some(Command::Dispose) | None => {
                    if ctx.config.share {
                        // A shared socket is deliberately left open for
                        // the other consumers; just stop listening.
                        break SessionEnd::Disposed;
                    }
                    // Exclusive socket: request the close once, then
                    // drain events until it is confirmed.
                    expecting_close = true;
                    ctx.ready_states.set(&ctx.url, ReadyState::Closing);
                    transport.close();
                }
            }
        }
    };

    transport.detach(listener);
    end
}

/// Applies the message filter, decodes when framing is enabled, stores
/// the last message and invokes the consumer callback.
fn deliver_message(ctx: &ManagerContext, frame: Message) {
    if let Some(filter) = &ctx.config.message_filter
        && !filter(&frame)
    {
        trace!(url = %ctx.url, "Frame suppressed by filter");
        return;
    }

    let message = if ctx.config.use_envelope_framing {
        SocketMessage::Envelope(envelope::decode(Some(&frame)))
    } else {
        SocketMessage::Frame(frame)
    };

    *ctx.last_message.write() = Some(message.clone());
    if let Some(on_message) = &ctx.config.on_message {
        on_message(&message);
    }
}

/// Waits out the reconnect delay.
///
/// Returns `false` when the subscription is disposed (or its handle
/// dropped) before the delay elapses; the pending reconnect is then
/// abandoned, never started late. Frames sent during the delay are
/// dropped: no transport is attached.
async fn wait_reconnect_delay(
    delay: Duration,
    command_rx: &mut mpsc::UnboundedReceiver<Command>,
) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            () = &mut sleep => return true,

            command = command_rx.recv() => match command {
                Some(Command::Send(_)) => {
                    trace!("Dropping frame: no transport attached");
                }
                Some(Command::Dispose) | None => return false,
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
