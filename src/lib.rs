//! ws-tether - Reconnecting WebSocket connection manager.
//!
//! This library manages the lifecycle of WebSocket connections so
//! consumers never have to: it normalizes URLs, shares physical sockets
//! between subscribers, tracks ready state, decodes Socket.IO-style
//! message envelopes, and reconnects with a configurable policy after
//! unexpected closure.
//!
//! # Architecture
//!
//! Each subscription spawns one manager task that owns the connection
//! lifecycle:
//!
//! - **[`SocketHub`]**: Entry point; validates URLs, spawns managers
//! - **Manager task**: Pumps transport events, applies reconnect policy
//! - **[`Transport`]**: Seam over the physical socket (real or injected)
//! - **Registry**: Deduplicates shared sockets by physical URL
//!
//! Key design principles:
//!
//! - Subscriptions with `share` attach to one physical socket per URL
//! - Ready state lives in a URL-keyed map, so late sharers read the
//!   current state instead of waiting for an event replay
//! - Reconnect delays are cancellable; unsubscribing mid-delay stops
//!   the pending attempt
//! - Shared configuration is fingerprinted and must stay fixed for the
//!   subscription's lifetime
//!
//! # Quick Start
//!
//! ```no_run
//! use ws_tether::{ConnectionConfig, Message, Result, SocketHub};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let hub = SocketHub::new();
//!
//!     let subscription = hub.subscribe(
//!         "wss://echo.example.com/feed",
//!         ConnectionConfig::new()
//!             .with_shared()
//!             .with_on_message(|message| {
//!                 println!("received: {message:?}");
//!             }),
//!     )?;
//!
//!     subscription.send(Message::text("hello"));
//!
//!     // ... later
//!     subscription.unsubscribe();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Subscription options, callbacks, reconnect policy |
//! | [`envelope`] | Socket.IO-style `[event, payload]` frame decoding |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`hub`] | [`SocketHub`] entry point and builder |
//! | [`manager`] | Subscription handles and the manager task (internal) |
//! | [`normalize`] | URL normalization (framing rewrite, query params) |
//! | [`registry`] | Shared-socket registry keyed by physical URL |
//! | [`state`] | Ready-state enum and URL-keyed state map |
//! | [`transport`] | Transport seam and the tungstenite implementation |

// ============================================================================
// Modules
// ============================================================================

/// Subscription configuration.
///
/// [`ConnectionConfig`] carries callbacks, sharing, framing, and the
/// reconnect policy. A [`StaticConfigGuard`] enforces that it stays
/// fixed for the subscription's lifetime.
pub mod config;

/// Socket.IO-style envelope decoding.
///
/// Total decoding of `[event, payload]` text frames; anything that does
/// not fit yields the [`Envelope::empty()`] sentinel.
pub mod envelope;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Hub entry point.
///
/// Use [`SocketHub::new()`] for real connections, or
/// [`SocketHub::builder()`] to inject a transport factory.
pub mod hub;

/// Subscription handles and the per-subscription manager task.
pub mod manager;

/// URL normalization.
///
/// Framing rewrite to the Socket.IO path plus query-parameter append.
pub mod normalize;

/// Shared-socket registry.
///
/// Internal module deduplicating physical sockets by normalized URL.
pub mod registry;

/// Connection ready state.
///
/// [`ReadyState`] mirrors the browser WebSocket numeric states.
pub mod state;

/// Transport layer.
///
/// The [`Transport`] trait seam, lifecycle events, and the
/// tokio-tungstenite implementation.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration types
pub use config::{
    BackoffFn, ConfigFingerprint, ConnectionConfig, MessageFilter, OnClose, OnError, OnMessage,
    OnOpen, ReconnectInterval, ShouldReconnect, StaticConfigGuard,
};

// Envelope types
pub use envelope::Envelope;

// Error types
pub use error::{Error, Result};

// Hub types
pub use hub::{SocketHub, SocketHubBuilder};

// Subscription types
pub use manager::{SocketMessage, Subscription};

// URL helpers
pub use normalize::{append_query_params, normalize_url, socket_io_url};

// Registry types
pub use registry::SharedSocketRegistry;

// State types
pub use state::{ReadyState, ReadyStateMap};

// Transport types
pub use transport::{
    CloseEvent, ListenerId, ListenerSet, Transport, TransportEvent, TransportFactory, WsTransport,
};

/// WebSocket frame type, re-exported from tungstenite.
pub use tokio_tungstenite::tungstenite::Message;
