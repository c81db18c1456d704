//! Subscription entry point.
//!
//! A [`SocketHub`] bundles the process-scoped stores (the shared-socket
//! registry and the ready-state tracker) with the transport factory,
//! and spawns one connection manager task per subscription. The stores
//! are explicit members rather than statics, so independent hubs (and
//! tests) never interfere with each other.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::info;
use url::Url;

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::manager::Subscription;
use crate::manager::core::{self, ManagerContext};
use crate::normalize::normalize_url;
use crate::registry::SharedSocketRegistry;
use crate::state::{ReadyState, ReadyStateMap};
use crate::transport::TransportFactory;

use super::builder::SocketHubBuilder;

// ============================================================================
// SocketHub
// ============================================================================

/// Creates and tracks logical WebSocket connections.
///
/// # Example
///
/// ```no_run
/// use ws_tether::{ConnectionConfig, Message, SocketHub};
///
/// # async fn example() -> ws_tether::Result<()> {
/// let hub = SocketHub::new();
///
/// let sub = hub.subscribe(
///     "wss://example.test/socket",
///     ConnectionConfig::new().with_shared().with_query_param("token", "abc"),
/// )?;
///
/// sub.send(Message::text("hello"));
/// println!("state: {}", sub.ready_state());
/// sub.unsubscribe();
/// # Ok(())
/// # }
/// ```
pub struct SocketHub {
    /// Shared sockets keyed by physical URL.
    registry: Arc<SharedSocketRegistry>,
    /// Ready state per physical URL.
    ready_states: ReadyStateMap,
    /// Creates physical transports.
    factory: TransportFactory,
}

impl SocketHub {
    /// Creates a hub with the default (real WebSocket) transport
    /// factory.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Returns a builder for a configured hub.
    #[inline]
    #[must_use]
    pub fn builder() -> SocketHubBuilder {
        SocketHubBuilder::new()
    }

    pub(crate) fn from_parts(
        registry: Arc<SharedSocketRegistry>,
        ready_states: ReadyStateMap,
        factory: TransportFactory,
    ) -> Self {
        Self {
            registry,
            ready_states,
            factory,
        }
    }

    /// Creates a logical connection for a URL and configuration.
    ///
    /// The URL is normalized first (Socket.IO rewrite when envelope
    /// framing is enabled, then query-parameter augmentation); the
    /// physical connection is keyed by the result. A manager task is
    /// spawned to drive the connection's lifecycle, so a tokio runtime
    /// must be current.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] when the normalized URL does not
    /// parse or is not `ws`/`wss`.
    pub fn subscribe(&self, url: &str, config: ConnectionConfig) -> Result<Subscription> {
        let config = Arc::new(config);
        let physical_url = normalize_url(url, &config);

        let parsed = Url::parse(&physical_url)
            .map_err(|e| Error::invalid_url(&physical_url, e.to_string()))?;
        match parsed.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(Error::invalid_url(
                    &physical_url,
                    format!("scheme must be ws or wss, got {other}"),
                ));
            }
        }

        // Sharers of one URL must agree on a single source of truth, so
        // shared subscriptions use the hub-wide tracker. An exclusive
        // subscription owns its socket outright and tracks its state
        // privately: two unshared subscriptions to the same URL must not
        // clobber each other's entry.
        let ready_states = if config.share {
            self.ready_states.clone()
        } else {
            ReadyStateMap::new()
        };

        let last_message = Arc::new(RwLock::new(None));
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let context = ManagerContext {
            url: physical_url.clone(),
            config,
            registry: Arc::clone(&self.registry),
            ready_states: ready_states.clone(),
            factory: Arc::clone(&self.factory),
            last_message: Arc::clone(&last_message),
        };
        tokio::spawn(core::run(context, command_rx));

        info!(url = %physical_url, "Subscription created");

        Ok(Subscription::new(
            physical_url,
            command_tx,
            ready_states,
            last_message,
        ))
    }

    /// Returns the ready state tracked for a physical URL.
    ///
    /// Covers shared subscriptions (which all report into the hub-wide
    /// tracker); an exclusive subscription tracks its state on its own
    /// handle instead. URLs that never connected report
    /// [`ReadyState::Connecting`].
    #[must_use]
    pub fn ready_state(&self, physical_url: &str) -> ReadyState {
        self.ready_states.get(physical_url)
    }

    /// Returns the number of shared sockets currently registered.
    ///
    /// Shared sockets are never unregistered by consumer teardown, so
    /// this only ever grows for a given hub.
    #[must_use]
    pub fn shared_socket_count(&self) -> usize {
        self.registry.len()
    }
}

impl Default for SocketHub {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SocketHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketHub")
            .field("registry", &self.registry)
            .field("ready_states", &self.ready_states)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
