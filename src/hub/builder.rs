//! Builder pattern for hub configuration.
//!
//! Provides a fluent API for configuring and creating [`SocketHub`]
//! instances. The main knob is the transport factory, which tests swap
//! for a scripted transport.
//!
//! # Example
//!
//! ```no_run
//! use ws_tether::SocketHub;
//!
//! let hub = SocketHub::builder().build();
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::registry::SharedSocketRegistry;
use crate::state::ReadyStateMap;
use crate::transport::{Transport, TransportFactory, WsTransport};

use super::core::SocketHub;

// ============================================================================
// SocketHubBuilder
// ============================================================================

/// Builder for configuring a [`SocketHub`] instance.
///
/// Use [`SocketHub::builder()`] to create a new builder.
#[derive(Default)]
pub struct SocketHubBuilder {
    /// Transport factory override.
    factory: Option<TransportFactory>,
}

impl SocketHubBuilder {
    /// Creates a new hub builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides how physical transports are created.
    ///
    /// The default factory dials the URL with [`WsTransport::connect`].
    /// Tests inject a factory returning scripted transports here.
    #[must_use]
    pub fn transport_factory(
        mut self,
        factory: impl Fn(&str) -> Arc<dyn Transport> + Send + Sync + 'static,
    ) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Builds the hub with fresh (empty) registry and ready-state map.
    #[must_use]
    pub fn build(self) -> SocketHub {
        let factory = self
            .factory
            .unwrap_or_else(|| Arc::new(|url: &str| WsTransport::connect(url) as Arc<dyn Transport>));

        SocketHub::from_parts(
            Arc::new(SharedSocketRegistry::new()),
            ReadyStateMap::new(),
            factory,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::mock::MockTransport;

    #[test]
    fn test_default_build() {
        let hub = SocketHubBuilder::new().build();
        assert_eq!(hub.shared_socket_count(), 0);
    }

    #[test]
    fn test_custom_factory_is_kept() {
        let hub = SocketHub::builder()
            .transport_factory(|_url| MockTransport::new() as Arc<dyn Transport>)
            .build();
        assert_eq!(hub.shared_socket_count(), 0);
    }
}
