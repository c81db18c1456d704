//! Subscription configuration.
//!
//! [`ConnectionConfig`] is the exhaustive configuration surface for one
//! logical subscription: framing, query augmentation, socket sharing,
//! lifecycle callbacks and reconnection policy.
//!
//! Configuration is fixed for the lifetime of a subscription. The manager
//! snapshots a [`ConfigFingerprint`] the first time it observes a config
//! and re-checks it before every reconnection attempt; a mismatch is the
//! fatal [`Error::ConfigMutated`] usage error.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use ws_tether::ConnectionConfig;
//!
//! let config = ConnectionConfig::new()
//!     .with_shared()
//!     .with_query_param("token", "abc")
//!     .with_reconnect_attempts(5)
//!     .with_reconnect_interval(Duration::from_secs(2));
//! assert!(config.share);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_tungstenite::tungstenite::Message;

use crate::error::{Error, Result};
use crate::manager::SocketMessage;
use crate::transport::CloseEvent;

// ============================================================================
// Constants
// ============================================================================

/// Default delay between reconnection attempts.
const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Default reconnection ceiling.
const DEFAULT_RECONNECT_ATTEMPTS: u32 = 20;

// ============================================================================
// Callback Types
// ============================================================================

/// Called when the physical connection opens.
pub type OnOpen = Arc<dyn Fn() + Send + Sync>;

/// Called when the physical connection closes.
///
/// The close event is `None` when the transport ended without a close
/// frame (for example after a connect failure).
pub type OnClose = Arc<dyn Fn(Option<&CloseEvent>) + Send + Sync>;

/// Called for each delivered message.
pub type OnMessage = Arc<dyn Fn(&SocketMessage) + Send + Sync>;

/// Called when the transport reports an error.
pub type OnError = Arc<dyn Fn(&str) + Send + Sync>;

/// Decides whether an unexpected close should trigger reconnection.
pub type ShouldReconnect = Arc<dyn Fn(Option<&CloseEvent>) -> bool + Send + Sync>;

/// Filters raw inbound frames; returning `false` suppresses delivery.
pub type MessageFilter = Arc<dyn Fn(&Message) -> bool + Send + Sync>;

/// Maps the current attempt number (1-based) to a reconnect delay.
pub type BackoffFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

// ============================================================================
// ReconnectInterval
// ============================================================================

/// Delay policy between reconnection attempts.
#[derive(Clone)]
pub enum ReconnectInterval {
    /// Fixed delay for every attempt.
    Fixed(Duration),
    /// Per-attempt delay, e.g. exponential backoff.
    Backoff(BackoffFn),
}

impl ReconnectInterval {
    /// Returns the delay before the given attempt (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(duration) => *duration,
            Self::Backoff(f) => f(attempt),
        }
    }
}

impl Default for ReconnectInterval {
    fn default() -> Self {
        Self::Fixed(DEFAULT_RECONNECT_INTERVAL)
    }
}

impl fmt::Debug for ReconnectInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(duration) => f.debug_tuple("Fixed").field(duration).finish(),
            Self::Backoff(_) => f.debug_tuple("Backoff").field(&"<fn>").finish(),
        }
    }
}

// ============================================================================
// ConnectionConfig
// ============================================================================

/// Configuration for one logical subscription.
///
/// Immutable for the subscription's lifetime; see the module docs.
#[derive(Clone, Default)]
pub struct ConnectionConfig {
    /// Decode inbound frames through the envelope codec and rewrite the
    /// URL to the Socket.IO handshake form.
    pub use_envelope_framing: bool,

    /// Query parameters appended to the physical URL, in order.
    pub query_params: Vec<(String, String)>,

    /// Share one physical socket between all subscriptions to the same
    /// physical URL.
    pub share: bool,

    /// Open callback.
    pub on_open: Option<OnOpen>,

    /// Close callback.
    pub on_close: Option<OnClose>,

    /// Message callback.
    pub on_message: Option<OnMessage>,

    /// Error callback.
    pub on_error: Option<OnError>,

    /// Reconnection predicate; absent means "always reconnect".
    pub should_reconnect: Option<ShouldReconnect>,

    /// Delay policy between reconnection attempts.
    pub reconnect_interval: ReconnectInterval,

    /// Maximum automatic reconnection attempts before giving up.
    pub reconnect_attempts: u32,

    /// Raw-frame filter; `false` suppresses state update and callback.
    pub message_filter: Option<MessageFilter>,

    /// Treat a transport error like an unexpected close and enter
    /// reconnection evaluation immediately.
    pub retry_on_error: bool,
}

// ============================================================================
// Constructors
// ============================================================================

impl ConnectionConfig {
    /// Creates a configuration with default settings.
    ///
    /// Defaults: no framing, no sharing, reconnect on every unexpected
    /// close, 5 s fixed interval, 20 attempt ceiling.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            ..Self::default()
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ConnectionConfig {
    /// Enables envelope framing (Socket.IO style).
    #[inline]
    #[must_use]
    pub fn with_envelope_framing(mut self) -> Self {
        self.use_envelope_framing = true;
        self
    }

    /// Appends one query parameter to the physical URL.
    #[inline]
    #[must_use]
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Enables socket sharing by physical URL.
    #[inline]
    #[must_use]
    pub fn with_shared(mut self) -> Self {
        self.share = true;
        self
    }

    /// Sets the open callback.
    #[inline]
    #[must_use]
    pub fn with_on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Arc::new(f));
        self
    }

    /// Sets the close callback.
    #[inline]
    #[must_use]
    pub fn with_on_close(
        mut self,
        f: impl Fn(Option<&CloseEvent>) + Send + Sync + 'static,
    ) -> Self {
        self.on_close = Some(Arc::new(f));
        self
    }

    /// Sets the message callback.
    #[inline]
    #[must_use]
    pub fn with_on_message(mut self, f: impl Fn(&SocketMessage) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Arc::new(f));
        self
    }

    /// Sets the error callback.
    #[inline]
    #[must_use]
    pub fn with_on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Sets the reconnection predicate.
    #[inline]
    #[must_use]
    pub fn with_should_reconnect(
        mut self,
        f: impl Fn(Option<&CloseEvent>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_reconnect = Some(Arc::new(f));
        self
    }

    /// Sets a fixed reconnect interval.
    #[inline]
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = ReconnectInterval::Fixed(interval);
        self
    }

    /// Sets a per-attempt reconnect delay function.
    #[inline]
    #[must_use]
    pub fn with_reconnect_backoff(
        mut self,
        f: impl Fn(u32) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.reconnect_interval = ReconnectInterval::Backoff(Arc::new(f));
        self
    }

    /// Sets the reconnection ceiling.
    #[inline]
    #[must_use]
    pub fn with_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_attempts = attempts;
        self
    }

    /// Sets the raw-frame filter.
    #[inline]
    #[must_use]
    pub fn with_message_filter(
        mut self,
        f: impl Fn(&Message) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.message_filter = Some(Arc::new(f));
        self
    }

    /// Promotes transport errors to reconnection triggers.
    #[inline]
    #[must_use]
    pub fn with_retry_on_error(mut self) -> Self {
        self.retry_on_error = true;
        self
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("use_envelope_framing", &self.use_envelope_framing)
            .field("query_params", &self.query_params)
            .field("share", &self.share)
            .field("on_open", &self.on_open.as_ref().map(|_| "<fn>"))
            .field("on_close", &self.on_close.as_ref().map(|_| "<fn>"))
            .field("on_message", &self.on_message.as_ref().map(|_| "<fn>"))
            .field("on_error", &self.on_error.as_ref().map(|_| "<fn>"))
            .field(
                "should_reconnect",
                &self.should_reconnect.as_ref().map(|_| "<fn>"),
            )
            .field("reconnect_interval", &self.reconnect_interval)
            .field("reconnect_attempts", &self.reconnect_attempts)
            .field(
                "message_filter",
                &self.message_filter.as_ref().map(|_| "<fn>"),
            )
            .field("retry_on_error", &self.retry_on_error)
            .finish()
    }
}

// ============================================================================
// ConfigFingerprint
// ============================================================================

/// Comparable snapshot of a [`ConnectionConfig`].
///
/// Callbacks cannot be compared, so their presence is captured instead;
/// a backoff function likewise collapses to "custom".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFingerprint {
    use_envelope_framing: bool,
    query_params: Vec<(String, String)>,
    share: bool,
    reconnect_attempts: u32,
    retry_on_error: bool,
    fixed_interval_ms: Option<u128>,
    callbacks: [bool; 6],
}

impl ConnectionConfig {
    /// Takes a comparable snapshot of this configuration.
    #[must_use]
    pub fn fingerprint(&self) -> ConfigFingerprint {
        let fixed_interval_ms = match &self.reconnect_interval {
            ReconnectInterval::Fixed(duration) => Some(duration.as_millis()),
            ReconnectInterval::Backoff(_) => None,
        };

        ConfigFingerprint {
            use_envelope_framing: self.use_envelope_framing,
            query_params: self.query_params.clone(),
            share: self.share,
            reconnect_attempts: self.reconnect_attempts,
            retry_on_error: self.retry_on_error,
            fixed_interval_ms,
            callbacks: [
                self.on_open.is_some(),
                self.on_close.is_some(),
                self.on_message.is_some(),
                self.on_error.is_some(),
                self.should_reconnect.is_some(),
                self.message_filter.is_some(),
            ],
        }
    }
}

// ============================================================================
// StaticConfigGuard
// ============================================================================

/// Enforces that a configuration never changes across the lifetime of
/// one subscription.
///
/// The first [`observe`](Self::observe) stores a snapshot; every later
/// observation must match it or the fatal [`Error::ConfigMutated`] is
/// returned. The connection manager observes before every (re)connect.
#[derive(Debug, Default)]
pub struct StaticConfigGuard {
    snapshot: Option<ConfigFingerprint>,
}

impl StaticConfigGuard {
    /// Creates a guard with no snapshot yet.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigMutated`] when the configuration's content
    /// differs from the first observation.
    pub fn observe(&mut self, config: &ConnectionConfig) -> Result<()> {
        let fingerprint = config.fingerprint();
        match &self.snapshot {
            None => {
                self.snapshot = Some(fingerprint);
                Ok(())
            }
            Some(snapshot) if *snapshot == fingerprint => Ok(()),
            Some(_) => Err(Error::ConfigMutated),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::new();
        assert!(!config.use_envelope_framing);
        assert!(!config.share);
        assert!(!config.retry_on_error);
        assert!(config.query_params.is_empty());
        assert_eq!(config.reconnect_attempts, 20);
        assert_eq!(
            config.reconnect_interval.delay(1),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_builder_chain() {
        let config = ConnectionConfig::new()
            .with_envelope_framing()
            .with_shared()
            .with_retry_on_error()
            .with_query_param("token", "abc")
            .with_reconnect_attempts(3);

        assert!(config.use_envelope_framing);
        assert!(config.share);
        assert!(config.retry_on_error);
        assert_eq!(config.query_params, vec![("token".into(), "abc".into())]);
        assert_eq!(config.reconnect_attempts, 3);
    }

    #[test]
    fn test_backoff_delay() {
        let config = ConnectionConfig::new()
            .with_reconnect_backoff(|attempt| Duration::from_millis(100 * u64::from(attempt)));
        assert_eq!(
            config.reconnect_interval.delay(3),
            Duration::from_millis(300)
        );
    }

    #[test]
    fn test_fingerprint_captures_callback_presence() {
        let bare = ConnectionConfig::new();
        let with_open = ConnectionConfig::new().with_on_open(|| {});
        assert_ne!(bare.fingerprint(), with_open.fingerprint());

        // Two distinct closures of the same shape fingerprint equal.
        let other_open = ConnectionConfig::new().with_on_open(|| {});
        assert_eq!(with_open.fingerprint(), other_open.fingerprint());
    }

    #[test]
    fn test_guard_accepts_stable_config() {
        let config = ConnectionConfig::new().with_query_param("token", "abc");
        let mut guard = StaticConfigGuard::new();

        assert!(guard.observe(&config).is_ok());
        assert!(guard.observe(&config).is_ok());
        assert!(guard.observe(&config.clone()).is_ok());
    }

    #[test]
    fn test_guard_rejects_mutated_config() {
        let config = ConnectionConfig::new().with_query_param("token", "abc");
        let mutated = ConnectionConfig::new().with_query_param("token", "xyz");
        let mut guard = StaticConfigGuard::new();

        guard.observe(&config).expect("first observation");
        let err = guard.observe(&mutated).expect_err("mutated config");
        assert!(matches!(err, Error::ConfigMutated));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_guard_rejects_interval_change() {
        let fixed = ConnectionConfig::new().with_reconnect_interval(Duration::from_secs(1));
        let backoff =
            ConnectionConfig::new().with_reconnect_backoff(|_| Duration::from_secs(1));
        let mut guard = StaticConfigGuard::new();

        guard.observe(&fixed).expect("first observation");
        assert!(matches!(
            guard.observe(&backoff),
            Err(Error::ConfigMutated)
        ));
    }

    #[test]
    fn test_debug_does_not_panic() {
        let config = ConnectionConfig::new().with_on_open(|| {});
        let rendered = format!("{config:?}");
        assert!(rendered.contains("ConnectionConfig"));
    }
}
