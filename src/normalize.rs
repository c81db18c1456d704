//! Physical URL derivation.
//!
//! A logical request carries a base URL plus configuration; the physical
//! connection is keyed by the fully-resolved URL after the optional
//! Socket.IO handshake rewrite and query-parameter augmentation.
//!
//! Everything here is a pure string transformation: no network, no
//! validation (the hub validates the final URL at the subscription seam),
//! and idempotent for the same inputs.

// ============================================================================
// Imports
// ============================================================================

use crate::config::ConnectionConfig;

// ============================================================================
// Constants
// ============================================================================

/// Socket.IO websocket handshake path and query.
const SOCKET_IO_PATH: &str = "/socket.io/?EIO=3&transport=websocket";

// ============================================================================
// Normalization
// ============================================================================

/// Derives the physical connection URL for a logical request.
///
/// Applies the Socket.IO rewrite first when envelope framing is enabled,
/// then appends query parameters with the correct separator.
///
/// # Example
///
/// ```
/// use ws_tether::{ConnectionConfig, normalize_url};
///
/// let config = ConnectionConfig::new().with_query_param("token", "abc");
/// assert_eq!(
///     normalize_url("wss://example.test/socket", &config),
///     "wss://example.test/socket?token=abc",
/// );
/// ```
#[must_use]
pub fn normalize_url(url: &str, config: &ConnectionConfig) -> String {
    let converted = if config.use_envelope_framing {
        socket_io_url(url)
    } else {
        url.to_owned()
    };

    if config.query_params.is_empty() {
        converted
    } else {
        append_query_params(&converted, &config.query_params)
    }
}

/// Rewrites a base URL into its Socket.IO websocket handshake form.
///
/// The scheme is normalized to `wss` for secure inputs (`https`/`wss`)
/// and `ws` otherwise; a single trailing slash is stripped before the
/// handshake path is appended.
#[must_use]
pub fn socket_io_url(url: &str) -> String {
    let secure = url.starts_with("https") || url.starts_with("wss");
    let scheme = if secure { "wss" } else { "ws" };

    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .or_else(|| url.strip_prefix("wss://"))
        .or_else(|| url.strip_prefix("ws://"))
        .unwrap_or(url);
    let stripped = stripped.strip_suffix('/').unwrap_or(stripped);

    format!("{scheme}://{stripped}{SOCKET_IO_PATH}")
}

/// Appends query parameters to a URL.
///
/// Uses `&` when the URL already carries a query string (for example
/// because the Socket.IO rewrite introduced one) and `?` otherwise.
/// Keys and values are percent-encoded.
#[must_use]
pub fn append_query_params(url: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return url.to_owned();
    }

    let query = params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&");

    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

// ============================================================================
// Tests
// ============================================================================
