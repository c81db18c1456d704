//! Envelope codec for event/payload framed messages.
//!
//! Some servers (Socket.IO style) wrap every message in a transport
//! envelope: a text frame whose body contains a JSON array of
//! `[eventName, payload]`. This module translates such frames into a
//! typed [`Envelope`].
//!
//! Decoding is total: absent, non-text, truncated or otherwise malformed
//! frames all decode to the `empty` sentinel envelope. A parse failure is
//! never surfaced to the caller.
//!
//! # Wire Format
//!
//! ```text
//! 42["chat message",{"user":"ada","body":"hi"}]
//!    └────────────── matched by \[.*\] ──────┘
//! ```
//!
//! The leading digits are the framing protocol's packet type and are
//! ignored; only the first bracketed JSON array is considered.

// ============================================================================
// Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// Constants
// ============================================================================

/// Event type of the sentinel envelope.
const EMPTY_EVENT_TYPE: &str = "empty";

/// Matches the first `[...]` group in a frame body.
static ENVELOPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*\]").expect("envelope regex is valid"));

// ============================================================================
// Envelope
// ============================================================================

/// A decoded `(eventType, payload)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Event name from the first array element.
    pub event_type: String,
    /// Payload from the second array element.
    pub payload: Value,
}

impl Envelope {
    /// Returns the sentinel envelope used for unrecognized frames.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            event_type: EMPTY_EVENT_TYPE.to_owned(),
            payload: Value::Null,
        }
    }

    /// Returns `true` if this is the sentinel envelope.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.event_type == EMPTY_EVENT_TYPE && self.payload.is_null()
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::empty()
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes a raw transport frame into an [`Envelope`].
///
/// Returns the sentinel [`Envelope::empty`] when:
///
/// - no frame is present, or the frame is not text
/// - the body contains no `[...]` group
/// - the group is not valid JSON, or not an array
/// - the array's second element is absent or falsy
///
/// Never panics and never returns an error, regardless of input.
#[must_use]
pub fn decode(frame: Option<&Message>) -> Envelope {
    let Some(Message::Text(body)) = frame else {
        return Envelope::empty();
    };

    let Some(matched) = ENVELOPE_RE.find(body.as_str()) else {
        return Envelope::empty();
    };

    let Ok(value) = serde_json::from_str::<Value>(matched.as_str()) else {
        return Envelope::empty();
    };

    let Value::Array(items) = value else {
        return Envelope::empty();
    };

    let payload = match items.get(1) {
        Some(p) if !is_falsy(p) => p.clone(),
        _ => return Envelope::empty(),
    };

    let event_type = match items.first() {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => return Envelope::empty(),
    };

    Envelope {
        event_type,
        payload,
    }
}

/// JavaScript-style falsiness for JSON values.
///
/// `null`, `false`, numeric zero and the empty string are falsy; arrays
/// and objects are always truthy, even when empty.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    fn text(body: &str) -> Message {
        Message::text(body)
    }

    #[test]
    fn test_absent_frame_is_empty() {
        assert!(decode(None).is_empty());
    }

    #[test]
    fn test_non_text_frame_is_empty() {
        let frame = Message::binary(vec![0x5b, 0x5d]);
        assert!(decode(Some(&frame)).is_empty());
    }

    #[test]
    fn test_no_bracket_group_is_empty() {
        assert!(decode(Some(&text("hello"))).is_empty());
        assert!(decode(Some(&text(""))).is_empty());
        assert!(decode(Some(&text("3probe"))).is_empty());
    }

    #[test]
    fn test_invalid_json_is_empty() {
        assert!(decode(Some(&text("[not json"))).is_empty());
        assert!(decode(Some(&text(r#"["unterminated]"#))).is_empty());
    }

    #[test]
    fn test_object_body_is_empty() {
        assert!(decode(Some(&text(r#"{"a": 1}"#))).is_empty());
    }

    #[test]
    fn test_greedy_match_across_groups_is_empty() {
        // The match is greedy, so two separate groups span into one
        // non-JSON chunk.
        assert!(decode(Some(&text(r#"[1,2] noise [3,4]"#))).is_empty());
    }

    #[test]
    fn test_falsy_payload_is_empty() {
        assert!(decode(Some(&text(r#"["evt"]"#))).is_empty());
        assert!(decode(Some(&text(r#"["evt", null]"#))).is_empty());
        assert!(decode(Some(&text(r#"["evt", false]"#))).is_empty());
        assert!(decode(Some(&text(r#"["evt", 0]"#))).is_empty());
        assert!(decode(Some(&text(r#"["evt", ""]"#))).is_empty());
    }

    #[test]
    fn test_valid_pair_decodes() {
        let envelope = decode(Some(&text(r#"42["chat",{"body":"hi"}]"#)));
        assert_eq!(envelope.event_type, "chat");
        assert_eq!(envelope.payload, json!({"body": "hi"}));
        assert!(!envelope.is_empty());
    }

    #[test]
    fn test_scalar_payload_decodes() {
        let envelope = decode(Some(&text(r#"["tick", 7]"#)));
        assert_eq!(envelope.event_type, "tick");
        assert_eq!(envelope.payload, json!(7));
    }

    #[test]
    fn test_empty_collection_payloads_are_truthy() {
        assert_eq!(decode(Some(&text(r#"["evt", []]"#))).payload, json!([]));
        assert_eq!(decode(Some(&text(r#"["evt", {}]"#))).payload, json!({}));
    }

    #[test]
    fn test_non_string_event_type_is_stringified() {
        let envelope = decode(Some(&text(r#"[3, "payload"]"#)));
        assert_eq!(envelope.event_type, "3");
        assert_eq!(envelope.payload, json!("payload"));
    }

    #[test]
    fn test_serializes_with_camel_case_keys() {
        let envelope = Envelope {
            event_type: "chat".to_owned(),
            payload: json!(1),
        };
        let rendered = serde_json::to_string(&envelope).expect("serialize");
        assert_eq!(rendered, r#"{"eventType":"chat","payload":1}"#);
    }

    proptest! {
        /// Decoding must never panic, whatever the frame body contains.
        #[test]
        fn decode_is_total(body in ".*") {
            let _ = decode(Some(&text(&body)));
        }

        /// Valid two-element frames always round out to their parts.
        #[test]
        fn valid_pairs_decode(event in "[a-z]{1,12}", n in 1u32..10_000) {
            let body = format!(r#"["{event}", {n}]"#);
            let envelope = decode(Some(&text(&body)));
            prop_assert_eq!(envelope.event_type, event);
            prop_assert_eq!(envelope.payload, json!(n));
        }
    }
}
