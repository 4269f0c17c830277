//! Frame Classifier
//!
//! Pure classification of raw text frames into typed events. Downstream
//! code matches on [`FrameEvent`] instead of re-inspecting raw JSON.
//!
//! Alpaca sends messages as JSON arrays where each element is a message
//! object; single objects occur for some control messages. The `T` field
//! discriminates:
//!
//! - `"success"` with `msg == "authenticated"` -> [`FrameEvent::AuthAck`]
//! - `"subscription"` -> [`FrameEvent::SubscriptionAck`]
//! - `"b"` -> [`FrameEvent::Bar`]
//!
//! Everything else passes through as [`FrameEvent::Unrecognized`] for
//! observability. Classification never raises past this boundary: a
//! payload that fails to parse yields a single [`FrameEvent::ParseError`].

use serde_json::Value;

use crate::domain::Bar;

/// A classified inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    /// Server acknowledged authentication.
    AuthAck,
    /// Server acknowledged a subscription change.
    SubscriptionAck,
    /// A market-data bar.
    Bar(Bar),
    /// An object or scalar with no recognized discriminator.
    Unrecognized(Value),
    /// The payload was not valid JSON.
    ParseError {
        /// The original payload.
        payload: String,
        /// Parser diagnostic.
        detail: String,
    },
}

/// Classify one raw text payload into zero or more typed events.
///
/// Arrays classify element-wise in array order. This is a pure function;
/// it never panics and never returns an error.
#[must_use]
pub fn classify(payload: &str) -> Vec<FrameEvent> {
    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => {
            return vec![FrameEvent::ParseError {
                payload: payload.to_string(),
                detail: e.to_string(),
            }];
        }
    };

    match value {
        Value::Array(elements) => elements.iter().map(classify_element).collect(),
        object @ Value::Object(_) => vec![classify_element(&object)],
        scalar => vec![FrameEvent::Unrecognized(scalar)],
    }
}

/// Classify one array element (or a single top-level object).
fn classify_element(value: &Value) -> FrameEvent {
    if !value.is_object() {
        return FrameEvent::Unrecognized(value.clone());
    }

    let tag = value.get("T").and_then(Value::as_str).unwrap_or_default();
    match tag {
        "success" if value.get("msg").and_then(Value::as_str) == Some("authenticated") => {
            FrameEvent::AuthAck
        }
        "subscription" => FrameEvent::SubscriptionAck,
        "b" => FrameEvent::Bar(Bar::from_value(value)),
        _ => FrameEvent::Unrecognized(value.clone()),
    }
}
