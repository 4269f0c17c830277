//! Crypto Bar (OHLCV) Record
//!
//! One inbound market-data record parsed from a stream frame.
//!
//! # Wire Format (JSON)
//! ```json
//! {
//!   "T": "b",
//!   "S": "BTC/USD",
//!   "o": 42000.5,
//!   "h": 42100.0,
//!   "l": 41950.0,
//!   "c": 42050.0,
//!   "v": 3.25,
//!   "t": "2024-01-15T10:00:00Z",
//!   "n": 120,
//!   "vw": 42010.7
//! }
//! ```
//!
//! Parsing is deliberately tolerant: a missing or mistyped field leaves
//! the corresponding value at its zero default rather than failing the
//! whole frame. Only the `T` type tag is required for classification,
//! which happens before a `Bar` is constructed.

use serde_json::Value;

/// One OHLCV bar received from the data stream.
///
/// Immutable once constructed; created per inbound frame and discarded
/// after the handling worker has derived an order from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bar {
    /// Message type tag (always "b" for bars).
    pub msg_type: String,
    /// Instrument symbol.
    pub symbol: String,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Volume.
    pub volume: f64,
    /// Bar timestamp (RFC 3339 string, kept verbatim).
    pub timestamp: String,
    /// Trade count.
    pub trade_count: f64,
    /// Volume-weighted average price.
    pub vwap: f64,
}

impl Bar {
    /// Parse a bar from a raw JSON object.
    ///
    /// Absent or mistyped fields stay at their zero defaults; this never
    /// fails.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            msg_type: string_field(value, "T"),
            symbol: string_field(value, "S"),
            open: number_field(value, "o"),
            high: number_field(value, "h"),
            low: number_field(value, "l"),
            close: number_field(value, "c"),
            volume: number_field(value, "v"),
            timestamp: string_field(value, "t"),
            trade_count: number_field(value, "n"),
            vwap: number_field(value, "vw"),
        }
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn number_field(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_all_present_fields() {
        let value = json!({
            "T": "b",
            "S": "BTC/USD",
            "o": 42000.5,
            "h": 42100.0,
            "l": 41950.0,
            "c": 42050.0,
            "v": 3.25,
            "t": "2024-01-15T10:00:00Z",
            "n": 120,
            "vw": 42010.7
        });

        let bar = Bar::from_value(&value);
        assert_eq!(bar.msg_type, "b");
        assert_eq!(bar.symbol, "BTC/USD");
        assert_eq!(bar.open, 42000.5);
        assert_eq!(bar.high, 42100.0);
        assert_eq!(bar.low, 41950.0);
        assert_eq!(bar.close, 42050.0);
        assert_eq!(bar.volume, 3.25);
        assert_eq!(bar.timestamp, "2024-01-15T10:00:00Z");
        assert_eq!(bar.trade_count, 120.0);
        assert_eq!(bar.vwap, 42010.7);
    }

    #[test]
    fn absent_fields_default_to_zero() {
        let value = json!({"T": "b", "S": "ETHUSD"});

        let bar = Bar::from_value(&value);
        assert_eq!(bar.symbol, "ETHUSD");
        assert_eq!(bar.open, 0.0);
        assert_eq!(bar.close, 0.0);
        assert_eq!(bar.volume, 0.0);
        assert_eq!(bar.timestamp, "");
        assert_eq!(bar.trade_count, 0.0);
    }

    #[test]
    fn mistyped_fields_default_to_zero() {
        let value = json!({
            "T": "b",
            "S": 42,
            "o": "not a number",
            "t": 1700000000
        });

        let bar = Bar::from_value(&value);
        assert_eq!(bar.symbol, "");
        assert_eq!(bar.open, 0.0);
        assert_eq!(bar.timestamp, "");
    }

    #[test]
    fn empty_object_is_all_defaults() {
        let bar = Bar::from_value(&json!({}));
        assert_eq!(bar, Bar::default());
    }
}
