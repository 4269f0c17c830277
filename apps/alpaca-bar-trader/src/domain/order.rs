//! Order Request Record
//!
//! A derived trade instruction awaiting execution. The trading API uses
//! string-typed numeric fields, so every field is a `String` and the
//! record serializes to a fixed-key JSON object:
//!
//! ```json
//! {
//!   "symbol": "BTC",
//!   "qty": "0.001",
//!   "side": "sell",
//!   "type": "market",
//!   "time_in_force": "gtc"
//! }
//! ```

use serde::Serialize;

/// One trade instruction derived from an inbound bar.
///
/// Immutable; owned by the order accumulator until drained by the
/// execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    /// Base trading symbol.
    pub symbol: String,
    /// Quantity (string-typed on the wire).
    pub qty: String,
    /// Order side ("buy" or "sell").
    pub side: String,
    /// Order type ("market", "limit", ...).
    #[serde(rename = "type")]
    pub order_type: String,
    /// Time in force ("gtc", "day", ...).
    pub time_in_force: String,
}

impl OrderRequest {
    /// Create a new order request.
    #[must_use]
    pub fn new(
        symbol: impl Into<String>,
        qty: impl Into<String>,
        side: impl Into<String>,
        order_type: impl Into<String>,
        time_in_force: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            qty: qty.into(),
            side: side.into(),
            order_type: order_type.into(),
            time_in_force: time_in_force.into(),
        }
    }
}
