//! Outbound Control Frame Types
//!
//! Wire format types for frames sent to Alpaca's crypto stream.
//!
//! # Wire Format (JSON)
//! ```json
//! {"action": "auth", "key": "...", "secret": "..."}
//! {"action": "subscribe", "bars": ["BTC/USD"]}
//! {"action": "unsubscribe", "bars": ["BTC/USD"]}
//! ```

use serde::Serialize;

/// Authentication request frame.
#[derive(Debug, Clone, Serialize)]
pub struct AuthRequest {
    /// Action: "auth"
    pub action: &'static str,

    /// API key
    pub key: String,

    /// API secret
    pub secret: String,
}

impl AuthRequest {
    /// Create a new authentication request.
    #[must_use]
    pub const fn new(key: String, secret: String) -> Self {
        Self {
            action: "auth",
            key,
            secret,
        }
    }
}

/// Subscribe/unsubscribe request frame for bar channels.
#[derive(Debug, Clone, Serialize)]
pub struct BarSubscriptionRequest {
    /// Action: "subscribe" or "unsubscribe"
    pub action: &'static str,

    /// Bar symbols named by this request.
    pub bars: Vec<String>,
}

impl BarSubscriptionRequest {
    /// Create a subscribe request for the given symbols.
    #[must_use]
    pub const fn subscribe(bars: Vec<String>) -> Self {
        Self {
            action: "subscribe",
            bars,
        }
    }

    /// Create an unsubscribe request for the given symbols.
    #[must_use]
    pub const fn unsubscribe(bars: Vec<String>) -> Self {
        Self {
            action: "unsubscribe",
            bars,
        }
    }
}
