//! Order Derivation Policy
//!
//! Maps an inbound bar to zero or one order request. The rule is
//! isolated behind the [`OrderPolicy`] trait so the trading policy can
//! be replaced without touching dispatch logic.
//!
//! The default policy strips the 3-character quote-currency code
//! embedded at a fixed offset in the stream symbol (`BTCUSD` -> `BTC`)
//! and emits a fixed-size market sell.

use super::bar::Bar;
use super::order::OrderRequest;

/// Offset of the quote-currency code within a stream symbol.
const QUOTE_INFIX_OFFSET: usize = 3;

/// Length of the quote-currency code.
const QUOTE_INFIX_LEN: usize = 3;

/// Strategy mapping a bar to a trade decision.
pub trait OrderPolicy: Send + Sync {
    /// Derive zero or one order from a bar.
    fn derive(&self, bar: &Bar) -> Option<OrderRequest>;
}

/// Remove the quote-currency infix from a stream symbol.
///
/// Returns `None` when the symbol is too short to contain the infix;
/// conforming symbols lose exactly the [`QUOTE_INFIX_LEN`] characters
/// at [`QUOTE_INFIX_OFFSET`] and keep everything else unchanged.
#[must_use]
pub fn strip_quote_infix(symbol: &str) -> Option<String> {
    if symbol.len() < QUOTE_INFIX_OFFSET + QUOTE_INFIX_LEN
        || !symbol.is_char_boundary(QUOTE_INFIX_OFFSET)
        || !symbol.is_char_boundary(QUOTE_INFIX_OFFSET + QUOTE_INFIX_LEN)
    {
        return None;
    }

    let mut base = String::with_capacity(symbol.len() - QUOTE_INFIX_LEN);
    base.push_str(&symbol[..QUOTE_INFIX_OFFSET]);
    base.push_str(&symbol[QUOTE_INFIX_OFFSET + QUOTE_INFIX_LEN..]);
    Some(base)
}

/// Default policy: fixed-quantity market sell of the base symbol.
#[derive(Debug, Clone, Default)]
pub struct FixedSellPolicy;

impl OrderPolicy for FixedSellPolicy {
    fn derive(&self, bar: &Bar) -> Option<OrderRequest> {
        let Some(symbol) = strip_quote_infix(&bar.symbol) else {
            tracing::warn!(
                symbol = %bar.symbol,
                "bar symbol too short for quote-infix stripping, skipping order"
            );
            return None;
        };

        Some(OrderRequest::new(symbol, "0.001", "sell", "market", "gtc"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("BTCUSD", Some("BTC"); "btc usd pair")]
    #[test_case("ETHUSD", Some("ETH"); "eth usd pair")]
    #[test_case("DOGEUSDT", Some("DOGDT"); "longer symbol keeps tail")]
    #[test_case("BTCUS", None; "one short of infix end")]
    #[test_case("BTC", None; "only offset prefix")]
    #[test_case("", None; "empty symbol")]
    fn strips_fixed_infix(symbol: &str, expected: Option<&str>) {
        assert_eq!(
            strip_quote_infix(symbol),
            expected.map(ToString::to_string)
        );
    }

    #[test]
    fn derives_market_sell_from_bar() {
        let bar = Bar {
            msg_type: "b".to_string(),
            symbol: "BTCUSD".to_string(),
            ..Bar::default()
        };

        let order = FixedSellPolicy.derive(&bar).unwrap();
        assert_eq!(order.symbol, "BTC");
        assert_eq!(order.qty, "0.001");
        assert_eq!(order.side, "sell");
        assert_eq!(order.order_type, "market");
        assert_eq!(order.time_in_force, "gtc");
    }

    #[test]
    fn short_symbol_yields_no_order() {
        let bar = Bar {
            symbol: "BTC".to_string(),
            ..Bar::default()
        };
        assert!(FixedSellPolicy.derive(&bar).is_none());
    }

    proptest! {
        /// For any 3-char ASCII prefix, 3-char infix, and ASCII tail, the
        /// rule removes exactly the infix and keeps prefix and tail intact.
        #[test]
        fn removes_exactly_the_infix(
            prefix in "[A-Z]{3}",
            infix in "[A-Z]{3}",
            tail in "[A-Z]{0,8}",
        ) {
            let symbol = format!("{prefix}{infix}{tail}");
            let base = strip_quote_infix(&symbol).unwrap();
            prop_assert_eq!(base, format!("{prefix}{tail}"));
        }

        /// Symbols shorter than offset + infix never produce a base symbol.
        #[test]
        fn short_symbols_are_rejected(symbol in "[A-Z]{0,5}") {
            prop_assert!(strip_quote_infix(&symbol).is_none());
        }
    }
}
