//! Domain layer - Wire-independent value types and trading policy.

pub mod bar;
pub mod order;
pub mod policy;

pub use bar::Bar;
pub use order::OrderRequest;
pub use policy::{FixedSellPolicy, OrderPolicy, strip_quote_infix};
