//! Trading Adapter
//!
//! Bridges event handling and order execution:
//!
//! - `accumulator`: thread-safe buffer of derived order requests
//! - `executor`: concurrent submission against the trading REST API

pub mod accumulator;
pub mod executor;

pub use accumulator::OrderAccumulator;
pub use executor::{ExecutionReport, OrderApiError, OrderExecutor, OrderExecutorConfig};
