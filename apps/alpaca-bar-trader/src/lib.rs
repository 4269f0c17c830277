#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Alpaca Bar Trader - Crypto Bar Stream Trading Client
//!
//! Connects to Alpaca's encrypted crypto bar stream, classifies incoming
//! frames on a worker pool, derives a fixed sell order from every bar,
//! and submits the accumulated batch to the trading REST API on
//! shutdown.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Core trading types and rules
//!   - `bar`: OHLCV bar message
//!   - `order`: Trading API order request
//!   - `policy`: Bar -> order derivation rule
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `stream`: WebSocket client, frame classifier, dispatch pool
//!   - `trading`: Order accumulator and concurrent executor
//!   - `config`: Environment-driven settings
//!   - `telemetry`: Tracing setup
//!
//! # Data Flow
//!
//! ```text
//! Alpaca Bar WS --> Dispatch Pool --> Classifier --> Policy
//!                                                      |
//!             Trading REST API <-- Executor <-- Accumulator
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core trading types with no external integrations.
pub mod domain;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::{Bar, FixedSellPolicy, OrderPolicy, OrderRequest};

// Infrastructure config
pub use infrastructure::config::{ConfigError, Credentials, Settings};

// Stream client (for integration tests)
pub use infrastructure::stream::{
    BarStreamClient, BarStreamConfig, ClientEvent, ConnectionPhase, FrameEvent, StreamClientError,
    TlsSettings, classify,
};

// Trading (for integration tests)
pub use infrastructure::trading::{
    ExecutionReport, OrderAccumulator, OrderApiError, OrderExecutor, OrderExecutorConfig,
};
