//! Tracing Setup
//!
//! Structured logging via `tracing`, filtered through `RUST_LOG` with a
//! sane default for the trader's own crate.
//!
//! # Usage
//!
//! ```ignore
//! use alpaca_bar_trader::infrastructure::telemetry;
//!
//! telemetry::init();
//! tracing::info!("starting");
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global tracing subscriber.
///
/// Honors `RUST_LOG`; defaults the trader itself to `info` and quiets
/// the HTTP stack.
#[allow(clippy::expect_used)]
pub fn init() {
    let env_filter = EnvFilter::from_default_env()
        .add_directive(
            "alpaca_bar_trader=info"
                .parse()
                .expect("static directive 'alpaca_bar_trader=info' is valid"),
        )
        .add_directive(
            "hyper=warn"
                .parse()
                .expect("static directive 'hyper=warn' is valid"),
        )
        .add_directive(
            "reqwest=warn"
                .parse()
                .expect("static directive 'reqwest=warn' is valid"),
        );

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
