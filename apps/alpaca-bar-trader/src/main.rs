//! Alpaca Bar Trader Binary
//!
//! Runs one trading session: connect, authenticate, subscribe, collect
//! bars until a shutdown signal, then execute the accumulated orders.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin alpaca-bar-trader
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `API_KEY`: Alpaca API key
//! - `API_SECRET_KEY`: Alpaca API secret
//! - `SYMBOL_LIST`: Symbols to subscribe to, e.g. `BTCUSD,ETHUSD`
//!
//! ## Optional
//! - `STREAM_URL`: Bar stream endpoint (default: crypto us feed)
//! - `TRADING_BASE_URL`: Trading REST endpoint (default: paper)
//! - `TLS_INSECURE_SKIP_VERIFY`: Skip TLS verification (default: false)
//! - `DISPATCH_POOL_SIZE`: Frame dispatch workers (default: host cores)
//! - `EXECUTOR_POOL_SIZE`: Order submission parallelism (default: host cores)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use alpaca_bar_trader::infrastructure::config::{Settings, load_dotenv};
use alpaca_bar_trader::infrastructure::telemetry;
use alpaca_bar_trader::{
    BarStreamClient, BarStreamConfig, ClientEvent, FixedSellPolicy, OrderAccumulator,
    OrderExecutor, OrderExecutorConfig, TlsSettings,
};
use tokio::signal;
use tokio::sync::mpsc;

/// How long to wait for each lifecycle acknowledgement.
const ACK_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    load_dotenv();
    telemetry::init();

    tracing::info!("Starting Alpaca Bar Trader");

    let settings = Settings::from_env()?;
    log_settings(&settings);

    let accumulator = Arc::new(OrderAccumulator::new());
    let tls = TlsSettings {
        insecure_skip_verify: settings.tls_insecure_skip_verify,
    };

    let mut executor_config = OrderExecutorConfig::new(
        settings.trading_base_url.clone(),
        settings.credentials.clone(),
    );
    executor_config.parallelism = settings.executor_pool_size;
    executor_config.accept_invalid_certs = settings.tls_insecure_skip_verify;
    let executor = OrderExecutor::new(executor_config)?;

    let (event_tx, mut event_rx) = mpsc::channel::<ClientEvent>(64);
    let client = BarStreamClient::new(
        BarStreamConfig {
            credentials: settings.credentials.clone(),
            tls,
            dispatch_pool_size: settings.dispatch_pool_size,
        },
        Arc::new(FixedSellPolicy),
        Arc::clone(&accumulator),
        event_tx,
    );

    client.connect(&settings.stream_url)?;
    wait_for(&mut event_rx, &ClientEvent::Connected).await?;

    client.authenticate()?;
    wait_for(&mut event_rx, &ClientEvent::Authenticated).await?;

    client.subscribe(&settings.symbols)?;
    wait_for(&mut event_rx, &ClientEvent::Subscribed).await?;

    tracing::info!(symbols = ?settings.symbols, "collecting bars until shutdown signal");
    await_shutdown().await;

    if let Err(error) = client.unsubscribe(&settings.symbols) {
        tracing::warn!(%error, "unsubscribe on shutdown failed");
    }
    client.disconnect();
    drain_until_disconnected(&mut event_rx).await;
    // Frames still queued at disconnect must land in the accumulator
    // before the batch drain.
    client.join_dispatch().await;

    let report = executor.execute_all(&accumulator).await;
    tracing::info!(
        submitted = report.submitted,
        failed = report.failed,
        elapsed_secs = report.elapsed.as_secs_f64(),
        "session complete"
    );

    Ok(())
}

/// Wait for a specific lifecycle event, failing on errors or timeout.
async fn wait_for(
    event_rx: &mut mpsc::Receiver<ClientEvent>,
    wanted: &ClientEvent,
) -> anyhow::Result<()> {
    let deadline = tokio::time::sleep(ACK_TIMEOUT);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(event) if event == *wanted => return Ok(()),
                Some(ClientEvent::Failed(detail)) => {
                    anyhow::bail!("stream connection failed: {detail}");
                }
                Some(ClientEvent::Disconnected) => {
                    anyhow::bail!("stream disconnected while waiting for {wanted:?}");
                }
                Some(other) => {
                    tracing::debug!(event = ?other, "interim lifecycle event");
                }
                None => anyhow::bail!("event channel closed while waiting for {wanted:?}"),
            },
            () = &mut deadline => {
                anyhow::bail!("timed out waiting for {wanted:?}");
            }
        }
    }
}

/// Drain lifecycle events until the stream reports closure.
async fn drain_until_disconnected(event_rx: &mut mpsc::Receiver<ClientEvent>) {
    let deadline = tokio::time::sleep(ACK_TIMEOUT);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(ClientEvent::Disconnected) | None => return,
                Some(event) => tracing::debug!(?event, "event during shutdown"),
            },
            () = &mut deadline => {
                tracing::warn!("timed out waiting for stream closure");
                return;
            }
        }
    }
}

/// Log the parsed configuration.
fn log_settings(settings: &Settings) {
    tracing::info!(
        stream_url = %settings.stream_url,
        trading_base_url = %settings.trading_base_url,
        symbols = ?settings.symbols,
        dispatch_pool_size = settings.dispatch_pool_size,
        executor_pool_size = settings.executor_pool_size,
        "Configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
