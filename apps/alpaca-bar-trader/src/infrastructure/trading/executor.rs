//! Order Executor
//!
//! Submits accumulated order requests to the Alpaca trading REST API.
//! Orders are drained as one atomic batch and submitted concurrently,
//! bounded by the configured parallelism. Individual failures are
//! logged and counted; they never abort the batch.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use thiserror::Error;

use crate::domain::OrderRequest;
use crate::infrastructure::config::Credentials;
use crate::infrastructure::trading::OrderAccumulator;

// ============================================================================
// Errors
// ============================================================================

/// Errors from a single order submission.
#[derive(Debug, Error)]
pub enum OrderApiError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("order request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("order rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status returned by the trading API.
        status: StatusCode,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Credentials contain bytes that cannot be sent as header values.
    #[error("credentials are not valid header values")]
    InvalidCredentials,
}

// ============================================================================
// Configuration
// ============================================================================

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for [`OrderExecutor`].
#[derive(Debug, Clone)]
pub struct OrderExecutorConfig {
    /// Base URL of the trading API, without trailing slash.
    pub base_url: String,
    /// API credentials sent as request headers.
    pub credentials: Credentials,
    /// Maximum concurrent in-flight submissions. `0` selects the
    /// host-derived default.
    pub parallelism: usize,
    /// Accept invalid TLS certificates (test endpoints only).
    pub accept_invalid_certs: bool,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl OrderExecutorConfig {
    /// Configuration with defaults for everything but endpoint and
    /// credentials.
    #[must_use]
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
            parallelism: 0,
            accept_invalid_certs: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Host-derived submission parallelism.
fn recommended_parallelism() -> usize {
    std::thread::available_parallelism().map_or(4, NonZeroUsize::get)
}

// ============================================================================
// Execution Report
// ============================================================================

/// Outcome of one batch execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Orders accepted by the trading API.
    pub submitted: usize,
    /// Orders that failed (transport error or rejection).
    pub failed: usize,
    /// Wall-clock time the batch took.
    pub elapsed: Duration,
}

impl ExecutionReport {
    /// Total orders attempted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.submitted + self.failed
    }
}

// ============================================================================
// Executor
// ============================================================================

/// Concurrent order submitter over HTTPS.
pub struct OrderExecutor {
    client: reqwest::Client,
    orders_url: String,
    parallelism: usize,
}

impl OrderExecutor {
    /// Build an executor from config.
    ///
    /// # Errors
    ///
    /// Returns [`OrderApiError::InvalidCredentials`] if the credentials
    /// cannot be sent as header values, or [`OrderApiError::Client`] if
    /// the underlying HTTP client cannot be constructed.
    pub fn new(config: OrderExecutorConfig) -> Result<Self, OrderApiError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(config.credentials.api_key())
            .map_err(|_| OrderApiError::InvalidCredentials)?;
        let mut secret = HeaderValue::from_str(config.credentials.api_secret())
            .map_err(|_| OrderApiError::InvalidCredentials)?;
        key.set_sensitive(true);
        secret.set_sensitive(true);
        headers.insert("APCA-API-KEY-ID", key);
        headers.insert("APCA-API-SECRET-KEY", secret);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(OrderApiError::Client)?;

        let parallelism = if config.parallelism == 0 {
            recommended_parallelism()
        } else {
            config.parallelism
        };

        Ok(Self {
            client,
            orders_url: format!("{}/v2/orders", config.base_url.trim_end_matches('/')),
            parallelism,
        })
    }

    /// Drain the accumulator and submit every pending order.
    ///
    /// An empty accumulator produces a zero report without touching the
    /// network. Submission order within the batch is not defined.
    pub async fn execute_all(&self, accumulator: &OrderAccumulator) -> ExecutionReport {
        let orders = accumulator.drain();
        if orders.is_empty() {
            tracing::info!("no pending orders to execute");
            return ExecutionReport::default();
        }

        let batch_size = orders.len();
        let started = Instant::now();
        tracing::info!(
            orders = batch_size,
            parallelism = self.parallelism,
            "executing order batch"
        );

        let mut report = ExecutionReport::default();
        let mut results = futures::stream::iter(orders)
            .map(|order| async move {
                let symbol = order.symbol.clone();
                (symbol, self.place_order(&order).await)
            })
            .buffer_unordered(self.parallelism);

        while let Some((symbol, result)) = results.next().await {
            match result {
                Ok(()) => {
                    report.submitted += 1;
                    tracing::info!(%symbol, "order submitted");
                }
                Err(error) => {
                    report.failed += 1;
                    tracing::error!(%symbol, %error, "order submission failed");
                }
            }
        }

        report.elapsed = started.elapsed();
        tracing::info!(
            submitted = report.submitted,
            failed = report.failed,
            elapsed_ms = report.elapsed.as_millis(),
            "order batch complete"
        );
        report
    }

    /// POST a single order to the trading API.
    async fn place_order(&self, order: &OrderRequest) -> Result<(), OrderApiError> {
        let response = self
            .client
            .post(&self.orders_url)
            .json(order)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(OrderApiError::Rejected { status, body })
    }
}
