//! Bar Stream Client
//!
//! Connection state machine for Alpaca's crypto bar stream.
//!
//! # Stream URL
//!
//! - Production: `wss://stream.data.alpaca.markets/v1beta3/crypto/us`
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected -> Connecting -> Open -> Closed | Failed
//! ```
//!
//! Authentication and subscription are acknowledgement events layered on
//! top of `Open`, not separate phases; the transport can be open while
//! both are still pending. Lifecycle progress is reported over one
//! [`ClientEvent`] channel consumed by the embedding application.
//!
//! The run loop owns the WebSocket and runs on its own spawned task.
//! Inbound text frames are handed to the dispatch pool; handler work
//! (classification, order derivation, accumulation) never runs on the
//! transport task. There is no automatic reconnection: a transport
//! failure is reported and the surrounding application owns retry policy.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::domain::OrderPolicy;
use crate::infrastructure::config::Credentials;
use crate::infrastructure::trading::OrderAccumulator;

use super::classifier::{FrameEvent, classify};
use super::dispatch::{DispatchPool, FrameHandler};
use super::messages::{AuthRequest, BarSubscriptionRequest};
use super::tls::TlsSettings;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

// =============================================================================
// Error Type
// =============================================================================

/// Errors from the bar stream client.
#[derive(Debug, thiserror::Error)]
pub enum StreamClientError {
    /// The endpoint could not be parsed into a connection request.
    /// Fatal at the call site; nothing was started.
    #[error("invalid stream endpoint {url}: {detail}")]
    InvalidEndpoint {
        /// The offending endpoint.
        url: String,
        /// Parser diagnostic.
        detail: String,
    },

    /// A connection attempt is already running or open.
    #[error("client is already connecting or connected")]
    AlreadyConnected,

    /// Operation requires an open connection.
    #[error("not connected to the stream")]
    NotConnected,

    /// Control frame serialization failed.
    #[error("failed to serialize control frame: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The run loop has gone away.
    #[error("outbound channel closed")]
    ChannelClosed,
}

// =============================================================================
// Lifecycle Events
// =============================================================================

/// Lifecycle events emitted to the embedding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Transport opened.
    Connected,
    /// Server acknowledged authentication (forwarded once per ack).
    Authenticated,
    /// Server acknowledged a subscription change (forwarded once per ack).
    Subscribed,
    /// Transport closed or failed; no automatic recovery.
    Disconnected,
    /// The connection attempt itself failed.
    Failed(String),
}

// =============================================================================
// Connection State
// =============================================================================

/// Connection lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// Not yet connected.
    #[default]
    Disconnected,
    /// Connection attempt in progress.
    Connecting,
    /// Transport open; control frames may be sent.
    Open,
    /// Closed normally.
    Closed,
    /// Terminated by a transport error.
    Failed,
}

/// Shared mutable connection record. All mutation happens under one lock;
/// the accumulator has its own independent lock and the two are never
/// held together.
#[derive(Default)]
struct ConnectionState {
    phase: ConnectionPhase,
    outbound: Option<mpsc::UnboundedSender<OutboundCommand>>,
    subscriptions: HashSet<String>,
}

enum OutboundCommand {
    Frame(String),
    Close,
}

// =============================================================================
// Client
// =============================================================================

/// Configuration for the bar stream client.
#[derive(Debug, Clone)]
pub struct BarStreamConfig {
    /// API credentials for the auth frame.
    pub credentials: Credentials,
    /// TLS behaviour.
    pub tls: TlsSettings,
    /// Dispatch pool size (0 = host parallelism).
    pub dispatch_pool_size: usize,
}

/// WebSocket client maintaining the bar stream connection.
pub struct BarStreamClient {
    credentials: Credentials,
    tls: TlsSettings,
    state: Arc<Mutex<ConnectionState>>,
    event_tx: mpsc::Sender<ClientEvent>,
    dispatch: Arc<DispatchPool>,
}

impl BarStreamClient {
    /// Create a new client.
    ///
    /// Bars surviving classification are mapped through `policy` and
    /// appended to `accumulator` by the dispatch pool workers.
    #[must_use]
    pub fn new(
        config: BarStreamConfig,
        policy: Arc<dyn OrderPolicy>,
        accumulator: Arc<OrderAccumulator>,
        event_tx: mpsc::Sender<ClientEvent>,
    ) -> Self {
        let pool_size = if config.dispatch_pool_size == 0 {
            DispatchPool::recommended_size()
        } else {
            config.dispatch_pool_size
        };

        let handler = Arc::new(BarFrameHandler {
            event_tx: event_tx.clone(),
            accumulator,
            policy,
        });
        let dispatch = Arc::new(DispatchPool::new(pool_size, handler));

        Self {
            credentials: config.credentials,
            tls: config.tls,
            state: Arc::new(Mutex::new(ConnectionState::default())),
            event_tx,
            dispatch,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> ConnectionPhase {
        self.state.lock().phase
    }

    /// Snapshot of the tracked subscription set.
    #[must_use]
    pub fn subscriptions(&self) -> HashSet<String> {
        self.state.lock().subscriptions.clone()
    }

    /// Open the stream connection.
    ///
    /// Validates the endpoint up front and fails fast if it cannot be
    /// turned into a connection request; on success the run loop is
    /// spawned on its own task and the client transitions to
    /// `Connecting`. Transport-level failures after this point are
    /// reported as [`ClientEvent::Failed`], never retried.
    pub fn connect(&self, url: &str) -> Result<(), StreamClientError> {
        let request =
            url.into_client_request()
                .map_err(|e| StreamClientError::InvalidEndpoint {
                    url: url.to_string(),
                    detail: e.to_string(),
                })?;

        {
            let mut state = self.state.lock();
            if matches!(
                state.phase,
                ConnectionPhase::Connecting | ConnectionPhase::Open
            ) {
                return Err(StreamClientError::AlreadyConnected);
            }
            state.phase = ConnectionPhase::Connecting;
        }

        tracing::info!(%url, "connecting to bar stream");

        let state = Arc::clone(&self.state);
        let event_tx = self.event_tx.clone();
        let dispatch = Arc::clone(&self.dispatch);
        let connector = self.tls.connector();
        tokio::spawn(async move {
            run_loop(request, connector, state, event_tx, dispatch).await;
        });

        Ok(())
    }

    /// Send the authentication frame.
    ///
    /// Valid only while `Open`; otherwise a reported non-fatal error and
    /// nothing is sent.
    pub fn authenticate(&self) -> Result<(), StreamClientError> {
        let frame = serde_json::to_string(&AuthRequest::new(
            self.credentials.api_key().to_string(),
            self.credentials.api_secret().to_string(),
        ))?;

        self.send_when_open(frame, "authenticate")?;
        tracing::info!("sent authentication request");
        Ok(())
    }

    /// Subscribe to bar channels for the given symbols.
    ///
    /// Sends one subscribe frame naming all symbols and records them in
    /// the tracked subscription set. Valid only while `Open`.
    pub fn subscribe(&self, symbols: &[String]) -> Result<(), StreamClientError> {
        let frame = serde_json::to_string(&BarSubscriptionRequest::subscribe(symbols.to_vec()))?;

        let mut state = self.state.lock();
        Self::check_open(&state, "subscribe")?;
        Self::send_locked(&state, frame)?;
        state.subscriptions.extend(symbols.iter().cloned());

        tracing::info!(symbols = ?symbols, "sent subscribe request");
        Ok(())
    }

    /// Unsubscribe from bar channels for the given symbols.
    ///
    /// The symbols are removed from the tracked set immediately, without
    /// waiting for the server acknowledgement (optimistic removal).
    /// Unsubscribing a symbol that was never subscribed is a no-op.
    pub fn unsubscribe(&self, symbols: &[String]) -> Result<(), StreamClientError> {
        let frame = serde_json::to_string(&BarSubscriptionRequest::unsubscribe(symbols.to_vec()))?;

        let mut state = self.state.lock();
        Self::check_open(&state, "unsubscribe")?;
        Self::send_locked(&state, frame)?;
        for symbol in symbols {
            state.subscriptions.remove(symbol);
        }

        tracing::info!(symbols = ?symbols, "sent unsubscribe request");
        Ok(())
    }

    /// Request a normal closure of the connection.
    ///
    /// Idempotent: calling while not `Open` is a no-op. In-flight
    /// dispatch work runs to completion; there is no hard-cancel path.
    pub fn disconnect(&self) {
        let mut state = self.state.lock();
        if state.phase != ConnectionPhase::Open {
            return;
        }

        if let Some(outbound) = state.outbound.take() {
            let _ = outbound.send(OutboundCommand::Close);
        }
        state.phase = ConnectionPhase::Closed;
        tracing::info!("disconnect requested");
    }

    /// Close the frame queue and wait for queued dispatch work to finish.
    ///
    /// Call after the stream has reported closure: once this returns,
    /// every frame read from the transport has been classified and its
    /// derived orders appended to the accumulator. The client cannot
    /// dispatch further frames afterwards.
    pub async fn join_dispatch(&self) {
        self.dispatch.close_and_join().await;
    }

    fn check_open(state: &ConnectionState, operation: &str) -> Result<(), StreamClientError> {
        if state.phase == ConnectionPhase::Open && state.outbound.is_some() {
            Ok(())
        } else {
            tracing::warn!(
                operation,
                phase = ?state.phase,
                "operation requires an open connection, skipping"
            );
            Err(StreamClientError::NotConnected)
        }
    }

    fn send_locked(state: &ConnectionState, frame: String) -> Result<(), StreamClientError> {
        state
            .outbound
            .as_ref()
            .ok_or(StreamClientError::NotConnected)?
            .send(OutboundCommand::Frame(frame))
            .map_err(|_| StreamClientError::ChannelClosed)
    }

    fn send_when_open(&self, frame: String, operation: &str) -> Result<(), StreamClientError> {
        let state = self.state.lock();
        Self::check_open(&state, operation)?;
        Self::send_locked(&state, frame)
    }
}

// =============================================================================
// Run Loop
// =============================================================================

/// Drive the connection from handshake to terminal state.
async fn run_loop(
    request: tokio_tungstenite::tungstenite::handshake::client::Request,
    connector: Option<tokio_tungstenite::Connector>,
    state: Arc<Mutex<ConnectionState>>,
    event_tx: mpsc::Sender<ClientEvent>,
    dispatch: Arc<DispatchPool>,
) {
    let connected =
        tokio_tungstenite::connect_async_tls_with_config(request, None, false, connector).await;

    let (ws_stream, _response) = match connected {
        Ok(ok) => ok,
        Err(e) => {
            tracing::error!(error = %e, "stream connection failed");
            state.lock().phase = ConnectionPhase::Failed;
            let _ = event_tx.send(ClientEvent::Failed(e.to_string())).await;
            return;
        }
    };

    let (write, read) = ws_stream.split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

    {
        let mut state = state.lock();
        state.phase = ConnectionPhase::Open;
        state.outbound = Some(outbound_tx);
    }
    tracing::info!("connection opened");
    let _ = event_tx.send(ClientEvent::Connected).await;

    let terminal = pump_messages(write, read, outbound_rx, &dispatch).await;

    {
        let mut state = state.lock();
        state.phase = terminal;
        state.outbound = None;
    }
    match terminal {
        ConnectionPhase::Failed => tracing::error!("connection failed"),
        _ => tracing::info!("connection closed"),
    }
    let _ = event_tx.send(ClientEvent::Disconnected).await;
}

/// Pump outbound commands and inbound frames until a terminal state.
async fn pump_messages(
    mut write: WsSink,
    mut read: WsSource,
    mut outbound_rx: mpsc::UnboundedReceiver<OutboundCommand>,
    dispatch: &DispatchPool,
) -> ConnectionPhase {
    let mut closing = false;
    loop {
        tokio::select! {
            command = outbound_rx.recv(), if !closing => match command {
                Some(OutboundCommand::Frame(text)) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        tracing::error!(error = %e, "failed to send control frame");
                        return ConnectionPhase::Failed;
                    }
                }
                Some(OutboundCommand::Close) | None => {
                    // Normal closure; the read side drains until the
                    // server answers or the stream ends.
                    let _ = write.send(Message::Close(None)).await;
                    closing = true;
                }
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if text.is_empty() {
                        tracing::debug!("empty text frame, ignoring");
                    } else if dispatch.submit(text.to_string()).await.is_err() {
                        tracing::error!("dispatch pool closed, dropping frame");
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::debug!(len = data.len(), "binary frame, ignoring");
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) => {
                    tracing::info!("server sent close frame");
                    return ConnectionPhase::Closed;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::error!(error = %e, "stream read error");
                    return ConnectionPhase::Failed;
                }
                None => {
                    return ConnectionPhase::Closed;
                }
            }
        }
    }
}

// =============================================================================
// Frame Handler
// =============================================================================

/// Dispatch-pool handler: classifies a frame and reacts to each event.
struct BarFrameHandler {
    event_tx: mpsc::Sender<ClientEvent>,
    accumulator: Arc<OrderAccumulator>,
    policy: Arc<dyn OrderPolicy>,
}

#[async_trait::async_trait]
impl FrameHandler for BarFrameHandler {
    async fn handle(&self, payload: String) {
        for event in classify(&payload) {
            match event {
                FrameEvent::AuthAck => {
                    tracing::info!("authentication successful");
                    let _ = self.event_tx.send(ClientEvent::Authenticated).await;
                }
                FrameEvent::SubscriptionAck => {
                    tracing::info!("subscription acknowledged");
                    let _ = self.event_tx.send(ClientEvent::Subscribed).await;
                }
                FrameEvent::Bar(bar) => {
                    if let Some(order) = self.policy.derive(&bar) {
                        let pending = self.accumulator.append(order);
                        tracing::info!(
                            pending,
                            symbol = %bar.symbol,
                            open = bar.open,
                            close = bar.close,
                            time = %bar.timestamp,
                            "bar received"
                        );
                    }
                }
                FrameEvent::Unrecognized(value) => {
                    tracing::debug!(%value, "unrecognized stream message");
                }
                FrameEvent::ParseError { payload, detail } => {
                    tracing::error!(%detail, %payload, "failed to parse stream frame");
                }
            }
        }
    }
}
