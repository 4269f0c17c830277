//! Alpaca WebSocket Stream Adapter
//!
//! Implements the encrypted stream connection to Alpaca's crypto data
//! feed (JSON codec):
//!
//! - `messages`: outbound control frame types
//! - `classifier`: raw frame -> typed event classification
//! - `dispatch`: bounded worker pool for classified-event handling
//! - `tls`: pluggable TLS connector factory
//! - `client`: connection state machine and run loop

pub mod classifier;
pub mod client;
pub mod dispatch;
pub mod messages;
pub mod tls;

pub use classifier::{FrameEvent, classify};
pub use client::{
    BarStreamClient, BarStreamConfig, ClientEvent, ConnectionPhase, StreamClientError,
};
pub use dispatch::{DispatchError, DispatchPool, FrameHandler};
pub use messages::{AuthRequest, BarSubscriptionRequest};
pub use tls::TlsSettings;
