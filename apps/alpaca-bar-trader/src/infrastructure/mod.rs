//! Infrastructure layer - Adapters and external integrations.

pub mod config;
pub mod stream;
pub mod telemetry;
pub mod trading;
