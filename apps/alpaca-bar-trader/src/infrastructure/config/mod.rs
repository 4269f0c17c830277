//! Configuration
//!
//! Environment-variable driven configuration for the bar trader.

pub mod settings;

pub use settings::{ConfigError, Credentials, Settings, load_dotenv, parse_symbol_list};
