//! Trader Configuration Settings
//!
//! Configuration types for the bar trader, loaded from environment
//! variables (optionally seeded from a `.env` file).

/// Default crypto bar stream endpoint.
const DEFAULT_STREAM_URL: &str = "wss://stream.data.alpaca.markets/v1beta3/crypto/us";

/// Default paper trading REST endpoint.
const DEFAULT_TRADING_BASE_URL: &str = "https://paper-api.alpaca.markets";

/// Alpaca API credentials.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret,
        }
    }

    /// Get the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the API secret.
    #[must_use]
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// Complete trader configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// API credentials.
    pub credentials: Credentials,
    /// Symbols to subscribe to on the bar channel.
    pub symbols: Vec<String>,
    /// WebSocket stream endpoint.
    pub stream_url: String,
    /// Trading REST endpoint (base URL, no trailing slash).
    pub trading_base_url: String,
    /// Skip TLS peer verification (test endpoints only).
    pub tls_insecure_skip_verify: bool,
    /// Frame dispatch worker count (0 = host-derived).
    pub dispatch_pool_size: usize,
    /// Order submission parallelism (0 = host-derived).
    pub executor_pool_size: usize,
}

impl Settings {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or empty, or
    /// if the symbol list parses to nothing.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = require_env("API_KEY")?;
        let api_secret = require_env("API_SECRET_KEY")?;

        let symbols = parse_symbol_list(&require_env("SYMBOL_LIST")?);
        if symbols.is_empty() {
            return Err(ConfigError::EmptySymbolList);
        }

        let stream_url =
            std::env::var("STREAM_URL").unwrap_or_else(|_| DEFAULT_STREAM_URL.to_string());
        let trading_base_url = std::env::var("TRADING_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_TRADING_BASE_URL.to_string());

        let tls_insecure_skip_verify = std::env::var("TLS_INSECURE_SKIP_VERIFY")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            credentials: Credentials::new(api_key, api_secret),
            symbols,
            stream_url,
            trading_base_url,
            tls_insecure_skip_verify,
            dispatch_pool_size: parse_env_usize("DISPATCH_POOL_SIZE", 0),
            executor_pool_size: parse_env_usize("EXECUTOR_POOL_SIZE", 0),
        })
    }
}

/// Load a `.env` file from the working directory or any ancestor.
///
/// Missing files are fine; existing process environment always wins
/// over file contents.
pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Parse a symbol list value into individual symbols.
///
/// Accepts both a plain comma-separated list (`BTCUSD,ETHUSD`) and a
/// bracketed, quoted form (`["BTCUSD", "ETHUSD"]`). Whitespace and
/// empty entries are dropped.
#[must_use]
pub fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|entry| entry.trim().trim_matches('"').trim_matches('\'').trim())
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// The symbol list contained no usable symbols.
    #[error("SYMBOL_LIST contained no symbols")]
    EmptySymbolList,
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    let value =
        std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))?;
    if value.is_empty() {
        return Err(ConfigError::EmptyValue(key.to_string()));
    }
    Ok(value)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
