use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Clone, Debug, Default, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub endpoint: EndpointConfig,

    #[command(flatten)]
    pub identity: IdentityConfig,

    #[command(flatten)]
    pub reconnect: ReconnectConfig,

    #[command(flatten)]
    pub receipts: ReceiptConfig,

    #[command(flatten)]
    pub notices: NoticeConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct EndpointConfig {
    /// Explicit push endpoint URL, bypassing origin-based derivation
    #[arg(long, env = "PORTFOLIO_NOTIFY_WS_URL")]
    pub ws_url: Option<Url>,

    /// Origin of the hosting page; its scheme selects ws or wss
    #[arg(long, env = "PORTFOLIO_NOTIFY_ORIGIN", default_value = "http://localhost:3000")]
    pub origin: Url,

    /// Path prefix of the backend API on the origin
    #[arg(long, env = "PORTFOLIO_NOTIFY_API_ROOT", default_value = "/api")]
    pub api_root: String,

    /// Path of the push endpoint under the API root
    #[arg(long, env = "PORTFOLIO_NOTIFY_WS_PATH", default_value = "/ws")]
    pub ws_path: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            ws_url: None,
            origin: Url::parse("http://localhost:3000").expect("static default URL"),
            api_root: "/api".to_string(),
            ws_path: "/ws".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Args)]
pub struct IdentityConfig {
    /// Subscriber identity to connect as
    #[arg(long, env = "PORTFOLIO_NOTIFY_USER_ID")]
    pub user_id: Option<String>,

    /// JSON session file holding the logged-in user (`ID` or `id` field), read on every attempt
    #[arg(long, env = "PORTFOLIO_NOTIFY_SESSION_FILE", conflicts_with = "user_id")]
    pub session_file: Option<PathBuf>,
}

#[derive(Clone, Debug, Args)]
pub struct ReconnectConfig {
    /// Delay before the first connection attempt
    #[arg(long, env = "PORTFOLIO_NOTIFY_ACTIVATION_DELAY_MS", default_value_t = 100)]
    pub activation_delay_ms: u64,

    /// Reconnect delay floor, restored after every successful open
    #[arg(long, env = "PORTFOLIO_NOTIFY_MIN_BACKOFF_MS", default_value_t = 3000)]
    pub min_backoff_ms: u64,

    /// Reconnect delay ceiling
    #[arg(long, env = "PORTFOLIO_NOTIFY_MAX_BACKOFF_MS", default_value_t = 30_000)]
    pub max_backoff_ms: u64,

    /// Multiplier applied to the reconnect delay after each failure
    #[arg(long, env = "PORTFOLIO_NOTIFY_BACKOFF_FACTOR", default_value_t = 1.5)]
    pub backoff_factor: f32,

    /// Time allowed for the websocket handshake before the attempt counts as failed
    #[arg(long, env = "PORTFOLIO_NOTIFY_CONNECT_TIMEOUT_SECS", default_value_t = 10)]
    pub connect_timeout_secs: u64,
}

impl ReconnectConfig {
    #[must_use]
    pub const fn activation_delay(&self) -> Duration {
        Duration::from_millis(self.activation_delay_ms)
    }

    #[must_use]
    pub const fn min_backoff(&self) -> Duration {
        Duration::from_millis(self.min_backoff_ms)
    }

    #[must_use]
    pub const fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            activation_delay_ms: 100,
            min_backoff_ms: 3000,
            max_backoff_ms: 30_000,
            backoff_factor: 1.5,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct ReceiptConfig {
    /// Root URL of the backend REST API that records read-receipts
    #[arg(long, env = "PORTFOLIO_NOTIFY_API_URL", default_value = "http://localhost:8080")]
    pub api_url: Url,

    /// Timeout for a single read-receipt request
    #[arg(long, env = "PORTFOLIO_NOTIFY_RECEIPT_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse("http://localhost:8080").expect("static default URL"),
            timeout_secs: 10,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct NoticeConfig {
    /// Title shown when a notification carries none
    #[arg(long, env = "PORTFOLIO_NOTIFY_DEFAULT_TITLE", default_value = "New notification")]
    pub default_title: String,

    /// Capacity of the refresh signal broadcast channel
    #[arg(long, env = "PORTFOLIO_NOTIFY_REFRESH_CHANNEL_CAPACITY", default_value_t = 16)]
    pub refresh_channel_capacity: usize,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self { default_title: "New notification".to_string(), refresh_channel_capacity: 16 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Default, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "PORTFOLIO_NOTIFY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP gRPC endpoint for traces and metrics export
    #[arg(long, env = "PORTFOLIO_NOTIFY_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
