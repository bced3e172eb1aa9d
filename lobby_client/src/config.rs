//! Connection settings supplied by the application

use crate::errors::ConfigError;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8200;
pub const DEFAULT_CLIENT_NAME: &str = concat!("lobby_client ", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAddress {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub tls: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16, tls: bool) -> Self {
        Self {
            host: host.into(),
            port,
            tls,
        }
    }
}

/// An account name and password.
///
/// Both are sent as single space-separated tokens, so neither may be empty or
/// contain whitespace.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Result<Self, ConfigError> {
        let ret = Self {
            username: username.to_string(),
            password: password.to_string(),
        };
        ret.validate()?;
        Ok(ret)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_token(&self.username)
            .map_err(|_| ConfigError::InvalidUsername(self.username.clone()))?;
        validate_token(&self.password).map_err(|_| ConfigError::InvalidPassword)?;
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<hidden>")
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TimingConfig {
    /// Minimum gap between queued outbound lines
    pub pacing_interval_ms: u64,
    /// Interval between keepalive probes
    pub ping_interval_ms: u64,
    /// Silence after which the connection is considered dead
    pub ping_timeout_ms: u64,
    /// Delay between transport connect and sending `LOGIN`
    pub login_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            pacing_interval_ms: 1500,
            ping_interval_ms: 29_000,
            ping_timeout_ms: 90_000,
            login_delay_ms: 1000,
        }
    }
}

impl TimingConfig {
    /// Intervals that drive timers must be non-zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("pacing-interval-ms", self.pacing_interval_ms),
            ("ping-interval-ms", self.ping_interval_ms),
            ("ping-timeout-ms", self.ping_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroInterval(name));
            }
        }
        Ok(())
    }

    pub fn pacing_interval(&self) -> Duration {
        Duration::from_millis(self.pacing_interval_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn login_delay(&self) -> Duration {
        Duration::from_millis(self.login_delay_ms)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ReconnectConfig {
    pub enabled: bool,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Give up after this long without a successful connection. `None` retries
    /// forever.
    pub max_elapsed_ms: Option<u64>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_ms: 2000,
            max_delay_ms: 60_000,
            max_elapsed_ms: None,
        }
    }
}

impl ReconnectConfig {
    pub fn backoff(&self) -> backoff::ExponentialBackoff {
        backoff::ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.initial_delay_ms))
            .with_max_interval(Duration::from_millis(self.max_delay_ms))
            .with_max_elapsed_time(self.max_elapsed_ms.map(Duration::from_millis))
            .build()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
    pub server: ServerAddress,
    /// Lobby login, sent once the login delay has passed
    #[serde(default)]
    pub login: Option<Credentials>,
    /// Credentials for SASL authentication during capability negotiation
    #[serde(default)]
    pub sasl: Option<Credentials>,
    /// Channels to join once registered
    #[serde(default)]
    pub channels: Vec<String>,
    /// Capabilities to request if the server offers them
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default = "default_client_name")]
    pub client_name: String,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_string()
}

impl ClientConfig {
    pub fn new(server: ServerAddress) -> Self {
        Self {
            server,
            login: None,
            sasl: None,
            channels: Vec::new(),
            capabilities: Vec::new(),
            client_name: default_client_name(),
            timing: TimingConfig::default(),
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Check everything that would otherwise only fail once sent
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(login) = &self.login {
            login.validate()?;
        }
        if let Some(sasl) = &self.sasl {
            sasl.validate()?;
        }
        for channel in &self.channels {
            validate_channel(channel)?;
        }
        for cap in &self.capabilities {
            validate_capability(cap)?;
        }
        self.timing.validate()
    }
}

fn validate_token(token: &str) -> Result<(), ()> {
    if token.is_empty() || token.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Err(())
    } else {
        Ok(())
    }
}

pub(crate) fn validate_channel(name: &str) -> Result<(), ConfigError> {
    if name.starts_with(':') || name.contains(',') {
        return Err(ConfigError::InvalidChannel(name.to_string()));
    }
    validate_token(name).map_err(|_| ConfigError::InvalidChannel(name.to_string()))
}

pub(crate) fn validate_target(name: &str) -> Result<(), ConfigError> {
    if name.starts_with(':') {
        return Err(ConfigError::InvalidTarget(name.to_string()));
    }
    validate_token(name).map_err(|_| ConfigError::InvalidTarget(name.to_string()))
}

pub(crate) fn validate_capability(name: &str) -> Result<(), ConfigError> {
    if name.starts_with(['-', ':']) || name.contains('=') {
        return Err(ConfigError::InvalidCapability(name.to_string()));
    }
    validate_token(name).map_err(|_| ConfigError::InvalidCapability(name.to_string()))
}

pub(crate) fn validate_email(email: &str) -> Result<(), ConfigError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            validate_token(email).map_err(|_| ConfigError::InvalidEmail(email.to_string()))
        }
        _ => Err(ConfigError::InvalidEmail(email.to_string())),
    }
}
