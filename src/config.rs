//! Configuration module for loading TOML configuration with environment overrides.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse TOML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Invalid configuration value.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Upstream market-data API configuration.
    pub upstream: UpstreamConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Inbound rate limiting.
    pub rate_limit: RateLimitConfig,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_level: LogLevel,
    /// Deployment mode.
    pub environment: Environment,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port number to listen on.
    pub port: u16,
    /// Directory with the static frontend, served for unmatched paths.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            static_dir: None,
        }
    }
}

/// Upstream market-data API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL, e.g. `https://pro-api.coinmarketcap.com/v1`.
    pub base_url: String,
    /// Key used to bootstrap the key file on first run.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Location of the key file.
    pub keys_file: PathBuf,
    /// Hours between automatic usage resets; 0 disables them.
    pub key_reset_interval_hours: u64,
}

/// Longest accepted key usage reset interval: one year.
pub const MAX_KEY_RESET_INTERVAL_HOURS: u64 = 24 * 365;

impl UpstreamConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Interval between automatic key usage resets, `None` when disabled.
    #[must_use]
    pub fn key_reset_interval(&self) -> Option<Duration> {
        (self.key_reset_interval_hours > 0)
            .then(|| Duration::from_secs(self.key_reset_interval_hours.saturating_mul(3600)))
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: market_client::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: 10,
            keys_file: PathBuf::from("config/apiKeys/coinmarketcap.json"),
            key_reset_interval_hours: 24,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string. Without it the in-memory stores are used.
    pub url: Option<String>,
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection.
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

/// Inbound rate limiting per client IP.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// Requests allowed per window.
    pub max_requests: u32,
    /// Identify clients by `X-Forwarded-For`/`X-Real-IP` instead of the
    /// socket peer. Only enable behind a proxy that overwrites these headers.
    pub trust_proxy: bool,
}

impl RateLimitConfig {
    /// Window length as a [`Duration`].
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 15 * 60 * 1000,
            max_requests: 100,
            trust_proxy: false,
        }
    }
}

/// Default log level.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct LogLevel(pub String);

impl Default for LogLevel {
    fn default() -> Self {
        Self("info".to_string())
    }
}

/// Deployment mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Error details are included in responses.
    #[default]
    Development,
    /// Error details stay in the server log.
    Production,
}

impl Environment {
    /// Whether error details may be sent to clients.
    #[must_use]
    pub fn exposes_error_details(self) -> bool {
        self == Self::Development
    }

    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::InvalidValue(format!(
                "unknown environment: {}",
                other
            ))),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Arguments
    /// * `content` - TOML content as string.
    ///
    /// # Errors
    /// Returns error if content cannot be parsed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file named by `CONFIG_PATH` (if any) and applies environment
    /// overrides.
    ///
    /// # Errors
    /// Returns error if the file or an override is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("CONFIG_PATH") {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides looked up by variable name.
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_number("PORT", &port)?;
        }
        if let Some(dir) = lookup("STATIC_DIR") {
            self.server.static_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = lookup("COINMARKETCAP_API_URL") {
            self.upstream.base_url = url;
        }
        if let Some(key) = lookup("COINMARKETCAP_API_KEY") {
            self.upstream.api_key = Some(key);
        }
        if let Some(path) = lookup("API_KEYS_FILE") {
            self.upstream.keys_file = PathBuf::from(path);
        }
        if let Some(hours) = lookup("KEY_RESET_INTERVAL_HOURS") {
            self.upstream.key_reset_interval_hours =
                parse_number("KEY_RESET_INTERVAL_HOURS", &hours)?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(max) = lookup("DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_number("DB_MAX_CONNECTIONS", &max)?;
        }
        if let Some(window) = lookup("RATE_LIMIT_WINDOW_MS") {
            self.rate_limit.window_ms = parse_number("RATE_LIMIT_WINDOW_MS", &window)?;
        }
        if let Some(max) = lookup("RATE_LIMIT_MAX_REQUESTS") {
            self.rate_limit.max_requests = parse_number("RATE_LIMIT_MAX_REQUESTS", &max)?;
        }
        if let Some(trust) = lookup("RATE_LIMIT_TRUST_PROXY") {
            self.rate_limit.trust_proxy = parse_bool("RATE_LIMIT_TRUST_PROXY", &trust)?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = LogLevel(level);
        }
        if let Some(env) = lookup("APP_ENV") {
            self.environment = Environment::parse(&env)?;
        }
        Ok(())
    }

    /// Validates the configuration values.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "upstream base_url cannot be empty".to_string(),
            ));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "upstream timeout_secs must be positive".to_string(),
            ));
        }
        if self.upstream.key_reset_interval_hours > MAX_KEY_RESET_INTERVAL_HOURS {
            return Err(ConfigError::InvalidValue(format!(
                "upstream key_reset_interval_hours cannot exceed {}",
                MAX_KEY_RESET_INTERVAL_HOURS
            )));
        }
        if self.rate_limit.window_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "rate_limit window_ms must be positive".to_string(),
            ));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::InvalidValue(
                "rate_limit max_requests must be positive".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "database max_connections must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{} must be a number, got {}", name, value)))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!(
            "{} must be a boolean, got {}",
            name, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
log_level = "debug"
environment = "production"

[server]
host = "127.0.0.1"
port = 3000
static_dir = "frontend"

[upstream]
base_url = "https://sandbox-api.coinmarketcap.com/v1"
api_key = "sandbox-key"
timeout_secs = 5
keys_file = "/tmp/keys.json"
key_reset_interval_hours = 12

[database]
url = "postgres://localhost/crypto"
max_connections = 4

[rate_limit]
window_ms = 60000
max_requests = 20
trust_proxy = true
"#;

        let config = Config::parse(toml_content).expect("should parse");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.static_dir, Some(PathBuf::from("frontend")));
        assert_eq!(
            config.upstream.base_url,
            "https://sandbox-api.coinmarketcap.com/v1"
        );
        assert_eq!(config.upstream.api_key.as_deref(), Some("sandbox-key"));
        assert_eq!(config.upstream.timeout(), Duration::from_secs(5));
        assert_eq!(config.upstream.key_reset_interval_hours, 12);
        assert_eq!(
            config.database.url.as_deref(),
            Some("postgres://localhost/crypto")
        );
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.database.acquire_timeout_secs, 5);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(60));
        assert_eq!(config.rate_limit.max_requests, 20);
        assert!(config.rate_limit.trust_proxy);
        assert_eq!(config.log_level, LogLevel("debug".to_string()));
        assert_eq!(config.environment, Environment::Production);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").expect("should parse");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.upstream.timeout(), Duration::from_secs(10));
        assert_eq!(
            config.upstream.keys_file,
            PathBuf::from("config/apiKeys/coinmarketcap.json")
        );
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(900));
        assert!(!config.rate_limit.trust_proxy);
        assert_eq!(
            config.upstream.key_reset_interval(),
            Some(Duration::from_secs(24 * 3600))
        );
        assert!(config.database.url.is_none());
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PORT", "8081"),
            ("COINMARKETCAP_API_KEY", "env-key"),
            ("DATABASE_URL", "postgres://db/crypto"),
            ("RATE_LIMIT_MAX_REQUESTS", "7"),
            ("RATE_LIMIT_TRUST_PROXY", "true"),
            ("APP_ENV", "production"),
        ]);

        let mut config = Config::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .expect("overrides should apply");

        assert_eq!(config.server.port, 8081);
        assert_eq!(config.upstream.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.database.url.as_deref(), Some("postgres://db/crypto"));
        assert_eq!(config.rate_limit.max_requests, 7);
        assert!(config.rate_limit.trust_proxy);
        assert!(!config.environment.exposes_error_details());
    }

    #[test]
    fn test_env_override_invalid_number() {
        let mut config = Config::default();
        let result = config.apply_overrides(|name| (name == "PORT").then(|| "abc".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_env_override_invalid_environment() {
        let mut config = Config::default();
        let result =
            config.apply_overrides(|name| (name == "APP_ENV").then(|| "staging".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_validation_zero_timeout() {
        let mut config = Config::default();
        config.upstream.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_rate_limit() {
        let mut config = Config::default();
        config.rate_limit.max_requests = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_override_invalid_bool() {
        let mut config = Config::default();
        let result = config.apply_overrides(|name| {
            (name == "RATE_LIMIT_TRUST_PROXY").then(|| "sometimes".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_key_reset_interval_disabled() {
        let mut config = Config::default();
        config.upstream.key_reset_interval_hours = 0;
        assert_eq!(config.upstream.key_reset_interval(), None);
    }

    #[test]
    fn test_validation_key_reset_interval_bound() {
        let mut config = Config::default();
        config.upstream.key_reset_interval_hours = MAX_KEY_RESET_INTERVAL_HOURS;
        assert!(config.validate().is_ok());

        config.upstream.key_reset_interval_hours = u64::MAX;
        assert!(config.validate().is_err());
        assert_eq!(
            config.upstream.key_reset_interval(),
            Some(Duration::from_secs(u64::MAX))
        );
    }
}
