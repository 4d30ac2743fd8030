//! Process configuration.
//!
//! Loaded once at startup from environment variables (after `.env` has been
//! applied by the binary) into an immutable [`Config`] that is passed to
//! constructors. Empty variables count as unset.
//!
//! # Example
//!
//! ```rust,no_run
//! use supernote_core::config::Config;
//!
//! let config = Config::from_env().expect("DATABASE_URL is required");
//! println!("listening on {}", config.bind_addr());
//! ```

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::defaults;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ConfigError::Invalid {
                key: "ENV",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Connection pool bounds and the per-operation deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
    pub query_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: defaults::DB_MAX_CONNECTIONS,
            min_connections: defaults::DB_MIN_CONNECTIONS,
            max_lifetime: Duration::from_secs(defaults::DB_MAX_LIFETIME_SECS),
            idle_timeout: Duration::from_secs(defaults::DB_IDLE_TIMEOUT_SECS),
            acquire_timeout: Duration::from_secs(defaults::DB_ACQUIRE_TIMEOUT_SECS),
            query_timeout: Duration::from_secs(defaults::DB_QUERY_TIMEOUT_SECS),
        }
    }
}

/// Keys for the embedding/auth providers. Loaded but not yet wired.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderKeys {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub supabase_service_role_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl fmt::Debug for ProviderKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderKeys")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_anon_key", &redact(&self.supabase_anon_key))
            .field(
                "supabase_service_role_key",
                &redact(&self.supabase_service_role_key),
            )
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .finish()
    }
}

fn redact(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "<redacted>")
}

/// Immutable service configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub pool: PoolSettings,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
    pub run_migrations: bool,
    pub providers: ProviderKeys,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("pool", &self.pool)
            .field("request_timeout", &self.request_timeout)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("run_migrations", &self.run_migrations)
            .field("providers", &self.providers)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let environment = match get("ENV") {
            Some(raw) => raw.parse()?,
            None => Environment::default(),
        };

        let defaults_pool = PoolSettings::default();
        let pool = PoolSettings {
            max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", defaults_pool.max_connections)?,
            min_connections: parse_or(&get, "DB_MIN_CONNECTIONS", defaults_pool.min_connections)?,
            max_lifetime: secs_or(&get, "DB_MAX_LIFETIME_SECS", defaults_pool.max_lifetime)?,
            idle_timeout: secs_or(&get, "DB_IDLE_TIMEOUT_SECS", defaults_pool.idle_timeout)?,
            acquire_timeout: secs_or(
                &get,
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults_pool.acquire_timeout,
            )?,
            query_timeout: secs_or(&get, "DB_QUERY_TIMEOUT_SECS", defaults_pool.query_timeout)?,
        };

        let config = Self {
            database_url,
            host: get("HOST").unwrap_or_else(|| defaults::HOST.to_string()),
            port: parse_or(&get, "PORT", defaults::PORT)?,
            environment,
            pool,
            request_timeout: secs_or(
                &get,
                "REQUEST_TIMEOUT_SECS",
                Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
            )?,
            max_body_bytes: parse_or(&get, "MAX_BODY_BYTES", defaults::MAX_BODY_BYTES)?,
            run_migrations: bool_or(&get, "RUN_MIGRATIONS", true)?,
            providers: ProviderKeys {
                supabase_url: get("SUPABASE_URL"),
                supabase_anon_key: get("SUPABASE_ANON_KEY"),
                supabase_service_role_key: get("SUPABASE_SERVICE_ROLE_KEY"),
                gemini_api_key: get("GEMINI_API_KEY"),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pool.max_connections == 0 {
            return Err(ConfigError::Validation(
                "DB_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }
        if self.pool.min_connections > self.pool.max_connections {
            return Err(ConfigError::Validation(format!(
                "DB_MIN_CONNECTIONS ({}) exceeds DB_MAX_CONNECTIONS ({})",
                self.pool.min_connections, self.pool.max_connections
            )));
        }
        if self.pool.query_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "DB_QUERY_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }
        if self.request_timeout <= self.pool.query_timeout {
            return Err(ConfigError::Validation(format!(
                "REQUEST_TIMEOUT_SECS ({}) must exceed DB_QUERY_TIMEOUT_SECS ({})",
                self.request_timeout.as_secs(),
                self.pool.query_timeout.as_secs()
            )));
        }
        Ok(())
    }

    /// `host:port` string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<G, T>(get: &G, key: &'static str, default: T) -> ConfigResult<T>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
        }),
        None => Ok(default),
    }
}

fn secs_or<G>(get: &G, key: &'static str, default: Duration) -> ConfigResult<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    parse_or(get, key, default.as_secs()).map(Duration::from_secs)
}

fn bool_or<G>(get: &G, key: &'static str, default: bool) -> ConfigResult<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value: raw }),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_missing_database_url_is_fatal() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
        assert_eq!(err.to_string(), "DATABASE_URL is required");
    }

    #[test]
    fn test_empty_database_url_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://x/y")])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.pool, PoolSettings::default());
        assert_eq!(config.pool.max_connections, 25);
        assert_eq!(config.pool.min_connections, 5);
        assert_eq!(config.pool.max_lifetime, Duration::from_secs(3600));
        assert_eq!(config.pool.idle_timeout, Duration::from_secs(1800));
        assert_eq!(config.request_timeout, Duration::from_secs(35));
        assert!(config.run_migrations);
        assert!(config.providers.gemini_api_key.is_none());
    }

    #[test]
    fn test_overrides_applied() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x/y"),
            ("PORT", "9000"),
            ("ENV", "production"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("DB_MIN_CONNECTIONS", "2"),
            ("DB_QUERY_TIMEOUT_SECS", "5"),
            ("RUN_MIGRATIONS", "false"),
            ("GEMINI_API_KEY", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert!(config.environment.is_production());
        assert_eq!(config.pool.max_connections, 4);
        assert_eq!(config.pool.min_connections, 2);
        assert_eq!(config.pool.query_timeout, Duration::from_secs(5));
        assert!(!config.run_migrations);
        assert_eq!(config.providers.gemini_api_key.as_deref(), Some("secret"));
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
    }

    #[test]
    fn test_unparsable_port_rejected() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "pg"), ("PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn test_unknown_environment_rejected() {
        let err =
            Config::from_lookup(lookup(&[("DATABASE_URL", "pg"), ("ENV", "staging")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ENV", .. }));
    }

    #[test]
    fn test_min_above_max_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "pg"),
            ("DB_MAX_CONNECTIONS", "2"),
            ("DB_MIN_CONNECTIONS", "3"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_request_timeout_must_exceed_query_timeout() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "pg"),
            ("DB_QUERY_TIMEOUT_SECS", "30"),
            ("REQUEST_TIMEOUT_SECS", "30"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "pg"),
            ("DB_QUERY_TIMEOUT_SECS", "5"),
            ("REQUEST_TIMEOUT_SECS", "6"),
        ]))
        .unwrap();
        assert!(config.request_timeout > config.pool.query_timeout);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://user:hunter2@db/notes"),
            ("SUPABASE_SERVICE_ROLE_KEY", "service-secret"),
            ("GEMINI_API_KEY", "gemini-secret"),
        ]))
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("service-secret"));
        assert!(!debug.contains("gemini-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_environment_round_trip() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!(Environment::Production.to_string(), "production");
        assert_eq!(Environment::Development.to_string(), "development");
    }
}
