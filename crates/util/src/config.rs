use std::{env, fmt, net::SocketAddr};

use super::{database_url, server_bind_address};

/// Secret used to sign sessions outside production when none is configured.
pub const DEVELOPMENT_SESSION_SECRET: &str = "alumni-portal-development-secret";
pub const DEFAULT_DASHBOARD_LIMIT: u32 = 20;
pub const MAX_DASHBOARD_LIMIT: u32 = 100;

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns `true` when the current environment should behave as development.
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub database_url: String,
    pub session_secret: String,
    pub dashboard_limit: u32,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_value = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let environment = Environment::from_str(&env_value)?;
        let bind_addr = server_bind_address().map_err(ConfigError::BindAddress)?;

        let session_secret = match env::var("APP_SESSION_SECRET") {
            Ok(value) if !value.trim().is_empty() => value,
            _ if environment == Environment::Production => {
                return Err(ConfigError::MissingSessionSecret)
            }
            _ => DEVELOPMENT_SESSION_SECRET.to_string(),
        };

        let dashboard_limit = match env::var("APP_DASHBOARD_LIMIT") {
            Ok(raw) => parse_dashboard_limit(&raw)?,
            Err(_) => DEFAULT_DASHBOARD_LIMIT,
        };

        Ok(Self {
            bind_addr,
            environment,
            database_url: database_url(),
            session_secret,
            dashboard_limit,
        })
    }
}

fn parse_dashboard_limit(raw: &str) -> Result<u32, ConfigError> {
    let value = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidDashboardLimit(raw.to_string()))?;
    if value == 0 || value > MAX_DASHBOARD_LIMIT {
        return Err(ConfigError::InvalidDashboardLimit(raw.to_string()));
    }
    Ok(value)
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    BindAddress(std::net::AddrParseError),
    MissingSessionSecret,
    InvalidDashboardLimit(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::BindAddress(err) => write!(f, "invalid APP_BIND_ADDR value: {err}"),
            Self::MissingSessionSecret => {
                write!(f, "APP_SESSION_SECRET must be set in production")
            }
            Self::InvalidDashboardLimit(value) => write!(
                f,
                "APP_DASHBOARD_LIMIT must be an integer between 1 and {MAX_DASHBOARD_LIMIT} (got {value})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
