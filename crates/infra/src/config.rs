//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;

use secrecy::Secret;
use thiserror::Error;

use bloodbank_donations::MismatchPolicy;
use bloodbank_observability::LogFormat;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("DATABASE_URL must be set when USE_PERSISTENT_STORES is enabled")]
    MissingDatabaseUrl,
    #[error("BLOODBANK_DB_MAX_CONNECTIONS must be at least 1")]
    EmptyPool,
    #[error("critical stock threshold ({critical}) cannot exceed the low stock threshold ({low})")]
    ThresholdOrder { critical: u32, low: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Whether internal error details may be returned to clients.
    pub fn exposes_error_details(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub log_format: LogFormat,
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub low_stock_threshold: u32,
    pub critical_stock_threshold: u32,
    pub mismatch_policy: MismatchPolicy,
    pub seed_inventory: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            environment: Environment::Development,
            log_format: LogFormat::Json,
            database: None,
            low_stock_threshold: 10,
            critical_stock_threshold: 5,
            mismatch_policy: MismatchPolicy::Reject,
            seed_inventory: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source and validate the result.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let mut bind_addr = match get("BLOODBANK_BIND_ADDR") {
            Some(raw) => raw.parse::<SocketAddr>().map_err(|e| invalid("BLOODBANK_BIND_ADDR", &raw, e))?,
            None => defaults.bind_addr,
        };
        if let Some(raw) = get("PORT") {
            let port = raw.parse::<u16>().map_err(|e| invalid("PORT", &raw, e))?;
            bind_addr.set_port(port);
        }

        let environment = match get("BLOODBANK_ENV").as_deref() {
            None => defaults.environment,
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "development" | "dev" => Environment::Development,
                "production" | "prod" => Environment::Production,
                _ => return Err(invalid("BLOODBANK_ENV", raw, "expected development or production")),
            },
        };

        let log_format = match get("BLOODBANK_LOG_FORMAT").as_deref() {
            None => defaults.log_format,
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => return Err(invalid("BLOODBANK_LOG_FORMAT", raw, "expected json or pretty")),
            },
        };

        let persistent = parse_bool(&get, "USE_PERSISTENT_STORES", false)?;
        let max_connections = parse_u32(&get, "BLOODBANK_DB_MAX_CONNECTIONS", 10)?;
        let database = if persistent {
            let url = get("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?;
            Some(DatabaseConfig {
                url: Secret::new(url),
                max_connections,
            })
        } else {
            None
        };

        let mismatch_policy = match get("BLOODBANK_BLOOD_GROUP_MISMATCH") {
            None => defaults.mismatch_policy,
            Some(raw) => raw
                .parse::<MismatchPolicy>()
                .map_err(|e| invalid("BLOODBANK_BLOOD_GROUP_MISMATCH", &raw, e))?,
        };

        let config = Self {
            bind_addr,
            environment,
            log_format,
            database,
            low_stock_threshold: parse_u32(&get, "BLOODBANK_LOW_STOCK_THRESHOLD", defaults.low_stock_threshold)?,
            critical_stock_threshold: parse_u32(
                &get,
                "BLOODBANK_CRITICAL_STOCK_THRESHOLD",
                defaults.critical_stock_threshold,
            )?,
            mismatch_policy,
            seed_inventory: parse_bool(&get, "BLOODBANK_SEED_INVENTORY", defaults.seed_inventory)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(db) = &self.database {
            if db.max_connections == 0 {
                return Err(ConfigError::EmptyPool);
            }
        }
        if self.critical_stock_threshold > self.low_stock_threshold {
            return Err(ConfigError::ThresholdOrder {
                critical: self.critical_stock_threshold,
                low: self.low_stock_threshold,
            });
        }
        Ok(())
    }
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_bool(get: &impl Fn(&str) -> Option<String>, var: &'static str, default: bool) -> Result<bool, ConfigError> {
    match get(var) {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(invalid(var, &raw, "expected a boolean")),
        },
    }
}

fn parse_u32(get: &impl Fn(&str) -> Option<String>, var: &'static str, default: u32) -> Result<u32, ConfigError> {
    match get(var) {
        None => Ok(default),
        Some(raw) => raw.parse::<u32>().map_err(|e| invalid(var, &raw, e)),
    }
}
