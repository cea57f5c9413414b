//! Configuration management for the wellness chat functions.

use std::env;
use std::time::Duration;

use crate::{Error, Result};

/// Default provider endpoint.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Default completion model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Where chat turns are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Supabase PostgREST endpoint with a service-role key.
    Supabase { url: String, service_role_key: String },
    /// Direct Postgres connection by URL.
    Postgres { database_url: String },
    /// Postgres with credentials held in Secrets Manager.
    PostgresSecret {
        host: String,
        name: String,
        secret_arn: String,
    },
    /// In-process store, lost on restart.
    Memory,
}

/// Provider credential, either literal or a Secrets Manager reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeySource {
    Literal(String),
    SecretArn(String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Conversation store backend
    pub store: StoreConfig,
    /// Completion provider credential
    pub openai_api_key: ApiKeySource,
    /// Completion provider base URL
    pub openai_base_url: String,
    /// Completion model name
    pub openai_model: String,
    /// Upper bound on one provider call
    pub openai_timeout: Duration,
    /// Requests allowed per client per window
    pub rate_limit_max: u32,
    /// Rate-limit window length
    pub rate_limit_window: Duration,
    /// Local server listening port
    pub port: u16,
    /// Reported by the shield endpoint
    pub shield_mode_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("{} not set", key)))
        };

        let backend = lookup("STORE_BACKEND").unwrap_or_else(|| "supabase".to_string());
        let store = match backend.to_ascii_lowercase().as_str() {
            "supabase" => StoreConfig::Supabase {
                url: required("SUPABASE_URL")?,
                service_role_key: required("SUPABASE_SERVICE_ROLE_KEY")?,
            },
            "postgres" => match lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
                Some(database_url) => StoreConfig::Postgres { database_url },
                None => StoreConfig::PostgresSecret {
                    host: required("DATABASE_HOST")?,
                    name: lookup("DATABASE_NAME").unwrap_or_else(|| "wellness".to_string()),
                    secret_arn: required("DATABASE_SECRET_ARN")?,
                },
            },
            "memory" => StoreConfig::Memory,
            other => {
                return Err(Error::Config(format!("Unknown STORE_BACKEND: {}", other)));
            }
        };

        let openai_api_key = match lookup("OPENAI_API_KEY").filter(|v| !v.is_empty()) {
            Some(key) => ApiKeySource::Literal(key),
            None => ApiKeySource::SecretArn(required("OPENAI_API_KEY_SECRET_ARN").map_err(
                |_| Error::Config("OPENAI_API_KEY or OPENAI_API_KEY_SECRET_ARN must be set".into()),
            )?),
        };

        Ok(Self {
            store,
            openai_api_key,
            openai_base_url: lookup("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_model: lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            openai_timeout: Duration::from_secs(parse_or(&lookup, "OPENAI_TIMEOUT_SECS", 30)?),
            rate_limit_max: parse_or(&lookup, "RATE_LIMIT_MAX", 5)?,
            rate_limit_window: Duration::from_secs(parse_or(&lookup, "RATE_LIMIT_WINDOW_SECS", 60)?),
            port: parse_or(&lookup, "PORT", 3000)?,
            shield_mode_enabled: parse_or(&lookup, "SHIELD_MODE_ENABLED", false)?,
        })
    }
}

/// Shield-mode flag alone, for functions that need no other configuration.
pub fn shield_mode_from_env() -> Result<bool> {
    parse_or(&|key: &str| env::var(key).ok(), "SHIELD_MODE_ENABLED", false)
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("Invalid value for {}: {}", key, raw))),
        _ => Ok(default),
    }
}
