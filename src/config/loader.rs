//! Build `AppConfig` from environment variables (or any lookup function, for tests).

use crate::config::types::*;
use crate::config::validator::{require, validate_database_url};
use crate::error::ConfigError;
use std::net::SocketAddr;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const BIND_ADDR: &str = "BIND_ADDR";
pub const JWT_SECRET: &str = "JWT_SECRET";
pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const GEMINI_MODEL: &str = "GEMINI_MODEL";
pub const GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";
pub const CORS_ORIGIN: &str = "CORS_ORIGIN";

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

impl AppConfig {
    /// Read from the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = require(&lookup, DATABASE_URL)?;
        validate_database_url(&database_url)?;

        let bind_raw = optional(&lookup, BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            var: BIND_ADDR,
            reason: format!("'{}' is not a socket address (host:port)", bind_raw),
        })?;

        let gemini = GeminiSettings::from_lookup(&lookup);

        Ok(AppConfig {
            database_url,
            bind_addr,
            jwt_secret: optional(&lookup, JWT_SECRET),
            gemini,
            cors_origin: optional(&lookup, CORS_ORIGIN),
            pool: PoolSettings::default(),
        })
    }
}

impl GeminiSettings {
    /// Only `GEMINI_*` variables; `None` when no API key is set.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(&|k: &str| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: &F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        optional(lookup, GEMINI_API_KEY).map(|api_key| GeminiSettings {
            api_key,
            model: optional(lookup, GEMINI_MODEL).unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: optional(lookup, GEMINI_BASE_URL).unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
        })
    }
}

fn optional<F>(lookup: &F, var: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn missing_database_url_is_fatal_with_guidance() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        match err {
            ConfigError::MissingVar { var, guidance } => {
                assert_eq!(var, DATABASE_URL);
                assert!(guidance.contains("DATABASE_URL=postgres://"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn defaults_apply() {
        let cfg = AppConfig::from_lookup(lookup_from(&[(DATABASE_URL, "postgres://localhost/shop")])).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert!(cfg.jwt_secret.is_none());
        assert!(cfg.gemini.is_none());
        assert_eq!(cfg.pool, PoolSettings::default());
    }

    #[test]
    fn gemini_settings_follow_api_key() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            (DATABASE_URL, "postgres://localhost/shop"),
            (GEMINI_API_KEY, "k-123"),
        ]))
        .unwrap();
        let gemini = cfg.gemini.unwrap();
        assert_eq!(gemini.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(gemini.api_key, "k-123");
    }

    #[test]
    fn bad_bind_addr_is_reported() {
        let err = AppConfig::from_lookup(lookup_from(&[
            (DATABASE_URL, "postgres://localhost/shop"),
            (BIND_ADDR, "localhost"),
        ]))
        .unwrap_err();
        assert_eq!(err.var(), BIND_ADDR);
    }

    #[test]
    #[serial]
    fn gemini_settings_read_process_environment() {
        std::env::set_var(GEMINI_API_KEY, "env-key");
        std::env::set_var(GEMINI_MODEL, "gemini-test");
        let settings = GeminiSettings::from_env();
        std::env::remove_var(GEMINI_API_KEY);
        std::env::remove_var(GEMINI_MODEL);

        let settings = settings.unwrap();
        assert_eq!(settings.api_key, "env-key");
        assert_eq!(settings.model, "gemini-test");
        assert_eq!(settings.base_url, DEFAULT_GEMINI_BASE_URL);
    }
}
