// src/config.rs
//! Runtime configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_VISION_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-2";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 90;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Optional at startup; every operation answers `server_misconfigured` without it.
    pub openai_api_key: Option<String>,
    pub api_base: String,
    pub vision_model: String,
    pub image_model: String,
    pub upstream_timeout: Duration,
    pub operator_unlimited_mode: bool,
}

impl Config {
    /// Loads configuration from the process environment, honoring a `.env`
    /// file outside of tests.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_address_str =
            var("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let upstream_timeout = match var("UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "UPSTREAM_TIMEOUT_SECS".to_string(),
                        format!("'{}' is not a positive number of seconds", raw),
                    ));
                }
            },
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let operator_unlimited_mode = match var("OPERATOR_UNLIMITED_MODE") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "OPERATOR_UNLIMITED_MODE".to_string(),
                    format!("'{}' is not a boolean", raw),
                )
            })?,
            None => false,
        };

        Ok(Self {
            bind_address,
            openai_api_key: var("OPENAI_API_KEY"),
            api_base: var("OPENAI_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            vision_model: var("OPENAI_VISION_MODEL")
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            image_model: var("OPENAI_IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            upstream_timeout,
            operator_unlimited_mode,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = load(&[]).unwrap();
        assert_eq!(config.openai_api_key, None);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.vision_model, "gpt-4.1-mini");
        assert_eq!(config.image_model, "dall-e-2");
        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.upstream_timeout, Duration::from_secs(90));
        assert!(!config.operator_unlimited_mode);
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = load(&[("OPENAI_API_KEY", "   ")]).unwrap();
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn overrides_are_read_and_base_is_trimmed() {
        let config = load(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_API_BASE", "http://localhost:9000/v1/"),
            ("OPENAI_IMAGE_MODEL", "gpt-image-1"),
            ("UPSTREAM_TIMEOUT_SECS", "15"),
            ("OPERATOR_UNLIMITED_MODE", "TRUE"),
        ])
        .unwrap();
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.api_base, "http://localhost:9000/v1");
        assert_eq!(config.image_model, "gpt-image-1");
        assert_eq!(config.upstream_timeout, Duration::from_secs(15));
        assert!(config.operator_unlimited_mode);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(load(&[("BIND_ADDRESS", "not-an-address")]).is_err());
        assert!(load(&[("UPSTREAM_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[("UPSTREAM_TIMEOUT_SECS", "soon")]).is_err());
        assert!(load(&[("OPERATOR_UNLIMITED_MODE", "maybe")]).is_err());
    }
}
