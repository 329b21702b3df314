// src/config.rs
use std::time::Duration;

use crate::ai::error::GenerationError;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Credential variables, checked in order.
const API_KEY_VARS: [&str; 3] = ["API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY"];

pub const MISSING_KEY_MESSAGE: &str =
    "API Key is missing. Please check your environment configuration.";

/// Settings for the generation client, resolved once at startup.
#[derive(Clone)]
pub struct GenerationConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

// The key stays out of logs.
impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl GenerationConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, GenerationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, GenerationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = API_KEY_VARS
            .iter()
            .find_map(|name| non_blank(*name))
            .ok_or_else(|| GenerationError::Config(MISSING_KEY_MESSAGE.to_string()))?;

        let mut config = Self::new(api_key.trim());

        if let Some(model) = non_blank("AEVORA_MODEL") {
            config = config.with_model(model.trim());
        }
        if let Some(endpoint) = non_blank("AEVORA_API_URL") {
            config = config.with_endpoint(endpoint.trim());
        }
        if let Some(secs) = non_blank("AEVORA_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                GenerationError::Config(format!("AEVORA_TIMEOUT_SECS must be a number of seconds, got '{}'", secs))
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = GenerationConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, GenerationError::Config(_)));
        assert_eq!(err.to_string(), MISSING_KEY_MESSAGE);
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let result = GenerationConfig::from_lookup(lookup_from(&[("API_KEY", "   ")]));
        assert!(matches!(result, Err(GenerationError::Config(_))));
    }

    #[test]
    fn test_key_fallback_order() {
        let config = GenerationConfig::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "google"),
            ("GEMINI_API_KEY", "gemini"),
        ]))
        .unwrap();
        assert_eq!(config.api_key, "gemini");

        let config = GenerationConfig::from_lookup(lookup_from(&[
            ("API_KEY", "primary"),
            ("GOOGLE_API_KEY", "google"),
        ]))
        .unwrap();
        assert_eq!(config.api_key, "primary");
    }

    #[test]
    fn test_defaults_and_overrides() {
        let config = GenerationConfig::from_lookup(lookup_from(&[("API_KEY", "k")])).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout, Duration::from_secs(300));

        let config = GenerationConfig::from_lookup(lookup_from(&[
            ("API_KEY", "k"),
            ("AEVORA_MODEL", "nano-banana-pro-preview"),
            ("AEVORA_API_URL", "http://localhost:8080/v1beta/"),
            ("AEVORA_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.model, "nano-banana-pro-preview");
        assert_eq!(config.endpoint, "http://localhost:8080/v1beta");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_bad_timeout_is_rejected() {
        let result = GenerationConfig::from_lookup(lookup_from(&[
            ("API_KEY", "k"),
            ("AEVORA_TIMEOUT_SECS", "soon"),
        ]));
        assert!(matches!(result, Err(GenerationError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = GenerationConfig::new("super-secret");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
