use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub server_addr: String,
}

impl Config {
    /// Reads the process environment (call `dotenv()` first).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .context("GEMINI_API_KEY must be set in .env file")?;

        let mut gemini = GeminiConfig::new(api_key);

        if let Some(model) = lookup("GEMINI_MODEL") {
            gemini = gemini.with_model(model);
        }
        if let Some(base_url) = lookup("GEMINI_BASE_URL") {
            gemini = gemini.with_base_url(base_url);
        }
        if let Some(secs) = lookup("GEMINI_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("GEMINI_TIMEOUT_SECS is not a number of seconds: {}", secs))?;
            gemini = gemini.with_timeout(Duration::from_secs(secs));
        }

        let server_addr = lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string());

        Ok(Self {
            gemini,
            server_addr,
        })
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
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_only_key_is_set() {
        let config = Config::from_lookup(lookup_from(&[("GEMINI_API_KEY", "secret")])).unwrap();

        assert_eq!(config.gemini.api_key, "secret");
        assert_eq!(config.gemini.model, DEFAULT_MODEL);
        assert_eq!(config.gemini.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.gemini.timeout, Duration::from_secs(60));
        assert_eq!(config.server_addr, DEFAULT_SERVER_ADDR);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-2.5-pro"),
            ("GEMINI_BASE_URL", "http://localhost:9999"),
            ("GEMINI_TIMEOUT_SECS", "15"),
            ("SERVER_ADDR", "127.0.0.1:3000"),
        ]))
        .unwrap();

        assert_eq!(config.gemini.model, "gemini-2.5-pro");
        assert_eq!(config.gemini.base_url, "http://localhost:9999");
        assert_eq!(config.gemini.timeout, Duration::from_secs(15));
        assert_eq!(config.server_addr, "127.0.0.1:3000");
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("GEMINI_API_KEY", "  ")])).is_err());
    }

    #[test]
    fn test_bad_timeout_is_an_error() {
        let result = Config::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_TIMEOUT_SECS", "soon"),
        ]));
        assert!(result.is_err());
    }
}
