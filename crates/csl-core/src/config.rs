//! Configuration
//!
//! Loaded from TOML; every section and field is optional. The
//! `CONSILIUM_BASE_URL` environment variable overrides `service.base_url`.

use csl_session::SessionResetPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the service base URL
pub const BASE_URL_ENV: &str = "CONSILIUM_BASE_URL";

/// Default service base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:8001/api";

/// Configuration loading failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Config path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Remote service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL every route is resolved against
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// User-Agent header
    pub user_agent: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 120,
            user_agent: Some(format!("consilium/{}", crate::VERSION)),
        }
    }
}

impl ServiceConfig {
    /// Timeout as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Analysis cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum stored results
    pub max_capacity: u64,
    /// Expire results this many seconds after insertion
    pub ttl_secs: Option<u64>,
    /// Drop results for superseded versions whenever the current version moves
    pub evict_superseded_versions: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: csl_analysis::DEFAULT_MAX_CAPACITY,
            ttl_secs: None,
            evict_superseded_versions: false,
        }
    }
}

/// Conversation settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Whether reset keeps the server-side session
    pub reset_policy: SessionResetPolicy,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsiliumConfig {
    /// Remote service
    pub service: ServiceConfig,
    /// Analysis cache
    pub cache: CacheConfig,
    /// Conversation
    pub session: SessionConfig,
}

impl ConsiliumConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a TOML file, then apply environment overrides
    ///
    /// # Errors
    /// [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_toml(&text)?.with_base_url_override(std::env::var(BASE_URL_ENV).ok()))
    }

    /// Defaults plus environment overrides
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_base_url_override(std::env::var(BASE_URL_ENV).ok())
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on invalid TOML or unknown values.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.service.base_url = url.trim().to_string();
        }
        self
    }

    /// With service base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.service.base_url = base_url.into();
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.service.timeout_secs = secs;
        self
    }

    /// With cache capacity
    #[inline]
    #[must_use]
    pub fn with_cache_capacity(mut self, max_capacity: u64) -> Self {
        self.cache.max_capacity = max_capacity;
        self
    }

    /// With superseded-version eviction
    #[inline]
    #[must_use]
    pub fn with_evict_superseded(mut self, enabled: bool) -> Self {
        self.cache.evict_superseded_versions = enabled;
        self
    }

    /// With session reset policy
    #[inline]
    #[must_use]
    pub fn with_reset_policy(mut self, policy: SessionResetPolicy) -> Self {
        self.session.reset_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = ConsiliumConfig::new();
        assert_eq!(config.service.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.service.timeout(), Duration::from_secs(120));
        assert_eq!(config.cache.max_capacity, 10_000);
        assert!(!config.cache.evict_superseded_versions);
        assert_eq!(config.session.reset_policy, SessionResetPolicy::NewSession);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ConsiliumConfig::from_toml(
            r#"
            [service]
            base_url = "http://analysis.internal:9000/api"

            [session]
            reset_policy = "keep_session"
            "#,
        )
        .unwrap();
        assert_eq!(config.service.base_url, "http://analysis.internal:9000/api");
        assert_eq!(config.service.timeout_secs, 120);
        assert_eq!(config.session.reset_policy, SessionResetPolicy::KeepSession);
    }

    #[test]
    fn unknown_policy_rejected() {
        let err = ConsiliumConfig::from_toml("[session]\nreset_policy = \"forever\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nmax_capacity = 42\nttl_secs = 600").unwrap();
        let config = ConsiliumConfig::load(file.path()).unwrap();
        assert_eq!(config.cache.max_capacity, 42);
        assert_eq!(config.cache.ttl_secs, Some(600));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ConsiliumConfig::load("/nonexistent/consilium.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn base_url_override() {
        let config = ConsiliumConfig::new().with_base_url_override(Some(" http://x/api ".into()));
        assert_eq!(config.service.base_url, "http://x/api");
        let config = ConsiliumConfig::new().with_base_url_override(Some(String::new()));
        assert_eq!(config.service.base_url, DEFAULT_BASE_URL);
    }
}
