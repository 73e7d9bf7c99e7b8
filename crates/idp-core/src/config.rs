//! Process configuration for the identity provider layer.
//!
//! Settings are read once at startup from a TOML file plus a handful of
//! environment overrides, and are immutable afterwards.
//!
//! ```toml
//! provider = "null"
//! mode = "development"
//!
//! [idp]
//! base_url = "http://localhost:3000"
//! # Anything else in this table belongs to the provider.
//! project_id = "p1"
//! user_id = "u1"
//!
//! [middleware]
//! timeout_ms = 5000
//! cookie_name = "access-token"
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::token::TokenType;

/// Environment variable naming the settings file.
pub const ENV_CONFIG_PATH: &str = "IDP_CONFIG";
/// Environment override for [`IdpSettings::provider`].
pub const ENV_PROVIDER: &str = "IDP_PROVIDER";
/// Environment override for [`IdpSettings::mode`].
pub const ENV_MODE: &str = "IDP_MODE";
/// Environment override for [`IdpConfig::base_url`].
pub const ENV_BASE_URL: &str = "IDP_BASE_URL";
/// Environment override for [`MiddlewareSettings::timeout_ms`].
pub const ENV_TIMEOUT_MS: &str = "IDP_TIMEOUT_MS";

const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_COOKIE_NAME: &str = "access-token";

/// Whether the process runs with development conveniences enabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Fail closed everywhere.
    #[default]
    Production,
    /// Explicit opt-in: the null provider accepts any non-empty token.
    Development,
}

impl RuntimeMode {
    pub fn is_development(&self) -> bool {
        matches!(self, RuntimeMode::Development)
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeMode::Production => f.write_str("production"),
            RuntimeMode::Development => f.write_str("development"),
        }
    }
}

impl FromStr for RuntimeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(RuntimeMode::Production),
            "development" | "dev" => Ok(RuntimeMode::Development),
            other => Err(Error::config(format!("unknown runtime mode '{other}'"))),
        }
    }
}

/// Provider connection envelope: a base URL plus a provider-owned bag.
///
/// The registry validates `base_url` and never looks inside `extra`; each
/// provider parses its own typed view with [`IdpConfig::provider_settings`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdpConfig {
    /// Provider endpoint.
    pub base_url: String,
    /// Provider-specific keys, passed through verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IdpConfig {
    /// Create a config with an empty provider bag.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            extra: Map::new(),
        }
    }

    /// Add a provider-specific key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Check the common envelope. Does not touch `extra`.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::config("idp.base_url is required"));
        }
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| Error::config(format!("idp.base_url '{}': {e}", self.base_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(Error::config(format!(
                "idp.base_url must use http or https, got '{scheme}'"
            ))),
        }
    }

    /// Deserialize the provider-owned bag into `T`.
    pub fn provider_settings<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.extra.clone()))
            .map_err(|e| Error::config(format!("invalid provider settings: {e}")))
    }
}

/// Settings for the authentication middleware.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiddlewareSettings {
    /// Upper bound on a single provider call, independent of the provider's
    /// own timeout.
    pub timeout_ms: u64,
    /// Cookie consulted when no `Authorization` header is present.
    pub cookie_name: String,
    /// Declared type of credentials arriving on requests.
    pub token_type: TokenType,
}

impl MiddlewareSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Override the provider-call upper bound.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

impl Default for MiddlewareSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            token_type: TokenType::Access,
        }
    }
}

/// Top-level settings read at process startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdpSettings {
    /// Registry key of the active provider. `None` selects the null provider.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub mode: RuntimeMode,
    pub idp: IdpConfig,
    #[serde(default)]
    pub middleware: MiddlewareSettings,
}

impl IdpSettings {
    /// Settings for `provider` with default mode and middleware.
    pub fn new(provider: Option<&str>, idp: IdpConfig) -> Self {
        Self {
            provider: provider.map(str::to_string),
            mode: RuntimeMode::default(),
            idp,
            middleware: MiddlewareSettings::default(),
        }
    }

    /// Switch the runtime mode.
    pub fn with_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("invalid settings: {e}")))
    }

    /// Read settings from `path`, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("failed to read {}: {e}", path.display())))?;
        let mut settings = Self::from_toml_str(&content)?;
        settings.apply_overrides(|name| std::env::var(name).ok())?;
        log::debug!("Loaded IDP settings from {}", path.display());
        Ok(settings)
    }

    /// Apply `IDP_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup(ENV_PROVIDER) {
            let provider = provider.trim();
            self.provider = (!provider.is_empty()).then(|| provider.to_string());
        }
        if let Some(mode) = lookup(ENV_MODE) {
            self.mode = mode.parse()?;
        }
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.idp.base_url = base_url;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_MS) {
            self.middleware.timeout_ms = timeout
                .trim()
                .parse()
                .map_err(|e| Error::config(format!("{ENV_TIMEOUT_MS} '{timeout}': {e}")))?;
        }
        Ok(())
    }

    /// Validate everything the registry relies on.
    pub fn validate(&self) -> Result<()> {
        self.idp.validate()?;
        if self.middleware.timeout_ms == 0 {
            return Err(Error::config("middleware.timeout_ms must be greater than zero"));
        }
        Ok(())
    }
}
