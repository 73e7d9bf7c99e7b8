//! Startup-time provider selection.
//!
//! A [`ProviderRegistry`] maps configuration keys to provider factories.
//! [`ProviderRegistry::initialize`] runs once at startup, picks the configured
//! provider and returns an [`ActiveProvider`] handle that is injected into the
//! middleware. The handle is read-only for the life of the process.
//!
//! # Example
//!
//! ```rust,ignore
//! let settings = IdpSettings::load(path)?;
//! let active = ProviderRegistry::with_builtin().initialize(&settings)?;
//! let app = Router::new().layer(active.layer(settings.middleware.clone()));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use idp_core::{Error, IdentityProvider, IdpConfig, IdpSettings, MiddlewareSettings, Result, RuntimeMode};
use idp_provider_null::{NullProvider, NULL_PROVIDER_KEY};

use crate::middleware::AuthLayer;

/// Builds a provider from the common envelope and the runtime mode.
///
/// Factories parse their own provider-owned keys from [`IdpConfig::extra`].
pub type ProviderFactory =
    Box<dyn Fn(&IdpConfig, RuntimeMode) -> Result<Arc<dyn IdentityProvider>> + Send + Sync>;

/// Known providers, keyed by configuration name.
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry with the built-in providers (`null`).
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(NULL_PROVIDER_KEY, |config, mode| {
            let provider: Arc<dyn IdentityProvider> =
                Arc::new(NullProvider::from_config(config, mode)?);
            Ok(provider)
        });
        registry
    }

    /// Register a factory under `key`, replacing any previous one.
    pub fn register<F>(&mut self, key: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&IdpConfig, RuntimeMode) -> Result<Arc<dyn IdentityProvider>>
            + Send
            + Sync
            + 'static,
    {
        let key = key.into();
        if self.factories.insert(key.clone(), Box::new(factory)).is_some() {
            log::debug!("Replaced identity provider factory '{key}'");
        }
        self
    }

    /// Whether `key` is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Select and construct the configured provider.
    ///
    /// Fails with [`Error::UnknownProviderKey`] when `settings.provider` names
    /// an unregistered key; there is no silent fallback. With no key at all
    /// the null provider is used, which fails closed unless the mode is
    /// [`RuntimeMode::Development`].
    pub fn initialize(&self, settings: &IdpSettings) -> Result<ActiveProvider> {
        settings.validate()?;

        let provider = match settings.provider.as_deref() {
            Some(key) => {
                let factory = self.factories.get(key).ok_or_else(|| {
                    log::error!(
                        "Identity provider '{key}' is not registered (known: {})",
                        self.keys().collect::<Vec<_>>().join(", ")
                    );
                    Error::UnknownProviderKey(key.to_string())
                })?;
                factory(&settings.idp, settings.mode)?
            }
            None => {
                log::warn!(
                    "No identity provider configured; using the null provider ({} mode)",
                    settings.mode
                );
                let provider: Arc<dyn IdentityProvider> =
                    Arc::new(NullProvider::from_config(&settings.idp, settings.mode)?);
                provider
            }
        };

        log::info!(
            "Identity provider '{}' selected ({} mode, base URL {})",
            provider.key(),
            settings.mode,
            settings.idp.base_url
        );

        Ok(ActiveProvider {
            provider,
            mode: settings.mode,
        })
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The provider chosen at startup. Cheap to clone.
#[derive(Clone)]
pub struct ActiveProvider {
    provider: Arc<dyn IdentityProvider>,
    mode: RuntimeMode,
}

impl ActiveProvider {
    /// Wrap an already constructed provider, bypassing the registry.
    pub fn from_provider(provider: Arc<dyn IdentityProvider>, mode: RuntimeMode) -> Self {
        Self { provider, mode }
    }

    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    pub fn key(&self) -> &str {
        self.provider.key()
    }

    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    /// Authentication middleware bound to this provider.
    pub fn layer(&self, settings: MiddlewareSettings) -> AuthLayer {
        AuthLayer::new(self.provider.clone(), settings)
    }
}

impl fmt::Debug for ActiveProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveProvider")
            .field("key", &self.key())
            .field("mode", &self.mode)
            .finish()
    }
}

static GLOBAL: OnceLock<ActiveProvider> = OnceLock::new();

/// Install `active` as the process-wide provider.
///
/// Fails with [`Error::AlreadyInitialized`] on a second call; providers are
/// never swapped at runtime. Prefer passing [`ActiveProvider`] explicitly;
/// the global slot exists for code that cannot be handed one.
pub fn install_global(active: ActiveProvider) -> Result<&'static ActiveProvider> {
    let mut installed = false;
    let slot = GLOBAL.get_or_init(|| {
        installed = true;
        active
    });
    if installed {
        Ok(slot)
    } else {
        Err(Error::AlreadyInitialized)
    }
}

/// The process-wide provider, if one was installed.
pub fn global() -> Option<&'static ActiveProvider> {
    GLOBAL.get()
}
