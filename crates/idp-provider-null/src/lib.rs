//! Null identity provider.
//!
//! Implements [`idp_core::IdentityProvider`] with no backend at all:
//! - `validate` accepts any non-empty token and returns one fixed identity
//! - `revoke` is always [`Error::UnsupportedOperation`]
//!
//! Outside [`RuntimeMode::Development`] the provider fails closed and rejects
//! every token, so a missing provider configuration never opens the door.

use serde::Deserialize;

use idp_core::{
    BoxFuture, Error, IdentityProvider, IdpConfig, ProviderIdentity, Result, RevocationRequest,
    RevocationResponse, RuntimeMode, Token,
};

/// Registry key of the null provider.
pub const NULL_PROVIDER_KEY: &str = "null";

const DEFAULT_PROJECT_ID: &str = "dev-project";
const DEFAULT_USER_ID: &str = "dev-user";

/// Fixed identity returned by the null provider, read from the
/// provider-owned keys of [`IdpConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NullSettings {
    pub project_id: String,
    pub user_id: String,
    pub roles: Vec<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub project_title: Option<String>,
}

impl Default for NullSettings {
    fn default() -> Self {
        Self {
            project_id: DEFAULT_PROJECT_ID.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            roles: Vec::new(),
            full_name: None,
            email: None,
            avatar: None,
            project_title: None,
        }
    }
}

impl NullSettings {
    /// Settings with the given project and user and nothing else.
    pub fn new(project_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    fn identity(&self) -> ProviderIdentity {
        let mut identity = ProviderIdentity::new(NULL_PROVIDER_KEY, self.user_id.clone())
            .with_claim("projectId", self.project_id.clone())
            .with_claim("userId", self.user_id.clone())
            .with_claim("roles", self.roles.clone());
        let display = [
            ("fullName", &self.full_name),
            ("email", &self.email),
            ("avatar", &self.avatar),
            ("projectTitle", &self.project_title),
        ];
        for (claim, value) in display {
            if let Some(value) = value {
                identity = identity.with_claim(claim, value.clone());
            }
        }
        identity
    }
}

/// Identity provider that authenticates everyone as the same fixed user.
#[derive(Clone, Debug)]
pub struct NullProvider {
    mode: RuntimeMode,
    identity: ProviderIdentity,
}

impl NullProvider {
    /// Create a provider from explicit settings.
    pub fn new(settings: NullSettings, mode: RuntimeMode) -> Self {
        Self {
            mode,
            identity: settings.identity(),
        }
    }

    /// Create a provider from the provider-owned keys of `config`.
    pub fn from_config(config: &IdpConfig, mode: RuntimeMode) -> Result<Self> {
        let settings: NullSettings = config.provider_settings()?;
        let ids = [
            ("project_id", &settings.project_id),
            ("user_id", &settings.user_id),
        ];
        for (key, value) in ids {
            if value.trim().is_empty() {
                return Err(Error::config(format!("null provider: {key} must not be blank")));
            }
        }
        if !mode.is_development() {
            log::warn!("Null identity provider configured outside development mode; all tokens will be rejected");
        }
        Ok(Self::new(settings, mode))
    }

    /// Development-mode provider with the default fixed identity.
    pub fn development() -> Self {
        Self::new(NullSettings::default(), RuntimeMode::Development)
    }

    /// Whether this provider rejects every token.
    pub fn is_fail_closed(&self) -> bool {
        !self.mode.is_development()
    }
}

impl IdentityProvider for NullProvider {
    fn key(&self) -> &str {
        NULL_PROVIDER_KEY
    }

    fn validate<'a>(&'a self, token: &'a Token) -> BoxFuture<'a, Result<ProviderIdentity>> {
        Box::pin(async move {
            self.ensure_supported(token.token_type())?;
            if self.is_fail_closed() {
                return Err(Error::invalid_token(
                    "null provider rejects all tokens outside development mode",
                ));
            }
            Ok(self.identity.clone())
        })
    }

    fn revoke<'a>(
        &'a self,
        _request: &'a RevocationRequest,
    ) -> BoxFuture<'a, Result<RevocationResponse>> {
        Box::pin(async move { Err(Error::unsupported(NULL_PROVIDER_KEY, "revoke")) })
    }
}
