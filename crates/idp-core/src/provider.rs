//! The provider contract every identity backend implements.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::Role;
use crate::error::{Error, Result};
use crate::token::{RevocationRequest, RevocationResponse, Token, TokenType};

/// Boxed `Send` future returned by the async contract methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Provider-native result of a successful validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderIdentity {
    /// Registry key of the provider that produced this identity.
    pub provider: String,
    /// Provider-native subject identifier.
    pub subject: String,
    /// Raw claims, in whatever shape the provider uses.
    #[serde(default)]
    pub claims: Map<String, Value>,
}

impl ProviderIdentity {
    /// Create an identity with no claims.
    pub fn new(provider: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            subject: subject.into(),
            claims: Map::new(),
        }
    }

    /// Add a claim.
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }
}

/// Common profile shape produced by [`IdentityProvider::describe_user`].
///
/// `project_id` and `user_id` are optional here; the context builder decides
/// whether the identity is complete.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserProfile {
    pub project_id: Option<String>,
    pub user_id: Option<String>,
    pub roles: Vec<Role>,
    pub full_name: Option<String>,
    pub avatar: Option<String>,
    pub email: Option<String>,
    pub project_title: Option<String>,
    /// Claims the mapping did not recognise. Dropped by the context builder.
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Map a claim set using the conventional claim names.
    ///
    /// Each canonical field accepts a camelCase name, a snake_case name and,
    /// where one exists, the OIDC standard claim (`sub`, `name`, `picture`).
    /// Anything left over lands in [`UserProfile::extra`].
    pub fn from_claims(claims: &Map<String, Value>) -> Self {
        let mut extra = claims.clone();
        let mut take = |names: &[&str]| -> Option<String> {
            let mut found = None;
            for name in names {
                if let Some(value) = extra.remove(*name) {
                    if found.is_none() {
                        found = claim_string(&value);
                    }
                }
            }
            found
        };

        let project_id = take(&["projectId", "project_id"]);
        let user_id = take(&["userId", "user_id", "sub"]);
        let full_name = take(&["fullName", "full_name", "name"]);
        let avatar = take(&["avatar", "picture"]);
        let email = take(&["email"]);
        let project_title = take(&["projectTitle", "project_title"]);

        let roles = match extra.remove("roles") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(claim_string)
                .map(Role::new)
                .collect(),
            Some(Value::String(single)) => vec![Role::new(single)],
            _ => Vec::new(),
        };

        Self {
            project_id,
            user_id,
            roles,
            full_name,
            avatar,
            email,
            project_title,
            extra,
        }
    }
}

fn claim_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Contract implemented by every identity backend.
///
/// Implement this once per provider (null, hosted, self-hosted). The
/// middleware and the registry only ever see `dyn IdentityProvider`.
///
/// Expected negative outcomes are returned as [`Error`] variants, never
/// panics. Implementations enforce their own network timeout and map internal
/// faults to [`Error::ProviderUnavailable`].
pub trait IdentityProvider: Send + Sync + 'static {
    /// Registry key for this provider (e.g. `"null"`).
    fn key(&self) -> &str;

    /// Token types this provider recognises.
    fn supported_token_types(&self) -> &[TokenType] {
        &TokenType::ALL
    }

    /// Verify a credential and return the provider-native identity.
    fn validate<'a>(&'a self, token: &'a Token) -> BoxFuture<'a, Result<ProviderIdentity>>;

    /// Invalidate a credential.
    ///
    /// Must be idempotent: revoking an already revoked credential reports
    /// `success: true`.
    fn revoke<'a>(
        &'a self,
        request: &'a RevocationRequest,
    ) -> BoxFuture<'a, Result<RevocationResponse>>;

    /// Map provider-native claims to the common profile shape.
    fn describe_user(&self, identity: &ProviderIdentity) -> UserProfile {
        UserProfile::from_claims(&identity.claims)
    }

    /// Reject a declared type this provider does not recognise.
    fn ensure_supported(&self, token_type: TokenType) -> Result<()> {
        if self.supported_token_types().contains(&token_type) {
            Ok(())
        } else {
            Err(Error::UnsupportedTokenType(token_type))
        }
    }
}

/// Revoke through `provider`, folding [`Error::UnsupportedOperation`] into
/// `success: false`.
///
/// Other errors are returned unchanged.
pub async fn revoke_or_decline(
    provider: &dyn IdentityProvider,
    request: &RevocationRequest,
) -> Result<RevocationResponse> {
    match provider.revoke(request).await {
        Err(Error::UnsupportedOperation {
            provider: key,
            operation,
        }) => {
            log::debug!("Provider '{key}' does not support {operation}; declining");
            Ok(RevocationResponse::declined())
        }
        other => other,
    }
}
