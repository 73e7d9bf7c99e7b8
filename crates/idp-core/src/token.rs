//! Token model shared by every provider.
//!
//! [`TokenType`] is a closed set: adding a kind is a contract change that
//! every provider and the middleware must handle explicitly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Known credential kinds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived credential presented on each request.
    #[default]
    Access,
    /// Long-lived credential exchanged for new access tokens.
    Refresh,
    /// Machine-to-machine credential.
    Service,
}

impl TokenType {
    /// Every known kind, in declaration order.
    pub const ALL: [TokenType; 3] = [TokenType::Access, TokenType::Refresh, TokenType::Service];

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
            TokenType::Service => "service",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "access" => Ok(TokenType::Access),
            "refresh" => Ok(TokenType::Refresh),
            "service" => Ok(TokenType::Service),
            _ => Err(Error::UnknownTokenType(s.to_string())),
        }
    }
}

/// A raw credential together with its declared type.
///
/// The value is never empty: [`Token::new`] rejects empty input, so providers
/// never see an empty credential. `Debug` and `Display` redact the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    token_type: TokenType,
}

impl Token {
    /// Wrap a raw credential.
    ///
    /// Fails with [`Error::MalformedToken`] when `value` is empty or only
    /// whitespace.
    pub fn new(value: impl Into<String>, token_type: TokenType) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(Error::MalformedToken);
        }
        Ok(Self { value, token_type })
    }

    /// Shorthand for an access token.
    pub fn access(value: impl Into<String>) -> Result<Self> {
        Self::new(value, TokenType::Access)
    }

    /// The declared token type.
    pub fn token_type(&self) -> TokenType {
        self.token_type
    }

    /// Returns the raw credential. Callers must avoid logging this string.
    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} token <redacted>", self.token_type)
    }
}

/// Request to invalidate a previously issued credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationRequest {
    /// Raw credential to revoke.
    pub token: String,
    /// Declared type. When absent the provider infers it or fails with
    /// [`Error::TokenTypeRequired`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<TokenType>,
}

impl RevocationRequest {
    /// Build a request with an explicit token type.
    pub fn new(token: impl Into<String>, token_type: TokenType) -> Self {
        Self {
            token: token.into(),
            token_type: Some(token_type),
        }
    }

    /// Build a request that leaves the type for the provider to infer.
    pub fn untyped(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_type: None,
        }
    }
}

impl fmt::Debug for RevocationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevocationRequest")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Outcome of a revocation. There is no partial success.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationResponse {
    /// Whether the denoted credential(s) were revoked.
    pub success: bool,
}

impl RevocationResponse {
    /// The credential was revoked (or already was).
    pub fn revoked() -> Self {
        Self { success: true }
    }

    /// The credential was not revoked.
    pub fn declined() -> Self {
        Self { success: false }
    }
}
