//! Error taxonomy for the identity provider layer.

use http::StatusCode;

use crate::token::TokenType;

/// Result type alias for idp-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by providers, the context builder, the middleware and the
/// registry.
///
/// Expected negative outcomes (a bad credential, an unsupported operation) are
/// ordinary variants here; callers branch on them rather than treating them as
/// faults.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No credential was presented with the request.
    #[error("missing authentication credential")]
    Unauthenticated,

    /// A credential was presented but its raw value is empty.
    #[error("malformed token: value must not be empty")]
    MalformedToken,

    /// A token type name outside the known set.
    #[error("unknown token type '{0}'")]
    UnknownTokenType(String),

    /// The provider rejected the credential.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The credential was valid once but is no longer live.
    #[error("token has expired")]
    Expired,

    /// The provider does not handle tokens of this declared type.
    #[error("token type '{0}' is not supported by this provider")]
    UnsupportedTokenType(TokenType),

    /// The provider cannot infer the token type and the caller omitted it.
    #[error("token type is required for this operation")]
    TokenTypeRequired,

    /// The provider could not be reached or answered with garbage.
    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A validated identity lacks a field every context needs.
    #[error("provider returned an incomplete identity: missing {field}")]
    IncompleteIdentity {
        /// Canonical name of the missing field (`projectId` or `userId`).
        field: &'static str,
    },

    /// The operation is not meaningful for this provider.
    #[error("operation '{operation}' is not supported by provider '{provider}'")]
    UnsupportedOperation {
        /// Provider registry key.
        provider: String,
        /// Contract operation name.
        operation: &'static str,
    },

    /// Configuration names a provider that was never registered.
    #[error("unknown identity provider '{0}'")]
    UnknownProviderKey(String),

    /// The process-wide provider slot was already filled.
    #[error("identity provider already initialized")]
    AlreadyInitialized,

    /// Configuration is missing or invalid.
    #[error("configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },
}

/// Broad classification of an [`Error`], used to pick a response and a log
/// severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller presented no credential or a bad one.
    Client,
    /// The provider could not answer; retryable by the caller.
    Infrastructure,
    /// A provider broke the contract. Never retried.
    ContractViolation,
    /// Startup configuration is wrong. Fatal.
    Configuration,
}

impl Error {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Unauthenticated
            | Error::MalformedToken
            | Error::UnknownTokenType(_)
            | Error::InvalidToken(_)
            | Error::Expired
            | Error::UnsupportedTokenType(_)
            | Error::TokenTypeRequired
            | Error::UnsupportedOperation { .. } => ErrorClass::Client,
            Error::ProviderUnavailable(_) => ErrorClass::Infrastructure,
            Error::IncompleteIdentity { .. } => ErrorClass::ContractViolation,
            Error::UnknownProviderKey(_) | Error::AlreadyInitialized | Error::Config { .. } => {
                ErrorClass::Configuration
            }
        }
    }

    /// Whether this error should result in a 4xx (vs. a 5xx).
    pub fn is_client_error(&self) -> bool {
        self.class() == ErrorClass::Client
    }

    /// Whether a caller may retry the same request later.
    ///
    /// Only infrastructure faults qualify. This layer never retries on its own.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Infrastructure
    }

    /// HTTP-equivalent status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated
            | Error::MalformedToken
            | Error::InvalidToken(_)
            | Error::Expired
            | Error::UnsupportedTokenType(_) => StatusCode::UNAUTHORIZED,
            Error::UnknownTokenType(_) | Error::TokenTypeRequired => StatusCode::BAD_REQUEST,
            Error::UnsupportedOperation { .. } => StatusCode::NOT_IMPLEMENTED,
            Error::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::IncompleteIdentity { .. }
            | Error::UnknownProviderKey(_)
            | Error::AlreadyInitialized
            | Error::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unauthenticated => "unauthenticated",
            Error::MalformedToken => "malformed_token",
            Error::UnknownTokenType(_) => "unknown_token_type",
            Error::InvalidToken(_) => "invalid_token",
            Error::Expired => "expired",
            Error::UnsupportedTokenType(_) => "unsupported_token_type",
            Error::TokenTypeRequired => "token_type_required",
            Error::ProviderUnavailable(_) => "provider_unavailable",
            Error::IncompleteIdentity { .. } => "incomplete_identity",
            Error::UnsupportedOperation { .. } => "unsupported_operation",
            Error::UnknownProviderKey(_) => "unknown_provider_key",
            Error::AlreadyInitialized => "already_initialized",
            Error::Config { .. } => "config",
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates a new provider-unavailable error.
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Error::ProviderUnavailable(message.into())
    }

    /// Creates a new invalid-token error.
    pub fn invalid_token<S: Into<String>>(reason: S) -> Self {
        Error::InvalidToken(reason.into())
    }

    /// Creates an unsupported-operation error for `provider`.
    pub fn unsupported<S: Into<String>>(provider: S, operation: &'static str) -> Self {
        Error::UnsupportedOperation {
            provider: provider.into(),
            operation,
        }
    }
}
