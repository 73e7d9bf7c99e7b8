//! Identity provider contract for multi-tenant request authentication.
//!
//! Provides:
//! - [`IdentityProvider`]: the contract every backend implements (validate, revoke, describe)
//! - [`Token`] / [`TokenType`]: the credential model shared by all providers
//! - [`AuthorizationContext`] and [`build_context`]: the canonical per-request identity
//! - [`IdpConfig`] / [`IdpSettings`]: startup configuration
//! - [`Error`]: the error taxonomy, classified by [`ErrorClass`]
//! - [`conformance`]: contract checks runnable against any provider

#![forbid(unsafe_code)]

pub mod config;
pub mod conformance;
pub mod context;
pub mod error;
pub mod provider;
pub mod token;

#[cfg(test)]
mod proptests;

pub use config::{IdpConfig, IdpSettings, MiddlewareSettings, RuntimeMode};
pub use context::{build_context, AuthorizationContext, Role, RolesSource, CONTRACT_LOG_TARGET};
pub use error::{Error, ErrorClass, Result};
pub use provider::{revoke_or_decline, BoxFuture, IdentityProvider, ProviderIdentity, UserProfile};
pub use token::{RevocationRequest, RevocationResponse, Token, TokenType};

/// Alias used by callers that import several crates' `Error` types.
pub type IdpError = Error;
