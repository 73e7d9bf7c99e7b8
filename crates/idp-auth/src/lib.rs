//! Provider registry and request authentication for the IDP layer.
//!
//! Provides:
//! - [`ProviderRegistry`] / [`ActiveProvider`]: startup-time provider selection
//! - [`AuthLayer`] / [`AuthService`]: Tower middleware over the active provider
//! - [`authenticate`]: the per-request state machine, usable without HTTP
//! - [`revoke_bounded`]: revocation under the same provider timeout
//! - [`context_from_parts`] / [`Authorized`]: request-scoped context access

#![forbid(unsafe_code)]

mod middleware;
mod registry;
mod scope;

pub use middleware::{
    authenticate, authenticate_with, extract_credential, revoke_bounded, AuthLayer, AuthOutcome,
    AuthPhase, AuthService,
};
pub use registry::{global, install_global, ActiveProvider, ProviderFactory, ProviderRegistry};
pub use scope::{context_from_parts, project_id_from_parts, Authorized};
