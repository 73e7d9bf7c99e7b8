//! Request-scoped access to the authorization context.

use axum::extract::FromRequestParts;
use http::request::Parts;

use idp_core::{AuthorizationContext, Error};

use crate::middleware::error_response;

/// Extract the `AuthorizationContext` from HTTP request `Parts`, if present.
pub fn context_from_parts(parts: &Parts) -> Option<&AuthorizationContext> {
    parts.extensions.get::<AuthorizationContext>()
}

/// Extract the tenant scope from HTTP request `Parts`.
pub fn project_id_from_parts(parts: &Parts) -> Option<&str> {
    context_from_parts(parts).map(AuthorizationContext::project_id)
}

/// Axum extractor for handlers behind [`AuthLayer`](crate::AuthLayer).
///
/// Rejects with 401 when no context is attached, e.g. when a route was
/// mounted outside the auth layer by mistake.
#[derive(Clone, Debug)]
pub struct Authorized(pub AuthorizationContext);

impl<S> FromRequestParts<S> for Authorized
where
    S: Send + Sync,
{
    type Rejection = axum::response::Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        context_from_parts(parts)
            .cloned()
            .map(Authorized)
            .ok_or_else(|| error_response(&Error::Unauthenticated))
    }
}
