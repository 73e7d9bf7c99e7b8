//! Tower authentication middleware.
//!
//! `AuthLayer` and `AuthService` run every request through a small state
//! machine (extract, validate, build context, attach) against the active
//! identity provider. On success the [`AuthorizationContext`] is inserted into
//! the request extensions for downstream handlers; otherwise the request is
//! answered directly:
//!
//! - missing/invalid credential: 401 with `WWW-Authenticate`
//! - provider unavailable or too slow: 503
//! - provider broke the contract: 500
//!
//! The middleware never retries. Dropping the request future (client went
//! away) drops the in-flight provider call with it.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::response::IntoResponse;
use http::{HeaderMap, Request, StatusCode};
use tower::{Layer, Service};

use idp_core::{
    build_context, revoke_or_decline, AuthorizationContext, Error, ErrorClass, IdentityProvider,
    MiddlewareSettings, RevocationRequest, RevocationResponse, RolesSource, Token,
    CONTRACT_LOG_TARGET,
};

/// Step of the per-request state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthPhase {
    Extract,
    Validate,
    BuildContext,
    Attach,
}

impl fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthPhase::Extract => f.write_str("extract"),
            AuthPhase::Validate => f.write_str("validate"),
            AuthPhase::BuildContext => f.write_str("build_context"),
            AuthPhase::Attach => f.write_str("attach"),
        }
    }
}

/// Terminal state of one authentication.
#[derive(Debug)]
pub enum AuthOutcome {
    /// Credential accepted; context ready to attach.
    Authenticated(AuthorizationContext),
    /// The caller's fault (401-equivalent).
    Rejected(Error),
    /// The system could not decide (503) or a provider misbehaved (500).
    Errored(Error),
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated(_))
    }

    /// HTTP-equivalent status of this outcome.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthOutcome::Authenticated(_) => StatusCode::OK,
            AuthOutcome::Rejected(e) | AuthOutcome::Errored(e) => e.status_code(),
        }
    }

    /// Collapse into a `Result`, dropping the rejected/errored distinction.
    pub fn into_result(self) -> idp_core::Result<AuthorizationContext> {
        match self {
            AuthOutcome::Authenticated(ctx) => Ok(ctx),
            AuthOutcome::Rejected(e) | AuthOutcome::Errored(e) => Err(e),
        }
    }

    fn from_error(err: Error, phase: AuthPhase, provider: &str) -> Self {
        match err.class() {
            ErrorClass::Client => {
                log::warn!("Authentication rejected during {phase}: {err}");
                AuthOutcome::Rejected(err)
            }
            ErrorClass::Infrastructure => {
                log::error!("Identity provider '{provider}' unavailable during {phase}: {err}");
                AuthOutcome::Errored(err)
            }
            ErrorClass::ContractViolation | ErrorClass::Configuration => {
                log::error!(
                    target: CONTRACT_LOG_TARGET,
                    "Identity provider '{provider}' violated the contract during {phase}: {err}"
                );
                AuthOutcome::Errored(err)
            }
        }
    }
}

/// Authenticate one raw credential against `provider`.
///
/// This is the whole state machine minus the attach step, usable outside
/// HTTP (CLI, message consumers).
pub async fn authenticate(
    provider: &dyn IdentityProvider,
    credential: Option<&str>,
    settings: &MiddlewareSettings,
) -> AuthOutcome {
    authenticate_with(provider, &(), credential, settings).await
}

/// [`authenticate`] with extra roles merged from `roles`.
pub async fn authenticate_with<R>(
    provider: &dyn IdentityProvider,
    roles: &R,
    credential: Option<&str>,
    settings: &MiddlewareSettings,
) -> AuthOutcome
where
    R: RolesSource + Sync + ?Sized,
{
    let key = provider.key();

    log::debug!("auth phase: {}", AuthPhase::Extract);
    let token = match credential.map(|raw| Token::new(raw, settings.token_type)) {
        Some(Ok(token)) => token,
        // An empty credential is treated exactly like an absent one.
        None | Some(Err(_)) => {
            return AuthOutcome::from_error(Error::Unauthenticated, AuthPhase::Extract, key);
        }
    };

    log::debug!("auth phase: {}", AuthPhase::Validate);
    let timeout = settings.timeout();
    let identity = match tokio::time::timeout(timeout, provider.validate(&token)).await {
        Ok(Ok(identity)) => identity,
        Ok(Err(err)) => {
            return AuthOutcome::from_error(as_validation_rejection(err), AuthPhase::Validate, key);
        }
        Err(_elapsed) => {
            let err = Error::unavailable(format!("no answer within {timeout:?}"));
            return AuthOutcome::from_error(err, AuthPhase::Validate, key);
        }
    };

    log::debug!("auth phase: {}", AuthPhase::BuildContext);
    match build_context(provider.describe_user(&identity), roles) {
        Ok(ctx) => AuthOutcome::Authenticated(ctx),
        Err(err) => AuthOutcome::from_error(err, AuthPhase::BuildContext, key),
    }
}

/// A credential the provider turned away is always a 401, whatever client
/// error the provider chose to report it with.
fn as_validation_rejection(err: Error) -> Error {
    if err.is_client_error() && err.status_code() != StatusCode::UNAUTHORIZED {
        Error::invalid_token(err.to_string())
    } else {
        err
    }
}

/// Revoke through `provider` within `timeout`.
///
/// Same semantics as [`revoke_or_decline`]; an elapsed timeout is reported as
/// [`Error::ProviderUnavailable`] and the provider call is dropped.
pub async fn revoke_bounded(
    provider: &dyn IdentityProvider,
    request: &RevocationRequest,
    timeout: Duration,
) -> idp_core::Result<RevocationResponse> {
    match tokio::time::timeout(timeout, revoke_or_decline(provider, request)).await {
        Ok(result) => result,
        Err(_elapsed) => {
            log::error!(
                "Identity provider '{}' unavailable during revoke: no answer within {timeout:?}",
                provider.key()
            );
            Err(Error::unavailable(format!("no answer within {timeout:?}")))
        }
    }
}

type SharedRoles = Arc<dyn RolesSource + Send + Sync>;

/// Tower `Layer` that wraps services with provider authentication.
#[derive(Clone)]
pub struct AuthLayer {
    provider: Arc<dyn IdentityProvider>,
    roles: SharedRoles,
    settings: MiddlewareSettings,
}

impl AuthLayer {
    /// Create a new auth layer with the given provider and settings.
    pub fn new(provider: Arc<dyn IdentityProvider>, settings: MiddlewareSettings) -> Self {
        Self {
            provider,
            roles: Arc::new(()),
            settings,
        }
    }

    /// Merge roles from `roles` into every context this layer builds.
    pub fn with_roles_source<R>(mut self, roles: R) -> Self
    where
        R: RolesSource + Send + Sync + 'static,
    {
        self.roles = Arc::new(roles);
        self
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            provider: self.provider.clone(),
            roles: self.roles.clone(),
            settings: self.settings.clone(),
        }
    }
}

/// Tower `Service` that authenticates requests before forwarding them.
///
/// On success, inserts [`AuthorizationContext`] into request extensions where
/// it's available to downstream handlers for the duration of the request.
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    provider: Arc<dyn IdentityProvider>,
    roles: SharedRoles,
    settings: MiddlewareSettings,
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send,
{
    type Response = axum::response::Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let provider = self.provider.clone();
        let roles = self.roles.clone();
        let settings = self.settings.clone();

        Box::pin(async move {
            let credential = extract_credential(req.headers(), &settings.cookie_name);
            let outcome =
                authenticate_with(provider.as_ref(), roles.as_ref(), credential.as_deref(), &settings)
                    .await;

            match outcome {
                AuthOutcome::Authenticated(ctx) => {
                    log::debug!("auth phase: {}", AuthPhase::Attach);
                    req.extensions_mut().insert(ctx);
                    let resp = inner
                        .call(req)
                        .await
                        .unwrap_or_else(|infallible| match infallible {});
                    Ok(resp.into_response())
                }
                AuthOutcome::Rejected(err) | AuthOutcome::Errored(err) => Ok(error_response(&err)),
            }
        })
    }
}

/// Pull the credential from `Authorization: Bearer`, falling back to the
/// named cookie.
///
/// Returns `Some("")` for a present-but-empty bearer value so the caller can
/// reject it the same way as a missing one.
pub fn extract_credential(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(token) = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_value)
    {
        return Some(token.to_string());
    }

    if cookie_name.is_empty() {
        return None;
    }
    headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

fn bearer_value(header: &str) -> Option<&str> {
    let (scheme, value) = header.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then_some(value.trim())
}

/// Build the JSON response for a failed authentication.
///
/// Contract and configuration failures get a generic message; the details
/// stay in the logs.
pub(crate) fn error_response(err: &Error) -> axum::response::Response {
    let (category, message) = match err.class() {
        ErrorClass::Client => ("authentication", err.to_string()),
        ErrorClass::Infrastructure => (
            "unavailable",
            "identity provider is unavailable, try again later".to_string(),
        ),
        ErrorClass::ContractViolation | ErrorClass::Configuration => {
            ("internal", "internal authentication error".to_string())
        }
    };

    let body = serde_json::json!({
        "error": {
            "category": category,
            "code": err.code(),
            "message": message,
        }
    });

    let status = err.status_code();
    let mut response = (
        status,
        [(http::header::CONTENT_TYPE, "application/json")],
        serde_json::to_string(&body).unwrap_or_default(),
    )
        .into_response();

    if status == StatusCode::UNAUTHORIZED {
        let challenge = format!(r#"Bearer error="{}""#, err.code());
        if let Ok(value) = http::HeaderValue::from_str(&challenge) {
            response
                .headers_mut()
                .insert(http::header::WWW_AUTHENTICATE, value);
        }
    }

    response
}
