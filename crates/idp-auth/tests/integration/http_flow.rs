//! Full HTTP round trips through an axum router.

use axum::body::Body;
use axum::routing::get;
use axum::{Json, Router};
use http::{Request, StatusCode};
use idp_auth::{Authorized, ProviderRegistry};
use idp_core::{AuthorizationContext, RuntimeMode};
use tower::ServiceExt;

use crate::common::null_settings;

async fn whoami(Authorized(ctx): Authorized) -> Json<AuthorizationContext> {
    Json(ctx)
}

fn app(mode: RuntimeMode) -> Router {
    let settings = null_settings(mode);
    let active = ProviderRegistry::with_builtin().initialize(&settings).unwrap();
    Router::new()
        .route("/whoami", get(whoami))
        .layer(active.layer(settings.middleware.clone()))
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_whoami_returns_context() {
    let req = Request::builder()
        .uri("/whoami")
        .header("Authorization", "Bearer valid-123")
        .body(Body::empty())
        .unwrap();
    let resp = app(RuntimeMode::Development).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        serde_json::json!({"projectId": "p1", "userId": "u1", "roles": []})
    );
}

#[tokio::test]
async fn test_empty_bearer_is_401() {
    let req = Request::builder()
        .uri("/whoami")
        .header("Authorization", "Bearer ")
        .body(Body::empty())
        .unwrap();
    let resp = app(RuntimeMode::Development).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["error"]["code"], "unauthenticated");
}

#[tokio::test]
async fn test_production_null_provider_rejects_everything() {
    let req = Request::builder()
        .uri("/whoami")
        .header("Authorization", "Bearer valid-123")
        .body(Body::empty())
        .unwrap();
    let resp = app(RuntimeMode::Production).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["error"]["code"], "invalid_token");
}

#[tokio::test]
async fn test_route_without_layer_is_rejected_by_extractor() {
    let router = Router::new().route("/whoami", get(whoami));
    let req = Request::builder().uri("/whoami").body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
