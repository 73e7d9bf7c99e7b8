//! Bounded-time, cancellation and concurrency behaviour of the middleware.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use http::{Request, StatusCode};
use idp_auth::{authenticate, revoke_bounded, AuthLayer, AuthOutcome};
use idp_core::{Error, RevocationRequest, TokenType};
use tower::{Layer, ServiceExt};

use crate::common::{shared, short_timeout, RecordingProvider};

async fn ok_handler(_req: Request<Body>) -> Result<axum::response::Response, std::convert::Infallible> {
    Ok(axum::response::IntoResponse::into_response(StatusCode::OK))
}

#[tokio::test]
async fn test_slow_provider_yields_provider_unavailable() {
    let provider = RecordingProvider::new().with_delay(Duration::from_secs(30));
    let settings = short_timeout(Duration::from_millis(50));

    let started = Instant::now();
    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        authenticate(&provider, Some("valid-123"), &settings),
    )
    .await
    .expect("middleware must not hang on a slow provider");

    assert!(matches!(
        outcome,
        AuthOutcome::Errored(Error::ProviderUnavailable(_))
    ));
    assert_eq!(outcome.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(provider.validate_calls(), 1);
    assert_eq!(provider.completed_calls(), 0);
}

#[tokio::test]
async fn test_slow_provider_over_http_is_503() {
    let provider = Arc::new(RecordingProvider::new().with_delay(Duration::from_secs(30)));
    let layer = AuthLayer::new(shared(&provider), short_timeout(Duration::from_millis(50)));
    let service = layer.layer(tower::service_fn(ok_handler));

    let req = Request::builder()
        .header("Authorization", "Bearer valid-123")
        .body(Body::empty())
        .unwrap();
    let resp = tokio::time::timeout(Duration::from_secs(5), service.oneshot(req))
        .await
        .expect("request must finish in bounded time")
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_aborted_request_cancels_provider_call() {
    let provider = Arc::new(RecordingProvider::new().with_delay(Duration::from_millis(100)));
    let layer = AuthLayer::new(shared(&provider), short_timeout(Duration::from_secs(5)));
    let service = layer.layer(tower::service_fn(ok_handler));

    let req = Request::builder()
        .header("Authorization", "Bearer valid-123")
        .body(Body::empty())
        .unwrap();
    let handle = tokio::spawn(service.oneshot(req));

    // Wait until the provider call is in flight, then drop the request.
    let deadline = Instant::now() + Duration::from_secs(2);
    while provider.validate_calls() == 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(provider.validate_calls(), 1);
    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(provider.completed_calls(), 0);
}

#[tokio::test]
async fn test_concurrent_requests_do_not_serialize() {
    let provider = Arc::new(RecordingProvider::new().with_delay(Duration::from_millis(200)));
    let layer = AuthLayer::new(shared(&provider), short_timeout(Duration::from_secs(5)));

    let started = Instant::now();
    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..20 {
        let service = layer.layer(tower::service_fn(ok_handler));
        let req = Request::builder()
            .header("Authorization", format!("Bearer token-{i}"))
            .body(Body::empty())
            .unwrap();
        tasks.spawn(service.oneshot(req));
    }
    while let Some(result) = tasks.join_next().await {
        assert_eq!(result.unwrap().unwrap().status(), StatusCode::OK);
    }

    // Twenty sequential calls would take four seconds.
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(provider.completed_calls(), 20);
}

#[tokio::test]
async fn test_slow_revoke_yields_provider_unavailable() {
    let provider = RecordingProvider::new().with_revoke_delay(Duration::from_secs(3600));
    let request = RevocationRequest::new("valid-123", TokenType::Refresh);

    let started = Instant::now();
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        revoke_bounded(&provider, &request, Duration::from_millis(50)),
    )
    .await
    .expect("revocation must not hang on a slow provider");

    let err = result.unwrap_err();
    assert!(matches!(err, Error::ProviderUnavailable(_)));
    assert!(err.is_retryable());
    assert!(started.elapsed() < Duration::from_secs(5));
}
