//! End-to-end scenarios across registry, provider, builder and middleware.

use std::sync::Arc;

use idp_auth::{authenticate, AuthOutcome, ProviderRegistry};
use idp_core::conformance::check_provider;
use idp_core::{
    revoke_or_decline, Error, IdentityProvider, MiddlewareSettings, RevocationRequest,
    RuntimeMode, Token, TokenType,
};

use crate::common::{null_settings, RecordingProvider};

#[tokio::test]
async fn test_null_provider_builds_expected_context() {
    let settings = null_settings(RuntimeMode::Development);
    let active = ProviderRegistry::with_builtin().initialize(&settings).unwrap();
    assert_eq!(active.key(), "null");

    let outcome = authenticate(
        active.provider().as_ref(),
        Some("valid-123"),
        &settings.middleware,
    )
    .await;
    assert_eq!(settings.middleware.token_type, TokenType::Access);

    let ctx = outcome.into_result().unwrap();
    assert_eq!(ctx.project_id(), "p1");
    assert_eq!(ctx.user_id(), "u1");
    assert!(ctx.roles().is_empty());
    assert_eq!(
        serde_json::to_value(&ctx).unwrap(),
        serde_json::json!({"projectId": "p1", "userId": "u1", "roles": []})
    );
}

#[tokio::test]
async fn test_empty_token_is_rejected_before_any_provider_call() {
    let provider = RecordingProvider::new();
    let settings = MiddlewareSettings::default();

    for credential in [None, Some("")] {
        let outcome = authenticate(&provider, credential, &settings).await;
        assert!(matches!(outcome, AuthOutcome::Rejected(Error::Unauthenticated)));
    }
    assert_eq!(provider.validate_calls(), 0);
}

#[tokio::test]
async fn test_untyped_revocation_requires_type() {
    let provider = RecordingProvider::new().requiring_token_type();
    let err = provider
        .revoke(&RevocationRequest::untyped("abc"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TokenTypeRequired));
    assert!(!matches!(err, Error::InvalidToken(_)));
    assert_eq!(err.code(), "token_type_required");

    // The helper only folds UnsupportedOperation; this error passes through.
    assert!(matches!(
        revoke_or_decline(&provider, &RevocationRequest::untyped("abc")).await,
        Err(Error::TokenTypeRequired)
    ));
}

#[test]
fn test_unknown_provider_key_stops_startup() {
    let mut settings = null_settings(RuntimeMode::Production);
    settings.provider = Some("does-not-exist".to_string());

    let result = ProviderRegistry::with_builtin().initialize(&settings);
    assert!(matches!(
        result,
        Err(Error::UnknownProviderKey(ref key)) if key == "does-not-exist"
    ));
}

#[tokio::test]
async fn test_revocation_is_idempotent_and_takes_effect() {
    let provider = RecordingProvider::new();
    let token = Token::access("session-1").unwrap();
    let request = RevocationRequest::new("session-1", TokenType::Access);

    assert!(provider.validate(&token).await.is_ok());
    assert!(provider.revoke(&request).await.unwrap().success);
    assert!(provider.revoke(&request).await.unwrap().success);

    let outcome = authenticate(&provider, Some("session-1"), &MiddlewareSettings::default()).await;
    assert!(matches!(outcome, AuthOutcome::Rejected(Error::InvalidToken(_))));
}

#[tokio::test]
async fn test_null_provider_revocation_declines_consistently() {
    let active = ProviderRegistry::with_builtin()
        .initialize(&null_settings(RuntimeMode::Development))
        .unwrap();
    let request = RevocationRequest::new("abc", TokenType::Access);
    for _ in 0..2 {
        let err = active.provider().revoke(&request).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
        let resp = revoke_or_decline(active.provider().as_ref(), &request)
            .await
            .unwrap();
        assert!(!resp.success);
    }
}

#[tokio::test]
async fn test_recording_stub_meets_the_contract() {
    let provider = Arc::new(RecordingProvider::new());
    let report = check_provider(provider.as_ref(), &Token::access("sample").unwrap()).await;
    assert!(report.is_conformant(), "{report}");
}

#[tokio::test]
async fn test_registered_stub_is_selected_by_key() {
    let stub = Arc::new(RecordingProvider::new());
    let for_factory = stub.clone();

    let mut registry = ProviderRegistry::with_builtin();
    registry.register("better-auth", move |_config, _mode| {
        let provider: Arc<dyn IdentityProvider> = for_factory.clone();
        Ok(provider)
    });

    let mut settings = null_settings(RuntimeMode::Production);
    settings.provider = Some("better-auth".to_string());
    let active = registry.initialize(&settings).unwrap();
    assert_eq!(active.key(), "recording");

    let outcome = authenticate(active.provider().as_ref(), Some("t"), &settings.middleware).await;
    assert!(outcome.is_authenticated());
    assert_eq!(stub.validate_calls(), 1);
}
