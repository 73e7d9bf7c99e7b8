//! Handler functions for idpctl commands.
//!
//! Every handler loads settings and initializes the registry the same way
//! the server does, so a passing `config check` means the server will start.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::{Json, Router};
use idp_auth::{
    authenticate, install_global, revoke_bounded, ActiveProvider, Authorized, ProviderRegistry,
};
use idp_core::{AuthorizationContext, IdpSettings, RevocationRequest, TokenType};

use crate::cli::{ConfigAction, TokenAction};

/// Load settings and construct the active provider.
pub fn bootstrap(config_path: &Path) -> Result<(IdpSettings, ActiveProvider)> {
    let settings = IdpSettings::load(config_path)
        .with_context(|| format!("loading settings from {}", config_path.display()))?;
    let active = ProviderRegistry::with_builtin()
        .initialize(&settings)
        .context("initializing identity provider")?;
    Ok((settings, active))
}

/// Handle a config subcommand.
pub fn handle_config_command(config_path: &Path, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Check => {
            println!("{}", cmd_config_check(config_path)?);
            Ok(())
        }
        ConfigAction::Show => {
            print!("{}", cmd_config_show(config_path)?);
            Ok(())
        }
    }
}

/// Render the resolved settings as TOML.
pub fn cmd_config_show(config_path: &Path) -> Result<String> {
    let settings = IdpSettings::load(config_path)
        .with_context(|| format!("loading settings from {}", config_path.display()))?;
    Ok(toml::to_string_pretty(&settings)?)
}

/// Validate settings and provider construction; returns a one-line summary.
pub fn cmd_config_check(config_path: &Path) -> Result<String> {
    let (settings, active) = bootstrap(config_path)?;
    Ok(format!(
        "ok: provider '{}' ({} mode), timeout {}ms",
        active.key(),
        active.mode(),
        settings.middleware.timeout_ms
    ))
}

/// Handle a token subcommand.
pub async fn handle_token_command(config_path: &Path, action: TokenAction) -> Result<()> {
    let (settings, active) = bootstrap(config_path)?;
    let output = match action {
        TokenAction::Validate { token, token_type } => {
            let ctx = cmd_token_validate(&settings, &active, &token, token_type).await?;
            serde_json::to_string_pretty(&ctx)?
        }
        TokenAction::Revoke { token, token_type } => {
            let request = RevocationRequest {
                token,
                token_type,
            };
            let response = revoke_bounded(
                active.provider().as_ref(),
                &request,
                settings.middleware.timeout(),
            )
            .await?;
            serde_json::to_string_pretty(&response)?
        }
    };
    println!("{output}");
    Ok(())
}

/// Run the full authentication flow for one token.
pub async fn cmd_token_validate(
    settings: &IdpSettings,
    active: &ActiveProvider,
    token: &str,
    token_type: Option<TokenType>,
) -> Result<AuthorizationContext> {
    let mut middleware = settings.middleware.clone();
    if let Some(token_type) = token_type {
        middleware.token_type = token_type;
    }
    let outcome = authenticate(active.provider().as_ref(), Some(token), &middleware).await;
    let status = outcome.status_code();
    outcome
        .into_result()
        .with_context(|| format!("authentication failed ({status})"))
}

async fn whoami(Authorized(ctx): Authorized) -> Json<AuthorizationContext> {
    Json(ctx)
}

/// Build the demo router.
pub fn router(settings: &IdpSettings, active: &ActiveProvider) -> Router {
    Router::new()
        .route("/whoami", get(whoami))
        .layer(active.layer(settings.middleware.clone()))
        .route("/healthz", get(|| async { "ok" }))
}

/// Serve `/whoami` and `/healthz` until interrupted.
pub async fn cmd_serve(config_path: &Path, addr: SocketAddr) -> Result<()> {
    let (settings, active) = bootstrap(config_path)?;
    let active = install_global(active)?.clone();
    let app = router(&settings, &active);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    log::info!("Listening on {addr} with provider '{}'", active.key());
    axum::serve(listener, app).await?;
    Ok(())
}
