//! Webhook mode: an axum server that receives Telegram update POSTs and dispatches each one.

use anyhow::Context as _;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::bot::{self, Bot};
use crate::config::WebhookConfig;

/// Header Telegram uses to echo the secret given to setWebhook.
pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

#[derive(Clone)]
struct WebhookState {
    bot: Bot,
    secret: Option<String>,
    path: String,
    /// Held across dispatch: updates are handled one at a time, in arrival order.
    dispatch_lock: Arc<Mutex<()>>,
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Routes: `GET /` health JSON and `POST {path}` for updates.
pub fn router(bot: Bot, secret: Option<String>, path: &str) -> Router {
    let path = normalize_path(path);
    let state = WebhookState {
        bot,
        secret: secret.filter(|s| !s.is_empty()),
        path: path.clone(),
        dispatch_lock: Arc::new(Mutex::new(())),
    };
    Router::new()
        .route("/", get(health_http))
        .route(&path, post(receive_update))
        .with_state(state)
}

/// Register the webhook (when `config.url` is set), serve until SIGINT/SIGTERM,
/// then remove the webhook if `config.delete_on_shutdown`.
pub async fn serve(bot: Bot, config: WebhookConfig) -> anyhow::Result<()> {
    serve_with_shutdown(bot, config, shutdown_signal()).await
}

/// [`serve`] with a caller-provided shutdown future.
pub async fn serve_with_shutdown<F>(bot: Bot, config: WebhookConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let url = config
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string);
    let secret = config.secret.clone().filter(|s| !s.is_empty());

    if let Some(ref url) = url {
        match bot.api().set_webhook(url, secret.as_deref(), None, Some(1)).await {
            Ok(_) => log::info!("webhook registered: {}", url),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => log::warn!("setWebhook failed: {}", e),
        }
    }

    let app = router(bot.clone(), secret, &config.path);
    let bind_addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!(
        "webhook server listening on {} (updates at {})",
        bind_addr,
        normalize_path(&config.path)
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("webhook server exited")?;

    if url.is_some() && config.delete_on_shutdown {
        if let Err(e) = bot.api().delete_webhook(false).await {
            log::debug!("deleteWebhook on shutdown: {}", e);
        } else {
            log::info!("webhook removed");
        }
    }
    log::info!("webhook server stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received");
}

/// POST {path}: verify the optional secret, decode, dispatch. Only a body that is not
/// JSON or has no `update_id` gets 400; a malformed payload and handler failures are
/// logged and still answered with 200 so Telegram does not redeliver.
async fn receive_update(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(ref expected) = state.secret {
        let provided = headers
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != expected.as_str() {
            log::warn!("webhook: rejected update with wrong secret");
            return StatusCode::FORBIDDEN;
        }
    }
    let update = match bot::decode_webhook_body(&body) {
        Ok(u) => u,
        Err(e) => {
            log::debug!("webhook: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    let _guard = state.dispatch_lock.lock().await;
    if let Err(e) = state.bot.dispatch(&update).await {
        log::error!("webhook: update {} handler failed: {:#}", update.update_id, e);
    }
    StatusCode::OK
}

/// GET / returns a simple health JSON (for health checks).
async fn health_http(State(state): State<WebhookState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "running",
        "mode": "webhook",
        "path": state.path,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_gets_leading_slash() {
        assert_eq!(normalize_path("hook"), "/hook");
        assert_eq!(normalize_path(" /webhook "), "/webhook");
    }
}
