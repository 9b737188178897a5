//! HTTP surface: liveness probe, Telegram webhook, webhook registration.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

use crate::router::{InboundUpdate, UpdateRouter};
use crate::session::SessionStore;
use crate::tg::{Command, Messenger};
use crate::tmdb::Catalog;

pub struct AppState<C, M, S> {
    pub router: UpdateRouter<C, M, S>,
    /// Public base URL of this service; `None` disables `/set_webhook`.
    pub webhook_url: Option<String>,
}

pub fn app<C, M, S>(state: Arc<AppState<C, M, S>>) -> Router
where
    C: Catalog,
    M: Messenger,
    S: SessionStore,
{
    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(webhook::<C, M, S>))
        .route("/set_webhook", get(set_webhook::<C, M, S>))
        .with_state(state)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Always answers `{"ok": true}` so Telegram does not redeliver; failures
/// are only logged.
async fn webhook<C, M, S>(State(state): State<Arc<AppState<C, M, S>>>, body: Bytes) -> Json<Value>
where
    C: Catalog,
    M: Messenger,
    S: SessionStore,
{
    match serde_json::from_slice::<InboundUpdate>(&body) {
        Ok(update) => {
            if let Err(e) = state.router.handle_update(update).await {
                error!(error = %e, "update handling failed");
            }
        }
        Err(e) => warn!(error = %e, "unparseable webhook payload"),
    }
    Json(json!({ "ok": true }))
}

/// Re-registers the command menu and the webhook URL; safe to call repeatedly.
async fn set_webhook<C, M, S>(State(state): State<Arc<AppState<C, M, S>>>) -> (StatusCode, Json<Value>)
where
    C: Catalog,
    M: Messenger,
    S: SessionStore,
{
    let Some(base) = state.webhook_url.as_deref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ok": false, "error": "TELEGRAM_WEBHOOK_URL is not configured" })),
        );
    };
    let url = format!("{}/webhook", base.trim_end_matches('/'));
    let messenger = state.router.messenger();
    let result = async {
        messenger.set_commands(Command::bot_commands()).await?;
        messenger.set_webhook(&url).await
    }
    .await;
    match result {
        Ok(()) => {
            info!(%url, "webhook registered");
            (StatusCode::OK, Json(json!({ "ok": true, "url": url })))
        }
        Err(e) => {
            error!(%url, error = %e, "webhook registration failed");
            (StatusCode::BAD_GATEWAY, Json(json!({ "ok": false, "error": e.to_string() })))
        }
    }
}
