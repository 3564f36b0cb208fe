//! HTTP surface: liveness, the Telegram webhook receiver, and webhook
//! management endpoints.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use soundrelay_core::ChatRef;
use soundrelay_logging::redact_sensitive_data;
use teloxide::types::{Update, UpdateKind};
use tracing::{error, info, warn};

use crate::router::MessageRouter;
use crate::telegram::BotAccount;
use crate::DeliveryMode;

pub const WEBHOOK_PATH: &str = "/api/webhook";

#[derive(Clone)]
pub struct WebhookState {
    pub account: Arc<dyn BotAccount>,
    pub router: Arc<MessageRouter>,
    pub mode: DeliveryMode,
    /// Public origin Telegram should call, e.g. `https://bot.example.com`.
    pub public_base_url: Option<String>,
}

/// `GET /` only, for polling deployments.
pub fn health_router(state: WebhookState) -> Router {
    Router::new().route("/", get(health)).with_state(state)
}

pub fn webhook_router(state: WebhookState) -> Router {
    Router::new()
        .route("/", get(health))
        .route(WEBHOOK_PATH, post(receive_update))
        .route("/api/set-webhook", get(set_webhook))
        .route("/api/webhook-info", get(webhook_info))
        .with_state(state)
}

async fn health(State(state): State<WebhookState>) -> Json<Value> {
    match state.account.username().await {
        Ok(username) => Json(json!({
            "status": "ok",
            "message": "SoundCloud bot is running",
            "bot_username": username,
            "mode": state.mode.as_str(),
        })),
        Err(e) => Json(json!({
            "status": "error",
            "message": format!("Bot initialization failed: {}", redact_sensitive_data(&e.to_string())),
        })),
    }
}

/// Accept one Telegram update. Message handling runs on its own task so the
/// response goes back before a download finishes.
async fn receive_update(State(state): State<WebhookState>, body: Bytes) -> StatusCode {
    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            error!(error = %e, "Rejected malformed webhook update");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    if let UpdateKind::Message(msg) = update.kind {
        if let Some(text) = msg.text() {
            let chat = ChatRef(msg.chat.id.0);
            let text = text.to_string();
            let router = Arc::clone(&state.router);
            tokio::spawn(async move {
                router.handle_text(chat, &text).await;
            });
        }
    }

    StatusCode::OK
}

async fn set_webhook(State(state): State<WebhookState>) -> Json<Value> {
    let Some(base) = state.public_base_url.as_deref() else {
        return Json(json!({ "error": "WEBHOOK_BASE_URL environment variable not set" }));
    };
    let webhook_url = format!("{}{}", base.trim_end_matches('/'), WEBHOOK_PATH);

    match state.account.set_webhook(&webhook_url).await {
        Ok(()) => {
            info!(url = %webhook_url, "Webhook registered");
            Json(json!({
                "status": "success",
                "webhook_url": webhook_url,
                "message": "Webhook set successfully",
            }))
        }
        Err(e) => {
            let detail = redact_sensitive_data(&e.to_string());
            warn!(error = %detail, "Failed to register webhook");
            Json(json!({
                "status": "error",
                "message": format!("Failed to set webhook: {detail}"),
            }))
        }
    }
}

async fn webhook_info(State(state): State<WebhookState>) -> Json<Value> {
    match state.account.webhook_info().await {
        Ok(info) => Json(info),
        Err(e) => Json(json!({
            "status": "error",
            "message": format!("Failed to get webhook info: {}", redact_sensitive_data(&e.to_string())),
        })),
    }
}
