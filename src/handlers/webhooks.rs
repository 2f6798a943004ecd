// src/handlers/webhooks.rs

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::{
    common::error::AppError,
    config::AppState,
    models::payment::{WebhookAck, WebhookPayload},
};

/// Cabeçalho com o token compartilhado enviado pelo gateway.
pub const WEBHOOK_TOKEN_HEADER: &str = "asaas-access-token";

// POST /api/webhooks/asaas
#[utoipa::path(
    post,
    path = "/api/webhooks/asaas",
    tag = "Webhooks",
    request_body = WebhookPayload,
    responses(
        (status = 200, description = "Evento reconhecido (aplicado ou ignorado)", body = WebhookAck),
        (status = 500, description = "Falha transitória, o gateway deve reenviar")
    )
)]
pub async fn asaas_webhook(State(app_state): State<AppState>, body: Bytes) -> Response {
    handle_event(&app_state, &body).await
}

// POST /api/webhooks/payment
#[utoipa::path(
    post,
    path = "/api/webhooks/payment",
    tag = "Webhooks",
    request_body = WebhookPayload,
    params(("asaas-access-token" = String, Header, description = "Token do webhook")),
    responses(
        (status = 200, body = WebhookAck),
        (status = 401, description = "Token ausente ou incorreto"),
        (status = 500, description = "Falha transitória, o gateway deve reenviar")
    )
)]
pub async fn payment_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(expected) = app_state.webhook_token.as_deref() {
        let provided = headers
            .get(WEBHOOK_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());
        if provided != Some(expected) {
            warn!("🔒 Webhook recusado: token inválido");
            return AppError::InvalidToken.into_response();
        }
    }

    handle_event(&app_state, &body).await
}

// Qualquer resposta não-2xx faz o gateway reenviar: só falhas transitórias viram 500.
async fn handle_event(app_state: &AppState, body: &[u8]) -> Response {
    let payload: WebhookPayload = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Webhook com payload inválido: {}", e);
            return acknowledge(WebhookAck {
                ok: true,
                warning: Some("Payload inválido".into()),
            });
        }
    };

    match app_state.webhook_service.process(&payload).await {
        Ok(outcome) => acknowledge(outcome.ack()),
        Err(e) if e.is_transient() => {
            error!(event = %payload.event, "🔥 Falha transitória no webhook: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": "Falha temporária, tente novamente" })),
            )
                .into_response()
        }
        Err(e) => {
            warn!(event = %payload.event, "Webhook não aplicado: {}", e);
            acknowledge(WebhookAck {
                ok: true,
                warning: Some(e.to_string()),
            })
        }
    }
}

fn acknowledge(ack: WebhookAck) -> Response {
    (StatusCode::OK, Json(ack)).into_response()
}
