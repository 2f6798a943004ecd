// src/handlers/notifications.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::notification::{NotificationRecord, SendNotificationRequest, SendNotificationResponse},
    services::notification_service::Dispatch,
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NotificationQuery {
    /// Só os envios ligados a este pedido
    pub order_id: Option<Uuid>,
}

// POST /api/notifications/send
#[utoipa::path(
    post,
    path = "/api/notifications/send",
    tag = "Notificações",
    request_body = SendNotificationRequest,
    responses(
        (status = 200, body = SendNotificationResponse),
        (status = 500, description = "Falha do provedor de e-mail (registrada na auditoria)")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_notification(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<SendNotificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let dispatch = app_state
        .notification_service
        .send(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((
        StatusCode::OK,
        Json(SendNotificationResponse {
            ok: true,
            id: dispatch.id(),
            skipped: !matches!(dispatch, Dispatch::Sent(_)),
        }),
    ))
}

// GET /api/admin/notifications
#[utoipa::path(
    get,
    path = "/api/admin/notifications",
    tag = "Admin",
    params(NotificationQuery),
    responses((status = 200, description = "Auditoria de envios, mais recentes primeiro", body = Vec<NotificationRecord>)),
    security(("api_jwt" = []))
)]
pub async fn list_notifications(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<NotificationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let records = app_state
        .notification_service
        .list_records(query.order_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(records)))
}
