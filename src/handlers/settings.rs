// src/handlers/settings.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::settings::AdminEmails,
};

// GET /api/admin/settings/admin-emails
#[utoipa::path(
    get,
    path = "/api/admin/settings/admin-emails",
    tag = "Admin",
    responses((status = 200, body = AdminEmails)),
    security(("api_jwt" = []))
)]
pub async fn get_admin_emails(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let emails = app_state
        .notification_service
        .admin_emails()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(AdminEmails { emails })))
}

// PUT /api/admin/settings/admin-emails
#[utoipa::path(
    put,
    path = "/api/admin/settings/admin-emails",
    tag = "Admin",
    request_body = AdminEmails,
    responses(
        (status = 200, body = AdminEmails),
        (status = 400, description = "E-mail inválido na lista")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_admin_emails(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<AdminEmails>,
) -> Result<impl IntoResponse, ApiError> {
    let emails = app_state
        .notification_service
        .set_admin_emails(payload.emails)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(AdminEmails { emails })))
}
