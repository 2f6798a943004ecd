// src/handlers/portal.rs
//
// Portal do cliente: acesso por código do pedido + e-mail, sem login.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::order::{OrderDetail, OrderPhoto, RevisionRequest},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortalLookupPayload {
    #[schema(example = "maria@exemplo.com")]
    pub email: String,
    #[schema(example = "K7M2QX9A")]
    pub code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortalPhotoPayload {
    pub email: String,
    pub code: String,
    #[schema(example = "https://storage.exemplo.com/fotos/quintal.jpg")]
    pub url: String,
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevisionPayload {
    pub email: String,
    pub code: String,
    #[schema(example = "Trocar as palmeiras por árvores frutíferas.")]
    pub description: String,
}

// POST /api/portal/lookup
#[utoipa::path(
    post,
    path = "/api/portal/lookup",
    tag = "Portal",
    request_body = PortalLookupPayload,
    responses(
        (status = 200, body = OrderDetail),
        (status = 404, description = "Código ou e-mail não conferem")
    )
)]
pub async fn lookup_order(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<PortalLookupPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .order_service
        .lookup(&payload.email, &payload.code)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

// POST /api/portal/photos
#[utoipa::path(
    post,
    path = "/api/portal/photos",
    tag = "Portal",
    request_body = PortalPhotoPayload,
    responses(
        (status = 201, body = OrderPhoto),
        (status = 404, description = "Código ou e-mail não conferem")
    )
)]
pub async fn add_photo(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<PortalPhotoPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let photo = app_state
        .order_service
        .add_photo(&payload.email, &payload.code, &payload.url, payload.caption.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(photo)))
}

// POST /api/portal/revisions
#[utoipa::path(
    post,
    path = "/api/portal/revisions",
    tag = "Portal",
    request_body = RevisionPayload,
    responses(
        (status = 201, body = RevisionRequest),
        (status = 403, description = "Plano sem revisões disponíveis"),
        (status = 404, description = "Código ou e-mail não conferem")
    )
)]
pub async fn request_revision(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<RevisionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let revision = app_state
        .order_service
        .request_revision(&payload.email, &payload.code, &payload.description)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(revision)))
}
