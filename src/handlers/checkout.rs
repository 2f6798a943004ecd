// src/handlers/checkout.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::payment::{CheckoutRequest, CheckoutResponse},
};

// POST /api/checkout
#[utoipa::path(
    post,
    path = "/api/checkout",
    tag = "Pagamento",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "URL da página de pagamento", body = CheckoutResponse),
        (status = 400, description = "Campo ausente ou erro do gateway"),
        (status = 404, description = "Pedido não encontrado"),
        (status = 409, description = "Checkout em andamento")
    )
)]
pub async fn create_checkout(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = app_state
        .checkout_service
        .initiate(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(response)))
}
