// src/handlers/orders.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::order::{
        ChecklistItem, CreateOrderPayload, CustomerPatch, Deliverable, DeliverableKind,
        NewDeliverable, Order, OrderDetail, OrderStatus,
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersQuery {
    /// Filtra por status, ex.: "Em Produção"
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangePayload {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliverablePayload {
    #[schema(example = "Projeto final")]
    pub title: String,
    pub kind: DeliverableKind,
    #[schema(example = "https://storage.exemplo.com/projetos/K7M2QX9A.pdf")]
    pub url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistPayload {
    pub items: Vec<ChecklistItem>,
}

// =============================================================================
//  SITE
// =============================================================================

// POST /api/orders
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Pedidos",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Pedido criado aguardando pagamento", body = Order),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Plano não encontrado")
    )
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .order_service
        .create_order(payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(order)))
}

// =============================================================================
//  ADMIN
// =============================================================================

// GET /api/admin/orders
#[utoipa::path(
    get,
    path = "/api/admin/orders",
    tag = "Admin",
    params(ListOrdersQuery),
    responses((status = 200, body = Vec<Order>)),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let orders = app_state
        .order_service
        .list_orders(status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(orders)))
}

// GET /api/admin/orders/{id}
#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 200, body = OrderDetail),
        (status = 404, description = "Pedido não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .order_service
        .get_order_detail(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

// PATCH /api/admin/orders/{id}/status
#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/status",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body = StatusChangePayload,
    responses(
        (status = 200, body = Order),
        (status = 409, description = "Transição não permitida")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_status(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusChangePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .order_service
        .change_status(id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(order)))
}

// PATCH /api/admin/orders/{id}/customer
#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/customer",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body = CustomerPatch,
    responses((status = 200, body = Order)),
    security(("api_jwt" = []))
)]
pub async fn update_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<CustomerPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .order_service
        .update_customer(id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(order)))
}

// DELETE /api/admin/orders/{id}
#[utoipa::path(
    delete,
    path = "/api/admin/orders/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 204, description = "Pedido e filhos removidos"),
        (status = 404, description = "Pedido não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_order(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .order_service
        .delete_order(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/admin/orders/{id}/deliverables
#[utoipa::path(
    post,
    path = "/api/admin/orders/{id}/deliverables",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body = DeliverablePayload,
    responses(
        (status = 201, body = Deliverable),
        (status = 400, description = "Campo ausente")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_deliverable(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeliverablePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let deliverable = app_state
        .order_service
        .add_deliverable(
            id,
            NewDeliverable {
                title: payload.title.trim().to_string(),
                kind: payload.kind,
                url: payload.url.trim().to_string(),
            },
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(deliverable)))
}

// PUT /api/admin/orders/{id}/checklist
#[utoipa::path(
    put,
    path = "/api/admin/orders/{id}/checklist",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body = ChecklistPayload,
    responses((status = 200, body = Vec<ChecklistItem>)),
    security(("api_jwt" = []))
)]
pub async fn replace_checklist(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChecklistPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.items.len() > 100 {
        return Err(AppError::InvalidInput("checklist com mais de 100 itens".into())
            .to_api_error(&locale, &app_state.i18n_store));
    }

    let items = app_state
        .order_service
        .replace_checklist(id, payload.items)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(items)))
}
