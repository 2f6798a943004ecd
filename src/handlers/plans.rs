// src/handlers/plans.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::plan::{NewPlan, Plan, PlanPatch},
};

// GET /api/plans
#[utoipa::path(
    get,
    path = "/api/plans",
    tag = "Planos",
    responses(
        (status = 200, description = "Planos ativos, do mais barato ao mais caro", body = Vec<Plan>)
    )
)]
pub async fn list_plans(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let plans = app_state
        .catalog_service
        .list_plans()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(plans)))
}

// GET /api/plans/{id}
#[utoipa::path(
    get,
    path = "/api/plans/{id}",
    tag = "Planos",
    params(("id" = Uuid, Path, description = "ID do plano")),
    responses(
        (status = 200, body = Plan),
        (status = 404, description = "Plano não encontrado")
    )
)]
pub async fn get_plan(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let plan = app_state
        .catalog_service
        .get_plan(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(plan)))
}

// GET /api/admin/plans
#[utoipa::path(
    get,
    path = "/api/admin/plans",
    tag = "Admin",
    responses((status = 200, description = "Todos os planos, inclusive inativos", body = Vec<Plan>)),
    security(("api_jwt" = []))
)]
pub async fn list_all_plans(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let plans = app_state
        .catalog_service
        .list_all_plans()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(plans)))
}

// POST /api/admin/plans
#[utoipa::path(
    post,
    path = "/api/admin/plans",
    tag = "Admin",
    request_body = NewPlan,
    responses(
        (status = 201, body = Plan),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_plan(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<NewPlan>,
) -> Result<impl IntoResponse, ApiError> {
    let plan = app_state
        .catalog_service
        .create_plan(payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(plan)))
}

// PATCH /api/admin/plans/{id}
#[utoipa::path(
    patch,
    path = "/api/admin/plans/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do plano")),
    request_body = PlanPatch,
    responses(
        (status = 200, body = Plan),
        (status = 404, description = "Plano não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_plan(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<Uuid>,
    Json(payload): Json<PlanPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let plan = app_state
        .catalog_service
        .update_plan(id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(plan)))
}
