// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Json, Router,
};
use utoipa::OpenApi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

pub fn build_router(app_state: AppState) -> Router {
    // Rotas públicas do site e do portal
    let public_routes = Router::new()
        .route("/plans", get(handlers::plans::list_plans))
        .route("/plans/{id}", get(handlers::plans::get_plan))
        .route("/orders", post(handlers::orders::create_order))
        .route("/checkout", post(handlers::checkout::create_checkout))
        .route("/portal/lookup", post(handlers::portal::lookup_order))
        .route("/portal/photos", post(handlers::portal::add_photo))
        .route("/portal/revisions", post(handlers::portal::request_revision))
        .route("/auth/login", post(handlers::auth::login));

    // Chamadas do gateway: nunca passam pelo JWT
    let webhook_routes = Router::new()
        .route("/asaas", post(handlers::webhooks::asaas_webhook))
        .route("/payment", post(handlers::webhooks::payment_webhook));

    let auth_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/register", post(handlers::auth::register))
        .route("/password", post(handlers::auth::change_password))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let admin_routes = Router::new()
        .route("/orders", get(handlers::orders::list_orders))
        .route(
            "/orders/{id}",
            get(handlers::orders::get_order).delete(handlers::orders::delete_order),
        )
        .route("/orders/{id}/status", patch(handlers::orders::change_status))
        .route("/orders/{id}/customer", patch(handlers::orders::update_customer))
        .route("/orders/{id}/deliverables", post(handlers::orders::add_deliverable))
        .route("/orders/{id}/checklist", put(handlers::orders::replace_checklist))
        .route(
            "/plans",
            get(handlers::plans::list_all_plans).post(handlers::plans::create_plan),
        )
        .route("/plans/{id}", patch(handlers::plans::update_plan))
        .route(
            "/settings/admin-emails",
            get(handlers::settings::get_admin_emails).put(handlers::settings::update_admin_emails),
        )
        .route("/notifications", get(handlers::notifications::list_notifications))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let notification_routes = Router::new()
        .route("/send", post(handlers::notifications::send_notification))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api", public_routes)
        .nest("/api/webhooks", webhook_routes)
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/notifications", notification_routes)
        .with_state(app_state)
}
