// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Planos ---
        handlers::plans::list_plans,
        handlers::plans::get_plan,

        // --- Pedidos e portal ---
        handlers::orders::create_order,
        handlers::portal::lookup_order,
        handlers::portal::add_photo,
        handlers::portal::request_revision,

        // --- Pagamento ---
        handlers::checkout::create_checkout,
        handlers::webhooks::asaas_webhook,
        handlers::webhooks::payment_webhook,

        // --- Auth ---
        handlers::auth::login,
        handlers::auth::register,
        handlers::auth::get_me,
        handlers::auth::change_password,

        // --- Admin ---
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::change_status,
        handlers::orders::update_customer,
        handlers::orders::delete_order,
        handlers::orders::add_deliverable,
        handlers::orders::replace_checklist,
        handlers::plans::list_all_plans,
        handlers::plans::create_plan,
        handlers::plans::update_plan,
        handlers::settings::get_admin_emails,
        handlers::settings::update_admin_emails,
        handlers::notifications::send_notification,
        handlers::notifications::list_notifications,
    ),
    components(
        schemas(
            // --- Pedidos ---
            models::order::OrderStatus,
            models::order::CheckoutState,
            models::order::DeliverableKind,
            models::order::RevisionStatus,
            models::order::PlanSnapshot,
            models::order::CustomerInfo,
            models::order::ChecklistItem,
            models::order::Order,
            models::order::OrderPhoto,
            models::order::Deliverable,
            models::order::RevisionRequest,
            models::order::OrderDetail,
            models::order::CreateOrderPayload,
            models::order::CustomerPatch,

            // --- Planos ---
            models::plan::Plan,
            models::plan::NewPlan,
            models::plan::PlanPatch,

            // --- Pagamento ---
            models::payment::CheckoutRequest,
            models::payment::CheckoutResponse,
            models::payment::WebhookPayload,
            models::payment::WebhookPayment,
            models::payment::WebhookCheckout,
            models::payment::WebhookAck,

            // --- Notificações ---
            models::notification::SendStatus,
            models::notification::NotificationRecord,
            models::notification::SendNotificationRequest,
            models::notification::SendNotificationResponse,
            models::settings::AdminEmails,

            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::ChangePasswordPayload,
            models::auth::AuthResponse,

            // --- Payloads ---
            handlers::portal::PortalLookupPayload,
            handlers::portal::PortalPhotoPayload,
            handlers::portal::RevisionPayload,
            handlers::orders::StatusChangePayload,
            handlers::orders::DeliverablePayload,
            handlers::orders::ChecklistPayload,
        )
    ),
    tags(
        (name = "Planos", description = "Catálogo de planos"),
        (name = "Pedidos", description = "Criação de pedidos pelo site"),
        (name = "Portal", description = "Acompanhamento do pedido pelo cliente"),
        (name = "Pagamento", description = "Checkout no gateway"),
        (name = "Webhooks", description = "Eventos enviados pelo gateway de pagamento"),
        (name = "Auth", description = "Autenticação dos administradores"),
        (name = "Admin", description = "CMS: pedidos, planos e configurações"),
        (name = "Notificações", description = "Envio de e-mails transacionais")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
