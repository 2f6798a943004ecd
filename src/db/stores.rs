// src/db/stores.rs
//
// Contratos de persistência. Os repositórios Postgres implementam estes
// traits; os testes usam implementações em memória.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::User,
        notification::{NewNotificationRecord, NotificationRecord},
        order::{
            ChecklistItem, CheckoutLink, CustomerPatch, Deliverable, NewDeliverable, NewOrder,
            Order, OrderPhoto, OrderStatus, RevisionRequest,
        },
        plan::{NewPlan, Plan, PlanPatch},
    },
};

#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn list_active(&self) -> Result<Vec<Plan>, AppError>;
    async fn list_all(&self) -> Result<Vec<Plan>, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Plan>, AppError>;
    async fn create(&self, plan: &NewPlan) -> Result<Plan, AppError>;
    async fn update(&self, id: Uuid, patch: &PlanPatch) -> Result<Option<Plan>, AppError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    // --- Pedido ---
    async fn code_exists(&self, code: &str) -> Result<bool, AppError>;
    async fn insert(&self, order: &NewOrder) -> Result<Order, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, AppError>;
    async fn find_by_code(&self, code: &str) -> Result<Option<Order>, AppError>;
    async fn find_by_gateway_payment_id(&self, payment_id: &str) -> Result<Option<Order>, AppError>;
    async fn find_by_gateway_checkout_id(&self, checkout_id: &str)
        -> Result<Option<Order>, AppError>;
    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, AppError>;
    async fn update_customer(&self, id: Uuid, patch: &CustomerPatch) -> Result<Option<Order>, AppError>;
    /// Remove o pedido e, em cascata, todos os filhos.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    // --- Checkout ---
    /// `none -> pending` (ou `pending` abandonado antes de `stale_before`),
    /// marcando a reivindicação com `claimed_at`.
    /// Retorna `true` se este chamador ganhou o direito de criar a cobrança.
    async fn claim_checkout(
        &self,
        id: Uuid,
        claimed_at: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<bool, AppError>;
    /// `pending -> none`, só se a reivindicação ainda for `claimed_at`.
    async fn release_checkout(&self, id: Uuid, claimed_at: DateTime<Utc>) -> Result<(), AppError>;
    /// `pending -> ready`, gravando o vínculo com o gateway, só se a
    /// reivindicação ainda for `claimed_at`. `false` se ela foi tomada.
    async fn complete_checkout(
        &self,
        id: Uuid,
        claimed_at: DateTime<Utc>,
        link: &CheckoutLink,
    ) -> Result<bool, AppError>;

    // --- Webhook ---
    async fn record_gateway_event(
        &self,
        id: Uuid,
        event: &str,
        payment_id: Option<&str>,
        payment_status: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), AppError>;
    /// Escrita condicional: só altera se o status atual ainda for `from`.
    async fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> Result<bool, AppError>;
    /// Grava `paid_at` e o prazo apenas se `paid_at` ainda estiver vazio.
    async fn mark_paid(&self, id: Uuid, at: DateTime<Utc>, deadline_days: i32) -> Result<bool, AppError>;
    /// Grava `delivered_at` apenas se ainda estiver vazio.
    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError>;

    // --- Filhos ---
    async fn list_photos(&self, order_id: Uuid) -> Result<Vec<OrderPhoto>, AppError>;
    async fn add_photo(&self, order_id: Uuid, url: &str, caption: Option<&str>) -> Result<OrderPhoto, AppError>;
    async fn list_deliverables(&self, order_id: Uuid) -> Result<Vec<Deliverable>, AppError>;
    async fn add_deliverable(&self, order_id: Uuid, deliverable: &NewDeliverable) -> Result<Deliverable, AppError>;
    async fn list_revisions(&self, order_id: Uuid) -> Result<Vec<RevisionRequest>, AppError>;
    async fn count_revisions(&self, order_id: Uuid) -> Result<i64, AppError>;
    /// Insere apenas se o total de revisões do pedido ainda for menor que `max_allowed`.
    async fn add_revision(
        &self,
        order_id: Uuid,
        description: &str,
        max_allowed: i32,
    ) -> Result<Option<RevisionRequest>, AppError>;
    /// Marca todas as revisões pendentes como resolvidas.
    async fn resolve_revisions(&self, order_id: Uuid) -> Result<u64, AppError>;
    async fn replace_checklist(&self, order_id: Uuid, items: &[ChecklistItem]) -> Result<(), AppError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn append(&self, record: &NewNotificationRecord) -> Result<NotificationRecord, AppError>;
    async fn list_recent(&self, order_id: Option<Uuid>, limit: i64) -> Result<Vec<NotificationRecord>, AppError>;
    /// Reserva a chave de idempotência. `false` se já foi usada.
    async fn reserve_key(&self, key: &str) -> Result<bool, AppError>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn admin_emails(&self) -> Result<Vec<String>, AppError>;
    async fn set_admin_emails(&self, emails: &[String]) -> Result<(), AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn create_user(&self, email: &str, name: Option<&str>, password_hash: &str) -> Result<User, AppError>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError>;
}
