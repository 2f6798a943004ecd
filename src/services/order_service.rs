// src/services/order_service.rs

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{OrderStore, PlanStore},
    models::{
        notification::{EmailTemplate, Recipient, SendNotificationRequest},
        order::{
            ChecklistItem, CreateOrderPayload, CustomerInfo, CustomerPatch, Deliverable,
            DeliverableKind, NewDeliverable, NewOrder, Order, OrderDetail, OrderPhoto, OrderStatus,
            RevisionRequest,
        },
    },
    services::{notification_service::NotificationService, revision_gate},
};

/// Alfabeto do código do pedido: sem 0/O e 1/I para evitar confusão.
pub const ORDER_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const ORDER_CODE_LEN: usize = 8;
pub const MAX_CODE_ATTEMPTS: usize = 5;

pub fn generate_order_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ORDER_CODE_LEN)
        .map(|_| ORDER_CODE_ALPHABET[rng.gen_range(0..ORDER_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Campos comuns a todos os e-mails de um pedido.
pub fn order_email_data(order: &Order, site_url: &str) -> Value {
    json!({
        "customer_name": order.customer.name,
        "order_code": order.code,
        "plan_name": order.purchased_plan_name(),
        "portal_url": format!("{}/meu-pedido?codigo={}", site_url.trim_end_matches('/'), order.code),
    })
}

fn is_unique_violation(err: &AppError) -> bool {
    match err {
        AppError::DatabaseError(sqlx::Error::Database(db)) => db.is_unique_violation(),
        _ => false,
    }
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    plans: Arc<dyn PlanStore>,
    notifier: NotificationService,
    site_url: String,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        plans: Arc<dyn PlanStore>,
        notifier: NotificationService,
        site_url: String,
    ) -> Self {
        Self { orders, plans, notifier, site_url }
    }

    // =========================================================================
    //  CRIAÇÃO
    // =========================================================================

    pub async fn create_order(&self, payload: CreateOrderPayload) -> Result<Order, AppError> {
        payload.validate()?;

        let plan = self
            .plans
            .find_by_id(payload.plan_id)
            .await?
            .filter(|p| p.active)
            .ok_or(AppError::PlanNotFound)?;

        let customer = CustomerInfo {
            name: payload.customer.name.trim().to_string(),
            email: payload.customer.email.trim().to_lowercase(),
            phone: payload.customer.phone.trim().to_string(),
            tax_id: payload
                .customer
                .tax_id
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        };
        let notes = payload.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

        // A checagem prévia reduz colisões; a constraint UNIQUE fecha a janela restante.
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = generate_order_code(&mut rand::thread_rng());
            if self.orders.code_exists(&code).await? {
                warn!(attempt, "Código de pedido em colisão, gerando outro");
                continue;
            }

            let new_order = NewOrder {
                code,
                customer: customer.clone(),
                notes: notes.clone(),
                plan_id: plan.id,
                snapshot: plan.snapshot(),
            };

            match self.orders.insert(&new_order).await {
                Ok(order) => {
                    info!(order_code = %order.code, plan = %plan.name, "🧾 Pedido criado");
                    return Ok(order);
                }
                Err(e) if is_unique_violation(&e) => {
                    warn!(attempt, "Código de pedido tomado durante a inserção, gerando outro");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::OrderCodeExhausted)
    }

    // =========================================================================
    //  PORTAL DO CLIENTE
    // =========================================================================

    /// Código + e-mail. Qualquer divergência vira o mesmo `OrderNotFound`.
    async fn find_for_customer(&self, email: &str, code: &str) -> Result<Order, AppError> {
        let code = code.trim().to_uppercase();
        let email = email.trim();
        if code.is_empty() || email.is_empty() {
            return Err(AppError::OrderNotFound);
        }

        match self.orders.find_by_code(&code).await? {
            Some(order) if order.customer.email.trim().eq_ignore_ascii_case(email) => Ok(order),
            _ => Err(AppError::OrderNotFound),
        }
    }

    pub async fn lookup(&self, email: &str, code: &str) -> Result<OrderDetail, AppError> {
        let order = self.find_for_customer(email, code).await?;
        self.detail(order).await
    }

    pub async fn add_photo(
        &self,
        email: &str,
        code: &str,
        url: &str,
        caption: Option<&str>,
    ) -> Result<OrderPhoto, AppError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::MissingField("url".into()));
        }
        let order = self.find_for_customer(email, code).await?;
        let caption = caption.map(str::trim).filter(|c| !c.is_empty());
        self.orders.add_photo(order.id, url, caption).await
    }

    /// A regra de revisões é verificada antes de qualquer escrita, e a
    /// inserção é condicional ao total para não passar do limite.
    pub async fn request_revision(
        &self,
        email: &str,
        code: &str,
        description: &str,
    ) -> Result<RevisionRequest, AppError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(AppError::MissingField("description".into()));
        }

        let order = self.find_for_customer(email, code).await?;
        let submitted = self.orders.count_revisions(order.id).await?;
        if !revision_gate::can_request_revision(&order, submitted) {
            info!(order_code = %order.code, submitted, "🚫 Revisão recusada pelo limite do plano");
            return Err(AppError::RevisionLimitReached);
        }

        let max_allowed = revision_gate::max_revisions(&order);
        let revision = self
            .orders
            .add_revision(order.id, description, max_allowed)
            .await?
            .ok_or(AppError::RevisionLimitReached)?;

        info!(order_code = %order.code, "✏️ Revisão solicitada");

        let mut data = order_email_data(&order, &self.site_url);
        data["description"] = json!(description);
        self.notifier
            .notify(SendNotificationRequest {
                template: EmailTemplate::RevisionRequestedAdmin,
                to: Recipient::Admins,
                data,
                related_order_id: Some(order.id),
                related_user_id: None,
            })
            .await;

        Ok(revision)
    }

    async fn detail(&self, order: Order) -> Result<OrderDetail, AppError> {
        let photos = self.orders.list_photos(order.id).await?;
        let deliverables = self.orders.list_deliverables(order.id).await?;
        let revisions = self.orders.list_revisions(order.id).await?;

        let submitted = revisions.len() as i64;
        Ok(OrderDetail {
            can_request_revision: revision_gate::can_request_revision(&order, submitted),
            revisions_remaining: revision_gate::revisions_remaining(&order, submitted),
            order,
            photos,
            deliverables,
            revisions,
        })
    }

    // =========================================================================
    //  ADMIN
    // =========================================================================

    pub async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, AppError> {
        self.orders.list(status).await
    }

    async fn get_order(&self, id: Uuid) -> Result<Order, AppError> {
        self.orders.find_by_id(id).await?.ok_or(AppError::OrderNotFound)
    }

    pub async fn get_order_detail(&self, id: Uuid) -> Result<OrderDetail, AppError> {
        let order = self.get_order(id).await?;
        self.detail(order).await
    }

    /// Mudança manual de status, validada pela tabela de transições.
    pub async fn change_status(&self, id: Uuid, next: OrderStatus) -> Result<Order, AppError> {
        let order = self.get_order(id).await?;
        order.status.transition_to(next)?;
        if order.status == next {
            return Ok(order);
        }

        if !self.orders.update_status(id, order.status, next).await? {
            // Outro escritor mudou o status entre a leitura e a escrita.
            let current = self.get_order(id).await?;
            return Err(AppError::InvalidTransition {
                from: current.status.to_string(),
                to: next.to_string(),
            });
        }

        if next == OrderStatus::Enviado {
            self.orders.mark_delivered(id, Utc::now()).await?;
        }

        info!(order_code = %order.code, from = %order.status, to = %next, "🔄 Status alterado pelo admin");

        let updated = self.get_order(id).await?;
        let mut data = order_email_data(&updated, &self.site_url);
        data["status"] = json!(next.as_str());
        self.notifier
            .notify(SendNotificationRequest {
                template: EmailTemplate::StatusUpdate,
                to: Recipient::One(updated.customer.email.clone()),
                data,
                related_order_id: Some(updated.id),
                related_user_id: None,
            })
            .await;

        Ok(updated)
    }

    pub async fn update_customer(&self, id: Uuid, patch: CustomerPatch) -> Result<Order, AppError> {
        let patch = CustomerPatch {
            name: patch.name.map(|n| n.trim().to_string()),
            email: patch.email.map(|e| e.trim().to_lowercase()),
            phone: patch.phone.map(|p| p.trim().to_string()),
            tax_id: patch.tax_id.map(|t| t.trim().to_string()),
        };
        if patch.name.as_deref().is_some_and(str::is_empty) {
            return Err(AppError::MissingField("name".into()));
        }
        if patch.email.as_deref().is_some_and(|e| !e.contains('@')) {
            return Err(AppError::InvalidInput("email".into()));
        }

        self.orders
            .update_customer(id, &patch)
            .await?
            .ok_or(AppError::OrderNotFound)
    }

    pub async fn delete_order(&self, id: Uuid) -> Result<(), AppError> {
        if !self.orders.delete(id).await? {
            return Err(AppError::OrderNotFound);
        }
        info!(order_id = %id, "🗑️ Pedido removido");
        Ok(())
    }

    pub async fn add_deliverable(&self, id: Uuid, deliverable: NewDeliverable) -> Result<Deliverable, AppError> {
        if deliverable.title.trim().is_empty() {
            return Err(AppError::MissingField("title".into()));
        }
        if deliverable.url.trim().is_empty() {
            return Err(AppError::MissingField("url".into()));
        }

        let order = self.get_order(id).await?;
        let created = self.orders.add_deliverable(order.id, &deliverable).await?;

        let template = match deliverable.kind {
            DeliverableKind::Projeto => self
                .deliver(&order)
                .await?
                .then_some(EmailTemplate::ProjectDelivered),
            DeliverableKind::ProjetoRevisado => {
                let resolved = self.orders.resolve_revisions(order.id).await?;
                info!(order_code = %order.code, resolved, "✅ Revisões resolvidas");
                Some(EmailTemplate::RevisedProjectDelivered)
            }
            DeliverableKind::Imagem | DeliverableKind::Documento => None,
        };

        if let Some(template) = template {
            self.notifier
                .notify(SendNotificationRequest {
                    template,
                    to: Recipient::One(order.customer.email.clone()),
                    data: order_email_data(&order, &self.site_url),
                    related_order_id: Some(order.id),
                    related_user_id: None,
                })
                .await;
        }

        Ok(created)
    }

    /// `true` se o pedido está `Enviado` ao final; só então o cliente é avisado.
    async fn deliver(&self, order: &Order) -> Result<bool, AppError> {
        if order.status != OrderStatus::Enviado {
            if !order.status.can_transition_to(OrderStatus::Enviado) {
                warn!(order_code = %order.code, status = %order.status, "Projeto anexado sem mudar o status");
                return Ok(false);
            }
            if !self.orders.update_status(order.id, order.status, OrderStatus::Enviado).await? {
                warn!(order_code = %order.code, "Status mudou durante a entrega, mantendo o atual");
                return Ok(false);
            }
        }
        self.orders.mark_delivered(order.id, Utc::now()).await?;
        info!(order_code = %order.code, "📬 Projeto entregue");
        Ok(true)
    }

    pub async fn replace_checklist(&self, id: Uuid, items: Vec<ChecklistItem>) -> Result<Vec<ChecklistItem>, AppError> {
        let order = self.get_order(id).await?;
        let items: Vec<ChecklistItem> = items
            .into_iter()
            .map(|item| ChecklistItem { text: item.text.trim().to_string(), done: item.done })
            .filter(|item| !item.text.is_empty())
            .collect();

        self.orders.replace_checklist(order.id, &items).await?;
        Ok(items)
    }
}
