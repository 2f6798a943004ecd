// Dublês em memória para os testes de integração: stores, gateway e
// provedor de e-mail, montados num AppState sem banco nem rede.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use uuid::Uuid;

use paisagismo_backend::{
    common::error::AppError,
    config::{AppState, Settings, Stores},
    db::{NotificationStore, OrderStore, PlanStore, SettingsStore, UserStore},
    integrations::{EmailProvider, PaymentGateway},
    models::{
        auth::User,
        notification::{NewNotificationRecord, NotificationRecord, OutboundEmail},
        order::{
            ChecklistItem, CheckoutLink, CheckoutState, CreateOrderPayload, CustomerInfo,
            CustomerPatch, Deliverable, NewDeliverable, NewOrder, Order, OrderPhoto, OrderStatus,
            RevisionRequest, RevisionStatus,
        },
        payment::{CreatedPayment, GatewayCustomer, PaymentRequest},
        plan::{NewPlan, Plan, PlanPatch},
    },
    routes::build_router,
};

pub const SITE_URL: &str = "https://www.paisagismo.test";
pub const QA_EMAIL: &str = "qa@paisagismo.test";
pub const WEBHOOK_TOKEN: &str = "segredo-do-webhook";
pub const JWT_SECRET: &str = "segredo-de-teste";

// =============================================================================
//  STORES
// =============================================================================

#[derive(Default)]
struct State {
    plans: Vec<Plan>,
    orders: Vec<Order>,
    photos: Vec<OrderPhoto>,
    deliverables: Vec<Deliverable>,
    revisions: Vec<RevisionRequest>,
    records: Vec<NotificationRecord>,
    keys: HashSet<String>,
    admin_emails: Vec<String>,
    users: Vec<User>,
}

/// Banco em memória que implementa todos os stores.
#[derive(Default)]
pub struct MemoryDb {
    state: Mutex<State>,
    unavailable: AtomicBool,
    codes_taken: AtomicBool,
    code_lookups: AtomicUsize,
}

fn plan(name: &str, price_cents: i64, features: &[&str], revision_credits: i32) -> Plan {
    let now = Utc::now();
    Plan {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        price_cents,
        features: features.iter().map(|f| f.to_string()).collect(),
        revision_credits,
        active: true,
        created_at: now,
        updated_at: now,
    }
}

impl MemoryDb {
    /// Mesmo catálogo inicial da migração.
    pub fn seeded() -> Arc<Self> {
        let db = Self::default();
        {
            let mut state = db.state.lock().unwrap();
            state.plans = vec![
                plan("Girassol", 39900, &["Croqui do espaço", "Entrega em até 7 dias"], 0),
                plan(
                    "Ipê",
                    69900,
                    &["Planta baixa humanizada", "Imagens 3D", "1 rodada de revisão"],
                    1,
                ),
                plan(
                    "Jasmim",
                    129900,
                    &["Planta baixa humanizada", "2 rodadas de revisão", "Entrega expressa em até 3 dias"],
                    2,
                ),
            ];
        }
        Arc::new(db)
    }

    /// Simula o banco fora do ar.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Faz todo código de pedido parecer já usado.
    pub fn set_codes_taken(&self, taken: bool) {
        self.codes_taken.store(taken, Ordering::SeqCst);
    }

    pub fn code_lookups(&self) -> usize {
        self.code_lookups.load(Ordering::SeqCst)
    }

    /// Envelhece a reivindicação de checkout, como se o tempo tivesse passado.
    pub fn age_checkout_claim(&self, id: Uuid, by: chrono::Duration) {
        self.with_order(id, |o| o.checkout_claimed_at = o.checkout_claimed_at.map(|at| at - by));
    }

    fn check(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }

    pub fn order(&self, id: Uuid) -> Order {
        self.state
            .lock()
            .unwrap()
            .orders
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .expect("pedido inexistente")
    }

    pub fn records(&self) -> Vec<NotificationRecord> {
        self.state.lock().unwrap().records.clone()
    }

    pub fn revisions(&self, order_id: Uuid) -> Vec<RevisionRequest> {
        self.state
            .lock()
            .unwrap()
            .revisions
            .iter()
            .filter(|r| r.order_id == order_id)
            .cloned()
            .collect()
    }

    pub fn set_admins(&self, emails: &[&str]) {
        self.state.lock().unwrap().admin_emails = emails.iter().map(|e| e.to_string()).collect();
    }

    pub fn force_status(&self, id: Uuid, status: OrderStatus) {
        self.with_order(id, |o| o.status = status);
    }

    fn with_order<T>(&self, id: Uuid, f: impl FnOnce(&mut Order) -> T) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        state.orders.iter_mut().find(|o| o.id == id).map(|o| {
            let out = f(o);
            o.updated_at = Utc::now();
            out
        })
    }
}

#[async_trait]
impl PlanStore for MemoryDb {
    async fn list_active(&self) -> Result<Vec<Plan>, AppError> {
        self.check()?;
        let mut plans: Vec<Plan> = self.state.lock().unwrap().plans.iter().filter(|p| p.active).cloned().collect();
        plans.sort_by_key(|p| p.price_cents);
        Ok(plans)
    }

    async fn list_all(&self) -> Result<Vec<Plan>, AppError> {
        self.check()?;
        let mut plans = self.state.lock().unwrap().plans.clone();
        plans.sort_by_key(|p| p.price_cents);
        Ok(plans)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Plan>, AppError> {
        self.check()?;
        Ok(self.state.lock().unwrap().plans.iter().find(|p| p.id == id).cloned())
    }

    async fn create(&self, new: &NewPlan) -> Result<Plan, AppError> {
        self.check()?;
        let mut created = plan(&new.name, new.price_cents, &[], new.revision_credits.unwrap_or_default());
        created.features = new.features.clone();
        created.description = new.description.clone();
        created.active = new.active;
        self.state.lock().unwrap().plans.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: Uuid, patch: &PlanPatch) -> Result<Option<Plan>, AppError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        Ok(state.plans.iter_mut().find(|p| p.id == id).map(|p| {
            if let Some(name) = &patch.name {
                p.name = name.clone();
            }
            if let Some(description) = &patch.description {
                p.description = Some(description.clone());
            }
            if let Some(price) = patch.price_cents {
                p.price_cents = price;
            }
            if let Some(features) = &patch.features {
                p.features = features.clone();
            }
            if let Some(credits) = patch.revision_credits {
                p.revision_credits = credits;
            }
            if let Some(active) = patch.active {
                p.active = active;
            }
            p.updated_at = Utc::now();
            p.clone()
        }))
    }
}

#[async_trait]
impl OrderStore for MemoryDb {
    async fn code_exists(&self, code: &str) -> Result<bool, AppError> {
        self.check()?;
        self.code_lookups.fetch_add(1, Ordering::SeqCst);
        if self.codes_taken.load(Ordering::SeqCst) {
            return Ok(true);
        }
        Ok(self.state.lock().unwrap().orders.iter().any(|o| o.code == code))
    }

    async fn insert(&self, new: &NewOrder) -> Result<Order, AppError> {
        self.check()?;
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            code: new.code.clone(),
            customer: new.customer.clone(),
            notes: new.notes.clone(),
            plan_id: Some(new.plan_id),
            plan_name: new.snapshot.name.clone(),
            plan_snapshot: Some(new.snapshot.clone()),
            status: OrderStatus::AguardandoPagamento,
            payment_status: None,
            checkout_state: CheckoutState::None,
            checkout_claimed_at: None,
            gateway_customer_id: None,
            gateway_payment_id: None,
            gateway_checkout_id: None,
            checkout_url: None,
            last_gateway_event: None,
            last_webhook_at: None,
            paid_at: None,
            delivered_at: None,
            delivery_deadline_days: None,
            checklist: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().orders.push(order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        self.check()?;
        Ok(self.state.lock().unwrap().orders.iter().find(|o| o.id == id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Order>, AppError> {
        self.check()?;
        Ok(self.state.lock().unwrap().orders.iter().find(|o| o.code == code).cloned())
    }

    async fn find_by_gateway_payment_id(&self, payment_id: &str) -> Result<Option<Order>, AppError> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .orders
            .iter()
            .find(|o| o.gateway_payment_id.as_deref() == Some(payment_id))
            .cloned())
    }

    async fn find_by_gateway_checkout_id(&self, checkout_id: &str) -> Result<Option<Order>, AppError> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .orders
            .iter()
            .find(|o| o.gateway_checkout_id.as_deref() == Some(checkout_id))
            .cloned())
    }

    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, AppError> {
        self.check()?;
        let mut orders: Vec<Order> = self
            .state
            .lock()
            .unwrap()
            .orders
            .iter()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn update_customer(&self, id: Uuid, patch: &CustomerPatch) -> Result<Option<Order>, AppError> {
        self.check()?;
        Ok(self.with_order(id, |o| {
            if let Some(name) = &patch.name {
                o.customer.name = name.clone();
            }
            if let Some(email) = &patch.email {
                o.customer.email = email.clone();
            }
            if let Some(phone) = &patch.phone {
                o.customer.phone = phone.clone();
            }
            if let Some(tax_id) = &patch.tax_id {
                o.customer.tax_id = Some(tax_id.clone());
            }
            o.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let before = state.orders.len();
        state.orders.retain(|o| o.id != id);
        state.photos.retain(|p| p.order_id != id);
        state.deliverables.retain(|d| d.order_id != id);
        state.revisions.retain(|r| r.order_id != id);
        Ok(state.orders.len() < before)
    }

    async fn claim_checkout(
        &self,
        id: Uuid,
        claimed_at: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.check()?;
        Ok(self
            .with_order(id, |o| {
                let abandoned = o.checkout_state == CheckoutState::Pending
                    && o.checkout_claimed_at.is_some_and(|at| at < stale_before);
                if o.checkout_state == CheckoutState::None || abandoned {
                    o.checkout_state = CheckoutState::Pending;
                    o.checkout_claimed_at = Some(claimed_at);
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false))
    }

    async fn release_checkout(&self, id: Uuid, claimed_at: DateTime<Utc>) -> Result<(), AppError> {
        self.check()?;
        self.with_order(id, |o| {
            if o.checkout_state == CheckoutState::Pending && o.checkout_claimed_at == Some(claimed_at) {
                o.checkout_state = CheckoutState::None;
                o.checkout_claimed_at = None;
            }
        });
        Ok(())
    }

    async fn complete_checkout(
        &self,
        id: Uuid,
        claimed_at: DateTime<Utc>,
        link: &CheckoutLink,
    ) -> Result<bool, AppError> {
        self.check()?;
        Ok(self
            .with_order(id, |o| {
                if o.checkout_state != CheckoutState::Pending || o.checkout_claimed_at != Some(claimed_at) {
                    return false;
                }
                o.checkout_state = CheckoutState::Ready;
                if link.gateway_customer_id.is_some() {
                    o.gateway_customer_id = link.gateway_customer_id.clone();
                }
                if link.gateway_payment_id.is_some() {
                    o.gateway_payment_id = link.gateway_payment_id.clone();
                }
                o.gateway_checkout_id = Some(link.gateway_checkout_id.clone());
                o.checkout_url = Some(link.checkout_url.clone());
                true
            })
            .unwrap_or(false))
    }

    async fn record_gateway_event(
        &self,
        id: Uuid,
        event: &str,
        payment_id: Option<&str>,
        payment_status: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.check()?;
        self.with_order(id, |o| {
            o.last_gateway_event = Some(event.to_string());
            if o.gateway_payment_id.is_none() {
                o.gateway_payment_id = payment_id.map(str::to_string);
            }
            if let Some(status) = payment_status {
                o.payment_status = Some(status.to_string());
            }
            o.last_webhook_at = Some(at);
        });
        Ok(())
    }

    async fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> Result<bool, AppError> {
        self.check()?;
        Ok(self
            .with_order(id, |o| {
                if o.status == from {
                    o.status = to;
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false))
    }

    async fn mark_paid(&self, id: Uuid, at: DateTime<Utc>, deadline_days: i32) -> Result<bool, AppError> {
        self.check()?;
        Ok(self
            .with_order(id, |o| {
                if o.paid_at.is_none() {
                    o.paid_at = Some(at);
                    o.delivery_deadline_days = Some(deadline_days);
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false))
    }

    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError> {
        self.check()?;
        Ok(self
            .with_order(id, |o| {
                if o.delivered_at.is_none() {
                    o.delivered_at = Some(at);
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false))
    }

    async fn list_photos(&self, order_id: Uuid) -> Result<Vec<OrderPhoto>, AppError> {
        self.check()?;
        Ok(self.state.lock().unwrap().photos.iter().filter(|p| p.order_id == order_id).cloned().collect())
    }

    async fn add_photo(&self, order_id: Uuid, url: &str, caption: Option<&str>) -> Result<OrderPhoto, AppError> {
        self.check()?;
        let photo = OrderPhoto {
            id: Uuid::new_v4(),
            order_id,
            url: url.to_string(),
            caption: caption.map(str::to_string),
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().photos.push(photo.clone());
        Ok(photo)
    }

    async fn list_deliverables(&self, order_id: Uuid) -> Result<Vec<Deliverable>, AppError> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .deliverables
            .iter()
            .filter(|d| d.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn add_deliverable(&self, order_id: Uuid, new: &NewDeliverable) -> Result<Deliverable, AppError> {
        self.check()?;
        let deliverable = Deliverable {
            id: Uuid::new_v4(),
            order_id,
            title: new.title.clone(),
            kind: new.kind,
            url: new.url.clone(),
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().deliverables.push(deliverable.clone());
        Ok(deliverable)
    }

    async fn list_revisions(&self, order_id: Uuid) -> Result<Vec<RevisionRequest>, AppError> {
        self.check()?;
        Ok(self.revisions(order_id))
    }

    async fn count_revisions(&self, order_id: Uuid) -> Result<i64, AppError> {
        self.check()?;
        Ok(self.revisions(order_id).len() as i64)
    }

    async fn add_revision(
        &self,
        order_id: Uuid,
        description: &str,
        max_allowed: i32,
    ) -> Result<Option<RevisionRequest>, AppError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let count = state.revisions.iter().filter(|r| r.order_id == order_id).count() as i64;
        if count >= i64::from(max_allowed) {
            return Ok(None);
        }
        let revision = RevisionRequest {
            id: Uuid::new_v4(),
            order_id,
            description: description.to_string(),
            status: RevisionStatus::Pendente,
            created_at: Utc::now(),
        };
        state.revisions.push(revision.clone());
        Ok(Some(revision))
    }

    async fn resolve_revisions(&self, order_id: Uuid) -> Result<u64, AppError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let mut resolved = 0;
        for revision in state.revisions.iter_mut().filter(|r| r.order_id == order_id) {
            if revision.status == RevisionStatus::Pendente {
                revision.status = RevisionStatus::Resolvido;
                resolved += 1;
            }
        }
        Ok(resolved)
    }

    async fn replace_checklist(&self, order_id: Uuid, items: &[ChecklistItem]) -> Result<(), AppError> {
        self.check()?;
        self.with_order(order_id, |o| o.checklist = items.to_vec());
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for MemoryDb {
    async fn append(&self, record: &NewNotificationRecord) -> Result<NotificationRecord, AppError> {
        self.check()?;
        let stored = NotificationRecord {
            id: Uuid::new_v4(),
            template: record.template,
            recipients: record.recipients.clone(),
            subject: record.subject.clone(),
            body: record.body.clone(),
            status: record.status,
            provider_message_id: record.provider_message_id.clone(),
            error: record.error.clone(),
            related_order_id: record.related_order_id,
            related_user_id: record.related_user_id,
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().records.push(stored.clone());
        Ok(stored)
    }

    async fn list_recent(&self, order_id: Option<Uuid>, limit: i64) -> Result<Vec<NotificationRecord>, AppError> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .records
            .iter()
            .rev()
            .filter(|r| order_id.is_none() || r.related_order_id == order_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn reserve_key(&self, key: &str) -> Result<bool, AppError> {
        self.check()?;
        Ok(self.state.lock().unwrap().keys.insert(key.to_string()))
    }
}

#[async_trait]
impl SettingsStore for MemoryDb {
    async fn admin_emails(&self) -> Result<Vec<String>, AppError> {
        self.check()?;
        Ok(self.state.lock().unwrap().admin_emails.clone())
    }

    async fn set_admin_emails(&self, emails: &[String]) -> Result<(), AppError> {
        self.check()?;
        self.state.lock().unwrap().admin_emails = emails.to_vec();
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryDb {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.check()?;
        Ok(self.state.lock().unwrap().users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, email: &str, name: Option<&str>, password_hash: &str) -> Result<User, AppError> {
        self.check()?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.map(str::to_string),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().users.push(user.clone());
        Ok(user)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if let Some(user) = state.users.iter_mut().find(|u| u.id == id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }
}

// =============================================================================
//  GATEWAY
// =============================================================================

/// Gateway roteirizado: registra as chamadas e falha quando pedido.
#[derive(Default)]
pub struct FakeGateway {
    pub calls: Mutex<Vec<String>>,
    customers: Mutex<HashMap<String, String>>,
    pub payments: Mutex<Vec<PaymentRequest>>,
    fail_payments: Mutex<Option<String>>,
    hold_next_payment: Mutex<Option<Arc<Notify>>>,
    pub cancelled: Mutex<Vec<String>>,
    counter: AtomicUsize,
}

impl FakeGateway {
    pub fn fail_payments_with(&self, message: &str) {
        *self.fail_payments.lock().unwrap() = Some(message.to_string());
    }

    pub fn recover(&self) {
        *self.fail_payments.lock().unwrap() = None;
    }

    pub fn add_customer(&self, email: &str, id: &str) {
        self.customers.lock().unwrap().insert(email.to_string(), id.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn payment_count(&self) -> usize {
        self.payments.lock().unwrap().len()
    }

    /// A próxima cobrança só responde depois de `notify_one()` no retorno.
    pub fn hold_next_payment(&self) -> Arc<Notify> {
        let release = Arc::new(Notify::new());
        *self.hold_next_payment.lock().unwrap() = Some(release.clone());
        release
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }

    /// Cobranças criadas e não canceladas.
    pub fn live_payment_count(&self) -> usize {
        self.payment_count() - self.cancelled().len()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<String>, AppError> {
        self.calls.lock().unwrap().push(format!("find_customer:{email}"));
        Ok(self.customers.lock().unwrap().get(email).cloned())
    }

    async fn create_customer(&self, customer: &GatewayCustomer) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(format!("create_customer:{}", customer.email));
        let id = format!("cus_{}", self.counter.fetch_add(1, Ordering::SeqCst));
        self.customers.lock().unwrap().insert(customer.email.clone(), id.clone());
        Ok(id)
    }

    async fn create_payment(&self, request: &PaymentRequest) -> Result<CreatedPayment, AppError> {
        self.calls.lock().unwrap().push(format!("create_payment:{}", request.external_reference));
        if let Some(message) = self.fail_payments.lock().unwrap().clone() {
            return Err(AppError::GatewayError(message));
        }
        let hold = self.hold_next_payment.lock().unwrap().take();
        if let Some(release) = hold {
            release.notified().await;
        }
        self.payments.lock().unwrap().push(request.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(CreatedPayment {
            id: format!("pay_{n}"),
            invoice_url: format!("https://sandbox.asaas.com/i/{n}"),
        })
    }

    async fn cancel_payment(&self, payment_id: &str) -> Result<(), AppError> {
        self.calls.lock().unwrap().push(format!("cancel_payment:{payment_id}"));
        self.cancelled.lock().unwrap().push(payment_id.to_string());
        Ok(())
    }
}

// =============================================================================
//  PROVEDOR DE E-MAIL
// =============================================================================

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<OutboundEmail> {
        self.sent()
            .into_iter()
            .filter(|e| e.to.iter().any(|t| t == address))
            .collect()
    }
}

#[async_trait]
impl EmailProvider for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<String, AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::ProviderError("domínio não verificado".into()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        Ok(format!("msg_{}", sent.len()))
    }
}

// =============================================================================
//  APLICAÇÃO
// =============================================================================

pub fn settings() -> Settings {
    Settings {
        database_url: "postgres://localhost/teste".into(),
        jwt_secret: JWT_SECRET.into(),
        bind_addr: "127.0.0.1:0".into(),
        asaas_base_url: "http://gateway.invalid".into(),
        asaas_api_key: "chave".into(),
        asaas_webhook_token: Some(WEBHOOK_TOKEN.into()),
        resend_api_key: "chave".into(),
        email_from: "Paisagismo <contato@paisagismo.test>".into(),
        site_url: SITE_URL.into(),
        qa_bypass_emails: vec![QA_EMAIL.into()],
        admin_bootstrap: None,
    }
}

pub struct TestApp {
    pub state: AppState,
    pub db: Arc<MemoryDb>,
    pub gateway: Arc<FakeGateway>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new() -> Self {
        let db = MemoryDb::seeded();
        let gateway = Arc::new(FakeGateway::default());
        let mailer = Arc::new(RecordingMailer::default());

        let stores = Stores {
            plans: db.clone(),
            orders: db.clone(),
            notifications: db.clone(),
            settings: db.clone(),
            users: db.clone(),
        };
        let state = AppState::build(&settings(), stores, gateway.clone(), mailer.clone());

        Self { state, db, gateway, mailer }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub async fn plan(&self, name: &str) -> Plan {
        self.state
            .catalog_service
            .list_plans()
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.name == name)
            .expect("plano do catálogo inicial")
    }

    pub async fn order_for(&self, plan_name: &str, email: &str) -> Order {
        let plan = self.plan(plan_name).await;
        self.state
            .order_service
            .create_order(CreateOrderPayload {
                plan_id: plan.id,
                customer: CustomerInfo {
                    name: "Maria Souza".into(),
                    email: email.into(),
                    phone: "(11) 99999-8888".into(),
                    tax_id: Some("123.456.789-09".into()),
                },
                notes: None,
            })
            .await
            .unwrap()
    }

    pub async fn order(&self, plan_name: &str) -> Order {
        self.order_for(plan_name, "maria@exemplo.com").await
    }
}
