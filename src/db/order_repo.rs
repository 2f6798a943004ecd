// src/db/order_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::stores::OrderStore,
    models::order::{
        ChecklistItem, CheckoutLink, CustomerInfo, CustomerPatch, Deliverable, NewDeliverable,
        NewOrder, Order, OrderPhoto, OrderStatus, PlanSnapshot, RevisionRequest,
    },
};

const ORDER_COLUMNS: &str = r#"
    id, code, customer_name, customer_email, customer_phone, customer_tax_id, notes,
    plan_id, plan_name, snapshot_name, snapshot_price_cents, snapshot_features,
    snapshot_revision_credits, status, payment_status, checkout_state, checkout_claimed_at,
    gateway_customer_id, gateway_payment_id, gateway_checkout_id, checkout_url,
    last_gateway_event, last_webhook_at, paid_at, delivered_at, delivery_deadline_days,
    checklist, created_at, updated_at
"#;

// Linha crua da tabela `orders`; os enums viram tipos fechados no TryFrom.
#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    code: String,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    customer_tax_id: Option<String>,
    notes: Option<String>,
    plan_id: Option<Uuid>,
    plan_name: String,
    snapshot_name: Option<String>,
    snapshot_price_cents: Option<i64>,
    snapshot_features: Option<Vec<String>>,
    snapshot_revision_credits: Option<i32>,
    status: String,
    payment_status: Option<String>,
    checkout_state: String,
    checkout_claimed_at: Option<DateTime<Utc>>,
    gateway_customer_id: Option<String>,
    gateway_payment_id: Option<String>,
    gateway_checkout_id: Option<String>,
    checkout_url: Option<String>,
    last_gateway_event: Option<String>,
    last_webhook_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    delivery_deadline_days: Option<i32>,
    checklist: Json<Vec<ChecklistItem>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        // Pedidos antigos não têm snapshot; nome e preço são obrigatórios para existir um.
        let plan_snapshot = match (row.snapshot_name, row.snapshot_price_cents) {
            (Some(name), Some(price_cents)) => Some(PlanSnapshot {
                name,
                price_cents,
                features: row.snapshot_features.unwrap_or_default(),
                revision_credits: row.snapshot_revision_credits,
            }),
            _ => None,
        };

        Ok(Order {
            id: row.id,
            code: row.code,
            customer: CustomerInfo {
                name: row.customer_name,
                email: row.customer_email,
                phone: row.customer_phone,
                tax_id: row.customer_tax_id,
            },
            notes: row.notes,
            plan_id: row.plan_id,
            plan_name: row.plan_name,
            plan_snapshot,
            status: row.status.parse().map_err(corrupt_row)?,
            payment_status: row.payment_status,
            checkout_state: row.checkout_state.parse().map_err(corrupt_row)?,
            checkout_claimed_at: row.checkout_claimed_at,
            gateway_customer_id: row.gateway_customer_id,
            gateway_payment_id: row.gateway_payment_id,
            gateway_checkout_id: row.gateway_checkout_id,
            checkout_url: row.checkout_url,
            last_gateway_event: row.last_gateway_event,
            last_webhook_at: row.last_webhook_at,
            paid_at: row.paid_at,
            delivered_at: row.delivered_at,
            delivery_deadline_days: row.delivery_deadline_days,
            checklist: row.checklist.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct DeliverableRow {
    id: Uuid,
    order_id: Uuid,
    title: String,
    kind: String,
    url: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<DeliverableRow> for Deliverable {
    type Error = AppError;

    fn try_from(row: DeliverableRow) -> Result<Self, Self::Error> {
        Ok(Deliverable {
            id: row.id,
            order_id: row.order_id,
            title: row.title,
            kind: row.kind.parse().map_err(corrupt_row)?,
            url: row.url,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RevisionRow {
    id: Uuid,
    order_id: Uuid,
    description: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RevisionRow> for RevisionRequest {
    type Error = AppError;

    fn try_from(row: RevisionRow) -> Result<Self, Self::Error> {
        Ok(RevisionRequest {
            id: row.id,
            order_id: row.order_id,
            description: row.description,
            status: row.status.parse().map_err(corrupt_row)?,
            created_at: row.created_at,
        })
    }
}

fn corrupt_row(e: AppError) -> AppError {
    AppError::InternalServerError(anyhow::anyhow!("Linha inconsistente no banco: {}", e))
}

fn into_orders(rows: Vec<OrderRow>) -> Result<Vec<Order>, AppError> {
    rows.into_iter().map(Order::try_from).collect()
}

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, filter: &str, value: &str) -> Result<Option<Order>, AppError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {filter} = $1 LIMIT 1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    // =========================================================================
    //  PEDIDO
    // =========================================================================

    async fn code_exists(&self, code: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE code = $1)")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn insert(&self, order: &NewOrder) -> Result<Order, AppError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (
                code, customer_name, customer_email, customer_phone, customer_tax_id, notes,
                plan_id, plan_name, snapshot_name, snapshot_price_cents, snapshot_features,
                snapshot_revision_credits
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, $9, $10, $11)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(&order.code)
        .bind(&order.customer.name)
        .bind(&order.customer.email)
        .bind(&order.customer.phone)
        .bind(&order.customer.tax_id)
        .bind(&order.notes)
        .bind(order.plan_id)
        .bind(&order.snapshot.name)
        .bind(order.snapshot.price_cents)
        .bind(&order.snapshot.features)
        .bind(order.snapshot.revision_credits)
        .fetch_one(&self.pool)
        .await?;

        Order::try_from(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Order>, AppError> {
        self.find_one("code", code).await
    }

    async fn find_by_gateway_payment_id(&self, payment_id: &str) -> Result<Option<Order>, AppError> {
        self.find_one("gateway_payment_id", payment_id).await
    }

    async fn find_by_gateway_checkout_id(
        &self,
        checkout_id: &str,
    ) -> Result<Option<Order>, AppError> {
        self.find_one("gateway_checkout_id", checkout_id).await
    }

    async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, AppError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        into_orders(rows)
    }

    async fn update_customer(
        &self,
        id: Uuid,
        patch: &CustomerPatch,
    ) -> Result<Option<Order>, AppError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE orders SET
                customer_name = COALESCE($2, customer_name),
                customer_email = COALESCE($3, customer_email),
                customer_phone = COALESCE($4, customer_phone),
                customer_tax_id = COALESCE($5, customer_tax_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.email)
        .bind(&patch.phone)
        .bind(&patch.tax_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    //  CHECKOUT
    // =========================================================================

    async fn claim_checkout(
        &self,
        id: Uuid,
        claimed_at: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET checkout_state = 'pending', checkout_claimed_at = $2, updated_at = NOW()
            WHERE id = $1
              AND (checkout_state = 'none'
                   OR (checkout_state = 'pending' AND checkout_claimed_at < $3))
            "#,
        )
        .bind(id)
        .bind(claimed_at)
        .bind(stale_before)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_checkout(&self, id: Uuid, claimed_at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE orders
            SET checkout_state = 'none', checkout_claimed_at = NULL, updated_at = NOW()
            WHERE id = $1 AND checkout_state = 'pending' AND checkout_claimed_at = $2
            "#,
        )
        .bind(id)
        .bind(claimed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn complete_checkout(
        &self,
        id: Uuid,
        claimed_at: DateTime<Utc>,
        link: &CheckoutLink,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                checkout_state = 'ready',
                gateway_customer_id = COALESCE($3, gateway_customer_id),
                gateway_payment_id = COALESCE($4, gateway_payment_id),
                gateway_checkout_id = $5,
                checkout_url = $6,
                updated_at = NOW()
            WHERE id = $1 AND checkout_state = 'pending' AND checkout_claimed_at = $2
            "#,
        )
        .bind(id)
        .bind(claimed_at)
        .bind(&link.gateway_customer_id)
        .bind(&link.gateway_payment_id)
        .bind(&link.gateway_checkout_id)
        .bind(&link.checkout_url)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    //  WEBHOOK
    // =========================================================================

    async fn record_gateway_event(
        &self,
        id: Uuid,
        event: &str,
        payment_id: Option<&str>,
        payment_status: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE orders SET
                last_gateway_event = $2,
                gateway_payment_id = COALESCE(gateway_payment_id, $3),
                payment_status = COALESCE($4, payment_status),
                last_webhook_at = $5,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(event)
        .bind(payment_id)
        .bind(payment_status)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE orders SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_paid(&self, id: Uuid, at: DateTime<Utc>, deadline_days: i32) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET paid_at = $2, delivery_deadline_days = $3, updated_at = NOW()
            WHERE id = $1 AND paid_at IS NULL
            "#,
        )
        .bind(id)
        .bind(at)
        .bind(deadline_days)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE orders SET delivered_at = $2, updated_at = NOW() WHERE id = $1 AND delivered_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    //  FILHOS (fotos, entregas, revisões, checklist)
    // =========================================================================

    async fn list_photos(&self, order_id: Uuid) -> Result<Vec<OrderPhoto>, AppError> {
        let photos = sqlx::query_as::<_, OrderPhoto>(
            "SELECT id, order_id, url, caption, created_at FROM order_photos WHERE order_id = $1 ORDER BY created_at",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(photos)
    }

    async fn add_photo(
        &self,
        order_id: Uuid,
        url: &str,
        caption: Option<&str>,
    ) -> Result<OrderPhoto, AppError> {
        let photo = sqlx::query_as::<_, OrderPhoto>(
            r#"
            INSERT INTO order_photos (order_id, url, caption)
            VALUES ($1, $2, $3)
            RETURNING id, order_id, url, caption, created_at
            "#,
        )
        .bind(order_id)
        .bind(url)
        .bind(caption)
        .fetch_one(&self.pool)
        .await?;
        Ok(photo)
    }

    async fn list_deliverables(&self, order_id: Uuid) -> Result<Vec<Deliverable>, AppError> {
        let rows = sqlx::query_as::<_, DeliverableRow>(
            "SELECT id, order_id, title, kind, url, created_at FROM order_deliverables WHERE order_id = $1 ORDER BY created_at",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Deliverable::try_from).collect()
    }

    async fn add_deliverable(
        &self,
        order_id: Uuid,
        deliverable: &NewDeliverable,
    ) -> Result<Deliverable, AppError> {
        let row = sqlx::query_as::<_, DeliverableRow>(
            r#"
            INSERT INTO order_deliverables (order_id, title, kind, url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, order_id, title, kind, url, created_at
            "#,
        )
        .bind(order_id)
        .bind(&deliverable.title)
        .bind(deliverable.kind.as_str())
        .bind(&deliverable.url)
        .fetch_one(&self.pool)
        .await?;

        Deliverable::try_from(row)
    }

    async fn list_revisions(&self, order_id: Uuid) -> Result<Vec<RevisionRequest>, AppError> {
        let rows = sqlx::query_as::<_, RevisionRow>(
            "SELECT id, order_id, description, status, created_at FROM revision_requests WHERE order_id = $1 ORDER BY created_at",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RevisionRequest::try_from).collect()
    }

    async fn count_revisions(&self, order_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM revision_requests WHERE order_id = $1")
            .bind(order_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn add_revision(
        &self,
        order_id: Uuid,
        description: &str,
        max_allowed: i32,
    ) -> Result<Option<RevisionRequest>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Trava o pedido para que duas solicitações simultâneas não passem do limite
        sqlx::query("SELECT id FROM orders WHERE id = $1 FOR UPDATE")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, RevisionRow>(
            r#"
            INSERT INTO revision_requests (order_id, description)
            SELECT $1, $2
            WHERE (SELECT COUNT(*) FROM revision_requests WHERE order_id = $1) < $3
            RETURNING id, order_id, description, status, created_at
            "#,
        )
        .bind(order_id)
        .bind(description)
        .bind(i64::from(max_allowed))
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        row.map(RevisionRequest::try_from).transpose()
    }

    async fn resolve_revisions(&self, order_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE revision_requests SET status = 'Resolvido' WHERE order_id = $1 AND status = 'Pendente'",
        )
        .bind(order_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn replace_checklist(&self, order_id: Uuid, items: &[ChecklistItem]) -> Result<(), AppError> {
        sqlx::query("UPDATE orders SET checklist = $2, updated_at = NOW() WHERE id = $1")
            .bind(order_id)
            .bind(Json(items))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
