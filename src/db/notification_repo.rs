// src/db/notification_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::stores::NotificationStore,
    models::notification::{EmailTemplate, NewNotificationRecord, NotificationRecord},
};

const LOG_COLUMNS: &str = r#"
    id, template, recipients, subject, body, status, provider_message_id, error,
    related_order_id, related_user_id, created_at
"#;

#[derive(Debug, FromRow)]
struct NotificationRow {
    id: Uuid,
    template: String,
    recipients: Vec<String>,
    subject: String,
    body: String,
    status: String,
    provider_message_id: Option<String>,
    error: Option<String>,
    related_order_id: Option<Uuid>,
    related_user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for NotificationRecord {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(NotificationRecord {
            id: row.id,
            template: EmailTemplate::from_key(&row.template),
            recipients: row.recipients,
            subject: row.subject,
            body: row.body,
            status: row.status.parse()?,
            provider_message_id: row.provider_message_id,
            error: row.error,
            related_order_id: row.related_order_id,
            related_user_id: row.related_user_id,
            created_at: row.created_at,
        })
    }
}

// Log de auditoria de e-mails: somente INSERT, nunca UPDATE
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn append(&self, record: &NewNotificationRecord) -> Result<NotificationRecord, AppError> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            INSERT INTO notification_log (
                template, recipients, subject, body, status, provider_message_id, error,
                related_order_id, related_user_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {LOG_COLUMNS}
            "#
        ))
        .bind(record.template.key())
        .bind(&record.recipients)
        .bind(&record.subject)
        .bind(&record.body)
        .bind(record.status.as_str())
        .bind(&record.provider_message_id)
        .bind(&record.error)
        .bind(record.related_order_id)
        .bind(record.related_user_id)
        .fetch_one(&self.pool)
        .await?;

        NotificationRecord::try_from(row)
    }

    async fn list_recent(
        &self,
        order_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<NotificationRecord>, AppError> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {LOG_COLUMNS} FROM notification_log
            WHERE ($1::uuid IS NULL OR related_order_id = $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
        .bind(order_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(NotificationRecord::try_from).collect()
    }

    async fn reserve_key(&self, key: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO notification_keys (key) VALUES ($1) ON CONFLICT (key) DO NOTHING",
        )
        .bind(key)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
