// src/db/settings_repo.rs

use async_trait::async_trait;
use sqlx::{types::Json, PgPool};

use crate::{common::error::AppError, db::stores::SettingsStore};

const ADMIN_EMAILS_KEY: &str = "admin_emails";

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for SettingsRepository {
    async fn admin_emails(&self) -> Result<Vec<String>, AppError> {
        // Sem linha ainda = ninguém configurado
        let value: Option<Json<Vec<String>>> =
            sqlx::query_scalar("SELECT value FROM app_settings WHERE key = $1")
                .bind(ADMIN_EMAILS_KEY)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value.map(|v| v.0).unwrap_or_default())
    }

    async fn set_admin_emails(&self, emails: &[String]) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO app_settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key)
            DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(ADMIN_EMAILS_KEY)
        .bind(Json(emails))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
