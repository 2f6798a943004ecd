// src/db/plan_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::stores::PlanStore,
    models::plan::{NewPlan, Plan, PlanPatch},
};

const PLAN_COLUMNS: &str =
    "id, name, description, price_cents, features, revision_credits, active, created_at, updated_at";

#[derive(Clone)]
pub struct PlanRepository {
    pool: PgPool,
}

impl PlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanStore for PlanRepository {
    async fn list_active(&self) -> Result<Vec<Plan>, AppError> {
        let plans = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE active ORDER BY price_cents ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(plans)
    }

    async fn list_all(&self) -> Result<Vec<Plan>, AppError> {
        let plans = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans ORDER BY price_cents ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(plans)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Plan>, AppError> {
        let plan = sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(plan)
    }

    async fn create(&self, plan: &NewPlan) -> Result<Plan, AppError> {
        let created = sqlx::query_as::<_, Plan>(&format!(
            r#"
            INSERT INTO plans (name, description, price_cents, features, revision_credits, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.price_cents)
        .bind(&plan.features)
        .bind(plan.revision_credits.unwrap_or_default())
        .bind(plan.active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::InvalidInput(format!("Já existe um plano chamado {}", plan.name));
                }
            }
            AppError::DatabaseError(e)
        })?;

        Ok(created)
    }

    async fn update(&self, id: Uuid, patch: &PlanPatch) -> Result<Option<Plan>, AppError> {
        // Pedidos já criados guardam o próprio snapshot; nada aqui os afeta.
        let updated = sqlx::query_as::<_, Plan>(&format!(
            r#"
            UPDATE plans SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price_cents = COALESCE($4, price_cents),
                features = COALESCE($5, features),
                revision_credits = COALESCE($6, revision_credits),
                active = COALESCE($7, active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(patch.price_cents)
        .bind(&patch.features)
        .bind(patch.revision_credits)
        .bind(patch.active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }
}
