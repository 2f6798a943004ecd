// src/services/catalog_service.rs

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::PlanStore,
    models::plan::{NewPlan, Plan, PlanPatch},
    services::revision_gate::{credits_from_features, credits_match_features},
};

#[derive(Clone)]
pub struct CatalogService {
    plans: Arc<dyn PlanStore>,
}

impl CatalogService {
    pub fn new(plans: Arc<dyn PlanStore>) -> Self {
        Self { plans }
    }

    /// Planos ativos, do mais barato ao mais caro.
    pub async fn list_plans(&self) -> Result<Vec<Plan>, AppError> {
        self.plans.list_active().await
    }

    pub async fn list_all_plans(&self) -> Result<Vec<Plan>, AppError> {
        self.plans.list_all().await
    }

    pub async fn get_plan(&self, id: Uuid) -> Result<Plan, AppError> {
        self.plans.find_by_id(id).await?.ok_or(AppError::PlanNotFound)
    }

    pub async fn create_plan(&self, mut payload: NewPlan) -> Result<Plan, AppError> {
        payload.validate()?;
        let credits = resolve_credits(&payload.features, payload.revision_credits, None)?;
        payload.revision_credits = Some(credits);

        let plan = self.plans.create(&payload).await?;
        info!(plan = %plan.name, revision_credits = plan.revision_credits, "📦 Plano criado");
        Ok(plan)
    }

    // Pedidos existentes guardam o próprio snapshot e não são afetados.
    pub async fn update_plan(&self, id: Uuid, mut patch: PlanPatch) -> Result<Plan, AppError> {
        patch.validate()?;

        if patch.features.is_some() || patch.revision_credits.is_some() {
            let current = self.get_plan(id).await?;
            let features = patch.features.as_deref().unwrap_or(current.features.as_slice());
            let credits = resolve_credits(features, patch.revision_credits, Some(current.revision_credits))?;
            patch.revision_credits = Some(credits);
        }

        let plan = self
            .plans
            .update(id, &patch)
            .await?
            .ok_or(AppError::PlanNotFound)?;
        info!(plan = %plan.name, "📦 Plano atualizado");
        Ok(plan)
    }
}

/// Créditos finais do plano. Um valor explícito precisa concordar com o
/// texto das features; sem ele, vale o atual (se ainda concordar) ou o texto.
fn resolve_credits(features: &[String], explicit: Option<i32>, current: Option<i32>) -> Result<i32, AppError> {
    if let Some(credits) = explicit {
        if !credits_match_features(features, credits) {
            warn!(credits, "Créditos de revisão contradizem as features do plano");
            return Err(AppError::InvalidInput(format!(
                "revisionCredits={credits} contradiz as features do plano"
            )));
        }
        return Ok(credits);
    }

    Ok(current
        .filter(|credits| credits_match_features(features, *credits))
        .unwrap_or_else(|| credits_from_features(features)))
}
