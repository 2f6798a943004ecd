// src/models/plan.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::order::PlanSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,
    #[schema(example = "Ipê")]
    pub name: String,
    #[schema(example = "Projeto completo para jardins de até 100 m².")]
    pub description: Option<String>,
    #[schema(example = 69900)]
    pub price_cents: i64,
    #[schema(example = json!(["Planta baixa humanizada", "1 rodada de revisão"]))]
    pub features: Vec<String>,
    #[schema(example = 1)]
    pub revision_credits: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    pub fn snapshot(&self) -> PlanSnapshot {
        PlanSnapshot {
            name: self.name.clone(),
            price_cents: self.price_cents,
            features: self.features.clone(),
            revision_credits: Some(self.revision_credits),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPlan {
    #[validate(length(min = 1, message = "O nome do plano é obrigatório."))]
    #[schema(example = "Jasmim")]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "O preço não pode ser negativo."))]
    #[schema(example = 129900)]
    pub price_cents: i64,
    #[serde(default)]
    pub features: Vec<String>,
    /// Ausente: derivado do texto das features.
    #[validate(range(min = 0, max = 10, message = "Créditos de revisão fora do intervalo."))]
    #[schema(example = 2)]
    pub revision_credits: Option<i32>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanPatch {
    #[validate(length(min = 1, message = "O nome do plano é obrigatório."))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "O preço não pode ser negativo."))]
    pub price_cents: Option<i64>,
    pub features: Option<Vec<String>>,
    #[validate(range(min = 0, max = 10, message = "Créditos de revisão fora do intervalo."))]
    pub revision_credits: Option<i32>,
    pub active: Option<bool>,
}
