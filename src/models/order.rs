// src/models/order.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

/// Prazo de entrega do plano expresso (Jasmim).
pub const EXPRESS_DEADLINE_DAYS: i32 = 3;
pub const STANDARD_DEADLINE_DAYS: i32 = 7;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    #[serde(rename = "Aguardando Pagamento")]
    AguardandoPagamento,
    #[serde(rename = "Recebido")]
    Recebido,
    #[serde(rename = "Em Produção")]
    EmProducao,
    #[serde(rename = "Enviado")]
    Enviado,
    #[serde(rename = "Cancelado")]
    Cancelado,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::AguardandoPagamento => "Aguardando Pagamento",
            OrderStatus::Recebido => "Recebido",
            OrderStatus::EmProducao => "Em Produção",
            OrderStatus::Enviado => "Enviado",
            OrderStatus::Cancelado => "Cancelado",
        }
    }

    /// Pedido já pago e em fase de produção/entrega.
    pub fn is_past_payment(&self) -> bool {
        matches!(self, OrderStatus::EmProducao | OrderStatus::Enviado)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        if *self == next {
            return true;
        }

        match (self, next) {
            (Cancelado, _) => false,
            (_, Cancelado) => true,
            (AguardandoPagamento, Recebido) => true,
            (Recebido, EmProducao) | (Recebido, Enviado) => true,
            (EmProducao, Enviado) => true,
            // Reabertura para nova rodada de produção
            (Enviado, EmProducao) => true,
            _ => false,
        }
    }

    pub fn transition_to(&self, next: OrderStatus) -> Result<OrderStatus, AppError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Aguardando Pagamento" => Ok(OrderStatus::AguardandoPagamento),
            "Recebido" => Ok(OrderStatus::Recebido),
            "Em Produção" => Ok(OrderStatus::EmProducao),
            "Enviado" => Ok(OrderStatus::Enviado),
            "Cancelado" => Ok(OrderStatus::Cancelado),
            other => Err(AppError::UnknownStatus(other.to_string())),
        }
    }
}

/// Guarda de "no máximo uma cobrança por pedido".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutState {
    None,
    Pending,
    Ready,
}

impl CheckoutState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::None => "none",
            CheckoutState::Pending => "pending",
            CheckoutState::Ready => "ready",
        }
    }
}

impl FromStr for CheckoutState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(CheckoutState::None),
            "pending" => Ok(CheckoutState::Pending),
            "ready" => Ok(CheckoutState::Ready),
            other => Err(AppError::InvalidInput(format!("checkout_state {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliverableKind {
    Projeto,
    ProjetoRevisado,
    Imagem,
    Documento,
}

impl DeliverableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliverableKind::Projeto => "projeto",
            DeliverableKind::ProjetoRevisado => "projeto_revisado",
            DeliverableKind::Imagem => "imagem",
            DeliverableKind::Documento => "documento",
        }
    }
}

impl FromStr for DeliverableKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "projeto" => Ok(DeliverableKind::Projeto),
            "projeto_revisado" => Ok(DeliverableKind::ProjetoRevisado),
            "imagem" => Ok(DeliverableKind::Imagem),
            "documento" => Ok(DeliverableKind::Documento),
            other => Err(AppError::InvalidInput(format!("tipo de entrega {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum RevisionStatus {
    Pendente,
    Resolvido,
}

impl RevisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevisionStatus::Pendente => "Pendente",
            RevisionStatus::Resolvido => "Resolvido",
        }
    }
}

impl FromStr for RevisionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pendente" => Ok(RevisionStatus::Pendente),
            "Resolvido" => Ok(RevisionStatus::Resolvido),
            other => Err(AppError::InvalidInput(format!("status de revisão {other}"))),
        }
    }
}

// --- Structs ---

/// Cópia imutável do plano no momento da compra.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanSnapshot {
    #[schema(example = "Ipê")]
    pub name: String,
    #[schema(example = 69900)]
    pub price_cents: i64,
    pub features: Vec<String>,
    /// Ausente em snapshots antigos, anteriores ao crédito estruturado.
    pub revision_credits: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    #[validate(length(min = 2, message = "O nome é obrigatório."))]
    #[schema(example = "Maria Souza")]
    pub name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "maria@exemplo.com")]
    pub email: String,
    #[validate(length(min = 8, message = "O telefone é obrigatório."))]
    #[schema(example = "(11) 99999-8888")]
    pub phone: String,
    #[schema(example = "123.456.789-09")]
    pub tax_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    #[schema(example = "Planta baixa")]
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    #[schema(example = "K7M2QX9A")]
    pub code: String,
    pub customer: CustomerInfo,
    pub notes: Option<String>,
    pub plan_id: Option<Uuid>,
    #[schema(example = "Ipê")]
    pub plan_name: String,
    pub plan_snapshot: Option<PlanSnapshot>,
    pub status: OrderStatus,
    #[schema(example = "CONFIRMED")]
    pub payment_status: Option<String>,
    pub checkout_state: CheckoutState,
    #[serde(skip)]
    pub checkout_claimed_at: Option<DateTime<Utc>>,
    pub gateway_customer_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_checkout_id: Option<String>,
    pub checkout_url: Option<String>,
    pub last_gateway_event: Option<String>,
    pub last_webhook_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub delivery_deadline_days: Option<i32>,
    pub checklist: Vec<ChecklistItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Nome do plano comprado, preferindo o snapshot.
    pub fn purchased_plan_name(&self) -> &str {
        self.plan_snapshot
            .as_ref()
            .map(|s| s.name.as_str())
            .unwrap_or(&self.plan_name)
    }

    pub fn price_cents(&self) -> Option<i64> {
        self.plan_snapshot.as_ref().map(|s| s.price_cents)
    }
}

/// Pedido vindo do site: plano escolhido e dados do cliente.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    pub plan_id: Uuid,
    #[validate(nested)]
    pub customer: CustomerInfo,
    #[schema(example = "Quintal de 40 m² com muita sombra.")]
    pub notes: Option<String>,
}

/// Dados para inserir um pedido novo.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub code: String,
    pub customer: CustomerInfo,
    pub notes: Option<String>,
    pub plan_id: Uuid,
    pub snapshot: PlanSnapshot,
}

/// Correção administrativa dos dados do cliente.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
}

/// Vínculo com o gateway gravado quando o checkout fica pronto.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutLink {
    pub gateway_customer_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_checkout_id: String,
    pub checkout_url: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderPhoto {
    pub id: Uuid,
    pub order_id: Uuid,
    pub url: String,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Deliverable {
    pub id: Uuid,
    pub order_id: Uuid,
    #[schema(example = "Projeto final")]
    pub title: String,
    pub kind: DeliverableKind,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDeliverable {
    pub title: String,
    pub kind: DeliverableKind,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevisionRequest {
    pub id: Uuid,
    pub order_id: Uuid,
    pub description: String,
    pub status: RevisionStatus,
    pub created_at: DateTime<Utc>,
}

/// Pedido com todos os filhos, para o portal do cliente e o CMS.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub photos: Vec<OrderPhoto>,
    pub deliverables: Vec<Deliverable>,
    pub revisions: Vec<RevisionRequest>,
    pub can_request_revision: bool,
    pub revisions_remaining: i32,
}

/// Planos expressos têm prazo menor.
pub fn delivery_deadline_days(plan_name: &str) -> i32 {
    if plan_name.to_lowercase().contains("jasmim") {
        EXPRESS_DEADLINE_DAYS
    } else {
        STANDARD_DEADLINE_DAYS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn cancelled_is_terminal() {
        for next in [AguardandoPagamento, Recebido, EmProducao, Enviado] {
            assert!(!Cancelado.can_transition_to(next), "Cancelado -> {next}");
        }
        assert!(Cancelado.can_transition_to(Cancelado));
    }

    #[test]
    fn every_live_status_can_be_cancelled() {
        for from in [AguardandoPagamento, Recebido, EmProducao, Enviado] {
            assert!(from.can_transition_to(Cancelado));
        }
    }

    #[test]
    fn payment_flow_moves_forward_only() {
        assert!(AguardandoPagamento.can_transition_to(Recebido));
        assert!(Recebido.can_transition_to(EmProducao));
        assert!(EmProducao.can_transition_to(Enviado));
        assert!(!Recebido.can_transition_to(AguardandoPagamento));
        assert!(!Enviado.can_transition_to(Recebido));
        assert!(!AguardandoPagamento.can_transition_to(Enviado));
    }

    #[test]
    fn illegal_transition_reports_both_ends() {
        let err = Cancelado.transition_to(Recebido).unwrap_err();
        match err {
            AppError::InvalidTransition { from, to } => {
                assert_eq!(from, "Cancelado");
                assert_eq!(to, "Recebido");
            }
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn status_strings_round_trip_through_serde() {
        let json = serde_json::to_string(&EmProducao).unwrap();
        assert_eq!(json, "\"Em Produção\"");
        assert_eq!("Em Produção".parse::<OrderStatus>().unwrap(), EmProducao);
        assert!("Pago".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn jasmim_gets_express_deadline() {
        assert_eq!(delivery_deadline_days("Jasmim"), 3);
        assert_eq!(delivery_deadline_days("Plano Jasmim Express"), 3);
        assert_eq!(delivery_deadline_days("Ipê"), 7);
        assert_eq!(delivery_deadline_days("Girassol"), 7);
    }
}
