// src/models/payment.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::order::OrderStatus;

/// Vencimento da cobrança, em dias a partir de hoje.
pub const PAYMENT_DUE_DAYS: i64 = 3;

// =============================================================================
//  EVENTOS DO GATEWAY
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    PaymentCreated,
    PaymentReceived,
    PaymentConfirmed,
    CheckoutPaid,
    PaymentCanceled(String),
    PaymentOverdue,
    PaymentRefunded,
    Other(String),
}

/// O que um evento faz com o pedido.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventEffect {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<&'static str>,
    pub marks_paid: bool,
}

impl GatewayEvent {
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "PAYMENT_CREATED" => GatewayEvent::PaymentCreated,
            "PAYMENT_RECEIVED" => GatewayEvent::PaymentReceived,
            "PAYMENT_CONFIRMED" => GatewayEvent::PaymentConfirmed,
            "CHECKOUT_PAID" => GatewayEvent::CheckoutPaid,
            n @ ("PAYMENT_CANCELED" | "PAYMENT_DELETED" | "CHECKOUT_CANCELED") => {
                GatewayEvent::PaymentCanceled(n.to_string())
            }
            "PAYMENT_OVERDUE" => GatewayEvent::PaymentOverdue,
            "PAYMENT_REFUNDED" => GatewayEvent::PaymentRefunded,
            other => GatewayEvent::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            GatewayEvent::PaymentCreated => "PAYMENT_CREATED",
            GatewayEvent::PaymentReceived => "PAYMENT_RECEIVED",
            GatewayEvent::PaymentConfirmed => "PAYMENT_CONFIRMED",
            GatewayEvent::CheckoutPaid => "CHECKOUT_PAID",
            GatewayEvent::PaymentCanceled(name) => name,
            GatewayEvent::PaymentOverdue => "PAYMENT_OVERDUE",
            GatewayEvent::PaymentRefunded => "PAYMENT_REFUNDED",
            GatewayEvent::Other(name) => name,
        }
    }

    pub fn effect(&self) -> EventEffect {
        match self {
            GatewayEvent::PaymentCreated => EventEffect {
                status: Some(OrderStatus::AguardandoPagamento),
                payment_status: Some("PENDING"),
                marks_paid: false,
            },
            GatewayEvent::PaymentReceived => paid("RECEIVED"),
            GatewayEvent::PaymentConfirmed | GatewayEvent::CheckoutPaid => paid("CONFIRMED"),
            GatewayEvent::PaymentCanceled(_) => EventEffect {
                status: Some(OrderStatus::Cancelado),
                payment_status: Some("CANCELED"),
                marks_paid: false,
            },
            GatewayEvent::PaymentOverdue => EventEffect {
                status: None,
                payment_status: Some("OVERDUE"),
                marks_paid: false,
            },
            GatewayEvent::PaymentRefunded => EventEffect {
                status: Some(OrderStatus::Cancelado),
                payment_status: Some("REFUNDED"),
                marks_paid: false,
            },
            GatewayEvent::Other(_) => EventEffect {
                status: None,
                payment_status: None,
                marks_paid: false,
            },
        }
    }
}

fn paid(payment_status: &'static str) -> EventEffect {
    EventEffect {
        status: Some(OrderStatus::Recebido),
        payment_status: Some(payment_status),
        marks_paid: true,
    }
}

// =============================================================================
//  PAYLOAD DO WEBHOOK
// =============================================================================

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    #[schema(example = "PAYMENT_CONFIRMED")]
    pub event: String,
    #[serde(default)]
    pub payment: Option<WebhookPayment>,
    #[serde(default)]
    pub checkout: Option<WebhookCheckout>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayment {
    #[schema(example = "pay_080225913252")]
    pub id: Option<String>,
    /// Código do pedido enviado na criação da cobrança.
    #[schema(example = "K7M2QX9A")]
    pub external_reference: Option<String>,
    pub status: Option<String>,
    pub customer: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookCheckout {
    pub id: Option<String>,
}

/// Resposta do webhook: sempre `ok`, com aviso quando nada foi aplicado.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

// =============================================================================
//  CHECKOUT
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub order_id: Option<Uuid>,
    #[schema(example = "K7M2QX9A")]
    pub order_code: Option<String>,
    #[schema(example = "Ipê")]
    pub plan_name: Option<String>,
    #[schema(value_type = Option<f64>, example = 699.00)]
    pub price: Option<Decimal>,
    #[schema(example = "https://www.exemplo.com.br")]
    pub site_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub checkout_url: String,
}

// --- Tipos trocados com o gateway ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayCustomer {
    pub name: String,
    pub email: String,
    pub mobile_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf_cnpj: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub customer_id: String,
    pub value: Decimal,
    pub due_date: NaiveDate,
    pub description: String,
    pub external_reference: String,
    pub success_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPayment {
    pub id: String,
    pub invoice_url: String,
}

/// Centavos para o valor decimal que o gateway espera (69900 -> 699.00).
pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
