// src/services/webhook_service.rs
//
// Reconciliação dos eventos do gateway. A entrega é at-least-once: o mesmo
// evento pode chegar repetido ou em paralelo, então toda escrita relevante
// é condicional e os e-mails são protegidos por chave de idempotência.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::{
    common::error::AppError,
    db::OrderStore,
    models::{
        notification::{EmailTemplate, Recipient, SendNotificationRequest},
        order::{delivery_deadline_days, Order, OrderStatus},
        payment::{GatewayEvent, WebhookAck, WebhookPayload},
    },
    services::{notification_service::NotificationService, order_service::order_email_data},
};

/// Tentativas da escrita condicional de status quando outro escritor vence.
const STATUS_CAS_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Status aplicado (ou já era o alvo).
    Applied {
        order_code: String,
        status: OrderStatus,
        newly_paid: bool,
    },
    /// Só a contabilidade do evento foi gravada.
    Recorded { order_code: String },
    /// Evento reconhecido, mas a transição não é permitida.
    Ignored { order_code: String, reason: String },
    /// Nenhum pedido corresponde ao evento.
    Unmatched,
}

impl WebhookOutcome {
    pub fn ack(&self) -> WebhookAck {
        match self {
            WebhookOutcome::Applied { .. } | WebhookOutcome::Recorded { .. } => WebhookAck {
                ok: true,
                warning: None,
            },
            WebhookOutcome::Ignored { reason, .. } => WebhookAck {
                ok: true,
                warning: Some(reason.clone()),
            },
            WebhookOutcome::Unmatched => WebhookAck {
                ok: true,
                warning: Some("Pedido não encontrado para este evento".into()),
            },
        }
    }
}

#[derive(Clone)]
pub struct WebhookService {
    orders: Arc<dyn OrderStore>,
    notifier: NotificationService,
    site_url: String,
}

impl WebhookService {
    pub fn new(orders: Arc<dyn OrderStore>, notifier: NotificationService, site_url: String) -> Self {
        Self { orders, notifier, site_url }
    }

    #[instrument(skip(self, payload), fields(event = %payload.event))]
    pub async fn process(&self, payload: &WebhookPayload) -> Result<WebhookOutcome, AppError> {
        let event = GatewayEvent::parse(&payload.event);

        let Some(order) = self.locate(payload).await? else {
            warn!(event = event.name(), "❓ Webhook sem pedido correspondente, ignorando");
            return Ok(WebhookOutcome::Unmatched);
        };

        let effect = event.effect();
        let now = Utc::now();
        let payment_id = payload
            .payment
            .as_ref()
            .and_then(|p| p.id.as_deref())
            .filter(|id| !id.is_empty());

        // Contabilidade: sempre gravada, mesmo sem mudança de status.
        self.orders
            .record_gateway_event(order.id, event.name(), payment_id, effect.payment_status, now)
            .await?;

        let Some(target) = effect.status else {
            info!(order_code = %order.code, event = event.name(), "📝 Evento registrado sem mudança de status");
            return Ok(WebhookOutcome::Recorded { order_code: order.code });
        };

        let status = match self.apply_status(order.clone(), target, effect.marks_paid).await? {
            Ok(status) => status,
            Err(reason) => {
                warn!(order_code = %order.code, event = event.name(), "⚠️ {}", reason);
                return Ok(WebhookOutcome::Ignored { order_code: order.code, reason });
            }
        };

        let mut newly_paid = false;
        if effect.marks_paid {
            let deadline = delivery_deadline_days(order.purchased_plan_name());
            newly_paid = self.orders.mark_paid(order.id, now, deadline).await?;
            if newly_paid {
                info!(order_code = %order.code, deadline, "💰 Pagamento confirmado");
                self.announce_payment(&order, deadline).await;
            } else {
                info!(order_code = %order.code, "🔁 Pagamento já registrado, sem novos e-mails");
            }
        }

        info!(order_code = %order.code, status = %status, event = event.name(), "✅ Webhook aplicado");
        Ok(WebhookOutcome::Applied {
            order_code: order.code,
            status,
            newly_paid,
        })
    }

    /// Ordem de busca: referência externa, id do pagamento, id do checkout.
    async fn locate(&self, payload: &WebhookPayload) -> Result<Option<Order>, AppError> {
        if let Some(payment) = &payload.payment {
            if let Some(reference) = payment.external_reference.as_deref().map(str::trim) {
                if !reference.is_empty() {
                    if let Some(order) = self.orders.find_by_code(&reference.to_uppercase()).await? {
                        return Ok(Some(order));
                    }
                }
            }
            if let Some(id) = payment.id.as_deref().filter(|id| !id.is_empty()) {
                if let Some(order) = self.orders.find_by_gateway_payment_id(id).await? {
                    return Ok(Some(order));
                }
            }
        }

        if let Some(id) = payload
            .checkout
            .as_ref()
            .and_then(|c| c.id.as_deref())
            .filter(|id| !id.is_empty())
        {
            return self.orders.find_by_gateway_checkout_id(id).await;
        }

        Ok(None)
    }

    /// `Ok(Ok(status))` com o status final, `Ok(Err(motivo))` quando a
    /// transição é recusada.
    async fn apply_status(
        &self,
        mut order: Order,
        target: OrderStatus,
        is_payment: bool,
    ) -> Result<Result<OrderStatus, String>, AppError> {
        for _ in 0..STATUS_CAS_ATTEMPTS {
            // Pagamento repetido não faz o pedido voltar da produção.
            if is_payment && order.status.is_past_payment() {
                return Ok(Ok(order.status));
            }
            if order.status == target {
                return Ok(Ok(target));
            }
            if !order.status.can_transition_to(target) {
                return Ok(Err(format!(
                    "Transição ignorada: {} -> {}",
                    order.status, target
                )));
            }
            if self.orders.update_status(order.id, order.status, target).await? {
                return Ok(Ok(target));
            }

            order = self
                .orders
                .find_by_id(order.id)
                .await?
                .ok_or(AppError::OrderNotFound)?;
        }

        Ok(Err(format!(
            "Status do pedido {} mudou durante o processamento",
            order.code
        )))
    }

    async fn announce_payment(&self, order: &Order, deadline: i32) {
        let mut data = order_email_data(order, &self.site_url);
        data["deadline_days"] = json!(deadline);

        self.notifier
            .notify_once(
                &format!("payment_confirmed:{}", order.id),
                SendNotificationRequest {
                    template: EmailTemplate::PaymentConfirmed,
                    to: Recipient::One(order.customer.email.clone()),
                    data: data.clone(),
                    related_order_id: Some(order.id),
                    related_user_id: None,
                },
            )
            .await;

        self.notifier
            .notify_once(
                &format!("new_order_admin:{}", order.id),
                SendNotificationRequest {
                    template: EmailTemplate::NewOrderAdmin,
                    to: Recipient::Admins,
                    data,
                    related_order_id: Some(order.id),
                    related_user_id: None,
                },
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ignored_and_unmatched_carry_a_warning() {
        let applied = WebhookOutcome::Applied {
            order_code: "ABCD2345".into(),
            status: OrderStatus::Recebido,
            newly_paid: true,
        };
        assert_eq!(applied.ack(), WebhookAck { ok: true, warning: None });

        let ignored = WebhookOutcome::Ignored {
            order_code: "ABCD2345".into(),
            reason: "Transição ignorada: Cancelado -> Recebido".into(),
        };
        assert!(ignored.ack().ok);
        assert!(ignored.ack().warning.is_some());

        assert!(WebhookOutcome::Unmatched.ack().warning.is_some());
    }
}
