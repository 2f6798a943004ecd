// src/services/checkout_service.rs

use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::OrderStore,
    integrations::PaymentGateway,
    models::{
        order::{CheckoutLink, Order, OrderStatus},
        payment::{
            cents_to_decimal, CheckoutRequest, CheckoutResponse, GatewayCustomer, PaymentRequest,
            PAYMENT_DUE_DAYS,
        },
    },
};

/// Reivindicação `pending` mais velha que isto é considerada abandonada.
pub const CHECKOUT_CLAIM_TTL_SECS: i64 = 120;

#[derive(Clone)]
pub struct CheckoutService {
    orders: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    site_url: String,
    qa_bypass_emails: Arc<Vec<String>>,
}

impl CheckoutService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        site_url: String,
        qa_bypass_emails: Vec<String>,
    ) -> Self {
        let qa_bypass_emails = qa_bypass_emails.iter().map(|e| e.trim().to_lowercase()).collect();
        Self {
            orders,
            gateway,
            site_url,
            qa_bypass_emails: Arc::new(qa_bypass_emails),
        }
    }

    /// No máximo uma cobrança por pedido: quem vence o `none -> pending`
    /// cria a cobrança; os demais recebem a URL já gravada.
    #[instrument(skip(self, request), fields(order_id))]
    pub async fn initiate(&self, request: &CheckoutRequest) -> Result<CheckoutResponse, AppError> {
        let order_id = request.order_id.ok_or_else(|| AppError::MissingField("orderId".into()))?;
        let client_price = request.price.ok_or_else(|| AppError::MissingField("price".into()))?;
        tracing::Span::current().record("order_id", tracing::field::display(order_id));

        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(AppError::OrderNotFound)?;

        if let Some(code) = request.order_code.as_deref() {
            if !code.eq_ignore_ascii_case(&order.code) {
                warn!(order_code = %order.code, sent = code, "Código enviado difere do pedido, usando o do pedido");
            }
        }

        if let Some(url) = order.checkout_url.clone() {
            info!(order_code = %order.code, "🔁 Checkout já existente reutilizado");
            return Ok(CheckoutResponse { checkout_url: url });
        }

        if order.status == OrderStatus::Cancelado {
            return Err(AppError::InvalidTransition {
                from: OrderStatus::Cancelado.to_string(),
                to: OrderStatus::Recebido.to_string(),
            });
        }

        let value = self.authoritative_price(&order, client_price);
        let site_url = self.site_url_for(request);

        // Microssegundos: a mesma precisão do timestamptz, para comparar a reivindicação depois.
        let claimed_at = Utc::now().trunc_subsecs(6);
        let stale_before = claimed_at - Duration::seconds(CHECKOUT_CLAIM_TTL_SECS);
        if !self.orders.claim_checkout(order.id, claimed_at, stale_before).await? {
            // Perdeu a disputa: se o vencedor já terminou, devolve a mesma URL.
            return self.current_checkout(order.id).await;
        }

        match self.create_link(&order, value, &site_url).await {
            Ok(link) => {
                if self.orders.complete_checkout(order.id, claimed_at, &link).await? {
                    info!(order_code = %order.code, checkout_id = %link.gateway_checkout_id, "💳 Checkout criado");
                    return Ok(CheckoutResponse { checkout_url: link.checkout_url });
                }
                self.discard_orphan(&order, &link, claimed_at).await;
                self.current_checkout(order.id).await
            }
            Err(e) => {
                if let Err(release_err) = self.orders.release_checkout(order.id, claimed_at).await {
                    error!(order_code = %order.code, "🔥 Falha ao liberar o checkout: {}", release_err);
                }
                warn!(order_code = %order.code, "Checkout falhou: {}", e);
                Err(e)
            }
        }
    }

    async fn current_checkout(&self, order_id: Uuid) -> Result<CheckoutResponse, AppError> {
        let current = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(AppError::OrderNotFound)?;
        match current.checkout_url {
            Some(url) => Ok(CheckoutResponse { checkout_url: url }),
            None => Err(AppError::CheckoutInProgress),
        }
    }

    /// A reivindicação expirou e foi tomada enquanto a cobrança era criada:
    /// a cobrança desta tentativa não é gravada e é cancelada no gateway.
    async fn discard_orphan(&self, order: &Order, link: &CheckoutLink, claimed_at: DateTime<Utc>) {
        warn!(
            order_code = %order.code,
            checkout_id = %link.gateway_checkout_id,
            claimed_at = %claimed_at,
            "Reivindicação de checkout perdida, descartando a cobrança criada"
        );
        let Some(payment_id) = link.gateway_payment_id.as_deref() else {
            return;
        };
        if let Err(e) = self.gateway.cancel_payment(payment_id).await {
            error!(order_code = %order.code, payment_id, "🔥 Cobrança órfã não cancelada: {}", e);
        }
    }

    /// O preço do snapshot manda; o do cliente só vale para pedidos sem snapshot.
    fn authoritative_price(&self, order: &Order, client_price: Decimal) -> Decimal {
        match order.price_cents() {
            Some(cents) => {
                let snapshot_price = cents_to_decimal(cents);
                if snapshot_price != client_price {
                    warn!(
                        order_code = %order.code,
                        client = %client_price,
                        snapshot = %snapshot_price,
                        "Preço do cliente ignorado, usando o do snapshot"
                    );
                }
                snapshot_price
            }
            None => client_price,
        }
    }

    fn site_url_for(&self, request: &CheckoutRequest) -> String {
        request
            .site_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.site_url)
            .trim_end_matches('/')
            .to_string()
    }

    fn is_qa_bypass(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.qa_bypass_emails.iter().any(|e| *e == email)
    }

    async fn create_link(&self, order: &Order, value: Decimal, site_url: &str) -> Result<CheckoutLink, AppError> {
        if self.is_qa_bypass(&order.customer.email) {
            info!(order_code = %order.code, "🧪 E-mail de QA, pulando o gateway");
            return Ok(CheckoutLink {
                gateway_customer_id: None,
                gateway_payment_id: None,
                gateway_checkout_id: format!("qa-{}", order.code),
                checkout_url: format!("{site_url}/pedido/sucesso?codigo={}&qa=1", order.code),
            });
        }

        let customer_id = match self.gateway.find_customer_by_email(&order.customer.email).await? {
            Some(id) => id,
            None => {
                self.gateway
                    .create_customer(&GatewayCustomer {
                        name: order.customer.name.clone(),
                        email: order.customer.email.clone(),
                        mobile_phone: order.customer.phone.clone(),
                        cpf_cnpj: order.customer.tax_id.clone(),
                    })
                    .await?
            }
        };

        let payment = self
            .gateway
            .create_payment(&PaymentRequest {
                customer_id: customer_id.clone(),
                value,
                due_date: Utc::now().date_naive() + Duration::days(PAYMENT_DUE_DAYS),
                description: format!(
                    "Projeto de paisagismo - plano {} (pedido {})",
                    order.purchased_plan_name(),
                    order.code
                ),
                external_reference: order.code.clone(),
                success_url: format!("{site_url}/pedido/sucesso?codigo={}", order.code),
            })
            .await?;

        Ok(CheckoutLink {
            gateway_customer_id: Some(customer_id),
            gateway_payment_id: Some(payment.id.clone()),
            gateway_checkout_id: payment.id,
            checkout_url: payment.invoice_url,
        })
    }
}
