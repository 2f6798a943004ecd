// src/integrations/asaas.rs

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
    common::error::AppError,
    models::payment::{CreatedPayment, GatewayCustomer, PaymentRequest},
};

pub const SANDBOX_BASE_URL: &str = "https://api-sandbox.asaas.com/v3";
pub const PRODUCTION_BASE_URL: &str = "https://api.asaas.com/v3";

/// Cada chamada termina bem antes da reivindicação de checkout expirar.
pub const GATEWAY_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Operações usadas do gateway de pagamento.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<String>, AppError>;
    async fn create_customer(&self, customer: &GatewayCustomer) -> Result<String, AppError>;
    async fn create_payment(&self, request: &PaymentRequest) -> Result<CreatedPayment, AppError>;
    async fn cancel_payment(&self, payment_id: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct AsaasClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CustomerList {
    #[serde(default)]
    data: Vec<CustomerRef>,
}

#[derive(Debug, Deserialize)]
struct CustomerRef {
    id: String,
}

impl AsaasClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(GATEWAY_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Envia a requisição e trata erro HTTP ou o array `errors` no corpo.
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, AppError> {
        let response = request
            .header("access_token", &self.api_key)
            .header("User-Agent", "paisagismo-backend")
            .send()
            .await
            .map_err(|e| AppError::GatewayError(format!("Falha de comunicação com o gateway: {e}")))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::GatewayError(format!("Resposta ilegível do gateway: {e}")))?;

        if let Some(message) = gateway_error_message(&body) {
            warn!(status = %status, "Gateway recusou a requisição: {}", message);
            return Err(AppError::GatewayError(message));
        }
        if !status.is_success() {
            warn!(status = %status, "Gateway respondeu com erro sem detalhes");
            return Err(AppError::GatewayError(format!("Gateway respondeu {status}")));
        }

        serde_json::from_value(body)
            .map_err(|e| AppError::GatewayError(format!("Resposta inesperada do gateway: {e}")))
    }
}

fn gateway_error_message(body: &Value) -> Option<String> {
    let errors = body.get("errors")?.as_array()?;
    if errors.is_empty() {
        return None;
    }
    let descriptions: Vec<&str> = errors
        .iter()
        .filter_map(|e| e.get("description").and_then(Value::as_str))
        .collect();

    Some(if descriptions.is_empty() {
        "Erro não especificado do gateway".to_string()
    } else {
        descriptions.join("; ")
    })
}

#[async_trait]
impl PaymentGateway for AsaasClient {
    #[instrument(skip(self))]
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<String>, AppError> {
        let list: CustomerList = self
            .send(self.client.get(self.url("/customers")).query(&[("email", email)]))
            .await?;

        Ok(list.data.into_iter().next().map(|c| c.id))
    }

    #[instrument(skip(self, customer), fields(email = %customer.email))]
    async fn create_customer(&self, customer: &GatewayCustomer) -> Result<String, AppError> {
        let created: CustomerRef = self
            .send(self.client.post(self.url("/customers")).json(customer))
            .await?;

        info!(customer_id = %created.id, "Cliente criado no gateway");
        Ok(created.id)
    }

    #[instrument(skip(self, request), fields(external_reference = %request.external_reference))]
    async fn create_payment(&self, request: &PaymentRequest) -> Result<CreatedPayment, AppError> {
        // billingType UNDEFINED: o cliente escolhe Pix, boleto ou cartão na página
        let body = json!({
            "customer": request.customer_id,
            "billingType": "UNDEFINED",
            "value": request.value,
            "dueDate": request.due_date,
            "description": request.description,
            "externalReference": request.external_reference,
            "callback": {
                "successUrl": request.success_url,
                "autoRedirect": true,
            },
        });

        let payment: CreatedPayment = self
            .send(self.client.post(self.url("/payments")).json(&body))
            .await?;

        info!(payment_id = %payment.id, "Cobrança criada no gateway");
        Ok(payment)
    }

    #[instrument(skip(self))]
    async fn cancel_payment(&self, payment_id: &str) -> Result<(), AppError> {
        let _: Value = self
            .send(self.client.delete(self.url(&format!("/payments/{payment_id}"))))
            .await?;

        info!(payment_id, "Cobrança cancelada no gateway");
        Ok(())
    }
}
