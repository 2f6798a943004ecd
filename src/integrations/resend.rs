// src/integrations/resend.rs

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use crate::{common::error::AppError, models::notification::OutboundEmail};

pub const RESEND_BASE_URL: &str = "https://api.resend.com";

const PROVIDER_TIMEOUT_SECS: u64 = 15;

/// Provedor de e-mail transacional. Retorna o id da mensagem no provedor.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<String, AppError>;
}

#[derive(Clone)]
pub struct ResendClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
    message: Option<String>,
}

impl ResendClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, AppError> {
        Self::with_base_url(RESEND_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl EmailProvider for ResendClient {
    #[instrument(skip(self, email), fields(subject = %email.subject))]
    async fn send(&self, email: &OutboundEmail) -> Result<String, AppError> {
        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await
            .map_err(|e| AppError::ProviderError(format!("Falha de comunicação: {e}")))?;

        let status = response.status();
        let body: SendResponse = response
            .json()
            .await
            .map_err(|e| AppError::ProviderError(format!("Resposta ilegível: {e}")))?;

        match (status.is_success(), body.id) {
            (true, Some(id)) => Ok(id),
            _ => Err(AppError::ProviderError(
                body.message
                    .unwrap_or_else(|| format!("Provedor respondeu {status}")),
            )),
        }
    }
}
