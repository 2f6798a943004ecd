// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{
        NotificationRepository, NotificationStore, OrderRepository, OrderStore, PlanRepository,
        PlanStore, SettingsRepository, SettingsStore, UserRepository, UserStore,
    },
    integrations::{
        asaas::{PRODUCTION_BASE_URL, SANDBOX_BASE_URL},
        AsaasClient, EmailProvider, PaymentGateway, ResendClient,
    },
    services::{
        auth::AuthService, catalog_service::CatalogService, checkout_service::CheckoutService,
        notification_service::NotificationService, order_service::OrderService,
        webhook_service::WebhookService,
    },
};

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub asaas_base_url: String,
    pub asaas_api_key: String,
    pub asaas_webhook_token: Option<String>,
    pub resend_api_key: String,
    pub email_from: String,
    pub site_url: String,
    pub qa_bypass_emails: Vec<String>,
    pub admin_bootstrap: Option<(String, String)>,
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .with_context(|| format!("{name} deve ser definida"))
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// "a@x.com, B@y.com" -> ["a@x.com", "b@y.com"]
pub fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

pub fn gateway_base_url(environment: &str) -> anyhow::Result<&'static str> {
    match environment.trim().to_lowercase().as_str() {
        "" | "sandbox" => Ok(SANDBOX_BASE_URL),
        "production" | "producao" => Ok(PRODUCTION_BASE_URL),
        other => anyhow::bail!("ASAAS_ENV inválido: {other}"),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let asaas_env = optional("ASAAS_ENV").unwrap_or_default();
        let admin_bootstrap = match (optional("ADMIN_BOOTSTRAP_EMAIL"), optional("ADMIN_BOOTSTRAP_PASSWORD")) {
            (Some(email), Some(password)) => Some((email, password)),
            _ => None,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            asaas_base_url: gateway_base_url(&asaas_env)?.to_string(),
            asaas_api_key: required("ASAAS_API_KEY")?,
            asaas_webhook_token: optional("ASAAS_WEBHOOK_TOKEN"),
            resend_api_key: required("RESEND_API_KEY")?,
            email_from: required("EMAIL_FROM")?,
            site_url: required("SITE_URL")?.trim_end_matches('/').to_string(),
            qa_bypass_emails: optional("QA_BYPASS_EMAILS")
                .map(|raw| parse_email_list(&raw))
                .unwrap_or_default(),
            admin_bootstrap,
        })
    }
}

/// Implementações de persistência usadas pelos serviços.
#[derive(Clone)]
pub struct Stores {
    pub plans: Arc<dyn PlanStore>,
    pub orders: Arc<dyn OrderStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            plans: Arc::new(PlanRepository::new(pool.clone())),
            orders: Arc::new(OrderRepository::new(pool.clone())),
            notifications: Arc::new(NotificationRepository::new(pool.clone())),
            settings: Arc::new(SettingsRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool)),
        }
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub catalog_service: CatalogService,
    pub order_service: OrderService,
    pub checkout_service: CheckoutService,
    pub webhook_service: WebhookService,
    pub notification_service: NotificationService,
    pub auth_service: AuthService,
    pub webhook_token: Option<String>,
    pub i18n_store: I18nStore,
}

impl AppState {
    /// Monta o grafo de dependências a partir de stores e integrações
    /// já construídos.
    pub fn build(
        settings: &Settings,
        stores: Stores,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn EmailProvider>,
    ) -> Self {
        let notification_service = NotificationService::new(
            mailer,
            stores.notifications.clone(),
            stores.settings.clone(),
            settings.email_from.clone(),
        );

        Self {
            catalog_service: CatalogService::new(stores.plans.clone()),
            order_service: OrderService::new(
                stores.orders.clone(),
                stores.plans.clone(),
                notification_service.clone(),
                settings.site_url.clone(),
            ),
            checkout_service: CheckoutService::new(
                stores.orders.clone(),
                gateway,
                settings.site_url.clone(),
                settings.qa_bypass_emails.clone(),
            ),
            webhook_service: WebhookService::new(
                stores.orders.clone(),
                notification_service.clone(),
                settings.site_url.clone(),
            ),
            auth_service: AuthService::new(
                stores.users.clone(),
                notification_service.clone(),
                settings.jwt_secret.clone(),
            ),
            notification_service,
            webhook_token: settings.asaas_webhook_token.clone(),
            i18n_store: I18nStore::new(),
        }
    }

    pub async fn connect(settings: &Settings) -> anyhow::Result<(Self, PgPool)> {
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let gateway = Arc::new(
            AsaasClient::new(settings.asaas_base_url.clone(), settings.asaas_api_key.clone())
                .context("Falha ao montar o cliente do gateway")?,
        );
        let mailer = Arc::new(
            ResendClient::new(settings.resend_api_key.clone())
                .context("Falha ao montar o cliente de e-mail")?,
        );

        let state = Self::build(settings, Stores::postgres(db_pool.clone()), gateway, mailer);
        Ok((state, db_pool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_list_ignores_blanks_and_case() {
        assert_eq!(
            parse_email_list(" QA@Exemplo.com, ,teste@exemplo.com "),
            vec!["qa@exemplo.com", "teste@exemplo.com"]
        );
        assert!(parse_email_list("").is_empty());
    }

    #[test]
    fn gateway_environment_selects_base_url() {
        assert_eq!(gateway_base_url("sandbox").unwrap(), SANDBOX_BASE_URL);
        assert_eq!(gateway_base_url("").unwrap(), SANDBOX_BASE_URL);
        assert_eq!(gateway_base_url("PRODUCTION").unwrap(), PRODUCTION_BASE_URL);
        assert!(gateway_base_url("staging").is_err());
    }
}
