// src/models/notification.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

/// Sentinela de destinatário: todos os admins configurados.
pub const ADMINS_SENTINEL: &str = "admins";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EmailTemplate {
    AccountCreated,
    PasswordChanged,
    NewOrderAdmin,
    PaymentConfirmed,
    StatusUpdate,
    ProjectDelivered,
    RevisionRequestedAdmin,
    RevisedProjectDelivered,
    Generic,
}

impl EmailTemplate {
    pub fn key(&self) -> &'static str {
        match self {
            EmailTemplate::AccountCreated => "account_created",
            EmailTemplate::PasswordChanged => "password_changed",
            EmailTemplate::NewOrderAdmin => "new_order_admin",
            EmailTemplate::PaymentConfirmed => "payment_confirmed",
            EmailTemplate::StatusUpdate => "status_update",
            EmailTemplate::ProjectDelivered => "project_delivered",
            EmailTemplate::RevisionRequestedAdmin => "revision_requested_admin",
            EmailTemplate::RevisedProjectDelivered => "revised_project_delivered",
            EmailTemplate::Generic => "generic",
        }
    }

    /// Chaves desconhecidas caem no template genérico.
    pub fn from_key(key: &str) -> Self {
        match key {
            "account_created" => EmailTemplate::AccountCreated,
            "password_changed" => EmailTemplate::PasswordChanged,
            "new_order_admin" => EmailTemplate::NewOrderAdmin,
            "payment_confirmed" => EmailTemplate::PaymentConfirmed,
            "status_update" => EmailTemplate::StatusUpdate,
            "project_delivered" => EmailTemplate::ProjectDelivered,
            "revision_requested_admin" => EmailTemplate::RevisionRequestedAdmin,
            "revised_project_delivered" => EmailTemplate::RevisedProjectDelivered,
            _ => EmailTemplate::Generic,
        }
    }

    pub fn render(&self, data: &Value) -> RenderedEmail {
        let name = field(data, "customer_name", "cliente");
        let code = field(data, "order_code", "");
        let plan = field(data, "plan_name", "");
        let portal = field(data, "portal_url", "");

        let (subject, content) = match self {
            EmailTemplate::AccountCreated => (
                "Sua conta foi criada".to_string(),
                format!(
                    "<p>Olá, {}!</p><p>Sua conta de acesso ao painel foi criada com o e-mail <strong>{}</strong>.</p>",
                    field(data, "name", "administrador"),
                    field(data, "email", "")
                ),
            ),
            EmailTemplate::PasswordChanged => (
                "Sua senha foi alterada".to_string(),
                "<p>A senha da sua conta foi alterada. Se não foi você, entre em contato imediatamente.</p>"
                    .to_string(),
            ),
            EmailTemplate::NewOrderAdmin => (
                format!("Novo pedido {code} - {plan}"),
                format!(
                    "<p>Pagamento confirmado para o pedido <strong>{code}</strong>.</p><p>Cliente: {name}<br>Plano: {plan}<br>Prazo: {} dias</p>",
                    field(data, "deadline_days", "-")
                ),
            ),
            EmailTemplate::PaymentConfirmed => (
                format!("Pagamento confirmado - pedido {code}"),
                format!(
                    "<p>Olá, {name}!</p><p>Recebemos o pagamento do seu pedido <strong>{code}</strong> (plano {plan}).</p><p>Seu projeto será entregue em até {} dias.</p>{}",
                    field(data, "deadline_days", "7"),
                    portal_link(&portal)
                ),
            ),
            EmailTemplate::StatusUpdate => (
                format!("Atualização do pedido {code}"),
                format!(
                    "<p>Olá, {name}!</p><p>O status do seu pedido <strong>{code}</strong> agora é: <strong>{}</strong>.</p>{}",
                    field(data, "status", ""),
                    portal_link(&portal)
                ),
            ),
            EmailTemplate::ProjectDelivered => (
                format!("Seu projeto está pronto - pedido {code}"),
                format!(
                    "<p>Olá, {name}!</p><p>O projeto do pedido <strong>{code}</strong> foi entregue e já está disponível para download.</p>{}",
                    portal_link(&portal)
                ),
            ),
            EmailTemplate::RevisionRequestedAdmin => (
                format!("Nova solicitação de revisão - pedido {code}"),
                format!(
                    "<p>O cliente {name} pediu uma revisão no pedido <strong>{code}</strong>:</p><blockquote>{}</blockquote>",
                    field(data, "description", "")
                ),
            ),
            EmailTemplate::RevisedProjectDelivered => (
                format!("Projeto revisado disponível - pedido {code}"),
                format!(
                    "<p>Olá, {name}!</p><p>A revisão do seu projeto (pedido <strong>{code}</strong>) foi concluída.</p>{}",
                    portal_link(&portal)
                ),
            ),
            EmailTemplate::Generic => (
                field(data, "title", "Notificação"),
                format!("<p>{}</p>", field(data, "message", "")),
            ),
        };

        RenderedEmail {
            subject,
            html: format!("<div style=\"font-family:sans-serif\">{content}</div>"),
        }
    }
}

impl From<String> for EmailTemplate {
    fn from(key: String) -> Self {
        EmailTemplate::from_key(&key)
    }
}

impl From<EmailTemplate> for String {
    fn from(template: EmailTemplate) -> Self {
        template.key().to_string()
    }
}

impl fmt::Display for EmailTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

fn field(data: &Value, key: &str, default: &str) -> String {
    match data.get(key) {
        Some(Value::String(s)) => escape_html(s),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => escape_html(default),
    }
}

fn portal_link(url: &str) -> String {
    if url.is_empty() {
        String::new()
    } else {
        format!("<p><a href=\"{url}\">Acompanhe seu pedido</a></p>")
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Destinatário: um endereço, uma lista ou a sentinela "admins".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Admins,
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for Recipient {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::One(s) if s == ADMINS_SENTINEL => Recipient::Admins,
            Raw::One(s) => Recipient::One(s),
            Raw::Many(list) => Recipient::Many(list),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    Sent,
    Failed,
}

impl SendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendStatus::Sent => "sent",
            SendStatus::Failed => "failed",
        }
    }
}

impl FromStr for SendStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(SendStatus::Sent),
            "failed" => Ok(SendStatus::Failed),
            other => Err(AppError::InvalidInput(format!("send_status {other}"))),
        }
    }
}

/// Registro de auditoria: um por tentativa de envio, nunca alterado.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: Uuid,
    #[schema(value_type = String, example = "payment_confirmed")]
    pub template: EmailTemplate,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub status: SendStatus,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
    pub related_order_id: Option<Uuid>,
    pub related_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotificationRecord {
    pub template: EmailTemplate,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub status: SendStatus,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
    pub related_order_id: Option<Uuid>,
    pub related_user_id: Option<Uuid>,
}

/// Pedido de envio vindo de outro serviço ou do painel.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    #[schema(value_type = String, example = "payment_confirmed")]
    pub template: EmailTemplate,
    #[schema(value_type = Object, example = "admins")]
    pub to: Recipient,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: Value,
    pub related_order_id: Option<Uuid>,
    pub related_user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationResponse {
    pub ok: bool,
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

/// E-mail pronto para o provedor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}
