// src/services/notification_service.rs

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{NotificationStore, SettingsStore},
    integrations::EmailProvider,
    models::notification::{
        NewNotificationRecord, NotificationRecord, OutboundEmail, Recipient, SendNotificationRequest,
        SendStatus,
    },
};

/// Máximo de registros devolvidos na auditoria.
const AUDIT_PAGE_SIZE: i64 = 200;

/// Resultado de um envio que não falhou.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Sent(Uuid),
    /// Nenhum destinatário (ex.: lista de admins vazia).
    NoRecipients,
    /// Chave de idempotência já usada.
    AlreadySent,
}

impl Dispatch {
    pub fn id(&self) -> Option<Uuid> {
        match self {
            Dispatch::Sent(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct NotificationService {
    provider: Arc<dyn EmailProvider>,
    records: Arc<dyn NotificationStore>,
    settings: Arc<dyn SettingsStore>,
    from: String,
}

impl NotificationService {
    pub fn new(
        provider: Arc<dyn EmailProvider>,
        records: Arc<dyn NotificationStore>,
        settings: Arc<dyn SettingsStore>,
        from: String,
    ) -> Self {
        Self { provider, records, settings, from }
    }

    /// Renderiza, envia e grava a auditoria. A auditoria é gravada antes de
    /// a falha do provedor voltar ao chamador.
    pub async fn send(&self, request: &SendNotificationRequest) -> Result<Dispatch, AppError> {
        let recipients = self.resolve(&request.to).await?;
        if recipients.is_empty() {
            info!(template = %request.template, "📭 Nenhum destinatário, envio ignorado");
            return Ok(Dispatch::NoRecipients);
        }

        let rendered = request.template.render(&request.data);
        let email = OutboundEmail {
            from: self.from.clone(),
            to: recipients.clone(),
            subject: rendered.subject.clone(),
            html: rendered.html.clone(),
        };

        let outcome = self.provider.send(&email).await;

        let (status, provider_message_id, failure) = match &outcome {
            Ok(message_id) => (SendStatus::Sent, Some(message_id.clone()), None),
            Err(e) => (SendStatus::Failed, None, Some(e.to_string())),
        };

        let record = self
            .records
            .append(&NewNotificationRecord {
                template: request.template,
                recipients,
                subject: rendered.subject,
                body: rendered.html,
                status,
                provider_message_id,
                error: failure,
                related_order_id: request.related_order_id,
                related_user_id: request.related_user_id,
            })
            .await?;

        match outcome {
            Ok(_) => {
                info!(template = %request.template, notification_id = %record.id, "📧 E-mail enviado");
                Ok(Dispatch::Sent(record.id))
            }
            Err(e) => {
                error!(template = %request.template, notification_id = %record.id, "🔥 Falha no envio: {}", e);
                Err(e)
            }
        }
    }

    /// Envia no máximo uma vez por chave. A chave é consumida mesmo se o
    /// provedor falhar; a auditoria fica como registro para reenvio manual.
    pub async fn send_once(&self, key: &str, request: &SendNotificationRequest) -> Result<Dispatch, AppError> {
        if !self.records.reserve_key(key).await? {
            info!(key, "🔁 Notificação já enviada, ignorando");
            return Ok(Dispatch::AlreadySent);
        }
        self.send(request).await
    }

    /// Para efeitos colaterais: a mudança de estado já foi gravada, então a
    /// falha de e-mail só é registrada em log.
    pub async fn notify(&self, request: SendNotificationRequest) {
        if let Err(e) = self.send(&request).await {
            warn!(template = %request.template, "⚠️ Notificação não enviada: {}", e);
        }
    }

    pub async fn notify_once(&self, key: &str, request: SendNotificationRequest) {
        if let Err(e) = self.send_once(key, &request).await {
            warn!(template = %request.template, key, "⚠️ Notificação não enviada: {}", e);
        }
    }

    pub async fn list_records(&self, order_id: Option<Uuid>) -> Result<Vec<NotificationRecord>, AppError> {
        self.records.list_recent(order_id, AUDIT_PAGE_SIZE).await
    }

    // --- E-mails dos administradores ---

    pub async fn admin_emails(&self) -> Result<Vec<String>, AppError> {
        self.settings.admin_emails().await
    }

    pub async fn set_admin_emails(&self, emails: Vec<String>) -> Result<Vec<String>, AppError> {
        let normalized = normalize_addresses(emails.iter().map(String::as_str));
        if let Some(bad) = normalized.iter().find(|e| !looks_like_email(e)) {
            return Err(AppError::InvalidInput(format!("e-mail inválido: {bad}")));
        }
        self.settings.set_admin_emails(&normalized).await?;
        info!(count = normalized.len(), "⚙️ Lista de admins atualizada");
        Ok(normalized)
    }

    // A lista de admins é lida a cada envio, sem cache.
    async fn resolve(&self, to: &Recipient) -> Result<Vec<String>, AppError> {
        Ok(match to {
            Recipient::Admins => {
                let admins = self.settings.admin_emails().await?;
                normalize_addresses(admins.iter().map(String::as_str))
            }
            Recipient::One(address) => normalize_addresses(std::iter::once(address.as_str())),
            Recipient::Many(list) => normalize_addresses(list.iter().map(String::as_str)),
        })
    }
}

fn normalize_addresses<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for address in raw {
        let address = address.trim().to_lowercase();
        if !address.is_empty() && !out.contains(&address) {
            out.push(address);
        }
    }
    out
}

fn looks_like_email(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_are_trimmed_lowercased_and_deduplicated() {
        let out = normalize_addresses([" Ana@Exemplo.com", "ana@exemplo.com", "", "bia@exemplo.com"].into_iter());
        assert_eq!(out, vec!["ana@exemplo.com", "bia@exemplo.com"]);
    }

    #[test]
    fn rejects_obviously_broken_addresses() {
        assert!(looks_like_email("ana@exemplo.com"));
        assert!(!looks_like_email("ana"));
        assert!(!looks_like_email("@exemplo.com"));
        assert!(!looks_like_email("ana@localhost"));
    }
}
