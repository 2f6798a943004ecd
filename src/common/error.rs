use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Campo obrigatório ausente: {0}")]
    MissingField(String),

    #[error("Dado inválido: {0}")]
    InvalidInput(String),

    #[error("Erro do gateway de pagamento: {0}")]
    GatewayError(String),

    #[error("Erro do provedor de e-mail: {0}")]
    ProviderError(String),

    #[error("Pedido não encontrado")]
    OrderNotFound,

    #[error("Plano não encontrado")]
    PlanNotFound,

    #[error("Transição de status inválida: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Status desconhecido: {0}")]
    UnknownStatus(String),

    #[error("Limite de revisões atingido")]
    RevisionLimitReached,

    #[error("Checkout já em andamento para este pedido")]
    CheckoutInProgress,

    #[error("Não foi possível gerar um código de pedido único")]
    OrderCodeExhausted,

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de comunicação HTTP: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Chave de tradução e status HTTP de cada variante.
    fn descriptor(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::MissingField(_) => (StatusCode::BAD_REQUEST, "missing_field"),
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            AppError::GatewayError(_) => (StatusCode::BAD_REQUEST, "gateway_error"),
            AppError::ProviderError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "provider_error"),
            AppError::OrderNotFound => (StatusCode::NOT_FOUND, "order_not_found"),
            AppError::PlanNotFound => (StatusCode::NOT_FOUND, "plan_not_found"),
            AppError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
            AppError::UnknownStatus(_) => (StatusCode::BAD_REQUEST, "unknown_status"),
            AppError::RevisionLimitReached => (StatusCode::FORBIDDEN, "revision_limit_reached"),
            AppError::CheckoutInProgress => (StatusCode::CONFLICT, "checkout_in_progress"),
            AppError::EmailAlreadyExists => (StatusCode::CONFLICT, "email_already_exists"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    /// Erros transitórios: o chamador pode tentar de novo mais tarde.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::DatabaseError(_)
                | AppError::InternalServerError(_)
                | AppError::HttpClientError(_)
        )
    }

    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let (status, key) = self.descriptor();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        let message = i18n.message(&locale.0, key);
        let body = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({ "error": message, "details": details })
            }
            AppError::MissingField(field) => json!({ "error": message, "field": field }),
            // O painel admin precisa da mensagem crua do gateway para depuração.
            AppError::GatewayError(detail) | AppError::InvalidInput(detail) => {
                json!({ "error": message, "details": detail })
            }
            AppError::InvalidTransition { from, to } => {
                json!({ "error": message, "from": from, "to": to })
            }
            _ => json!({ "error": message }),
        };

        ApiError { status, body }
    }
}

/// Erro já traduzido, pronto para virar resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: Value,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// Usado por extratores e middlewares, que não têm acesso ao Locale.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), &I18nStore::default())
            .into_response()
    }
}
