// src/common/i18n.rs

use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "pt";

const PT: &[(&str, &str)] = &[
    ("validation_error", "Um ou mais campos são inválidos."),
    ("missing_field", "Campo obrigatório não informado."),
    ("invalid_input", "Os dados enviados são inválidos."),
    ("gateway_error", "Não foi possível iniciar o pagamento. Tente novamente."),
    ("provider_error", "Falha ao enviar o e-mail."),
    ("order_not_found", "Pedido não encontrado. Confira o código e o e-mail informados."),
    ("plan_not_found", "Plano não encontrado."),
    ("invalid_transition", "Esta mudança de status não é permitida."),
    ("unknown_status", "Status desconhecido."),
    ("revision_limit_reached", "Seu plano não permite novas solicitações de revisão."),
    ("checkout_in_progress", "O pagamento deste pedido já está sendo gerado. Aguarde alguns instantes."),
    ("email_already_exists", "Este e-mail já está em uso."),
    ("invalid_credentials", "E-mail ou senha inválidos."),
    ("invalid_token", "Token de autenticação inválido ou ausente."),
    ("user_not_found", "Usuário não encontrado."),
    ("internal_error", "Ocorreu um erro inesperado."),
];

const EN: &[(&str, &str)] = &[
    ("validation_error", "One or more fields are invalid."),
    ("missing_field", "A required field is missing."),
    ("invalid_input", "The submitted data is invalid."),
    ("gateway_error", "Could not start the payment. Please try again."),
    ("provider_error", "Failed to send the e-mail."),
    ("order_not_found", "Order not found. Check your code and e-mail."),
    ("plan_not_found", "Plan not found."),
    ("invalid_transition", "This status change is not allowed."),
    ("unknown_status", "Unknown status."),
    ("revision_limit_reached", "Your plan does not allow more revision requests."),
    ("checkout_in_progress", "The payment for this order is being created. Please wait."),
    ("email_already_exists", "This e-mail is already in use."),
    ("invalid_credentials", "Invalid e-mail or password."),
    ("invalid_token", "Invalid or missing authentication token."),
    ("user_not_found", "User not found."),
    ("internal_error", "An unexpected error occurred."),
];

/// Tabelas de mensagens por idioma.
#[derive(Debug, Clone)]
pub struct I18nStore {
    tables: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl Default for I18nStore {
    fn default() -> Self {
        let mut tables = HashMap::new();
        tables.insert("pt", PT.iter().copied().collect());
        tables.insert("en", EN.iter().copied().collect());
        Self { tables }
    }
}

impl I18nStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idioma desconhecido cai para o português; chave desconhecida volta como está.
    pub fn message(&self, lang: &str, key: &str) -> String {
        self.tables
            .get(lang)
            .and_then(|t| t.get(key))
            .or_else(|| self.tables.get(DEFAULT_LANG).and_then(|t| t.get(key)))
            .map(|m| m.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}
