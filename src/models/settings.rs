// src/models/settings.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lista de e-mails que recebem os avisos destinados a "admins".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminEmails {
    pub emails: Vec<String>,
}
