// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserStore,
    models::{
        auth::{Claims, User},
        notification::{EmailTemplate, Recipient, SendNotificationRequest},
    },
    services::notification_service::NotificationService,
};

const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    notifier: NotificationService,
    jwt_secret: String,
}

async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
    Ok(valid)
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, notifier: NotificationService, jwt_secret: String) -> Self {
        Self { users, notifier, jwt_secret }
    }

    /// Cadastra outro administrador e avisa por e-mail.
    pub async fn register_admin(&self, email: &str, password: &str, name: Option<&str>) -> Result<User, AppError> {
        let email = email.trim().to_lowercase();
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        let hashed_password = hash_password(password).await?;
        let user = self.users.create_user(&email, name, &hashed_password).await?;
        info!(user_id = %user.id, "👤 Administrador cadastrado");

        self.notifier
            .notify(SendNotificationRequest {
                template: EmailTemplate::AccountCreated,
                to: Recipient::One(user.email.clone()),
                data: json!({
                    "name": user.name.clone().unwrap_or_default(),
                    "email": user.email,
                }),
                related_order_id: None,
                related_user_id: Some(user.id),
            })
            .await;

        Ok(user)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .users
            .find_by_email(email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(user.id)
    }

    pub async fn change_password(&self, user: &User, current: &str, new_password: &str) -> Result<(), AppError> {
        if !verify_password(current, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        let hashed_password = hash_password(new_password).await?;
        self.users.update_password(user.id, &hashed_password).await?;
        info!(user_id = %user.id, "🔑 Senha alterada");

        self.notifier
            .notify(SendNotificationRequest {
                template: EmailTemplate::PasswordChanged,
                to: Recipient::One(user.email.clone()),
                data: json!({ "email": user.email }),
                related_order_id: None,
                related_user_id: Some(user.id),
            })
            .await;

        Ok(())
    }

    /// Cria o primeiro administrador na subida, se ainda não existir.
    pub async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<(), AppError> {
        let email = email.trim().to_lowercase();
        if self.users.find_by_email(&email).await?.is_some() {
            return Ok(());
        }

        let hashed_password = hash_password(password).await?;
        let user = self.users.create_user(&email, None, &hashed_password).await?;
        info!(user_id = %user.id, "👤 Administrador inicial criado");
        Ok(())
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        self.users
            .find_by_id(token_data.claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(TOKEN_TTL_DAYS);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
