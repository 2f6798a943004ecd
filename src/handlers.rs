pub mod auth;
pub mod checkout;
pub mod notifications;
pub mod orders;
pub mod plans;
pub mod portal;
pub mod settings;
pub mod webhooks;
