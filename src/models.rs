pub mod auth;
pub mod notification;
pub mod order;
pub mod payment;
pub mod plan;
pub mod settings;
