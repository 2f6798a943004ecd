pub mod auth;
pub mod catalog_service;
pub mod checkout_service;
pub mod notification_service;
pub mod order_service;
pub mod revision_gate;
pub mod webhook_service;
