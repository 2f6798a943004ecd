pub mod asaas;
pub use asaas::{AsaasClient, PaymentGateway};
pub mod resend;
pub use resend::{EmailProvider, ResendClient};
