pub mod stores;
pub use stores::{NotificationStore, OrderStore, PlanStore, SettingsStore, UserStore};

pub mod order_repo;
pub use order_repo::OrderRepository;
pub mod plan_repo;
pub use plan_repo::PlanRepository;
pub mod notification_repo;
pub use notification_repo::NotificationRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
