//! Infrastructure layer: storage adapters, lifecycle orchestration, external
//! payment gateway, configuration.

pub mod config;
pub mod lifecycle;
pub mod payment_gateway;
pub mod query;
pub mod repository;

pub use config::{AppConfig, ConfigError, LogFormat};
pub use lifecycle::{AssetLifecycle, LifecycleError};
pub use payment_gateway::{DevPaymentGateway, GatewayError, PaymentGateway, StripeGateway};
pub use repository::{
    AssetRepository, DeleteResult, InsertResult, PaymentRepository, RepoError, UpdateResult, UserRepository,
};
