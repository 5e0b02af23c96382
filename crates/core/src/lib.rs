//! `assetdesk-core`: shared domain building blocks.
//!
//! Pure types only: identifiers, the domain error model and the entity trait.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AssetId, PaymentId, UserId};
