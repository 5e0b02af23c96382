//! Asset domain module.
//!
//! Business rules for company assets and the requests made against them,
//! implemented as deterministic domain logic (no IO, no HTTP, no storage).

pub mod asset;
pub mod request;
pub mod scope;

pub use asset::{Asset, AssetStatus, Availability, NewAsset, ProductType, Transition};
pub use request::{AssetDetails, AssetRequest};
pub use scope::AssetScope;
