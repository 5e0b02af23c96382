//! Repository abstractions over the three document collections.
//!
//! Every store (in-memory for tests/dev, Postgres for production) implements
//! these traits; handlers only ever see `Arc<dyn ...Repository>`.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use assetdesk_assets::{Asset, AssetDetails, AssetRequest, AssetScope, Transition};
use assetdesk_core::{AssetId, DomainError, UserId};
use assetdesk_directory::{CompanyAssignment, PaymentRecord, SubscriptionUpdate, User};

use crate::query::{AssetQuery, Page, RequestFilter, TopRequest, TypeBreakdown};

pub use in_memory::{InMemoryAssetRepository, InMemoryPaymentRepository, InMemoryUserRepository};
pub use postgres::{PostgresAssetRepository, PostgresPaymentRepository, PostgresStores, PostgresUserRepository};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Outcome of an insert, shaped like a document-store write result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InsertResult {
    pub fn inserted(id: impl ToString) -> Self {
        Self { acknowledged: true, inserted_id: Some(id.to_string()), message: None }
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self { acknowledged: true, inserted_id: None, message: Some(message.into()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<String>,
}

impl UpdateResult {
    pub fn matched(modified: bool) -> Self {
        Self { acknowledged: true, matched_count: 1, modified_count: u64::from(modified), upserted_id: None }
    }

    pub fn unmatched() -> Self {
        Self { acknowledged: true, matched_count: 0, modified_count: 0, upserted_id: None }
    }

    pub fn upserted(id: impl ToString) -> Self {
        Self { acknowledged: true, matched_count: 0, modified_count: 0, upserted_id: Some(id.to_string()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteResult {
    pub fn deleted(count: u64) -> Self {
        Self { acknowledged: true, deleted_count: count }
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert unless a user with the same email exists (atomic per email).
    async fn insert_if_absent(&self, user: User) -> Result<InsertResult, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepoError>;

    async fn list(&self) -> Result<Vec<User>, RepoError>;

    async fn list_by_company(&self, company_name: &str) -> Result<Vec<User>, RepoError>;

    /// Users with no company who are not HR accounts.
    async fn list_unaffiliated(&self) -> Result<Vec<User>, RepoError>;

    async fn assign_company(
        &self,
        id: UserId,
        assignment: &CompanyAssignment,
        added_by: &str,
    ) -> Result<UpdateResult, RepoError>;

    async fn remove_from_company(&self, id: UserId) -> Result<UpdateResult, RepoError>;

    async fn update_subscription(&self, email: &str, update: &SubscriptionUpdate) -> Result<UpdateResult, RepoError>;
}

#[async_trait]
pub trait AssetRepository: Send + Sync {
    async fn insert(&self, asset: Asset) -> Result<InsertResult, RepoError>;

    async fn get(&self, id: AssetId) -> Result<Option<Asset>, RepoError>;

    /// Every asset owned by `owner`, newest first.
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Asset>, RepoError>;

    /// Assets requested by `requester`, newest request first.
    async fn list_by_requester(&self, requester: &str, filter: &RequestFilter) -> Result<Vec<Asset>, RepoError>;

    /// Requested assets within `owner`'s inventory, newest request first.
    async fn list_requests_for_owner(&self, owner: &str) -> Result<Vec<Asset>, RepoError>;

    async fn update_details(&self, id: AssetId, owner: &str, details: &AssetDetails) -> Result<UpdateResult, RepoError>;

    async fn delete(&self, id: AssetId, owner: &str) -> Result<DeleteResult, RepoError>;

    /// Apply a lifecycle transition as one atomic write.
    ///
    /// An asset outside `scope` is reported as unmatched.
    async fn apply_transition(
        &self,
        id: AssetId,
        scope: &AssetScope,
        transition: &Transition,
    ) -> Result<UpdateResult, RepoError>;

    /// Merge `request` into asset `id`, or insert it as a new asset.
    async fn request_or_upsert(&self, id: AssetId, request: &AssetRequest) -> Result<UpdateResult, RepoError>;

    async fn search(&self, query: &AssetQuery) -> Result<Page<Asset>, RepoError>;

    async fn top_requested(&self, owner: &str, limit: usize) -> Result<Vec<TopRequest>, RepoError>;

    /// Assets below `threshold` units, lowest stock first.
    async fn limited_stock(&self, owner: &str, threshold: i64) -> Result<Vec<Asset>, RepoError>;

    async fn pending_requests(&self, owner: &str) -> Result<Vec<Asset>, RepoError>;

    async fn requests_between(
        &self,
        requester: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Asset>, RepoError>;

    async fn type_breakdown(&self, owner: &str) -> Result<TypeBreakdown, RepoError>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn append(&self, record: PaymentRecord) -> Result<InsertResult, RepoError>;

    /// Payment history for `email`, newest first.
    async fn list_by_email(&self, email: &str) -> Result<Vec<PaymentRecord>, RepoError>;
}
