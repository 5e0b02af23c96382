//! Asset lifecycle manager.
//!
//! Applies request status transitions through the injected asset store. The
//! store is responsible for atomicity; this layer decides scope, turns
//! "nothing matched" into `NotFound`, and logs state changes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use assetdesk_assets::{AssetRequest, AssetScope, Transition};
use assetdesk_core::{AssetId, DomainError};

use crate::repository::{AssetRepository, RepoError, UpdateResult};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("asset not found")]
    NotFound,

    #[error(transparent)]
    Domain(DomainError),

    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for LifecycleError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => LifecycleError::Domain(e),
            other => LifecycleError::Repo(other),
        }
    }
}

#[derive(Clone)]
pub struct AssetLifecycle {
    assets: Arc<dyn AssetRepository>,
}

impl AssetLifecycle {
    pub fn new(assets: Arc<dyn AssetRepository>) -> Self {
        Self { assets }
    }

    /// Reject a request on an asset in `owner`'s inventory.
    pub async fn reject(&self, id: AssetId, owner: &str) -> Result<UpdateResult, LifecycleError> {
        self.transition(id, AssetScope::Owner(owner.to_string()), Transition::Reject)
            .await
    }

    /// Approve a request on an asset in `owner`'s inventory.
    pub async fn approve(
        &self,
        id: AssetId,
        owner: &str,
        approved_date: DateTime<Utc>,
    ) -> Result<UpdateResult, LifecycleError> {
        self.transition(id, AssetScope::Owner(owner.to_string()), Transition::Approve { approved_date })
            .await
    }

    /// Mark an asset returned and put one unit back in stock.
    ///
    /// Either the owner or the requester may return it.
    pub async fn mark_returned(&self, id: AssetId, caller: &str) -> Result<UpdateResult, LifecycleError> {
        self.transition(id, AssetScope::Participant(caller.to_string()), Transition::MarkReturned)
            .await
    }

    /// Record a request against asset `id`, creating the asset if needed.
    pub async fn request(&self, id: AssetId, request: &AssetRequest) -> Result<UpdateResult, LifecycleError> {
        let result = self.assets.request_or_upsert(id, request).await?;
        info!(
            asset_id = %id,
            requester = %request.requester_email,
            upserted = result.upserted_id.is_some(),
            "asset requested"
        );
        Ok(result)
    }

    async fn transition(
        &self,
        id: AssetId,
        scope: AssetScope,
        transition: Transition,
    ) -> Result<UpdateResult, LifecycleError> {
        let result = self.assets.apply_transition(id, &scope, &transition).await?;
        if result.matched_count == 0 {
            return Err(LifecycleError::NotFound);
        }
        info!(
            asset_id = %id,
            status = transition.target_status().as_str(),
            by = scope.email(),
            "asset status changed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetdesk_assets::{Asset, AssetStatus, NewAsset, ProductType};

    use crate::repository::InMemoryAssetRepository;

    async fn seeded(quantity: i64) -> (Arc<InMemoryAssetRepository>, AssetLifecycle, AssetId) {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let asset = Asset::create(
            AssetId::new(),
            "b@x.com",
            NewAsset {
                product_name: "Laptop".into(),
                product_quantity: quantity,
                product_type: Some(ProductType::Returnable),
                availability: None,
                date_added: None,
            },
            Utc::now(),
        )
        .unwrap();
        let id = asset.id;
        repo.insert(asset).await.unwrap();
        let lifecycle = AssetLifecycle::new(repo.clone());
        (repo, lifecycle, id)
    }

    fn request_by(email: &str) -> AssetRequest {
        AssetRequest {
            requester_email: email.into(),
            requester_name: Some("Ann".into()),
            request_date: Some(Utc::now()),
            notes: None,
            status: None,
            product_name: None,
            product_quantity: None,
            product_type: None,
            availability: None,
            date_added: None,
            item_added_by: None,
        }
    }

    #[tokio::test]
    async fn request_approve_return_scenario() {
        let (repo, lifecycle, id) = seeded(5).await;

        lifecycle.request(id, &request_by("a@x.com")).await.unwrap();
        lifecycle.approve(id, "b@x.com", Utc::now()).await.unwrap();
        lifecycle.mark_returned(id, "a@x.com").await.unwrap();

        let asset = repo.get(id).await.unwrap().unwrap();
        assert_eq!(asset.status, Some(AssetStatus::Returned));
        assert_eq!(asset.product_quantity, 6);
        assert!(asset.approved_date.is_some());
    }

    #[tokio::test]
    async fn missing_or_foreign_asset_is_not_found() {
        let (_repo, lifecycle, id) = seeded(5).await;

        assert_eq!(
            lifecycle.approve(AssetId::new(), "b@x.com", Utc::now()).await,
            Err(LifecycleError::NotFound)
        );
        assert_eq!(lifecycle.reject(id, "other@x.com").await, Err(LifecycleError::NotFound));
        assert_eq!(lifecycle.mark_returned(id, "stranger@x.com").await, Err(LifecycleError::NotFound));
    }

    #[tokio::test]
    async fn reject_is_unguarded_by_current_status() {
        let (repo, lifecycle, id) = seeded(5).await;
        lifecycle.mark_returned(id, "b@x.com").await.unwrap();
        lifecycle.reject(id, "b@x.com").await.unwrap();

        let asset = repo.get(id).await.unwrap().unwrap();
        assert_eq!(asset.status, Some(AssetStatus::Rejected));
        assert_eq!(asset.product_quantity, 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_returns_each_add_one_unit() {
        let (repo, lifecycle, id) = seeded(5).await;
        lifecycle.request(id, &request_by("a@x.com")).await.unwrap();

        let first = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.mark_returned(id, "a@x.com").await })
        };
        let second = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.mark_returned(id, "b@x.com").await })
        };
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let asset = repo.get(id).await.unwrap().unwrap();
        assert_eq!(asset.product_quantity, 7);
    }

    #[tokio::test]
    async fn invalid_request_surfaces_as_domain_error() {
        let (_repo, lifecycle, _id) = seeded(5).await;
        let err = lifecycle.request(AssetId::new(), &request_by("a@x.com")).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Domain(DomainError::Validation(_))));
    }
}
