//! In-memory repositories for tests and local development.
//!
//! Each collection sits behind one `RwLock`; every write (including the
//! combined status + quantity change of a return) happens under a single
//! write guard, so it is atomic with respect to every other caller.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use assetdesk_assets::{Asset, AssetDetails, AssetRequest, AssetScope, AssetStatus, ProductType, Transition};
use assetdesk_core::{AssetId, Entity, UserId};
use assetdesk_directory::{CompanyAssignment, PaymentRecord, SubscriptionUpdate, User};

use super::{
    AssetRepository, DeleteResult, InsertResult, PaymentRepository, RepoError, UpdateResult, UserRepository,
};
use crate::query::{AssetQuery, Page, RequestFilter, TopRequest, TypeBreakdown};

/// Keyed collection of entities.
#[derive(Debug)]
struct Collection<T: Entity> {
    inner: RwLock<HashMap<T::Id, T>>,
}

impl<T: Entity + Clone> Collection<T> {
    fn new() -> Self {
        Self { inner: RwLock::new(HashMap::new()) }
    }

    fn read<R>(&self, f: impl FnOnce(&HashMap<T::Id, T>) -> R) -> Result<R, RepoError> {
        let map = self.inner.read().map_err(|_| RepoError::Storage("collection lock poisoned".into()))?;
        Ok(f(&map))
    }

    fn write<R>(&self, f: impl FnOnce(&mut HashMap<T::Id, T>) -> R) -> Result<R, RepoError> {
        let mut map = self.inner.write().map_err(|_| RepoError::Storage("collection lock poisoned".into()))?;
        Ok(f(&mut map))
    }

    fn filtered(&self, predicate: impl Fn(&T) -> bool) -> Result<Vec<T>, RepoError> {
        self.read(|map| map.values().filter(|v| predicate(v)).cloned().collect())
    }
}

fn newest_request_first(items: &mut [Asset]) {
    items.sort_by_key(|a| Reverse((a.request_date, a.id)));
}

/// Replace the entry for `id` with `f(entry)`, reporting whether anything changed.
fn modify<T, F>(map: &mut HashMap<T::Id, T>, id: T::Id, f: F) -> Result<UpdateResult, RepoError>
where
    T: Entity + Clone + PartialEq,
    F: FnOnce(&mut T) -> Result<bool, RepoError>,
{
    let Some(current) = map.get_mut(&id) else {
        return Ok(UpdateResult::unmatched());
    };
    let mut next = current.clone();
    if !f(&mut next)? {
        return Ok(UpdateResult::unmatched());
    }
    let changed = next != *current;
    *current = next;
    Ok(UpdateResult::matched(changed))
}

#[derive(Debug)]
pub struct InMemoryUserRepository {
    users: Collection<User>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self { users: Collection::new() }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert_if_absent(&self, user: User) -> Result<InsertResult, RepoError> {
        self.users.write(|map| {
            if map.values().any(|u| u.email == user.email) {
                return InsertResult::already_exists("user already exists");
            }
            let id = user.id();
            map.insert(id, user);
            InsertResult::inserted(id)
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        self.users.read(|map| map.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepoError> {
        self.users.read(|map| map.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, RepoError> {
        let mut users = self.users.filtered(|_| true)?;
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn list_by_company(&self, company_name: &str) -> Result<Vec<User>, RepoError> {
        let mut users = self.users.filtered(|u| u.company_name.as_deref() == Some(company_name))?;
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn list_unaffiliated(&self) -> Result<Vec<User>, RepoError> {
        let mut users = self.users.filtered(User::is_unaffiliated)?;
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn assign_company(
        &self,
        id: UserId,
        assignment: &CompanyAssignment,
        added_by: &str,
    ) -> Result<UpdateResult, RepoError> {
        assignment.validate()?;
        self.users.write(|map| {
            modify(map, id, |user| {
                user.assign_company(assignment, added_by);
                Ok(true)
            })
        })?
    }

    async fn remove_from_company(&self, id: UserId) -> Result<UpdateResult, RepoError> {
        self.users.write(|map| {
            modify(map, id, |user| {
                user.remove_from_company();
                Ok(true)
            })
        })?
    }

    async fn update_subscription(&self, email: &str, update: &SubscriptionUpdate) -> Result<UpdateResult, RepoError> {
        update.validate()?;
        self.users.write(|map| {
            let Some(id) = map.values().find(|u| u.email == email).map(|u| u.id) else {
                return Ok(UpdateResult::unmatched());
            };
            modify(map, id, |user| {
                user.update_subscription(update);
                Ok(true)
            })
        })?
    }
}

#[derive(Debug)]
pub struct InMemoryAssetRepository {
    assets: Collection<Asset>,
}

impl InMemoryAssetRepository {
    pub fn new() -> Self {
        Self { assets: Collection::new() }
    }
}

impl Default for InMemoryAssetRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetRepository for InMemoryAssetRepository {
    async fn insert(&self, asset: Asset) -> Result<InsertResult, RepoError> {
        self.assets.write(|map| {
            let id = asset.id();
            map.insert(id, asset);
            InsertResult::inserted(id)
        })
    }

    async fn get(&self, id: AssetId) -> Result<Option<Asset>, RepoError> {
        self.assets.read(|map| map.get(&id).cloned())
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Asset>, RepoError> {
        let mut items = self.assets.filtered(|a| a.is_owned_by(owner))?;
        AssetQuery::for_owner(owner).sort(&mut items);
        Ok(items)
    }

    async fn list_by_requester(&self, requester: &str, filter: &RequestFilter) -> Result<Vec<Asset>, RepoError> {
        let mut items = self.assets.filtered(|a| a.is_requested_by(requester) && filter.matches(a))?;
        newest_request_first(&mut items);
        Ok(items)
    }

    async fn list_requests_for_owner(&self, owner: &str) -> Result<Vec<Asset>, RepoError> {
        let mut items = self.assets.filtered(|a| a.is_owned_by(owner) && a.requester_email.is_some())?;
        newest_request_first(&mut items);
        Ok(items)
    }

    async fn update_details(&self, id: AssetId, owner: &str, details: &AssetDetails) -> Result<UpdateResult, RepoError> {
        self.assets.write(|map| {
            modify(map, id, |asset| {
                if !asset.is_owned_by(owner) {
                    return Ok(false);
                }
                asset.apply_details(details)?;
                Ok(true)
            })
        })?
    }

    async fn delete(&self, id: AssetId, owner: &str) -> Result<DeleteResult, RepoError> {
        self.assets.write(|map| {
            if map.get(&id).is_some_and(|a| a.is_owned_by(owner)) {
                map.remove(&id);
                DeleteResult::deleted(1)
            } else {
                DeleteResult::deleted(0)
            }
        })
    }

    async fn apply_transition(
        &self,
        id: AssetId,
        scope: &AssetScope,
        transition: &Transition,
    ) -> Result<UpdateResult, RepoError> {
        self.assets.write(|map| {
            modify(map, id, |asset| {
                if !scope.permits(asset) {
                    return Ok(false);
                }
                asset.apply(transition)?;
                Ok(true)
            })
        })?
    }

    async fn request_or_upsert(&self, id: AssetId, request: &AssetRequest) -> Result<UpdateResult, RepoError> {
        self.assets.write(|map| {
            if map.contains_key(&id) {
                return modify(map, id, |asset| {
                    asset.apply_request(request)?;
                    Ok(true)
                });
            }
            let asset = Asset::from_request(id, request)?;
            map.insert(id, asset);
            Ok(UpdateResult::upserted(id))
        })?
    }

    async fn search(&self, query: &AssetQuery) -> Result<Page<Asset>, RepoError> {
        let mut items = self.assets.filtered(|a| query.matches(a))?;
        query.sort(&mut items);

        let total = items.len() as u64;
        let offset = usize::try_from(query.pagination.offset()).unwrap_or(usize::MAX);
        let page: Vec<Asset> = items
            .into_iter()
            .skip(offset)
            .take(query.pagination.size as usize)
            .collect();
        Ok(Page::new(page, total, query.pagination))
    }

    async fn top_requested(&self, owner: &str, limit: usize) -> Result<Vec<TopRequest>, RepoError> {
        let requested = self.assets.filtered(|a| a.is_owned_by(owner) && a.requester_email.is_some())?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for asset in requested {
            *counts.entry(asset.product_name).or_default() += 1;
        }

        let mut top: Vec<TopRequest> = counts
            .into_iter()
            .map(|(product_name, count)| TopRequest { product_name, count })
            .collect();
        top.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.product_name.cmp(&b.product_name)));
        top.truncate(limit);
        Ok(top)
    }

    async fn limited_stock(&self, owner: &str, threshold: i64) -> Result<Vec<Asset>, RepoError> {
        let mut items = self.assets.filtered(|a| a.is_owned_by(owner) && a.product_quantity < threshold)?;
        items.sort_by_key(|a| (a.product_quantity, a.id));
        Ok(items)
    }

    async fn pending_requests(&self, owner: &str) -> Result<Vec<Asset>, RepoError> {
        let mut items = self.assets.filtered(|a| {
            a.is_owned_by(owner) && a.requester_email.is_some() && a.status == Some(AssetStatus::Pending)
        })?;
        newest_request_first(&mut items);
        Ok(items)
    }

    async fn requests_between(
        &self,
        requester: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Asset>, RepoError> {
        let mut items = self.assets.filtered(|a| {
            a.is_requested_by(requester) && a.request_date.is_some_and(|d| d >= from && d < to)
        })?;
        newest_request_first(&mut items);
        Ok(items)
    }

    async fn type_breakdown(&self, owner: &str) -> Result<TypeBreakdown, RepoError> {
        self.assets.read(|map| {
            map.values()
                .filter(|a| a.is_owned_by(owner) && a.requester_email.is_some())
                .fold(TypeBreakdown::default(), |mut acc, a| {
                    match a.product_type {
                        Some(ProductType::Returnable) => acc.returnable += 1,
                        Some(ProductType::NonReturnable) => acc.non_returnable += 1,
                        None => {}
                    }
                    acc
                })
        })
    }
}

#[derive(Debug)]
pub struct InMemoryPaymentRepository {
    payments: Collection<PaymentRecord>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self { payments: Collection::new() }
    }
}

impl Default for InMemoryPaymentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn append(&self, record: PaymentRecord) -> Result<InsertResult, RepoError> {
        self.payments.write(|map| {
            let id = record.id();
            map.insert(id, record);
            InsertResult::inserted(id)
        })
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<PaymentRecord>, RepoError> {
        let mut records = self.payments.filtered(|p| p.email == email)?;
        records.sort_by_key(|p| Reverse((p.date, p.id)));
        Ok(records)
    }
}
