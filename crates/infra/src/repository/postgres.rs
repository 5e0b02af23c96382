//! Postgres-backed repositories.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `RepoError` by [`map_sqlx_error`]:
//!
//! | SQLx Error | PostgreSQL Error Code | RepoError |
//! |------------|----------------------|-----------|
//! | Database (unique violation) | `23505` | `Domain(Validation)` |
//! | Database (check constraint violation) | `23514` | `Domain(Validation)` |
//! | Database (other) | Any other | `Storage` |
//! | PoolClosed / other | N/A | `Storage` |
//!
//! ## Atomicity
//!
//! Lifecycle transitions are single `UPDATE` statements; returning an asset
//! bumps `product_quantity` in the same statement that sets the status, so
//! concurrent returns each add exactly one unit.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use tracing::{Span, instrument};

use assetdesk_assets::{
    Asset, AssetDetails, AssetRequest, AssetScope, AssetStatus, Availability, ProductType, Transition,
};
use assetdesk_auth::Role;
use assetdesk_core::{AssetId, DomainError, PaymentId, UserId};
use assetdesk_directory::{CompanyAssignment, PaymentRecord, PaymentStatus, SubscriptionUpdate, User};

use super::{
    AssetRepository, DeleteResult, InsertResult, PaymentRepository, RepoError, UpdateResult, UserRepository,
};
use crate::query::{AssetQuery, Page, RequestFilter, SortOrder, TopRequest, TypeBreakdown, like_pattern};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            UUID PRIMARY KEY,
        email         TEXT NOT NULL UNIQUE,
        name          TEXT,
        photo         TEXT,
        role          TEXT,
        company_name  TEXT,
        company_logo  TEXT,
        affiliate     BOOLEAN,
        added_by      TEXT,
        category      BIGINT,
        payment       TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS assets (
        id                UUID PRIMARY KEY,
        product_name      TEXT NOT NULL,
        product_quantity  BIGINT NOT NULL CHECK (product_quantity >= 0),
        product_type      TEXT,
        availability      TEXT,
        date_added        TIMESTAMPTZ,
        item_added_by     TEXT,
        requester_email   TEXT,
        requester_name    TEXT,
        request_date      TIMESTAMPTZ,
        notes             TEXT,
        status            TEXT,
        approved_date     TIMESTAMPTZ
    )
    "#,
    "CREATE INDEX IF NOT EXISTS assets_owner_idx ON assets (item_added_by)",
    "CREATE INDEX IF NOT EXISTS assets_requester_idx ON assets (requester_email)",
    r#"
    CREATE TABLE IF NOT EXISTS payments (
        id              UUID PRIMARY KEY,
        email           TEXT NOT NULL,
        category_price  DOUBLE PRECISION NOT NULL,
        category        BIGINT,
        transaction_id  TEXT,
        date            TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS payments_email_idx ON payments (email)",
];

const ASSET_COLUMNS: &str = "id, product_name, product_quantity, product_type, availability, date_added, \
     item_added_by, requester_email, requester_name, request_date, notes, status, approved_date";

const USER_COLUMNS: &str =
    "id, email, name, photo, role, company_name, company_logo, affiliate, added_by, category, payment";

/// Shared pool plus schema management; hands out the per-collection repositories.
#[derive(Debug, Clone)]
pub struct PostgresStores {
    pool: Arc<PgPool>,
}

impl PostgresStores {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub async fn connect(database_url: &str) -> Result<Self, RepoError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), RepoError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }

    pub fn users(&self) -> PostgresUserRepository {
        PostgresUserRepository { pool: self.pool.clone() }
    }

    pub fn assets(&self) -> PostgresAssetRepository {
        PostgresAssetRepository { pool: self.pool.clone() }
    }

    pub fn payments(&self) -> PostgresPaymentRepository {
        PostgresPaymentRepository { pool: self.pool.clone() }
    }
}

#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: Arc<PgPool>,
}

#[derive(Debug, Clone)]
pub struct PostgresAssetRepository {
    pool: Arc<PgPool>,
}

#[derive(Debug, Clone)]
pub struct PostgresPaymentRepository {
    pool: Arc<PgPool>,
}

fn rows_matched(rows: u64) -> UpdateResult {
    UpdateResult {
        acknowledged: true,
        matched_count: rows,
        modified_count: rows,
        upserted_id: None,
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, user), fields(email = %user.email), err)]
    async fn insert_if_absent(&self, user: User) -> Result<InsertResult, RepoError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, email, name, photo, role, company_name, company_logo, affiliate, added_by, category, payment)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (email) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.photo)
        .bind(user.role.map(|r| r.as_str()))
        .bind(&user.company_name)
        .bind(&user.company_logo)
        .bind(user.affiliate)
        .bind(&user.added_by)
        .bind(user.category)
        .bind(user.payment.map(|p| p.as_str()))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        Ok(match inserted {
            Some(row) => {
                let id: uuid::Uuid = row.try_get("id").map_err(|e| map_sqlx_error("insert_user", e))?;
                InsertResult::inserted(id)
            }
            None => InsertResult::already_exists("user already exists"),
        })
    }

    #[instrument(skip(self), err)]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.map(|r| user_from_row(&r)).transpose()
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepoError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_id", e))?;
        row.map(|r| user_from_row(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<User>, RepoError> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_by_company(&self, company_name: &str) -> Result<Vec<User>, RepoError> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE company_name = $1 ORDER BY id"))
            .bind(company_name)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users_by_company", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_unaffiliated(&self) -> Result<Vec<User>, RepoError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE company_name IS NULL AND role IS DISTINCT FROM 'hr' ORDER BY id"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_unaffiliated_users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self, assignment), fields(user_id = %id), err)]
    async fn assign_company(
        &self,
        id: UserId,
        assignment: &CompanyAssignment,
        added_by: &str,
    ) -> Result<UpdateResult, RepoError> {
        assignment.validate()?;
        let result = sqlx::query(
            r#"
            UPDATE users
            SET company_name = $2, company_logo = $3, affiliate = $4, added_by = $5
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&assignment.company_name)
        .bind(&assignment.company_logo)
        .bind(assignment.affiliate.unwrap_or(true))
        .bind(added_by)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("assign_company", e))?;
        Ok(rows_matched(result.rows_affected()))
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn remove_from_company(&self, id: UserId) -> Result<UpdateResult, RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET company_name = NULL, company_logo = NULL, affiliate = NULL, added_by = NULL
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove_from_company", e))?;
        Ok(rows_matched(result.rows_affected()))
    }

    #[instrument(skip(self, update), err)]
    async fn update_subscription(&self, email: &str, update: &SubscriptionUpdate) -> Result<UpdateResult, RepoError> {
        update.validate()?;
        let result = sqlx::query("UPDATE users SET category = $2, payment = $3 WHERE email = $1")
            .bind(email)
            .bind(update.category)
            .bind(update.payment.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_subscription", e))?;
        Ok(rows_matched(result.rows_affected()))
    }
}

impl PostgresAssetRepository {
    async fn fetch_assets(&self, operation: &str, sql: &str, binds: AssetBinds<'_>) -> Result<Vec<Asset>, RepoError> {
        let mut query = sqlx::query(sql).bind(binds.email);
        if let Some(n) = binds.number {
            query = query.bind(n);
        }
        if let Some((from, to)) = binds.window {
            query = query.bind(from).bind(to);
        }
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        Span::current().record("rows", rows.len());
        rows.iter().map(asset_from_row).collect()
    }
}

/// Positional parameters for the simple asset listings.
struct AssetBinds<'a> {
    email: &'a str,
    number: Option<i64>,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl<'a> AssetBinds<'a> {
    fn email(email: &'a str) -> Self {
        Self { email, number: None, window: None }
    }
}

#[async_trait]
impl AssetRepository for PostgresAssetRepository {
    #[instrument(skip(self, asset), fields(asset_id = %asset.id), err)]
    async fn insert(&self, asset: Asset) -> Result<InsertResult, RepoError> {
        insert_asset(&*self.pool, &asset).await?;
        Ok(InsertResult::inserted(asset.id))
    }

    #[instrument(skip(self), fields(asset_id = %id), err)]
    async fn get(&self, id: AssetId) -> Result<Option<Asset>, RepoError> {
        let row = sqlx::query(&format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_asset", e))?;
        row.map(|r| asset_from_row(&r)).transpose()
    }

    #[instrument(skip(self), fields(rows = tracing::field::Empty), err)]
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Asset>, RepoError> {
        let sql = format!(
            "SELECT {ASSET_COLUMNS} FROM assets WHERE item_added_by = $1 \
             ORDER BY date_added DESC NULLS LAST, id DESC"
        );
        self.fetch_assets("list_assets_by_owner", &sql, AssetBinds::email(owner)).await
    }

    #[instrument(skip(self, filter), fields(rows = tracing::field::Empty), err)]
    async fn list_by_requester(&self, requester: &str, filter: &RequestFilter) -> Result<Vec<Asset>, RepoError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {ASSET_COLUMNS} FROM assets WHERE requester_email = "));
        builder.push_bind(requester.to_string());
        if let Some(search) = &filter.search {
            builder.push(" AND product_name ILIKE ").push_bind(like_pattern(search));
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        builder.push(" ORDER BY request_date DESC NULLS LAST, id DESC");

        let rows = builder
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_assets_by_requester", e))?;
        Span::current().record("rows", rows.len());
        rows.iter().map(asset_from_row).collect()
    }

    #[instrument(skip(self), fields(rows = tracing::field::Empty), err)]
    async fn list_requests_for_owner(&self, owner: &str) -> Result<Vec<Asset>, RepoError> {
        let sql = format!(
            "SELECT {ASSET_COLUMNS} FROM assets \
             WHERE item_added_by = $1 AND requester_email IS NOT NULL \
             ORDER BY request_date DESC NULLS LAST, id DESC"
        );
        self.fetch_assets("list_requests_for_owner", &sql, AssetBinds::email(owner)).await
    }

    #[instrument(skip(self, details), fields(asset_id = %id), err)]
    async fn update_details(&self, id: AssetId, owner: &str, details: &AssetDetails) -> Result<UpdateResult, RepoError> {
        details.validate()?;
        let result = sqlx::query(
            r#"
            UPDATE assets
            SET product_name = COALESCE($3, product_name),
                product_quantity = COALESCE($4, product_quantity),
                product_type = COALESCE($5, product_type),
                date_added = COALESCE($6, date_added)
            WHERE id = $1 AND item_added_by = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(owner)
        .bind(&details.product_name)
        .bind(details.product_quantity)
        .bind(details.product_type.map(|t| t.as_str()))
        .bind(details.date_added)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_asset_details", e))?;
        Ok(rows_matched(result.rows_affected()))
    }

    #[instrument(skip(self), fields(asset_id = %id), err)]
    async fn delete(&self, id: AssetId, owner: &str) -> Result<DeleteResult, RepoError> {
        let result = sqlx::query("DELETE FROM assets WHERE id = $1 AND item_added_by = $2")
            .bind(id.as_uuid())
            .bind(owner)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_asset", e))?;
        Ok(DeleteResult::deleted(result.rows_affected()))
    }

    #[instrument(skip(self, scope), fields(asset_id = %id, transition = ?transition), err)]
    async fn apply_transition(
        &self,
        id: AssetId,
        scope: &AssetScope,
        transition: &Transition,
    ) -> Result<UpdateResult, RepoError> {
        let sql = transition_sql(transition, scope);
        let mut query = sqlx::query(&sql).bind(id.as_uuid()).bind(scope.email());
        if let Transition::Approve { approved_date } = transition {
            query = query.bind(*approved_date);
        }
        let result = query
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("apply_transition", e))?;
        Ok(rows_matched(result.rows_affected()))
    }

    #[instrument(skip(self, request), fields(asset_id = %id), err)]
    async fn request_or_upsert(&self, id: AssetId, request: &AssetRequest) -> Result<UpdateResult, RepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let result = match lock_asset(&mut *tx, id).await? {
            Some(current) => merge_request(&mut *tx, current, request).await?,
            None => {
                let asset = Asset::from_request(id, request)?;
                if insert_asset_if_absent(&mut *tx, &asset).await? {
                    UpdateResult::upserted(id)
                } else {
                    // A concurrent request created the row first; merge into it.
                    let current = lock_asset(&mut *tx, id)
                        .await?
                        .ok_or_else(|| RepoError::Storage(format!("asset {id} vanished during upsert")))?;
                    merge_request(&mut *tx, current, request).await?
                }
            }
        };

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(result)
    }

    #[instrument(skip(self, query), fields(owner = %query.owner, rows = tracing::field::Empty), err)]
    async fn search(&self, query: &AssetQuery) -> Result<Page<Asset>, RepoError> {
        let total: i64 = search_builder("SELECT COUNT(*) FROM assets", query)
            .build_query_scalar()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_assets", e))?;

        let mut builder = search_builder(&format!("SELECT {ASSET_COLUMNS} FROM assets"), query);
        push_order_and_page(&mut builder, query);
        let rows = builder
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("search_assets", e))?;
        Span::current().record("rows", rows.len());

        let items = rows.iter().map(asset_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total.max(0) as u64, query.pagination))
    }

    #[instrument(skip(self), err)]
    async fn top_requested(&self, owner: &str, limit: usize) -> Result<Vec<TopRequest>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT product_name, COUNT(*) AS count
            FROM assets
            WHERE item_added_by = $1 AND requester_email IS NOT NULL
            GROUP BY product_name
            ORDER BY count DESC, product_name ASC
            LIMIT $2
            "#,
        )
        .bind(owner)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("top_requested", e))?;

        rows.iter()
            .map(|row| {
                let count: i64 = row.try_get("count").map_err(|e| map_sqlx_error("top_requested", e))?;
                Ok(TopRequest {
                    product_name: row.try_get("product_name").map_err(|e| map_sqlx_error("top_requested", e))?,
                    count: count.max(0) as u64,
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(rows = tracing::field::Empty), err)]
    async fn limited_stock(&self, owner: &str, threshold: i64) -> Result<Vec<Asset>, RepoError> {
        let sql = format!(
            "SELECT {ASSET_COLUMNS} FROM assets \
             WHERE item_added_by = $1 AND product_quantity < $2 \
             ORDER BY product_quantity ASC, id ASC"
        );
        let binds = AssetBinds { number: Some(threshold), ..AssetBinds::email(owner) };
        self.fetch_assets("limited_stock", &sql, binds).await
    }

    #[instrument(skip(self), fields(rows = tracing::field::Empty), err)]
    async fn pending_requests(&self, owner: &str) -> Result<Vec<Asset>, RepoError> {
        let sql = format!(
            "SELECT {ASSET_COLUMNS} FROM assets \
             WHERE item_added_by = $1 AND requester_email IS NOT NULL AND status = 'pending' \
             ORDER BY request_date DESC NULLS LAST, id DESC"
        );
        self.fetch_assets("pending_requests", &sql, AssetBinds::email(owner)).await
    }

    #[instrument(skip(self), fields(rows = tracing::field::Empty), err)]
    async fn requests_between(
        &self,
        requester: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Asset>, RepoError> {
        let sql = format!(
            "SELECT {ASSET_COLUMNS} FROM assets \
             WHERE requester_email = $1 AND request_date >= $2 AND request_date < $3 \
             ORDER BY request_date DESC, id DESC"
        );
        let binds = AssetBinds { window: Some((from, to)), ..AssetBinds::email(requester) };
        self.fetch_assets("requests_between", &sql, binds).await
    }

    #[instrument(skip(self), err)]
    async fn type_breakdown(&self, owner: &str) -> Result<TypeBreakdown, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE product_type = 'Returnable') AS returnable,
                COUNT(*) FILTER (WHERE product_type = 'Non-returnable') AS non_returnable
            FROM assets
            WHERE item_added_by = $1 AND requester_email IS NOT NULL
            "#,
        )
        .bind(owner)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("type_breakdown", e))?;

        let returnable: i64 = row.try_get("returnable").map_err(|e| map_sqlx_error("type_breakdown", e))?;
        let non_returnable: i64 = row.try_get("non_returnable").map_err(|e| map_sqlx_error("type_breakdown", e))?;
        Ok(TypeBreakdown {
            returnable: returnable.max(0) as u64,
            non_returnable: non_returnable.max(0) as u64,
        })
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    #[instrument(skip(self, record), fields(payment_id = %record.id), err)]
    async fn append(&self, record: PaymentRecord) -> Result<InsertResult, RepoError> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, email, category_price, category, transaction_id, date)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(&record.email)
        .bind(record.category_price)
        .bind(record.category)
        .bind(&record.transaction_id)
        .bind(record.date)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_payment", e))?;
        Ok(InsertResult::inserted(record.id))
    }

    #[instrument(skip(self), err)]
    async fn list_by_email(&self, email: &str) -> Result<Vec<PaymentRecord>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT id, email, category_price, category, transaction_id, date
            FROM payments
            WHERE email = $1
            ORDER BY date DESC, id DESC
            "#,
        )
        .bind(email)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_payments", e))?;

        rows.iter()
            .map(|row| {
                PaymentRow::from_row(row)
                    .map(PaymentRecord::from)
                    .map_err(|e| map_sqlx_error("list_payments", e))
            })
            .collect()
    }
}

/// `UPDATE` for one transition. `$1` is the id, `$2` the scope email and,
/// for approvals, `$3` the approval date.
fn transition_sql(transition: &Transition, scope: &AssetScope) -> String {
    let set = match transition {
        Transition::Reject => "status = 'rejected'",
        Transition::Approve { .. } => "status = 'approved', approved_date = $3",
        Transition::MarkReturned => "status = 'returned', product_quantity = product_quantity + 1",
    };
    let scope_clause = match scope {
        AssetScope::Owner(_) => "item_added_by = $2",
        AssetScope::Participant(_) => "(item_added_by = $2 OR requester_email = $2)",
    };
    format!("UPDATE assets SET {set} WHERE id = $1 AND {scope_clause}")
}

fn search_builder<'a>(select: &str, query: &AssetQuery) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new(select);
    builder.push(" WHERE item_added_by = ").push_bind(query.owner.clone());
    if let Some(search) = &query.search {
        builder.push(" AND product_name ILIKE ").push_bind(like_pattern(search));
    }
    if let Some(availability) = query.availability {
        builder.push(" AND availability = ").push_bind(availability.as_str());
    }
    if let Some(product_type) = query.product_type {
        builder.push(" AND product_type = ").push_bind(product_type.as_str());
    }
    builder
}

fn push_order_and_page(builder: &mut QueryBuilder<'_, Postgres>, query: &AssetQuery) {
    builder.push(match query.sort {
        Some(SortOrder::Asc) => " ORDER BY product_quantity ASC, id ASC",
        Some(SortOrder::Desc) => " ORDER BY product_quantity DESC, id DESC",
        None => " ORDER BY date_added DESC NULLS LAST, id DESC",
    });
    builder.push(" LIMIT ").push_bind(i64::from(query.pagination.size));
    builder
        .push(" OFFSET ")
        .push_bind(i64::try_from(query.pagination.offset()).unwrap_or(i64::MAX));
}

fn insert_asset_sql(skip_existing: bool) -> String {
    let mut sql = format!(
        "INSERT INTO assets ({ASSET_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
    );
    if skip_existing {
        sql.push_str(" ON CONFLICT (id) DO NOTHING");
    }
    sql
}

async fn insert_asset<'e, E>(executor: E, asset: &Asset) -> Result<(), RepoError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    bind_insert(&insert_asset_sql(false), asset, executor, "insert_asset").await?;
    Ok(())
}

/// Insert unless the id is taken; `false` when another writer got there first.
async fn insert_asset_if_absent<'e, E>(executor: E, asset: &Asset) -> Result<bool, RepoError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let rows = bind_insert(&insert_asset_sql(true), asset, executor, "upsert_asset").await?;
    Ok(rows == 1)
}

async fn bind_insert<'e, E>(sql: &str, asset: &Asset, executor: E, operation: &str) -> Result<u64, RepoError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(sql)
        .bind(asset.id.as_uuid())
        .bind(&asset.product_name)
        .bind(asset.product_quantity)
        .bind(asset.product_type.map(|t| t.as_str()))
        .bind(asset.availability.map(|a| a.as_str()))
        .bind(asset.date_added)
        .bind(&asset.item_added_by)
        .bind(&asset.requester_email)
        .bind(&asset.requester_name)
        .bind(asset.request_date)
        .bind(&asset.notes)
        .bind(asset.status.map(|s| s.as_str()))
        .bind(asset.approved_date)
        .execute(executor)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;
    Ok(result.rows_affected())
}

async fn lock_asset(conn: &mut PgConnection, id: AssetId) -> Result<Option<Asset>, RepoError> {
    let row = sqlx::query(&format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1 FOR UPDATE"))
        .bind(id.as_uuid())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("lock_asset", e))?;
    row.as_ref().map(asset_from_row).transpose()
}

async fn merge_request(
    conn: &mut PgConnection,
    current: Asset,
    request: &AssetRequest,
) -> Result<UpdateResult, RepoError> {
    let mut next = current.clone();
    next.apply_request(request)?;
    let changed = next != current;
    if changed {
        update_asset(&mut *conn, &next).await?;
    }
    Ok(UpdateResult::matched(changed))
}

async fn update_asset<'e, E>(executor: E, asset: &Asset) -> Result<(), RepoError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        UPDATE assets
        SET product_name = $2, product_quantity = $3, product_type = $4, availability = $5,
            date_added = $6, item_added_by = $7, requester_email = $8, requester_name = $9,
            request_date = $10, notes = $11, status = $12, approved_date = $13
        WHERE id = $1
        "#,
    )
    .bind(asset.id.as_uuid())
    .bind(&asset.product_name)
    .bind(asset.product_quantity)
    .bind(asset.product_type.map(|t| t.as_str()))
    .bind(asset.availability.map(|a| a.as_str()))
    .bind(asset.date_added)
    .bind(&asset.item_added_by)
    .bind(&asset.requester_email)
    .bind(&asset.requester_name)
    .bind(asset.request_date)
    .bind(&asset.notes)
    .bind(asset.status.map(|s| s.as_str()))
    .bind(asset.approved_date)
    .execute(executor)
    .await
    .map_err(|e| map_sqlx_error("update_asset", e))?;
    Ok(())
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23514") => RepoError::Domain(DomainError::validation(msg)),
                _ => RepoError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => RepoError::Storage(format!("connection pool closed in {}", operation)),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
            RepoError::Corrupt(format!("row decode failed in {}: {}", operation, err))
        }
        _ => RepoError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn parse_column<T>(column: &str, value: Option<String>, parse: impl Fn(&str) -> Option<T>) -> Result<Option<T>, RepoError> {
    value
        .map(|raw| parse(&raw).ok_or_else(|| RepoError::Corrupt(format!("unexpected {column} value '{raw}'"))))
        .transpose()
}

fn asset_from_row(row: &PgRow) -> Result<Asset, RepoError> {
    let raw = AssetRow::from_row(row).map_err(|e| map_sqlx_error("decode_asset", e))?;
    raw.try_into()
}

fn user_from_row(row: &PgRow) -> Result<User, RepoError> {
    let raw = UserRow::from_row(row).map_err(|e| map_sqlx_error("decode_user", e))?;
    raw.try_into()
}

// SQLx row types

#[derive(Debug)]
struct AssetRow {
    id: uuid::Uuid,
    product_name: String,
    product_quantity: i64,
    product_type: Option<String>,
    availability: Option<String>,
    date_added: Option<DateTime<Utc>>,
    item_added_by: Option<String>,
    requester_email: Option<String>,
    requester_name: Option<String>,
    request_date: Option<DateTime<Utc>>,
    notes: Option<String>,
    status: Option<String>,
    approved_date: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for AssetRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AssetRow {
            id: row.try_get("id")?,
            product_name: row.try_get("product_name")?,
            product_quantity: row.try_get("product_quantity")?,
            product_type: row.try_get("product_type")?,
            availability: row.try_get("availability")?,
            date_added: row.try_get("date_added")?,
            item_added_by: row.try_get("item_added_by")?,
            requester_email: row.try_get("requester_email")?,
            requester_name: row.try_get("requester_name")?,
            request_date: row.try_get("request_date")?,
            notes: row.try_get("notes")?,
            status: row.try_get("status")?,
            approved_date: row.try_get("approved_date")?,
        })
    }
}

impl TryFrom<AssetRow> for Asset {
    type Error = RepoError;

    fn try_from(row: AssetRow) -> Result<Self, Self::Error> {
        Ok(Asset {
            id: AssetId::from_uuid(row.id),
            product_name: row.product_name,
            product_quantity: row.product_quantity,
            product_type: parse_column("product_type", row.product_type, ProductType::parse)?,
            availability: parse_column("availability", row.availability, Availability::parse)?,
            date_added: row.date_added,
            item_added_by: row.item_added_by,
            requester_email: row.requester_email,
            requester_name: row.requester_name,
            request_date: row.request_date,
            notes: row.notes,
            status: parse_column("status", row.status, AssetStatus::parse)?,
            approved_date: row.approved_date,
        })
    }
}

#[derive(Debug)]
struct UserRow {
    id: uuid::Uuid,
    email: String,
    name: Option<String>,
    photo: Option<String>,
    role: Option<String>,
    company_name: Option<String>,
    company_logo: Option<String>,
    affiliate: Option<bool>,
    added_by: Option<String>,
    category: Option<i64>,
    payment: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            photo: row.try_get("photo")?,
            role: row.try_get("role")?,
            company_name: row.try_get("company_name")?,
            company_logo: row.try_get("company_logo")?,
            affiliate: row.try_get("affiliate")?,
            added_by: row.try_get("added_by")?,
            category: row.try_get("category")?,
            payment: row.try_get("payment")?,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = RepoError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId::from_uuid(row.id),
            email: row.email,
            name: row.name,
            photo: row.photo,
            role: parse_column("role", row.role, |s| s.parse::<Role>().ok())?,
            company_name: row.company_name,
            company_logo: row.company_logo,
            affiliate: row.affiliate,
            added_by: row.added_by,
            category: row.category,
            payment: parse_column("payment", row.payment, PaymentStatus::parse)?,
        })
    }
}

#[derive(Debug)]
struct PaymentRow {
    id: uuid::Uuid,
    email: String,
    category_price: f64,
    category: Option<i64>,
    transaction_id: Option<String>,
    date: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for PaymentRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(PaymentRow {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            category_price: row.try_get("category_price")?,
            category: row.try_get("category")?,
            transaction_id: row.try_get("transaction_id")?,
            date: row.try_get("date")?,
        })
    }
}

impl From<PaymentRow> for PaymentRecord {
    fn from(row: PaymentRow) -> Self {
        PaymentRecord {
            id: PaymentId::from_uuid(row.id),
            email: row.email,
            category_price: row.category_price,
            category: row.category,
            transaction_id: row.transaction_id,
            date: row.date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Pagination;

    #[test]
    fn return_is_a_single_statement_incrementing_quantity() {
        let sql = transition_sql(&Transition::MarkReturned, &AssetScope::Participant("a@x.com".into()));
        assert_eq!(
            sql,
            "UPDATE assets SET status = 'returned', product_quantity = product_quantity + 1 \
             WHERE id = $1 AND (item_added_by = $2 OR requester_email = $2)"
        );
    }

    #[test]
    fn approve_binds_date_and_is_owner_scoped() {
        let sql = transition_sql(
            &Transition::Approve { approved_date: Utc::now() },
            &AssetScope::Owner("hr@acme.io".into()),
        );
        assert!(sql.contains("approved_date = $3"));
        assert!(sql.ends_with("WHERE id = $1 AND item_added_by = $2"));
    }

    #[test]
    fn upsert_insert_skips_existing_ids() {
        assert!(!insert_asset_sql(false).contains("ON CONFLICT"));
        assert!(insert_asset_sql(true).ends_with("ON CONFLICT (id) DO NOTHING"));
    }

    #[test]
    fn search_builder_adds_only_requested_filters() {
        let mut query = AssetQuery::for_owner("hr@acme.io");
        let plain = search_builder("SELECT COUNT(*) FROM assets", &query);
        assert_eq!(plain.sql(), "SELECT COUNT(*) FROM assets WHERE item_added_by = $1");

        query.search = Some("lap".into());
        query.product_type = Some(ProductType::Returnable);
        query.sort = Some(SortOrder::Desc);
        query.pagination = Pagination::new(Some(2), Some(5));
        let mut full = search_builder("SELECT * FROM assets", &query);
        push_order_and_page(&mut full, &query);
        assert_eq!(
            full.sql(),
            "SELECT * FROM assets WHERE item_added_by = $1 AND product_name ILIKE $2 \
             AND product_type = $3 ORDER BY product_quantity DESC, id DESC LIMIT $4 OFFSET $5"
        );
    }

    #[test]
    fn unknown_enum_values_are_corrupt_rows() {
        let err = parse_column("status", Some("lost".into()), AssetStatus::parse).unwrap_err();
        assert!(matches!(err, RepoError::Corrupt(_)));
        assert_eq!(parse_column("status", None, AssetStatus::parse).unwrap(), None);
    }
}
