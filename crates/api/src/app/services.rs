//! Service wiring: stores, lifecycle manager, payment gateway and token issuer.

use std::sync::Arc;

use tracing::info;

use assetdesk_auth::Hs256Jwt;
use assetdesk_infra::repository::{
    InMemoryAssetRepository, InMemoryPaymentRepository, InMemoryUserRepository, PostgresStores,
};
use assetdesk_infra::{
    AppConfig, AssetLifecycle, AssetRepository, DevPaymentGateway, PaymentGateway, PaymentRepository, RepoError,
    StripeGateway, UserRepository,
};

/// Everything a handler can reach, shared behind one `Arc`.
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<dyn UserRepository>,
    pub assets: Arc<dyn AssetRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub lifecycle: AssetLifecycle,
    pub gateway: Arc<dyn PaymentGateway>,
    pub tokens: Arc<Hs256Jwt>,
}

impl AppServices {
    pub fn new(
        users: Arc<dyn UserRepository>,
        assets: Arc<dyn AssetRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        tokens: Arc<Hs256Jwt>,
    ) -> Self {
        Self {
            lifecycle: AssetLifecycle::new(assets.clone()),
            users,
            assets,
            payments,
            gateway,
            tokens,
        }
    }

    /// In-memory stores and the dev payment gateway.
    pub fn in_memory(tokens: Arc<Hs256Jwt>) -> Self {
        Self::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryAssetRepository::new()),
            Arc::new(InMemoryPaymentRepository::new()),
            Arc::new(DevPaymentGateway::new()),
            tokens,
        )
    }

    /// Postgres when `DATABASE_URL` is set, Stripe when a payment key is set.
    pub async fn from_config(config: &AppConfig, tokens: Arc<Hs256Jwt>) -> Result<Self, RepoError> {
        let gateway: Arc<dyn PaymentGateway> = match &config.payment_secret_key {
            Some(key) => Arc::new(StripeGateway::new(config.payment_api_base.clone(), key.clone())),
            None => {
                info!("PAYMENT_SECRET_KEY not set; using dev payment gateway");
                Arc::new(DevPaymentGateway::new())
            }
        };

        let Some(url) = &config.database_url else {
            info!("DATABASE_URL not set; using in-memory stores");
            let mut services = Self::in_memory(tokens);
            services.gateway = gateway;
            return Ok(services);
        };

        let stores = PostgresStores::connect(url).await?;
        stores.migrate().await?;
        info!("connected to postgres");

        Ok(Self::new(
            Arc::new(stores.users()),
            Arc::new(stores.assets()),
            Arc::new(stores.payments()),
            gateway,
            tokens,
        ))
    }
}
