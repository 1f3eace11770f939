//! Store selection and the shared handle passed to every handler.

use std::sync::Arc;

use anyhow::Context;

use bloodbank_infra::config::AppConfig;
use bloodbank_infra::store::{
    ContactInbox, DonationRecorder, InMemoryStore, InventoryLedger, PostgresStore, RequestDirectory, StoreError,
    UserDirectory, seed_inventory,
};

use crate::app::errors;

pub struct AppServices {
    pub ledger: Arc<dyn InventoryLedger>,
    pub donations: Arc<dyn DonationRecorder>,
    pub users: Arc<dyn UserDirectory>,
    pub requests: Arc<dyn RequestDirectory>,
    pub contact: Arc<dyn ContactInbox>,
    pub config: AppConfig,
}

impl AppServices {
    /// Wire every component to the same backing store.
    fn over<S>(store: Arc<S>, config: AppConfig) -> Self
    where
        S: InventoryLedger + DonationRecorder + UserDirectory + RequestDirectory + ContactInbox + 'static,
    {
        Self {
            ledger: store.clone(),
            donations: store.clone(),
            users: store.clone(),
            requests: store.clone(),
            contact: store,
            config,
        }
    }

    pub fn store_error(&self, err: StoreError) -> axum::response::Response {
        errors::store_error_to_response(err, self.config.environment)
    }

    pub fn auth_error(&self, err: bloodbank_auth::AuthError) -> axum::response::Response {
        errors::auth_error_to_response(err, self.config.environment)
    }
}

pub async fn build_services(config: AppConfig) -> anyhow::Result<AppServices> {
    let services = match &config.database {
        Some(db) => {
            let store = PostgresStore::connect(db)
                .await
                .context("failed to connect to the database")?;
            store.apply_schema().await.context("failed to apply the database schema")?;
            tracing::info!(max_connections = db.max_connections, "using postgres store");
            AppServices::over(Arc::new(store), config)
        }
        None => {
            tracing::info!("using in-memory store");
            AppServices::over(Arc::new(InMemoryStore::new()), config)
        }
    };

    if services.config.seed_inventory {
        let created = seed_inventory(services.ledger.as_ref())
            .await
            .context("failed to seed the blood inventory")?;
        tracing::info!(created, "blood inventory seeded");
    }
    Ok(services)
}
