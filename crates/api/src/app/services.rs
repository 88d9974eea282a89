//! Service wiring shared by every handler.
//!
//! One store, one event hub, and the services built on top of them. Handlers
//! receive this through an `Extension<Arc<AppServices>>`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use salesboard_events::{EventBus, EventHub};
use salesboard_infra::{
    AppConfig, CatalogService, InMemoryStore, InventoryService, Ledger, OrderDeletePolicy,
    OrderFulfillmentEngine, PostgresStore, Store, TransferService,
};

pub struct AppServices {
    pub hub: Arc<EventHub>,
    pub catalog: CatalogService,
    pub ledger: Ledger,
    pub orders: OrderFulfillmentEngine,
    pub transfers: TransferService,
    pub inventory: InventoryService,
    pub sse_heartbeat: Duration,
}

impl AppServices {
    /// Wire every service on top of `store`.
    pub fn new(
        store: Arc<dyn Store>,
        delete_policy: OrderDeletePolicy,
        sse_heartbeat: Duration,
    ) -> Self {
        let hub = Arc::new(EventHub::new());
        let bus: Arc<dyn EventBus> = hub.clone();

        Self {
            catalog: CatalogService::new(store.clone()),
            ledger: Ledger::new(store.clone()),
            orders: OrderFulfillmentEngine::new(store.clone(), bus.clone())
                .with_delete_policy(delete_policy),
            transfers: TransferService::new(store.clone(), bus.clone()),
            inventory: InventoryService::new(store, bus),
            hub,
            sse_heartbeat,
        }
    }

    /// In-memory wiring (dev/test).
    pub fn in_memory(delete_policy: OrderDeletePolicy, sse_heartbeat: Duration) -> Self {
        Self::new(Arc::new(InMemoryStore::new()), delete_policy, sse_heartbeat)
    }
}

/// Postgres when `DATABASE_URL` is set, otherwise the in-memory store.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url, config.db_max_connections)
                .await
                .context("failed to connect to DATABASE_URL")?;
            store.migrate().await.context("failed to apply migrations")?;
            tracing::info!(max_connections = config.db_max_connections, "using postgres store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    Ok(AppServices::new(
        store,
        config.order_delete_policy,
        config.sse_heartbeat,
    ))
}
