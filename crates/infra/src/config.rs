//! Process configuration, read from the environment at startup.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::fulfillment::OrderDeletePolicy;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_SSE_HEARTBEAT_SECS: u64 = 25;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub sse_heartbeat: Duration,
    pub order_delete_policy: OrderDeletePolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address like 0.0.0.0:8080")?;

        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };
        if db_max_connections == 0 {
            bail!("DB_MAX_CONNECTIONS must be at least 1");
        }

        let heartbeat_secs = match get("SSE_HEARTBEAT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .context("SSE_HEARTBEAT_SECS must be a whole number of seconds")?,
            None => DEFAULT_SSE_HEARTBEAT_SECS,
        };
        if heartbeat_secs == 0 {
            bail!("SSE_HEARTBEAT_SECS must be at least 1");
        }

        let order_delete_policy = match get("ORDER_DELETE_POLICY") {
            Some(raw) => raw
                .parse::<OrderDeletePolicy>()
                .map_err(|e| anyhow::anyhow!("ORDER_DELETE_POLICY: {e}"))?,
            None => OrderDeletePolicy::default(),
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            db_max_connections,
            sse_heartbeat: Duration::from_secs(heartbeat_secs),
            order_delete_policy,
        })
    }
}
