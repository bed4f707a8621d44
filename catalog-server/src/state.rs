//! Application state shared across handlers

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::db::{AcquiredConnection, ConnectionTier, Driver};
use crate::service::ProductService;

/// Where the process connection came from, reported by `/health`
#[derive(Debug, Clone, Serialize)]
pub struct ServingTarget {
    pub target: String,
    pub driver: Driver,
    pub tier: ConnectionTier,
}

impl ServingTarget {
    pub fn is_durable(&self) -> bool {
        self.tier.is_durable()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub products: ProductService,
    pub serving: ServingTarget,
}

impl AppState {
    /// Take ownership of an acquired connection and share it across requests.
    pub fn from_acquired(acquired: AcquiredConnection) -> Self {
        let serving = ServingTarget {
            target: acquired.target,
            driver: acquired.driver,
            tier: acquired.tier,
        };
        let conn = Arc::new(Mutex::new(acquired.connection));

        Self {
            products: ProductService::new(conn, serving.driver),
            serving,
        }
    }
}
