//! Health check endpoint
//!
//! Pings the shared connection and reports which target is serving.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::db::{ConnectionTier, Driver};
use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: DatabaseHealth,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub status: &'static str,
    pub target: String,
    pub driver: Driver,
    pub tier: ConnectionTier,
    pub durable: bool,
}

/// GET /health - 503 when the store doesn't answer
async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let reachable = match state.products.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "health check ping failed");
            false
        }
    };

    let serving = &state.serving;
    let (code, status, db_status) = if reachable {
        (StatusCode::OK, "ok", "up")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "down")
    };

    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        database: DatabaseHealth {
            status: db_status,
            target: serving.target.clone(),
            driver: serving.driver,
            tier: serving.tier,
            durable: serving.is_durable(),
        },
    };

    (code, Json(body))
}

/// Health routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ConnectionSupplier;

    #[tokio::test]
    async fn health_reports_local_fallback() {
        let acquired = ConnectionSupplier::local_only().acquire().await.unwrap();
        let state = Arc::new(AppState::from_acquired(acquired));

        let (code, Json(body)) = health(State(state)).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.database.status, "up");
        assert_eq!(body.database.tier, ConnectionTier::LocalFallback);
        assert!(!body.database.durable);
    }
}
