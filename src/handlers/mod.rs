pub mod transactions;
pub mod transfers;
pub mod webhook;

use crate::error::AppError;
use crate::AppState;
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

pub const BUSINESS_HEADER: &str = "X-Business-Id";

/// Business the caller acts for, set by the authenticating proxy in front
/// of this service.
#[derive(Debug, Clone, Copy)]
pub struct BusinessId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for BusinessId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(BUSINESS_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing X-Business-Id header".to_string()))?;

        Uuid::parse_str(raw.trim())
            .map(BusinessId)
            .map_err(|_| AppError::Validation("X-Business-Id: must be a UUID".to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DbPoolStats {
    pub active_connections: u32,
    pub idle_connections: u32,
    pub max_connections: u32,
    pub usage_percent: f32,
}

impl DbPoolStats {
    fn from_pool(pool: &PgPool) -> Self {
        let max_connections = pool.options().get_max_connections();
        let active_connections = pool.size();
        let usage_percent = match max_connections {
            0 => 0.0,
            max => active_connections as f32 * 100.0 / max as f32,
        };
        Self {
            active_connections,
            idle_connections: pool.num_idle() as u32,
            max_connections,
            usage_percent,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub db: String,
    pub bank_backend: String,
    pub db_pool: DbPoolStats,
}

/// Liveness plus database reachability. Answers 503 while the database is
/// unreachable so a load balancer drains the instance.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let db_up = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .map_err(|e| tracing::warn!(error = %e, "health check could not reach the database"))
        .is_ok();

    let (code, status, db) = if db_up {
        (StatusCode::OK, "healthy", "connected")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "disconnected")
    };

    let body = HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        db: db.to_string(),
        bank_backend: state.transfers.backend_name().to_string(),
        db_pool: DbPoolStats::from_pool(&state.db),
    };

    (code, Json(body))
}
