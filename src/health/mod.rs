/*!
 * # Health Check Module
 *
 * - Basic health check (`/health`) - process is up, no I/O
 * - Readiness check (`/health/ready`) - database answers a ping
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use crate::AppState;

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Readiness report
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReadinessReport {
    pub status: HealthStatus,
    pub database: HealthStatus,
    pub backend: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

/// Simple health check response that doesn't require state
pub async fn simple_health_check() -> impl IntoResponse {
    debug!("Health check endpoint called");

    (
        StatusCode::OK,
        Json(json!({
            "status": "up",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match crate::db::check_connection(&state.db).await {
        Ok(()) => HealthStatus::Up,
        Err(e) => {
            error!("Database readiness check failed: {}", e);
            HealthStatus::Down
        }
    };

    let status_code = match database {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };

    let report = ReadinessReport {
        status: database.clone(),
        database,
        backend: format!("{:?}", state.db.get_database_backend()),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    };

    (status_code, Json(report))
}

/// Creates router with health check endpoints
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(simple_health_check))
        .route("/ready", get(readiness_check))
}
