use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::time::Instant;

use crate::api::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub dependencies: DependencyStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub database: ServiceHealth,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    pub response_time_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health check endpoint
/// Returns 200 if all dependencies are healthy, 503 if any are down
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let start = Instant::now();

    let db_health = check_database(&state.pool).await;
    let all_healthy = db_health.status == "healthy";

    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy {
            "healthy".to_string()
        } else {
            "unhealthy".to_string()
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        dependencies: DependencyStatus {
            database: db_health,
        },
    };

    tracing::info!(
        status = %response.status,
        duration_ms = start.elapsed().as_millis(),
        "Health check completed"
    );

    (status_code, Json(response))
}

/// Check database connectivity
async fn check_database(pool: &PgPool) -> ServiceHealth {
    let start = Instant::now();

    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => ServiceHealth {
            status: "healthy".to_string(),
            response_time_ms: start.elapsed().as_millis(),
            error: None,
        },
        Err(e) => ServiceHealth {
            status: "unhealthy".to_string(),
            response_time_ms: start.elapsed().as_millis(),
            error: Some(format!("Database error: {}", e)),
        },
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
