use crate::api::AppState;
use crate::health::HealthStatus;
use axum::{extract::State, http::StatusCode, Json};
use tracing::{debug, error};

/// GET /health
pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, (StatusCode, Json<HealthStatus>)> {
    let health_status = state.health.check_health().await;

    if health_status.is_healthy() {
        debug!(status = ?health_status.status, "health check passed");
        Ok(Json(health_status))
    } else {
        error!("health check failed - service unhealthy");
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(health_status)))
    }
}

/// GET /health/live
pub async fn liveness() -> &'static str {
    "OK"
}
