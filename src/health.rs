//! Health check module
//! Provides health status for the application and its dependencies

use serde::Serialize;
use std::collections::HashMap;
#[cfg(feature = "database")]
use std::time::{Duration, Instant};
#[cfg(feature = "database")]
use tokio::time::timeout;
#[cfg(feature = "database")]
use tracing::{error, info};

/// Health status response
#[derive(Debug, Serialize, Clone)]
pub struct HealthStatus {
    pub status: HealthState,
    pub checks: HashMap<String, ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health status
#[derive(Debug, Serialize, Clone)]
pub struct ComponentHealth {
    pub status: ComponentState,
    pub response_time_ms: Option<u128>,
    pub details: Option<String>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    Up,
    Down,
    Warning,
}

impl HealthStatus {
    pub fn new() -> Self {
        Self {
            status: HealthState::Healthy,
            checks: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        !matches!(self.status, HealthState::Unhealthy)
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentHealth {
    pub fn up(response_time_ms: Option<u128>) -> Self {
        Self {
            status: ComponentState::Up,
            response_time_ms,
            details: None,
        }
    }

    pub fn down(details: Option<String>) -> Self {
        Self {
            status: ComponentState::Down,
            response_time_ms: None,
            details,
        }
    }

    pub fn warning(details: Option<String>) -> Self {
        Self {
            status: ComponentState::Warning,
            response_time_ms: None,
            details,
        }
    }
}

/// Health checker for the application
#[derive(Clone)]
pub struct HealthChecker {
    #[cfg(feature = "database")]
    db_pool: Option<sqlx::PgPool>,
    gateway_configured: bool,
}

impl HealthChecker {
    pub fn new(gateway_configured: bool) -> Self {
        Self {
            #[cfg(feature = "database")]
            db_pool: None,
            gateway_configured,
        }
    }

    #[cfg(feature = "database")]
    pub fn with_database(mut self, pool: sqlx::PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    pub async fn check_health(&self) -> HealthStatus {
        let mut health_status = HealthStatus::new();

        self.check_database(&mut health_status).await;

        // Missing credentials degrade the service; callbacks still get acknowledged.
        let gateway = if self.gateway_configured {
            ComponentHealth::up(None)
        } else {
            if health_status.status == HealthState::Healthy {
                health_status.status = HealthState::Degraded;
            }
            ComponentHealth::warning(Some("Viva credentials not configured".to_string()))
        };
        health_status.checks.insert("viva".to_string(), gateway);

        health_status
    }

    #[cfg(feature = "database")]
    async fn check_database(&self, health_status: &mut HealthStatus) {
        if let Some(pool) = &self.db_pool {
            match timeout(Duration::from_secs(5), check_database_health(pool)).await {
                Ok(Ok(response_time)) => {
                    health_status.checks.insert(
                        "database".to_string(),
                        ComponentHealth::up(Some(response_time)),
                    );
                    info!("Database health check: OK ({}ms)", response_time);
                }
                Ok(Err(e)) => {
                    health_status.status = HealthState::Unhealthy;
                    health_status.checks.insert(
                        "database".to_string(),
                        ComponentHealth::down(Some(e.to_string())),
                    );
                    error!("Database health check failed: {}", e);
                }
                Err(_) => {
                    health_status.status = HealthState::Unhealthy;
                    health_status.checks.insert(
                        "database".to_string(),
                        ComponentHealth::down(Some("Timeout".to_string())),
                    );
                    error!("Database health check timed out");
                }
            }
        }
    }

    #[cfg(not(feature = "database"))]
    async fn check_database(&self, _health_status: &mut HealthStatus) {}
}

#[cfg(feature = "database")]
pub async fn check_database_health(
    pool: &sqlx::PgPool,
) -> Result<u128, crate::database::error::DatabaseError> {
    let start = Instant::now();
    crate::database::health_check(pool).await?;
    Ok(start.elapsed().as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn configured_gateway_without_database_is_healthy() {
        let status = HealthChecker::new(true).check_health().await;
        assert_eq!(status.status, HealthState::Healthy);
        assert_eq!(status.checks["viva"].status, ComponentState::Up);
    }

    #[tokio::test]
    async fn missing_credentials_degrade() {
        let status = HealthChecker::new(false).check_health().await;
        assert_eq!(status.status, HealthState::Degraded);
        assert!(status.is_healthy());
    }
}
