//! HTTP surface: the Viva callback URL plus the store-side payment endpoints.

pub mod callback;
pub mod health;
pub mod payments;

use crate::health::HealthChecker;
use crate::middleware::logging::{request_logging_middleware, UuidRequestId};
use crate::services::{CallbackDispatcher, GatewayStatus, PaymentInitiator, RefundInitiator};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<CallbackDispatcher>,
    pub initiator: Arc<PaymentInitiator>,
    pub refunds: Arc<RefundInitiator>,
    pub gateway: Arc<GatewayStatus>,
    pub health: HealthChecker,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route(
            "/callbacks/viva",
            get(callback::viva_callback).post(callback::viva_callback),
        )
        .route("/api/orders/{id}/payment", post(payments::initiate_payment))
        .route("/api/orders/{id}/payment/notice", get(payments::payment_notice))
        .route("/api/orders/{id}/refunds", post(payments::refund_order))
        .route("/api/gateway/credentials", post(payments::validate_credentials))
        .route("/api/gateway/status", get(payments::gateway_status))
        .route(
            "/api/gateway/notices/{name}/dismiss",
            post(payments::dismiss_notice),
        )
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(axum::middleware::from_fn(request_logging_middleware))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}
