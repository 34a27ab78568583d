//! Store-side payment endpoints: start a checkout, refund an order and manage
//! the gateway configuration state.

use crate::api::AppState;
use crate::error::{AppError, AppErrorKind, AppResult, DomainError};
use crate::middleware::error::get_request_id_from_headers;
use crate::services::gateway_status::GatewayStatusReport;
use crate::services::return_handler::failed_payment_notice;
use crate::services::ConfigurationStatus;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct InitiatePaymentRequest {
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InitiatePaymentResponse {
    pub result: &'static str,
    pub redirect: String,
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub refunded: bool,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub merchant_id: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct CredentialsResponse {
    pub status: ConfigurationStatus,
    pub code: u8,
}

#[derive(Debug, Deserialize)]
pub struct GatewayStatusQuery {
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentNoticeResponse {
    pub notice: Option<&'static str>,
}

fn tag(err: impl Into<AppError>, headers: &HeaderMap) -> AppError {
    let err = err.into();
    match get_request_id_from_headers(headers) {
        Some(request_id) => err.with_request_id(request_id),
        None => err,
    }
}

/// POST /api/orders/{id}/payment
pub async fn initiate_payment(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<InitiatePaymentRequest>,
) -> AppResult<Json<InitiatePaymentResponse>> {
    if !state.gateway.is_enabled() {
        return Err(tag(
            AppError::new(AppErrorKind::Domain(DomainError::GatewayDisabled)),
            &headers,
        ));
    }

    let locale = request.locale.as_deref().unwrap_or("en_US");
    let redirect = state
        .initiator
        .initiate(&order_id, locale)
        .await
        .map_err(|e| tag(e, &headers))?;

    info!(order_id = %order_id, order_code = %redirect.order_code, "checkout redirect issued");
    Ok(Json(InitiatePaymentResponse {
        result: "success",
        redirect: redirect.redirect,
    }))
}

/// GET /api/orders/{id}/payment/notice
pub async fn payment_notice(
    Path(_order_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<PaymentNoticeResponse> {
    Json(PaymentNoticeResponse {
        notice: failed_payment_notice(&query),
    })
}

/// POST /api/orders/{id}/refunds
pub async fn refund_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<RefundRequest>,
) -> AppResult<Json<RefundResponse>> {
    let refunded = state
        .refunds
        .refund(&order_id, request.amount, request.reason.as_deref())
        .await
        .map_err(|e| tag(e, &headers))?;

    Ok(Json(RefundResponse { refunded }))
}

/// POST /api/gateway/credentials
pub async fn validate_credentials(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CredentialsRequest>,
) -> AppResult<Json<CredentialsResponse>> {
    let status = state
        .gateway
        .validate_credentials(&request.merchant_id, &request.api_key)
        .await
        .map_err(|e| tag(e, &headers))?;

    Ok(Json(CredentialsResponse {
        status,
        code: status.code(),
    }))
}

/// GET /api/gateway/status?currency=EUR
pub async fn gateway_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<GatewayStatusQuery>,
) -> AppResult<Json<GatewayStatusReport>> {
    let currency = query.currency.as_deref().unwrap_or("EUR");
    let report = state
        .gateway
        .report(currency)
        .await
        .map_err(|e| tag(e, &headers))?;
    Ok(Json(report))
}

/// POST /api/gateway/notices/{name}/dismiss
pub async fn dismiss_notice(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    state
        .gateway
        .dismiss_notice(&name)
        .await
        .map_err(|e| tag(e, &headers))?;
    Ok(StatusCode::NO_CONTENT)
}
