use crate::api::AppState;
use crate::services::CallbackResponse;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use std::collections::HashMap;
use tracing::info;

/// GET|POST /callbacks/viva
///
/// Buyer returns get a redirect; webhooks always get a 200 unless the
/// verification probe could not fetch a token.
pub async fn viva_callback(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    match state.dispatcher.dispatch(&query, &body).await {
        CallbackResponse::Redirect(location) => {
            info!(location = %location, "redirecting returning buyer");
            Redirect::to(&location).into_response()
        }
        CallbackResponse::Body(raw) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            raw,
        )
            .into_response(),
        CallbackResponse::Acknowledge => StatusCode::OK.into_response(),
        CallbackResponse::Unavailable => StatusCode::BAD_GATEWAY.into_response(),
    }
}
