//! Payment provider callbacks
//!
//! `/api/payments/{provider}/callback` accepts POST (card, MoMo, ZaloPay)
//! and GET (VNPay IPN). The raw headers, query and body are handed to the
//! reconciler untouched so signatures are checked over the exact bytes.
//! The response is whatever acknowledgement format the provider expects.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use shared::payment::PaymentMethod;
use shared::{AppError, ErrorCode};

use crate::core::ServerState;
use crate::payments::RawCallback;

pub fn router() -> Router<ServerState> {
    Router::new().route(
        "/api/payments/{provider}/callback",
        get(callback).post(callback),
    )
}

pub async fn callback(
    State(state): State<ServerState>,
    Path(provider): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let method = PaymentMethod::from_slug(&provider).ok_or_else(|| {
        AppError::with_message(ErrorCode::PaymentInvalidMethod, format!("Unknown payment provider: {provider}"))
    })?;

    let raw = RawCallback {
        headers,
        query: query.unwrap_or_default(),
        body,
    };
    let (status, ack): (StatusCode, serde_json::Value) = state.reconciler.handle_callback(method, &raw)?;
    Ok((status, Json(ack)).into_response())
}
