//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`orders`] - 订单创建、查询、状态流转、支付重试、配送结果
//! - [`cart`] - 购物车 (库存占用)
//! - [`inventory`] - 商品投影、库存调整、可用库存
//! - [`payments`] - 支付回调 (每个渠道一个端点)
//! - [`vouchers`] - 优惠券管理
//! - [`address`] - 省市目录

pub mod address;
pub mod cart;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod payments;
pub mod vouchers;


use axum::Router;
use axum::body::Bytes;
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;
use shared::AppError;

/// Build the Axum router (without state)
pub fn routes() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(health::router())
        .merge(orders::router())
        .merge(cart::router())
        .merge(inventory::router())
        .merge(payments::router())
        .merge(vouchers::router())
        .merge(address::router())
}

/// Full application: routes, state and tower middleware
pub fn build_app(state: ServerState) -> Router {
    let timeout = timeout_layer(state.config.request_timeout_ms);
    routes()
        .with_state(state)
        .layer(timeout)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Requests running longer than `timeout_ms` are answered with 408
pub(crate) fn timeout_layer(timeout_ms: u64) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_millis(timeout_ms))
}

/// Parse an optional JSON body; an empty body yields `T::default()`
pub(crate) fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::validation(format!("Invalid JSON body: {e}")))
}
