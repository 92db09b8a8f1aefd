//! Order API Module
//!
//! | 路径 | 方法 | 说明 | 角色 |
//! |------|------|------|------|
//! | /api/orders | POST | 下单 (返回订单与支付信息) | customer |
//! | /api/orders | GET | 订单列表 (admin 可按状态筛选全部订单) | any |
//! | /api/orders/{id} | GET | 订单详情 | owner / admin |
//! | /api/orders/{id}/status | PATCH | 状态流转 | admin |
//! | /api/orders/{id}/cancel 等 | POST | 客户操作 | owner |
//! | /api/orders/{id}/delivery | POST | 配送结果 | courier / admin |
//! | /api/orders/{id}/pay | POST | 重新发起在线支付 | owner |

mod handler;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create).get(handler::list))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", patch(handler::update_status))
        // Customer actions
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/confirm-delivery", post(handler::confirm_delivery))
        .route("/{id}/confirm-satisfaction", post(handler::confirm_satisfaction))
        .route("/{id}/request-refund", post(handler::request_refund))
        .route("/{id}/request-return", post(handler::request_return))
        .route("/{id}/report-delivery-failure", post(handler::report_delivery_failure))
        // Courier
        .route("/{id}/delivery", post(handler::record_delivery))
        // Payment retry
        .route("/{id}/pay", post(handler::pay))
}
