//! 优惠券管理 (admin)

use axum::{Json, Router, extract::State, routing::get};
use shared::order::Voucher;
use shared::{ApiResponse, AppResult};

use crate::auth::CurrentUser;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/vouchers", get(list).put(upsert))
}

pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<Voucher>>>> {
    user.ensure_admin()?;
    Ok(Json(ApiResponse::success(state.orders.list_vouchers()?)))
}

pub async fn upsert(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(voucher): Json<Voucher>,
) -> AppResult<Json<ApiResponse<Voucher>>> {
    user.ensure_admin()?;
    Ok(Json(ApiResponse::success(state.orders.upsert_voucher(voucher)?)))
}
