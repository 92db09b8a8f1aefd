//! 省市目录 (公共, 带缓存)

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use shared::{ApiResponse, AppResult};

use crate::address::{District, Province};
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/address/provinces", get(provinces))
        .route("/api/address/provinces/{code}/districts", get(districts))
}

pub async fn provinces(State(state): State<ServerState>) -> AppResult<Json<ApiResponse<Vec<Province>>>> {
    let provinces = state.address.provinces().await?;
    Ok(Json(ApiResponse::success(provinces.as_ref().clone())))
}

pub async fn districts(
    State(state): State<ServerState>,
    Path(code): Path<u32>,
) -> AppResult<Json<ApiResponse<Vec<District>>>> {
    let districts = state.address.districts(code).await?;
    Ok(Json(ApiResponse::success(districts.as_ref().clone())))
}
