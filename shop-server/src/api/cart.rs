//! 购物车 API - 库存占用
//!
//! Setting a line is absolute (not additive) and refreshes its expiry;
//! quantity 0 releases the hold.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, put},
};
use serde::Deserialize;
use shared::inventory::{CartItemRequest, CartLine, Reservation, StockKey};
use shared::{ApiResponse, AppResult};

use crate::auth::CurrentUser;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest(
        "/api/cart",
        Router::new()
            .route("/", get(list))
            .route("/items", put(set_item))
            .route("/items/{product_id}", delete(remove_item)),
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantQuery {
    #[serde(default)]
    pub variant_id: Option<String>,
}

pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<CartLine>>>> {
    let lines = state.inventory.list_reservations(&user.id)?;
    Ok(Json(ApiResponse::success(lines)))
}

/// `None` in the response means the hold was released
pub async fn set_item(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(request): Json<CartItemRequest>,
) -> AppResult<Json<ApiResponse<Option<Reservation>>>> {
    let reservation = state.inventory.create_reservation(&user.id, &request)?;
    Ok(Json(ApiResponse::success(reservation)))
}

pub async fn remove_item(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(product_id): Path<String>,
    Query(query): Query<VariantQuery>,
) -> AppResult<Json<ApiResponse<bool>>> {
    let key = StockKey {
        product_id,
        variant_id: query.variant_id,
    };
    let released = state.inventory.release_reservation(&user.id, &key)?;
    Ok(Json(ApiResponse::success(released)))
}
