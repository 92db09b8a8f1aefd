use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::inventory::{AdjustStockRequest, Product, SetStockRequest, StockLevel};
use shared::{ApiResponse, AppResult};

use crate::api::cart::VariantQuery;
use crate::auth::CurrentUser;
use crate::core::ServerState;

pub async fn list_products(State(state): State<ServerState>) -> AppResult<Json<ApiResponse<Vec<Product>>>> {
    let products = state.inventory.list_products()?;
    Ok(Json(ApiResponse::success(products)))
}

pub async fn get_product(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = state.inventory.get_product(&id)?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn upsert_product(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(product): Json<Product>,
) -> AppResult<Json<ApiResponse<Product>>> {
    user.ensure_admin()?;
    let product = state.inventory.upsert_product(product)?;
    Ok(Json(ApiResponse::success(product)))
}

pub async fn set_stock(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(product_id): Path<String>,
    Json(request): Json<SetStockRequest>,
) -> AppResult<Json<ApiResponse<StockLevel>>> {
    user.ensure_admin()?;
    let level = state
        .inventory
        .set_on_hand(&product_id, request.variant_id.as_deref(), request.on_hand)?;
    Ok(Json(ApiResponse::success(level)))
}

pub async fn adjust_stock(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(product_id): Path<String>,
    Json(request): Json<AdjustStockRequest>,
) -> AppResult<Json<ApiResponse<StockLevel>>> {
    user.ensure_admin()?;
    let level = state
        .inventory
        .adjust_on_hand(&product_id, request.variant_id.as_deref(), request.delta)?;
    Ok(Json(ApiResponse::success(level)))
}

/// Stock the caller could still put in their cart
pub async fn available(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(product_id): Path<String>,
    Query(query): Query<VariantQuery>,
) -> AppResult<Json<ApiResponse<StockLevel>>> {
    let level = match query.variant_id.as_deref() {
        Some(variant_id) => {
            state
                .inventory
                .get_available_variant_stock(&product_id, variant_id, Some(&user.id))?
        }
        None => state.inventory.get_available_stock(&product_id, Some(&user.id))?,
    };
    Ok(Json(ApiResponse::success(level)))
}
