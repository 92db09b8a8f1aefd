//! Catalog projection and stock API
//!
//! | 路径 | 方法 | 说明 | 角色 |
//! |------|------|------|------|
//! | /api/products | GET | 商品列表 | 公共 |
//! | /api/products | POST | 新增 / 覆盖商品 | admin |
//! | /api/products/{id} | GET | 商品详情 | 公共 |
//! | /api/inventory/{productId}/stock | PUT | 盘点 (覆盖库存) | admin |
//! | /api/inventory/{productId}/stock/adjust | POST | 补货 / 核销 | admin |
//! | /api/inventory/{productId}/available | GET | 可用库存 (排除自己的占用) | any |

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    let products = Router::new()
        .route("/", get(handler::list_products).post(handler::upsert_product))
        .route("/{id}", get(handler::get_product));

    let stock = Router::new()
        .route("/{product_id}/stock", put(handler::set_stock))
        .route("/{product_id}/stock/adjust", post(handler::adjust_stock))
        .route("/{product_id}/available", get(handler::available));

    Router::new()
        .nest("/api/products", products)
        .nest("/api/inventory", stock)
}
