use shared::inventory::UnavailableItem;
use shared::{AppError, ErrorCode};
use thiserror::Error;

use crate::db::{StorageError, forward_redb_errors};

/// Inventory errors
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    #[error("Product {0} must be ordered by variant")]
    VariantRequired(String),

    #[error("Invalid price for product {0}")]
    InvalidPrice(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid product: {0}")]
    Validation(String),

    /// One or more lines cannot be served from available stock
    #[error("Insufficient stock")]
    Unavailable(Vec<UnavailableItem>),
}

pub type InventoryResult<T> = Result<T, InventoryError>;

forward_redb_errors!(InventoryError);

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Storage(e) => e.into(),
            InventoryError::ProductNotFound(id) => {
                AppError::new(ErrorCode::ProductNotFound).with_detail("productId", id)
            }
            InventoryError::VariantNotFound(id) => {
                AppError::new(ErrorCode::VariantNotFound).with_detail("variantId", id)
            }
            InventoryError::VariantRequired(id) => {
                AppError::new(ErrorCode::VariantRequired).with_detail("productId", id)
            }
            InventoryError::InvalidPrice(id) => {
                AppError::new(ErrorCode::ProductInvalidPrice).with_detail("productId", id)
            }
            InventoryError::InvalidQuantity(msg) => {
                AppError::with_message(ErrorCode::InvalidQuantity, msg)
            }
            InventoryError::Validation(msg) => AppError::validation(msg),
            InventoryError::Unavailable(items) => unavailable_error(&items),
        }
    }
}

/// `ProductOutOfStock` carrying the structured `unavailableItems` list
pub fn unavailable_error(items: &[UnavailableItem]) -> AppError {
    let details = serde_json::to_value(items).unwrap_or_default();
    AppError::new(ErrorCode::ProductOutOfStock).with_detail("unavailableItems", details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::inventory::UnavailableReason;

    #[test]
    fn test_unavailable_maps_to_out_of_stock_with_items() {
        let err: AppError = InventoryError::Unavailable(vec![UnavailableItem {
            product_id: "mug".into(),
            variant_id: None,
            requested: 4,
            available: 1,
            reason: UnavailableReason::InsufficientStock,
        }])
        .into();

        assert_eq!(err.code, ErrorCode::ProductOutOfStock);
        assert_eq!(err.http_status(), http::StatusCode::BAD_REQUEST);
        let details = err.details.unwrap();
        assert_eq!(details["unavailableItems"][0]["productId"], "mug");
        assert_eq!(details["unavailableItems"][0]["available"], 1);
    }

    #[test]
    fn test_redb_errors_land_in_storage_variant() {
        let err: InventoryError = redb::TableError::TableDoesNotExist("stock".into()).into();
        assert!(matches!(err, InventoryError::Storage(StorageError::Table(_))));

        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::DatabaseError);
    }
}
