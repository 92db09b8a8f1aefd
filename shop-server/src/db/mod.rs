//! redb storage shared by inventory, reservations and orders
//!
//! A single database file holds every table so one write transaction can
//! span order creation, stock deduction and reservation cleanup. redb
//! allows one writer at a time, which turns each "check then mutate" inside
//! a write transaction into an atomic conditional update.
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `stock` | `stock_key` | `u64` | On-hand quantity per product / variant |
//! | `products` | `product_id` | `Product` | Catalog projection (price, variants) |
//! | `reservations` | `(stock_key, owner_id)` | `Reservation` | Cart holds |
//! | `owner_reservations` | `(owner_id, stock_key)` | `()` | Holds by owner |
//! | `orders` | `order_id` | `Order` | Order documents |
//! | `orders_by_owner` | `(owner_id, order_id)` | `()` | Customer order index |
//! | `awaiting_payment` | `order_id` | payment window start | Unpaid draft / payment_failed orders |
//! | `processed_callbacks` | `provider:transaction_id` | `order_id` | Callback idempotency |
//! | `vouchers` | `code` | `Voucher` | Discount codes |
//! | `counters` | `name` | `u64` | Order number sequence |

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub(crate) const STOCK_TABLE: TableDefinition<&str, u64> = TableDefinition::new("stock");

pub(crate) const PRODUCTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("products");

pub(crate) const RESERVATIONS_TABLE: TableDefinition<(&str, &str), &[u8]> =
    TableDefinition::new("reservations");

pub(crate) const OWNER_RESERVATIONS_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("owner_reservations");

pub(crate) const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

pub(crate) const ORDERS_BY_OWNER_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("orders_by_owner");

pub(crate) const AWAITING_PAYMENT_TABLE: TableDefinition<&str, i64> =
    TableDefinition::new("awaiting_payment");

pub(crate) const PROCESSED_CALLBACKS_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("processed_callbacks");

pub(crate) const VOUCHERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("vouchers");

pub(crate) const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Lets `?` lift raw redb errors straight into an error type that wraps
/// [`StorageError`] (one `From` hop only).
macro_rules! forward_redb_errors {
    ($target:ty) => {
        impl From<redb::TransactionError> for $target {
            fn from(err: redb::TransactionError) -> Self {
                crate::db::StorageError::from(err).into()
            }
        }

        impl From<redb::TableError> for $target {
            fn from(err: redb::TableError) -> Self {
                crate::db::StorageError::from(err).into()
            }
        }

        impl From<redb::StorageError> for $target {
            fn from(err: redb::StorageError) -> Self {
                crate::db::StorageError::from(err).into()
            }
        }

        impl From<redb::CommitError> for $target {
            fn from(err: redb::CommitError) -> Self {
                crate::db::StorageError::from(err).into()
            }
        }
    };
}
pub(crate) use forward_redb_errors;

impl From<StorageError> for shared::AppError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "Storage error");
        shared::AppError::database(err.to_string())
    }
}

/// Handle to the shared redb database
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// Open or create the database file
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(STOCK_TABLE)?;
            let _ = txn.open_table(PRODUCTS_TABLE)?;
            let _ = txn.open_table(RESERVATIONS_TABLE)?;
            let _ = txn.open_table(OWNER_RESERVATIONS_TABLE)?;
            let _ = txn.open_table(ORDERS_TABLE)?;
            let _ = txn.open_table(ORDERS_BY_OWNER_TABLE)?;
            let _ = txn.open_table(AWAITING_PAYMENT_TABLE)?;
            let _ = txn.open_table(PROCESSED_CALLBACKS_TABLE)?;
            let _ = txn.open_table(VOUCHERS_TABLE)?;
            let _ = txn.open_table(COUNTERS_TABLE)?;
        }
        txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    pub fn begin_read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    /// Cheap liveness probe used by `/health`
    pub fn check(&self) -> StorageResult<()> {
        let txn = self.db.begin_read()?;
        let _ = txn.open_table(COUNTERS_TABLE)?;
        Ok(())
    }
}

/// Increment a named counter inside `txn` and return the new value
pub(crate) fn next_counter(txn: &WriteTransaction, name: &str) -> StorageResult<u64> {
    let mut table = txn.open_table(COUNTERS_TABLE)?;
    let current = table.get(name)?.map(|g| g.value()).unwrap_or(0);
    let next = current + 1;
    table.insert(name, next)?;
    Ok(next)
}

pub(crate) fn to_bytes<T: serde::Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub(crate) fn from_bytes<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}
