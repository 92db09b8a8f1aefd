//! Stock ledger: on-hand counters and the catalog projection
//!
//! Every mutation takes the caller's `WriteTransaction`, so a deduction is
//! committed (or discarded) together with whatever else the caller writes.

use redb::{ReadableTable, WriteTransaction};
use shared::inventory::{Product, StockKey};

use crate::db::{PRODUCTS_TABLE, STOCK_TABLE, StorageResult, from_bytes, to_bytes};

/// Read the on-hand quantity from any readable stock table
pub(crate) fn on_hand_in<T>(table: &T, key: &StockKey) -> StorageResult<u64>
where
    T: ReadableTable<&'static str, u64>,
{
    let storage_key = key.storage_key();
    Ok(table
        .get(storage_key.as_str())?
        .map(|g| g.value())
        .unwrap_or(0))
}

pub(crate) fn product_in<T>(table: &T, product_id: &str) -> StorageResult<Option<Product>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(product_id)? {
        Some(guard) => Ok(Some(from_bytes(guard.value())?)),
        None => Ok(None),
    }
}

pub(crate) fn on_hand(txn: &WriteTransaction, key: &StockKey) -> StorageResult<u64> {
    let table = txn.open_table(STOCK_TABLE)?;
    on_hand_in(&table, key)
}

pub(crate) fn save_product(txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
    let bytes = to_bytes(product)?;
    let mut table = txn.open_table(PRODUCTS_TABLE)?;
    table.insert(product.id.as_str(), bytes.as_slice())?;
    Ok(())
}

/// Create the counter with zero stock if it does not exist yet
pub(crate) fn ensure_counter(txn: &WriteTransaction, key: &StockKey) -> StorageResult<()> {
    let storage_key = key.storage_key();
    let mut table = txn.open_table(STOCK_TABLE)?;
    if table.get(storage_key.as_str())?.is_none() {
        table.insert(storage_key.as_str(), 0u64)?;
    }
    Ok(())
}

pub(crate) fn set_on_hand(txn: &WriteTransaction, key: &StockKey, quantity: u64) -> StorageResult<()> {
    let storage_key = key.storage_key();
    let mut table = txn.open_table(STOCK_TABLE)?;
    table.insert(storage_key.as_str(), quantity)?;
    Ok(())
}

/// Decrement by `quantity` if and only if enough is on hand.
///
/// Returns `Err(current)` without writing when the floor check fails.
pub(crate) fn try_decrement(
    txn: &WriteTransaction,
    key: &StockKey,
    quantity: u64,
) -> StorageResult<Result<u64, u64>> {
    let storage_key = key.storage_key();
    let mut table = txn.open_table(STOCK_TABLE)?;
    let current = table
        .get(storage_key.as_str())?
        .map(|g| g.value())
        .unwrap_or(0);
    if current < quantity {
        return Ok(Err(current));
    }
    let remaining = current - quantity;
    table.insert(storage_key.as_str(), remaining)?;
    Ok(Ok(remaining))
}

pub(crate) fn increment(txn: &WriteTransaction, key: &StockKey, quantity: u64) -> StorageResult<u64> {
    let storage_key = key.storage_key();
    let mut table = txn.open_table(STOCK_TABLE)?;
    let current = table
        .get(storage_key.as_str())?
        .map(|g| g.value())
        .unwrap_or(0);
    let next = current.saturating_add(quantity);
    table.insert(storage_key.as_str(), next)?;
    Ok(next)
}

/// Apply a signed delta, floored at zero
pub(crate) fn adjust(txn: &WriteTransaction, key: &StockKey, delta: i64) -> StorageResult<u64> {
    let storage_key = key.storage_key();
    let mut table = txn.open_table(STOCK_TABLE)?;
    let current = table
        .get(storage_key.as_str())?
        .map(|g| g.value())
        .unwrap_or(0);
    let next = if delta >= 0 {
        current.saturating_add(delta.unsigned_abs())
    } else {
        current.saturating_sub(delta.unsigned_abs())
    };
    table.insert(storage_key.as_str(), next)?;
    Ok(next)
}
