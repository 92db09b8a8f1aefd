//! Order persistence on the shared redb database
//!
//! `save` keeps the secondary tables in step with the document:
//! `orders_by_owner` always, `awaiting_payment` only while the order sits
//! unpaid in `draft` / `payment_failed`, keyed to the start of its current
//! payment window.

use redb::{ReadTransaction, ReadableTable, WriteTransaction};
use shared::order::{Order, OrderStatus, Voucher};

use crate::db::{
    AWAITING_PAYMENT_TABLE, ORDERS_BY_OWNER_TABLE, ORDERS_TABLE, PROCESSED_CALLBACKS_TABLE,
    StorageResult, VOUCHERS_TABLE, from_bytes, next_counter, to_bytes,
};

const ORDER_NUMBER_COUNTER: &str = "order_number";

/// `ORD-YYYYMMDD-NNNNNN`, sequence global across days
pub(crate) fn next_order_number(txn: &WriteTransaction, now: i64) -> StorageResult<String> {
    let seq = next_counter(txn, ORDER_NUMBER_COUNTER)?;
    let date = chrono::DateTime::from_timestamp_millis(now)
        .unwrap_or_default()
        .format("%Y%m%d");
    Ok(format!("ORD-{date}-{seq:06}"))
}

pub(crate) fn load(txn: &WriteTransaction, order_id: &str) -> StorageResult<Option<Order>> {
    let table = txn.open_table(ORDERS_TABLE)?;
    match table.get(order_id)? {
        Some(guard) => Ok(Some(from_bytes(guard.value())?)),
        None => Ok(None),
    }
}

pub(crate) fn save(txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
    let bytes = to_bytes(order)?;
    {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        table.insert(order.id.as_str(), bytes.as_slice())?;
    }
    {
        let mut index = txn.open_table(ORDERS_BY_OWNER_TABLE)?;
        index.insert((order.owner_id.as_str(), order.id.as_str()), ())?;
    }
    let mut awaiting = txn.open_table(AWAITING_PAYMENT_TABLE)?;
    if order.awaits_payment() {
        awaiting.insert(order.id.as_str(), order.payment_window_start())?;
    } else {
        awaiting.remove(order.id.as_str())?;
    }
    Ok(())
}

pub(crate) fn get(txn: &ReadTransaction, order_id: &str) -> StorageResult<Option<Order>> {
    let table = txn.open_table(ORDERS_TABLE)?;
    match table.get(order_id)? {
        Some(guard) => Ok(Some(from_bytes(guard.value())?)),
        None => Ok(None),
    }
}

/// Orders of one customer, newest first
pub(crate) fn list_for_owner(txn: &ReadTransaction, owner_id: &str) -> StorageResult<Vec<Order>> {
    let index = txn.open_table(ORDERS_BY_OWNER_TABLE)?;
    let table = txn.open_table(ORDERS_TABLE)?;
    let mut orders = Vec::new();
    for entry in index.range((owner_id, "")..)? {
        let (k, _) = entry?;
        let (owner, order_id) = k.value();
        if owner != owner_id {
            break;
        }
        if let Some(guard) = table.get(order_id)? {
            orders.push(from_bytes::<Order>(guard.value())?);
        }
    }
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
}

/// All orders, newest first, optionally filtered by status
pub(crate) fn list_all(txn: &ReadTransaction, status: Option<OrderStatus>) -> StorageResult<Vec<Order>> {
    let table = txn.open_table(ORDERS_TABLE)?;
    let mut orders = Vec::new();
    for entry in table.iter()? {
        let (_, v) = entry?;
        let order: Order = from_bytes(v.value())?;
        if status.is_none_or(|s| s == order.status) {
            orders.push(order);
        }
    }
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
}

/// Ids of orders whose payment window opened at or before `cutoff`
pub(crate) fn awaiting_payment_before(txn: &ReadTransaction, cutoff: i64) -> StorageResult<Vec<String>> {
    let table = txn.open_table(AWAITING_PAYMENT_TABLE)?;
    let mut ids = Vec::new();
    for entry in table.iter()? {
        let (k, v) = entry?;
        if v.value() <= cutoff {
            ids.push(k.value().to_string());
        }
    }
    Ok(ids)
}

// ========== Callback idempotency ==========

pub(crate) fn callback_key(provider: &str, transaction_id: &str) -> String {
    format!("{provider}:{transaction_id}")
}

pub(crate) fn is_callback_processed(txn: &WriteTransaction, key: &str) -> StorageResult<bool> {
    let table = txn.open_table(PROCESSED_CALLBACKS_TABLE)?;
    Ok(table.get(key)?.is_some())
}

pub(crate) fn mark_callback_processed(txn: &WriteTransaction, key: &str, order_id: &str) -> StorageResult<()> {
    let mut table = txn.open_table(PROCESSED_CALLBACKS_TABLE)?;
    table.insert(key, order_id)?;
    Ok(())
}

// ========== Vouchers ==========

pub(crate) fn load_voucher(txn: &WriteTransaction, code: &str) -> StorageResult<Option<Voucher>> {
    let table = txn.open_table(VOUCHERS_TABLE)?;
    match table.get(code)? {
        Some(guard) => Ok(Some(from_bytes(guard.value())?)),
        None => Ok(None),
    }
}

pub(crate) fn save_voucher(txn: &WriteTransaction, voucher: &Voucher) -> StorageResult<()> {
    let bytes = to_bytes(voucher)?;
    let mut table = txn.open_table(VOUCHERS_TABLE)?;
    table.insert(voucher.code.as_str(), bytes.as_slice())?;
    Ok(())
}

pub(crate) fn list_vouchers(txn: &ReadTransaction) -> StorageResult<Vec<Voucher>> {
    let table = txn.open_table(VOUCHERS_TABLE)?;
    let mut vouchers = Vec::new();
    for entry in table.iter()? {
        let (_, v) = entry?;
        vouchers.push(from_bytes(v.value())?);
    }
    Ok(vouchers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;

    #[test]
    fn test_order_number_format() {
        let store = Store::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        // 2026-03-05T00:00:00Z
        let now = 1_772_668_800_000;
        assert_eq!(next_order_number(&txn, now).unwrap(), "ORD-20260305-000001");
        assert_eq!(next_order_number(&txn, now).unwrap(), "ORD-20260305-000002");
    }

    #[test]
    fn test_callback_keys_are_remembered() {
        let store = Store::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        let key = callback_key("momo", "2147483647");
        assert!(!is_callback_processed(&txn, &key).unwrap());
        mark_callback_processed(&txn, &key, "o1").unwrap();
        assert!(is_callback_processed(&txn, &key).unwrap());
        assert!(!is_callback_processed(&txn, &callback_key("vnpay", "2147483647")).unwrap());
    }
}
