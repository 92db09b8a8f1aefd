//! Reservation store
//!
//! One row per `(stock_key, owner)`: at most one hold per shopper and stock
//! counter. Released or expired holds stay in the table with
//! `active = false` until the same shopper reserves that line again or the
//! next expiry sweep purges them.

use redb::{ReadableTable, WriteTransaction};
use serde::Deserialize;
use shared::inventory::{Reservation, StockKey};

use crate::db::{
    OWNER_RESERVATIONS_TABLE, RESERVATIONS_TABLE, StorageResult, from_bytes, to_bytes,
};

/// Sum of live holds on `key`, optionally ignoring one owner's hold
pub(crate) fn reserved_in<T>(
    table: &T,
    key: &StockKey,
    exclude_owner: Option<&str>,
    now: i64,
) -> StorageResult<u64>
where
    T: ReadableTable<(&'static str, &'static str), &'static [u8]>,
{
    let storage_key = key.storage_key();
    let mut total = 0u64;
    for entry in table.range((storage_key.as_str(), "")..)? {
        let (k, v) = entry?;
        let (row_key, owner) = k.value();
        if row_key != storage_key {
            break;
        }
        if exclude_owner == Some(owner) {
            continue;
        }
        let reservation: Reservation = from_bytes(v.value())?;
        if reservation.is_live(now) {
            total += u64::from(reservation.quantity);
        }
    }
    Ok(total)
}

pub(crate) fn get_in<T>(table: &T, key: &StockKey, owner: &str) -> StorageResult<Option<Reservation>>
where
    T: ReadableTable<(&'static str, &'static str), &'static [u8]>,
{
    let storage_key = key.storage_key();
    match table.get((storage_key.as_str(), owner))? {
        Some(guard) => Ok(Some(from_bytes(guard.value())?)),
        None => Ok(None),
    }
}

pub(crate) fn reserved_quantity(
    txn: &WriteTransaction,
    key: &StockKey,
    exclude_owner: Option<&str>,
    now: i64,
) -> StorageResult<u64> {
    let table = txn.open_table(RESERVATIONS_TABLE)?;
    reserved_in(&table, key, exclude_owner, now)
}

pub(crate) fn load(txn: &WriteTransaction, key: &StockKey, owner: &str) -> StorageResult<Option<Reservation>> {
    let table = txn.open_table(RESERVATIONS_TABLE)?;
    get_in(&table, key, owner)
}

/// Insert or replace the owner's hold on `reservation.stock_key()`
pub(crate) fn save(txn: &WriteTransaction, reservation: &Reservation) -> StorageResult<()> {
    let storage_key = reservation.stock_key().storage_key();
    let bytes = to_bytes(reservation)?;
    {
        let mut table = txn.open_table(RESERVATIONS_TABLE)?;
        table.insert((storage_key.as_str(), reservation.owner_id.as_str()), bytes.as_slice())?;
    }
    let mut index = txn.open_table(OWNER_RESERVATIONS_TABLE)?;
    index.insert((reservation.owner_id.as_str(), storage_key.as_str()), ())?;
    Ok(())
}

/// Mark the owner's hold inactive. Returns the hold if it was live.
pub(crate) fn deactivate(
    txn: &WriteTransaction,
    key: &StockKey,
    owner: &str,
    now: i64,
) -> StorageResult<Option<Reservation>> {
    let Some(mut reservation) = load(txn, key, owner)? else {
        return Ok(None);
    };
    let was_live = reservation.is_live(now);
    if reservation.active {
        reservation.active = false;
        save(txn, &reservation)?;
    }
    Ok(was_live.then_some(reservation))
}

/// Stock keys the owner has (or had) a hold on
pub(crate) fn owner_keys_in<T>(table: &T, owner: &str) -> StorageResult<Vec<String>>
where
    T: ReadableTable<(&'static str, &'static str), ()>,
{
    let mut keys = Vec::new();
    for entry in table.range((owner, "")..)? {
        let (k, _) = entry?;
        let (row_owner, stock_key) = k.value();
        if row_owner != owner {
            break;
        }
        keys.push(stock_key.to_string());
    }
    Ok(keys)
}

/// Live holds of one owner
pub(crate) fn list_for_owner(
    txn: &redb::ReadTransaction,
    owner: &str,
    now: i64,
) -> StorageResult<Vec<Reservation>> {
    let index = txn.open_table(OWNER_RESERVATIONS_TABLE)?;
    let table = txn.open_table(RESERVATIONS_TABLE)?;
    let mut out = Vec::new();
    for stock_key in owner_keys_in(&index, owner)? {
        if let Some(guard) = table.get((stock_key.as_str(), owner))? {
            let reservation: Reservation = from_bytes(guard.value())?;
            if reservation.is_live(now) {
                out.push(reservation);
            }
        }
    }
    Ok(out)
}

/// Just the fields the sweep needs; avoids decoding whole rows
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Liveness {
    active: bool,
    expires_at: i64,
}

/// Deactivate every active hold whose `expires_at` has passed and purge
/// rows that were already inactive. Returns the newly expired holds.
pub(crate) fn deactivate_expired(txn: &WriteTransaction, now: i64) -> StorageResult<Vec<Reservation>> {
    let mut expired = Vec::new();
    let mut stale: Vec<(String, String)> = Vec::new();
    {
        let table = txn.open_table(RESERVATIONS_TABLE)?;
        for entry in table.iter()? {
            let (k, v) = entry?;
            let liveness: Liveness = from_bytes(v.value())?;
            if !liveness.active {
                let (stock_key, owner) = k.value();
                stale.push((stock_key.to_string(), owner.to_string()));
            } else if liveness.expires_at <= now {
                expired.push(from_bytes::<Reservation>(v.value())?);
            }
        }
    }
    if !stale.is_empty() {
        let mut table = txn.open_table(RESERVATIONS_TABLE)?;
        let mut index = txn.open_table(OWNER_RESERVATIONS_TABLE)?;
        for (stock_key, owner) in &stale {
            table.remove((stock_key.as_str(), owner.as_str()))?;
            index.remove((owner.as_str(), stock_key.as_str()))?;
        }
        tracing::debug!(purged = stale.len(), "Inactive reservations purged");
    }
    for reservation in &mut expired {
        reservation.active = false;
        save(txn, reservation)?;
    }
    Ok(expired)
}
