//! InventoryService - the only writer of on-hand stock
//!
//! ```text
//! available(X) = on_hand(X) - Σ live reservations on X held by other owners
//! ```
//!
//! Operations come in two forms: a self-contained method that opens and
//! commits its own transaction, and an `*_in_txn` form the order controller
//! calls so stock changes commit atomically with the order document.

use redb::WriteTransaction;
use shared::inventory::{
    AvailabilityReport, CartItemRequest, CartLine, DeductionReport, LineRequest, Product,
    ProductVariant, Reservation, RestoreReport, StockKey, StockLevel, UnavailableItem,
    UnavailableReason,
};
use shared::util::{minutes_to_millis, now_millis};
use std::collections::BTreeMap;
use validator::Validate;

use super::error::{InventoryError, InventoryResult};
use super::{ledger, reservations};
use crate::audit_log;
use crate::db::{
    PRODUCTS_TABLE, RESERVATIONS_TABLE, STOCK_TABLE, Store, StorageResult, from_bytes,
};

/// A requested line matched against the catalog
#[derive(Debug, Clone)]
pub struct ResolvedLine {
    pub line: LineRequest,
    pub product: Product,
    pub variant: Option<ProductVariant>,
}

impl ResolvedLine {
    pub fn key(&self) -> StockKey {
        self.line.stock_key()
    }

    /// Variant price wins over the product price
    pub fn unit_price(&self) -> rust_decimal::Decimal {
        self.variant
            .as_ref()
            .and_then(|v| v.price)
            .unwrap_or(self.product.price)
    }
}

/// Outcome of evaluating a set of lines against stock
#[derive(Debug, Default)]
pub struct Evaluation {
    pub resolved: Vec<ResolvedLine>,
    pub unavailable: Vec<UnavailableItem>,
}

/// Collapse repeated stock keys into one line, keeping first-seen order
pub fn merge_lines(lines: &[LineRequest]) -> Vec<LineRequest> {
    let mut merged: Vec<LineRequest> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|m| m.stock_key() == line.stock_key()) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => merged.push(line.clone()),
        }
    }
    merged
}

fn unavailable(line: &LineRequest, available: u64, reason: UnavailableReason) -> UnavailableItem {
    UnavailableItem {
        product_id: line.product_id.clone(),
        variant_id: line.variant_id.clone(),
        requested: line.quantity,
        available,
        reason,
    }
}

/// Match a line to its product / variant
fn resolve_in<P>(products: &P, line: &LineRequest) -> StorageResult<Result<ResolvedLine, UnavailableReason>>
where
    P: redb::ReadableTable<&'static str, &'static [u8]>,
{
    let Some(product) = ledger::product_in(products, &line.product_id)? else {
        return Ok(Err(UnavailableReason::ProductNotFound));
    };
    if !product.active {
        return Ok(Err(UnavailableReason::ProductInactive));
    }
    let variant = match (&line.variant_id, product.has_variants()) {
        (None, true) => return Ok(Err(UnavailableReason::VariantRequired)),
        (None, false) => None,
        (Some(variant_id), _) => match product.find_variant(variant_id) {
            Some(v) => Some(v.clone()),
            None => return Ok(Err(UnavailableReason::VariantNotFound)),
        },
    };
    Ok(Ok(ResolvedLine {
        line: line.clone(),
        product,
        variant,
    }))
}

/// Fail-closed availability check over any readable set of tables
fn evaluate_in<P, S, R>(
    products: &P,
    stock: &S,
    holds: &R,
    lines: &[LineRequest],
    owner: Option<&str>,
    now: i64,
) -> StorageResult<Evaluation>
where
    P: redb::ReadableTable<&'static str, &'static [u8]>,
    S: redb::ReadableTable<&'static str, u64>,
    R: redb::ReadableTable<(&'static str, &'static str), &'static [u8]>,
{
    let mut evaluation = Evaluation::default();
    for line in merge_lines(lines) {
        let resolved = match resolve_in(products, &line)? {
            Ok(r) => r,
            Err(reason) => {
                evaluation.unavailable.push(unavailable(&line, 0, reason));
                continue;
            }
        };
        let key = line.stock_key();
        let on_hand = ledger::on_hand_in(stock, &key)?;
        let held_by_others = reservations::reserved_in(holds, &key, owner, now)?;
        let available = on_hand.saturating_sub(held_by_others);
        if u64::from(line.quantity) > available {
            evaluation
                .unavailable
                .push(unavailable(&line, available, UnavailableReason::InsufficientStock));
        } else {
            evaluation.resolved.push(resolved);
        }
    }
    Ok(evaluation)
}

/// 库存服务
#[derive(Debug, Clone)]
pub struct InventoryService {
    store: Store,
    reservation_ttl_ms: i64,
}

impl InventoryService {
    pub fn new(store: Store, reservation_ttl_minutes: u64) -> Self {
        Self {
            store,
            reservation_ttl_ms: minutes_to_millis(reservation_ttl_minutes),
        }
    }

    // ========== Catalog projection ==========

    /// Insert or replace a product; creates zero-stock counters for new keys
    pub fn upsert_product(&self, product: Product) -> InventoryResult<Product> {
        product
            .validate()
            .map_err(|e| InventoryError::Validation(e.to_string()))?;
        let negative_variant = product
            .variants
            .iter()
            .any(|v| v.price.is_some_and(|p| p.is_sign_negative()));
        if product.price.is_sign_negative() || negative_variant {
            return Err(InventoryError::InvalidPrice(product.id));
        }
        if product.id.contains('#') || product.variants.iter().any(|v| v.id.is_empty() || v.id.contains('#')) {
            return Err(InventoryError::Validation(
                "product and variant ids must be non-empty and must not contain '#'".into(),
            ));
        }

        let txn = self.store.begin_write()?;
        ledger::save_product(&txn, &product)?;
        if product.has_variants() {
            for variant in &product.variants {
                ledger::ensure_counter(&txn, &StockKey::variant(&product.id, &variant.id))?;
            }
        } else {
            ledger::ensure_counter(&txn, &StockKey::product(&product.id))?;
        }
        txn.commit()?;

        tracing::info!(product_id = %product.id, variants = product.variants.len(), "Product upserted");
        Ok(product)
    }

    pub fn get_product(&self, product_id: &str) -> InventoryResult<Product> {
        let txn = self.store.begin_read()?;
        let table = txn.open_table(PRODUCTS_TABLE)?;
        ledger::product_in(&table, product_id)?
            .ok_or_else(|| InventoryError::ProductNotFound(product_id.to_string()))
    }

    pub fn list_products(&self) -> InventoryResult<Vec<Product>> {
        use redb::ReadableTable;
        let txn = self.store.begin_read()?;
        let table = txn.open_table(PRODUCTS_TABLE)?;
        let mut products = Vec::new();
        for entry in table.iter()? {
            let (_, v) = entry?;
            products.push(from_bytes(v.value())?);
        }
        Ok(products)
    }

    /// Stock key for a product, enforcing the variant rules of the catalog
    fn stock_key_for(&self, product_id: &str, variant_id: Option<&str>) -> InventoryResult<StockKey> {
        let product = self.get_product(product_id)?;
        match (variant_id, product.has_variants()) {
            (None, true) => Err(InventoryError::VariantRequired(product.id)),
            (None, false) => Ok(StockKey::product(product.id)),
            (Some(v), _) if product.find_variant(v).is_some() => Ok(StockKey::variant(product.id, v)),
            (Some(v), _) => Err(InventoryError::VariantNotFound(v.to_string())),
        }
    }

    /// Overwrite the on-hand count (stocktake)
    pub fn set_on_hand(
        &self,
        product_id: &str,
        variant_id: Option<&str>,
        quantity: u64,
    ) -> InventoryResult<StockLevel> {
        let key = self.stock_key_for(product_id, variant_id)?;
        let txn = self.store.begin_write()?;
        ledger::set_on_hand(&txn, &key, quantity)?;
        txn.commit()?;
        audit_log!(event = "stock_set", stock_key = %key, on_hand = quantity);
        self.stock_level(&key, None)
    }

    /// Restock (positive) or write off (negative), floored at zero
    pub fn adjust_on_hand(
        &self,
        product_id: &str,
        variant_id: Option<&str>,
        delta: i64,
    ) -> InventoryResult<StockLevel> {
        let key = self.stock_key_for(product_id, variant_id)?;
        let txn = self.store.begin_write()?;
        let on_hand = ledger::adjust(&txn, &key, delta)?;
        txn.commit()?;
        audit_log!(event = "stock_adjusted", stock_key = %key, delta = delta, on_hand = on_hand);
        self.stock_level(&key, None)
    }

    // ========== Availability ==========

    /// `check_availability`: never reports a line available that cannot be
    /// resolved. `owner`'s own holds are not counted against them.
    pub fn check_availability(
        &self,
        lines: &[LineRequest],
        owner: Option<&str>,
    ) -> InventoryResult<AvailabilityReport> {
        let txn = self.store.begin_read()?;
        let products = txn.open_table(PRODUCTS_TABLE)?;
        let stock = txn.open_table(STOCK_TABLE)?;
        let holds = txn.open_table(RESERVATIONS_TABLE)?;
        let evaluation = evaluate_in(&products, &stock, &holds, lines, owner, now_millis())?;
        Ok(AvailabilityReport::from_items(evaluation.unavailable))
    }

    /// Same check inside the caller's write transaction
    pub(crate) fn evaluate_in_txn(
        &self,
        txn: &WriteTransaction,
        lines: &[LineRequest],
        owner: Option<&str>,
        now: i64,
    ) -> StorageResult<Evaluation> {
        let products = txn.open_table(PRODUCTS_TABLE)?;
        let stock = txn.open_table(STOCK_TABLE)?;
        let holds = txn.open_table(RESERVATIONS_TABLE)?;
        evaluate_in(&products, &stock, &holds, lines, owner, now)
    }

    fn stock_level(&self, key: &StockKey, owner: Option<&str>) -> InventoryResult<StockLevel> {
        let txn = self.store.begin_read()?;
        let stock = txn.open_table(STOCK_TABLE)?;
        let holds = txn.open_table(RESERVATIONS_TABLE)?;
        let on_hand = ledger::on_hand_in(&stock, key)?;
        let reserved_by_others = reservations::reserved_in(&holds, key, owner, now_millis())?;
        Ok(StockLevel {
            product_id: key.product_id.clone(),
            variant_id: key.variant_id.clone(),
            on_hand,
            reserved_by_others,
            available: on_hand.saturating_sub(reserved_by_others),
        })
    }

    /// Available stock of a product without variants, as seen by `owner`
    pub fn get_available_stock(&self, product_id: &str, owner: Option<&str>) -> InventoryResult<StockLevel> {
        let key = self.stock_key_for(product_id, None)?;
        self.stock_level(&key, owner)
    }

    /// Available stock of one variant, as seen by `owner`
    pub fn get_available_variant_stock(
        &self,
        product_id: &str,
        variant_id: &str,
        owner: Option<&str>,
    ) -> InventoryResult<StockLevel> {
        let key = self.stock_key_for(product_id, Some(variant_id))?;
        self.stock_level(&key, owner)
    }

    // ========== Deduction / restoration ==========

    /// Decrement every line or none. Returns the failing lines; when the
    /// list is non-empty the caller must drop the transaction.
    pub(crate) fn deduct_in_txn(
        &self,
        txn: &WriteTransaction,
        lines: &[LineRequest],
    ) -> StorageResult<Vec<UnavailableItem>> {
        let mut failures = Vec::new();
        for line in merge_lines(lines) {
            let key = line.stock_key();
            if let Err(on_hand) = ledger::try_decrement(txn, &key, u64::from(line.quantity))? {
                failures.push(unavailable(&line, on_hand, UnavailableReason::InsufficientStock));
            }
        }
        Ok(failures)
    }

    pub(crate) fn restore_in_txn(&self, txn: &WriteTransaction, lines: &[LineRequest]) -> StorageResult<()> {
        for line in merge_lines(lines) {
            ledger::increment(txn, &line.stock_key(), u64::from(line.quantity))?;
        }
        Ok(())
    }

    /// `deduct_inventory`: all-or-nothing conditional decrement
    pub fn deduct_inventory(&self, lines: &[LineRequest], order_id: &str) -> InventoryResult<DeductionReport> {
        let txn = self.store.begin_write()?;
        let errors = self.deduct_in_txn(&txn, lines)?;
        if !errors.is_empty() {
            tracing::warn!(order_id = %order_id, failed_lines = errors.len(), "Deduction rejected, nothing written");
            return Ok(DeductionReport { success: false, errors });
        }
        txn.commit()?;
        audit_log!(event = "stock_deducted", order_id = %order_id, lines = lines.len());
        Ok(DeductionReport { success: true, errors })
    }

    /// `restore_inventory`: no-op when the order was already restored
    pub fn restore_inventory(
        &self,
        lines: &[LineRequest],
        order_id: &str,
        already_restored: bool,
    ) -> InventoryResult<RestoreReport> {
        if already_restored {
            tracing::debug!(order_id = %order_id, "Inventory already restored, skipping");
            return Ok(RestoreReport { success: true, skipped: true });
        }
        let txn = self.store.begin_write()?;
        self.restore_in_txn(&txn, lines)?;
        txn.commit()?;
        audit_log!(event = "stock_restored", order_id = %order_id, lines = lines.len());
        Ok(RestoreReport { success: true, skipped: false })
    }

    // ========== Reservations ==========

    /// `create_reservation`: sets the owner's hold to `quantity` (not
    /// additive) and refreshes its expiry. Quantity 0 releases the hold.
    pub fn create_reservation(
        &self,
        owner: &str,
        request: &CartItemRequest,
    ) -> InventoryResult<Option<Reservation>> {
        request
            .validate()
            .map_err(|e| InventoryError::InvalidQuantity(e.to_string()))?;
        let line = LineRequest {
            product_id: request.product_id.clone(),
            variant_id: request.variant_id.clone(),
            quantity: request.quantity,
        };
        let key = line.stock_key();
        if request.quantity == 0 {
            self.release_reservation(owner, &key)?;
            return Ok(None);
        }

        let now = now_millis();
        let txn = self.store.begin_write()?;
        {
            let products = txn.open_table(PRODUCTS_TABLE)?;
            match resolve_in(&products, &line)? {
                Ok(_) => {}
                Err(UnavailableReason::VariantRequired) => {
                    return Err(InventoryError::VariantRequired(line.product_id));
                }
                Err(UnavailableReason::VariantNotFound) => {
                    return Err(InventoryError::VariantNotFound(
                        line.variant_id.unwrap_or_default(),
                    ));
                }
                Err(reason) => {
                    return Err(InventoryError::Unavailable(vec![unavailable(&line, 0, reason)]));
                }
            }
        }

        let existing = reservations::load(&txn, &key, owner)?;
        let live_existing = existing.as_ref().filter(|r| r.is_live(now));
        let shrinking = live_existing.is_some_and(|r| request.quantity <= r.quantity);
        if !shrinking {
            let on_hand = ledger::on_hand(&txn, &key)?;
            let others = reservations::reserved_quantity(&txn, &key, Some(owner), now)?;
            let available = on_hand.saturating_sub(others);
            if u64::from(request.quantity) > available {
                return Err(InventoryError::Unavailable(vec![unavailable(
                    &line,
                    available,
                    UnavailableReason::InsufficientStock,
                )]));
            }
        }

        let reservation = Reservation {
            id: existing
                .as_ref()
                .map(|r| r.id.clone())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            product_id: line.product_id.clone(),
            variant_id: line.variant_id.clone(),
            owner_id: owner.to_string(),
            quantity: request.quantity,
            created_at: live_existing.map(|r| r.created_at).unwrap_or(now),
            expires_at: now + self.reservation_ttl_ms,
            active: true,
        };
        reservations::save(&txn, &reservation)?;
        txn.commit()?;

        tracing::debug!(owner = %owner, stock_key = %key, quantity = request.quantity, "Reservation set");
        Ok(Some(reservation))
    }

    /// Release the owner's hold; returns whether a live hold existed
    pub fn release_reservation(&self, owner: &str, key: &StockKey) -> InventoryResult<bool> {
        let txn = self.store.begin_write()?;
        let released = reservations::deactivate(&txn, key, owner, now_millis())?;
        txn.commit()?;
        Ok(released.is_some())
    }

    /// Release the owner's holds on the given lines inside the caller's
    /// transaction (cart lines converted into an order)
    pub(crate) fn release_lines_in_txn(
        &self,
        txn: &WriteTransaction,
        owner: &str,
        lines: &[LineRequest],
        now: i64,
    ) -> StorageResult<usize> {
        let mut released = 0;
        for line in merge_lines(lines) {
            if reservations::deactivate(txn, &line.stock_key(), owner, now)?.is_some() {
                released += 1;
            }
        }
        Ok(released)
    }

    /// `get_reserved_quantity`: live holds across all owners
    pub fn get_reserved_quantity(&self, key: &StockKey) -> InventoryResult<u64> {
        let txn = self.store.begin_read()?;
        let holds = txn.open_table(RESERVATIONS_TABLE)?;
        Ok(reservations::reserved_in(&holds, key, None, now_millis())?)
    }

    /// The owner's cart: live holds plus what is currently available to them
    pub fn list_reservations(&self, owner: &str) -> InventoryResult<Vec<CartLine>> {
        let now = now_millis();
        let txn = self.store.begin_read()?;
        let holds = reservations::list_for_owner(&txn, owner, now)?;
        let stock = txn.open_table(STOCK_TABLE)?;
        let table = txn.open_table(RESERVATIONS_TABLE)?;
        let mut lines = Vec::with_capacity(holds.len());
        for reservation in holds {
            let key = reservation.stock_key();
            let on_hand = ledger::on_hand_in(&stock, &key)?;
            let others = reservations::reserved_in(&table, &key, Some(owner), now)?;
            lines.push(CartLine {
                reservation,
                available: on_hand.saturating_sub(others),
            });
        }
        Ok(lines)
    }

    /// `cleanup_expired_reservations`: returns how many holds were released
    pub fn cleanup_expired_reservations(&self) -> InventoryResult<usize> {
        let txn = self.store.begin_write()?;
        let expired = reservations::deactivate_expired(&txn, now_millis())?;
        txn.commit()?;

        if !expired.is_empty() {
            let mut by_key: BTreeMap<String, u64> = BTreeMap::new();
            for r in &expired {
                *by_key.entry(r.stock_key().storage_key()).or_default() += u64::from(r.quantity);
            }
            tracing::info!(released = expired.len(), keys = ?by_key, "Expired reservations released");
        }
        Ok(expired.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn service_with_stock(on_hand: u64) -> InventoryService {
        let service = InventoryService::new(Store::open_in_memory().unwrap(), 15);
        service
            .upsert_product(Product {
                id: "p".into(),
                name: "Product P".into(),
                price: Decimal::new(100_000, 0),
                variants: vec![],
                active: true,
            })
            .unwrap();
        service.set_on_hand("p", None, on_hand).unwrap();
        service
            .upsert_product(Product {
                id: "tee".into(),
                name: "Tee".into(),
                price: Decimal::new(200_000, 0),
                variants: vec![
                    ProductVariant { id: "s".into(), name: "S".into(), price: None },
                    ProductVariant {
                        id: "xl".into(),
                        name: "XL".into(),
                        price: Some(Decimal::new(220_000, 0)),
                    },
                ],
                active: true,
            })
            .unwrap();
        service.set_on_hand("tee", Some("xl"), 2).unwrap();
        service
    }

    fn cart(product: &str, variant: Option<&str>, quantity: u32) -> CartItemRequest {
        CartItemRequest {
            product_id: product.into(),
            variant_id: variant.map(str::to_string),
            quantity,
        }
    }

    #[test]
    fn test_two_shoppers_cannot_both_hold_more_than_stock() {
        let service = service_with_stock(5);
        service.create_reservation("a", &cart("p", None, 3)).unwrap();

        let err = service.create_reservation("b", &cart("p", None, 3)).unwrap_err();
        match err {
            InventoryError::Unavailable(items) => assert_eq!(items[0].available, 2),
            other => panic!("unexpected error: {other:?}"),
        }

        let seen_by_b = service.get_available_stock("p", Some("b")).unwrap();
        assert_eq!(seen_by_b.available, 2);
        let seen_by_a = service.get_available_stock("p", Some("a")).unwrap();
        assert_eq!(seen_by_a.available, 5);
    }

    #[test]
    fn test_reservation_is_set_not_added() {
        let service = service_with_stock(5);
        service.create_reservation("a", &cart("p", None, 2)).unwrap();
        let r = service.create_reservation("a", &cart("p", None, 4)).unwrap().unwrap();
        assert_eq!(r.quantity, 4);
        assert_eq!(service.get_reserved_quantity(&StockKey::product("p")).unwrap(), 4);

        // Quantity 0 releases
        assert!(service.create_reservation("a", &cart("p", None, 0)).unwrap().is_none());
        assert_eq!(service.get_reserved_quantity(&StockKey::product("p")).unwrap(), 0);
    }

    #[test]
    fn test_variant_rules() {
        let service = service_with_stock(5);
        assert!(matches!(
            service.create_reservation("a", &cart("tee", None, 1)),
            Err(InventoryError::VariantRequired(_))
        ));
        assert!(matches!(
            service.create_reservation("a", &cart("tee", Some("m"), 1)),
            Err(InventoryError::VariantNotFound(_))
        ));
        let level = service.get_available_variant_stock("tee", "xl", None).unwrap();
        assert_eq!(level.on_hand, 2);
    }

    #[test]
    fn test_check_availability_fails_closed() {
        let service = service_with_stock(5);
        let report = service
            .check_availability(
                &[
                    LineRequest::new("p", None, 5),
                    LineRequest::new("ghost", None, 1),
                    LineRequest::new("tee", Some("xl"), 3),
                    LineRequest::new("tee", None, 1),
                ],
                None,
            )
            .unwrap();
        assert!(!report.available);
        let reasons: Vec<_> = report.unavailable_items.iter().map(|i| i.reason).collect();
        assert_eq!(
            reasons,
            vec![
                UnavailableReason::ProductNotFound,
                UnavailableReason::InsufficientStock,
                UnavailableReason::VariantRequired,
            ]
        );
    }

    #[test]
    fn test_duplicate_lines_are_merged() {
        let service = service_with_stock(5);
        let report = service
            .check_availability(
                &[LineRequest::new("p", None, 3), LineRequest::new("p", None, 3)],
                None,
            )
            .unwrap();
        assert!(!report.available);
        assert_eq!(report.unavailable_items[0].requested, 6);
    }

    #[test]
    fn test_deduct_is_all_or_nothing() {
        let service = service_with_stock(5);
        let report = service
            .deduct_inventory(
                &[LineRequest::new("p", None, 2), LineRequest::new("tee", Some("xl"), 3)],
                "o1",
            )
            .unwrap();
        assert!(!report.success);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(service.get_available_stock("p", None).unwrap().on_hand, 5);

        let report = service
            .deduct_inventory(
                &[LineRequest::new("p", None, 2), LineRequest::new("tee", Some("xl"), 2)],
                "o2",
            )
            .unwrap();
        assert!(report.success);
        assert_eq!(service.get_available_stock("p", None).unwrap().on_hand, 3);
        assert_eq!(service.get_available_variant_stock("tee", "xl", None).unwrap().on_hand, 0);
    }

    #[test]
    fn test_restore_skips_when_already_restored() {
        let service = service_with_stock(5);
        let lines = [LineRequest::new("p", None, 2)];
        service.deduct_inventory(&lines, "o1").unwrap();

        let first = service.restore_inventory(&lines, "o1", false).unwrap();
        assert!(!first.skipped);
        let second = service.restore_inventory(&lines, "o1", true).unwrap();
        assert!(second.skipped);
        assert_eq!(service.get_available_stock("p", None).unwrap().on_hand, 5);
    }

    #[test]
    fn test_concurrent_deductions_never_oversell() {
        let service = service_with_stock(10);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                std::thread::spawn(move || {
                    let qty = rand::random::<u32>() % 3 + 1;
                    let report = service
                        .deduct_inventory(&[LineRequest::new("p", None, qty)], &format!("o{i}"))
                        .unwrap();
                    if report.success { u64::from(qty) } else { 0 }
                })
            })
            .collect();
        let deducted: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        let left = service.get_available_stock("p", None).unwrap().on_hand;
        assert!(deducted <= 10);
        assert_eq!(deducted + left, 10);
    }

    #[test]
    fn test_cleanup_expired_reservations() {
        let service = InventoryService::new(Store::open_in_memory().unwrap(), 0);
        service
            .upsert_product(Product {
                id: "p".into(),
                name: "P".into(),
                price: Decimal::ONE,
                variants: vec![],
                active: true,
            })
            .unwrap();
        service.set_on_hand("p", None, 3).unwrap();
        // TTL 0: the hold is already expired when written
        service.create_reservation("a", &cart("p", None, 2)).unwrap();
        assert_eq!(service.cleanup_expired_reservations().unwrap(), 1);
        assert!(service.list_reservations("a").unwrap().is_empty());
        assert_eq!(service.cleanup_expired_reservations().unwrap(), 0);
    }

    #[test]
    fn test_rejects_negative_price() {
        let service = InventoryService::new(Store::open_in_memory().unwrap(), 15);
        let err = service
            .upsert_product(Product {
                id: "bad".into(),
                name: "Bad".into(),
                price: Decimal::new(-1, 0),
                variants: vec![],
                active: true,
            })
            .unwrap_err();
        assert!(matches!(err, InventoryError::InvalidPrice(_)));
    }
}
