use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::domain::errors::FulfillmentError;
use crate::store::UnitOfWork;
use super::value_objects::{OrderLine, Product, Reservation, ReservedLine};

// ============================================================================
// Inventory Ledger
// ============================================================================
//
// Sole writer of product stock. `reserve` is all-or-nothing across every line:
// all products are locked and checked before the first decrement, and it runs
// inside the caller's unit of work so a later failure rolls the decrements back
// with everything else.
//
// ============================================================================

pub struct InventoryLedger;

impl InventoryLedger {
    pub fn validate_lines(lines: &[OrderLine]) -> Result<(), FulfillmentError> {
        if lines.is_empty() {
            return Err(FulfillmentError::validation("order must contain at least one item"));
        }

        let mut seen = HashSet::with_capacity(lines.len());
        for line in lines {
            if line.quantity <= 0 {
                return Err(FulfillmentError::validation(format!(
                    "quantity for product {} must be positive, got {}",
                    line.product_id, line.quantity
                )));
            }
            if !seen.insert(line.product_id) {
                return Err(FulfillmentError::validation(format!(
                    "product {} appears more than once",
                    line.product_id
                )));
            }
        }

        Ok(())
    }

    /// Check and decrement stock for every line, capturing unit prices.
    pub async fn reserve(
        uow: &mut dyn UnitOfWork,
        lines: &[OrderLine],
    ) -> Result<Reservation, FulfillmentError> {
        Self::validate_lines(lines)?;

        let mut ids: Vec<Uuid> = lines.iter().map(|line| line.product_id).collect();
        ids.sort();

        let products: HashMap<Uuid, Product> = uow
            .lock_products(&ids)
            .await?
            .into_iter()
            .map(|product| (product.id, product))
            .collect();

        let mut reserved = Vec::with_capacity(lines.len());
        for line in lines {
            let product = check_line(&products, line)?;
            reserved.push(ReservedLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: product.price,
            });
        }

        for line in &reserved {
            if !uow.decrement_stock(line.product_id, line.quantity).await? {
                // The row moved under us; report what is left now.
                let available = uow
                    .lock_products(&[line.product_id])
                    .await?
                    .first()
                    .map_or(0, |p| p.stock);
                return Err(FulfillmentError::OutOfStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available,
                });
            }
        }

        let reservation = Reservation::from_lines(reserved);

        tracing::debug!(
            line_count = reservation.lines.len(),
            total = %reservation.total,
            "Reserved stock"
        );

        Ok(reservation)
    }
}

fn check_line<'a>(
    products: &'a HashMap<Uuid, Product>,
    line: &OrderLine,
) -> Result<&'a Product, FulfillmentError> {
    let product = products
        .get(&line.product_id)
        .ok_or(FulfillmentError::ProductNotFound(line.product_id))?;

    if !product.is_active {
        return Err(FulfillmentError::ProductNotActive(product.id));
    }

    if product.stock < line.quantity {
        return Err(FulfillmentError::OutOfStock {
            product_id: product.id,
            requested: line.quantity,
            available: product.stock,
        });
    }

    Ok(product)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FailPoint, MemoryStore, Store};
    use rust_decimal::Decimal;

    #[test]
    fn test_validate_rejects_empty_and_non_positive() {
        assert!(InventoryLedger::validate_lines(&[]).is_err());
        assert!(InventoryLedger::validate_lines(&[OrderLine::new(Uuid::new_v4(), 0)]).is_err());
        assert!(InventoryLedger::validate_lines(&[OrderLine::new(Uuid::new_v4(), -3)]).is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_products() {
        let id = Uuid::new_v4();
        let err = InventoryLedger::validate_lines(&[OrderLine::new(id, 1), OrderLine::new(id, 2)])
            .unwrap_err();
        assert_eq!(err.kind(), "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn test_reserve_captures_prices_and_decrements() {
        let store = MemoryStore::new();
        let a = store.seed_product("A", Decimal::new(1000, 2), 5, true).await;
        let b = store.seed_product("B", Decimal::new(250, 2), 2, true).await;

        let mut uow = store.begin().await.unwrap();
        let reservation =
            InventoryLedger::reserve(uow.as_mut(), &[OrderLine::new(a, 2), OrderLine::new(b, 2)])
                .await
                .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(reservation.total, Decimal::new(2500, 2));
        assert_eq!(reservation.lines[0].unit_price, Decimal::new(1000, 2));
        assert_eq!(store.product(a).await.unwrap().stock, 3);
        assert_eq!(store.product(b).await.unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_reserve_is_all_or_nothing() {
        let store = MemoryStore::new();
        let plenty = store.seed_product("Plenty", Decimal::ONE, 10, true).await;
        let scarce = store.seed_product("Scarce", Decimal::ONE, 1, true).await;

        let mut uow = store.begin().await.unwrap();
        let err = InventoryLedger::reserve(
            uow.as_mut(),
            &[OrderLine::new(plenty, 4), OrderLine::new(scarce, 2)],
        )
        .await
        .unwrap_err();
        uow.commit().await.unwrap();

        assert!(matches!(err, FulfillmentError::OutOfStock { requested: 2, available: 1, .. }));
        assert_eq!(store.product(plenty).await.unwrap().stock, 10);
        assert_eq!(store.product(scarce).await.unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_reserve_reports_missing_and_inactive_products() {
        let store = MemoryStore::new();
        let inactive = store.seed_product("Retired", Decimal::ONE, 10, false).await;
        let missing = Uuid::new_v4();

        let mut uow = store.begin().await.unwrap();
        let err = InventoryLedger::reserve(uow.as_mut(), &[OrderLine::new(missing, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::ProductNotFound(id) if id == missing));

        let err = InventoryLedger::reserve(uow.as_mut(), &[OrderLine::new(inactive, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::ProductNotActive(id) if id == inactive));
        uow.rollback().await.unwrap();

        assert_eq!(store.product(inactive).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_lost_decrement_reports_current_stock() {
        let store = MemoryStore::new();
        let product = store.seed_product("Contested", Decimal::ONE, 3, true).await;
        store.fail_on(FailPoint::RacedDecrement);

        let mut uow = store.begin().await.unwrap();
        let err = InventoryLedger::reserve(uow.as_mut(), &[OrderLine::new(product, 2)])
            .await
            .unwrap_err();
        uow.rollback().await.unwrap();

        assert!(matches!(
            err,
            FulfillmentError::OutOfStock { product_id, requested: 2, available: 0 } if product_id == product
        ));
        assert_eq!(store.product(product).await.unwrap().stock, 3);
    }
}
