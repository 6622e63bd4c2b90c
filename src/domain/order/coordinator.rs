use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::errors::FulfillmentError;
use crate::domain::inventory::InventoryLedger;
use crate::domain::shipment::{CodeGenerator, Shipment};
use crate::store::{settle, Store, UnitOfWork};
use super::commands::CreateOrder;
use super::value_objects::{Order, OrderItem, OrderStatus};

// ============================================================================
// Order Transaction Coordinator
// ============================================================================
//
// Orchestrates: validate -> reserve stock -> order -> items -> shipment,
// all inside one unit of work. Any failure rolls back the whole unit,
// including the stock reservation, so stock is never decremented without a
// persisted order. Never retried here.
//
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub shipment: Shipment,
}

pub struct OrderCoordinator {
    store: Arc<dyn Store>,
    codes: Arc<dyn CodeGenerator>,
}

impl OrderCoordinator {
    pub fn new(store: Arc<dyn Store>, codes: Arc<dyn CodeGenerator>) -> Self {
        Self { store, codes }
    }

    pub async fn create_order(&self, command: CreateOrder) -> Result<PlacedOrder, FulfillmentError> {
        InventoryLedger::validate_lines(&command.lines)?;

        let mut uow = self.store.begin().await?;
        let result = self.place(uow.as_mut(), &command).await;
        let placed = settle(uow, result).await?;

        tracing::info!(
            order_id = %placed.order.id,
            customer_id = %placed.order.customer_id,
            shipment_id = %placed.shipment.id,
            total = %placed.order.total_amount,
            item_count = placed.items.len(),
            "✅ Order placed"
        );

        Ok(placed)
    }

    async fn place(
        &self,
        uow: &mut dyn UnitOfWork,
        command: &CreateOrder,
    ) -> Result<PlacedOrder, FulfillmentError> {
        let reservation = InventoryLedger::reserve(uow, &command.lines).await?;

        let order = Order {
            id: Uuid::new_v4(),
            customer_id: command.customer_id,
            status: OrderStatus::Pending,
            total_amount: reservation.total,
            created_at: Utc::now(),
        };
        uow.insert_order(&order).await?;

        let items: Vec<OrderItem> = reservation
            .lines
            .iter()
            .map(|line| OrderItem {
                order_id: order.id,
                product_id: line.product_id,
                quantity: line.quantity,
                price_at_order: line.unit_price,
            })
            .collect();
        uow.insert_order_items(&items).await?;

        let shipment = Shipment::new(order.id, self.codes.generate());
        uow.insert_shipment(&shipment).await?;

        tracing::debug!(
            order_id = %order.id,
            shipment_id = %shipment.id,
            "Order rows staged"
        );

        Ok(PlacedOrder { order, items, shipment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::inventory::OrderLine;
    use crate::domain::shipment::{PepperedCodeGenerator, ShipmentStatus};
    use crate::store::{FailPoint, MemoryStore};
    use futures_util::future::join_all;
    use rust_decimal::Decimal;

    fn coordinator(store: &MemoryStore) -> OrderCoordinator {
        OrderCoordinator::new(
            Arc::new(store.clone()),
            Arc::new(PepperedCodeGenerator::new("test-pepper")),
        )
    }

    #[tokio::test]
    async fn test_create_order_snapshots_price_and_creates_shipment() {
        let store = MemoryStore::new();
        let p1 = store.seed_product("P1", Decimal::new(1000, 2), 5, true).await;
        let customer_id = Uuid::new_v4();

        let placed = coordinator(&store)
            .create_order(CreateOrder {
                customer_id,
                lines: vec![OrderLine::new(p1, 2)],
            })
            .await
            .unwrap();

        assert_eq!(placed.order.total_amount, Decimal::new(2000, 2));
        assert_eq!(placed.order.status, OrderStatus::Pending);
        assert_eq!(placed.order.customer_id, customer_id);
        assert_eq!(placed.items.len(), 1);
        assert_eq!(placed.items[0].price_at_order, Decimal::new(1000, 2));
        assert_eq!(placed.shipment.status, ShipmentStatus::Created);
        assert_eq!(placed.shipment.order_id, placed.order.id);
        assert!(!placed.shipment.code.is_empty());

        assert_eq!(store.product(p1).await.unwrap().stock, 3);
        assert_eq!(store.order_items(placed.order.id).await.len(), 1);
        assert_eq!(store.shipment_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_shipment_insert_releases_reservation() {
        let store = MemoryStore::new();
        let p1 = store.seed_product("P1", Decimal::ONE, 4, true).await;
        store.fail_on(FailPoint::InsertShipment);

        let err = coordinator(&store)
            .create_order(CreateOrder {
                customer_id: Uuid::new_v4(),
                lines: vec![OrderLine::new(p1, 3)],
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "INTERNAL_ERROR");
        assert_eq!(store.product(p1).await.unwrap().stock, 4);
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.shipment_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_items_insert_releases_reservation() {
        let store = MemoryStore::new();
        let p1 = store.seed_product("P1", Decimal::ONE, 4, true).await;
        store.fail_on(FailPoint::InsertOrderItems);

        let result = coordinator(&store)
            .create_order(CreateOrder {
                customer_id: Uuid::new_v4(),
                lines: vec![OrderLine::new(p1, 1)],
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.product(p1).await.unwrap().stock, 4);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_business_failure_propagates_kind_unchanged() {
        let store = MemoryStore::new();
        let p1 = store.seed_product("P1", Decimal::ONE, 1, true).await;

        let err = coordinator(&store)
            .create_order(CreateOrder {
                customer_id: Uuid::new_v4(),
                lines: vec![OrderLine::new(p1, 2)],
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "OUT_OF_STOCK");
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_order_rejected_before_store_access() {
        let store = MemoryStore::new();
        store.fail_on(FailPoint::InsertOrder);

        let err = coordinator(&store)
            .create_order(CreateOrder {
                customer_id: Uuid::new_v4(),
                lines: vec![],
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn test_last_unit_is_sold_once_under_concurrency() {
        let store = MemoryStore::new();
        let p1 = store.seed_product("P1", Decimal::ONE, 1, true).await;
        let coordinator = coordinator(&store);

        let attempts = (0..2).map(|_| {
            coordinator.create_order(CreateOrder {
                customer_id: Uuid::new_v4(),
                lines: vec![OrderLine::new(p1, 1)],
            })
        });
        let results = join_all(attempts).await;

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let out_of_stock = results
            .iter()
            .filter(|r| matches!(r, Err(FulfillmentError::OutOfStock { .. })))
            .count();

        assert_eq!(succeeded, 1);
        assert_eq!(out_of_stock, 1);
        assert_eq!(store.product(p1).await.unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_no_oversell_across_many_concurrent_orders() {
        let store = MemoryStore::new();
        let p1 = store.seed_product("P1", Decimal::ONE, 7, true).await;
        let coordinator = Arc::new(coordinator(&store));

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    coordinator
                        .create_order(CreateOrder {
                            customer_id: Uuid::new_v4(),
                            lines: vec![OrderLine::new(p1, 1 + (i % 2))],
                        })
                        .await
                })
            })
            .collect();

        let mut reserved = 0;
        for handle in handles {
            if let Ok(placed) = handle.await.unwrap() {
                reserved += placed.items[0].quantity;
            }
        }

        let remaining = store.product(p1).await.unwrap().stock;
        assert!(reserved <= 7);
        assert_eq!(reserved + remaining, 7);
    }
}
