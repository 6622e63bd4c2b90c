use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::domain::access::{Role, User};
use crate::domain::inventory::Product;
use crate::domain::order::{Order, OrderItem};
use crate::domain::route::{Route, RouteShipment};
use crate::domain::scan::ScanLogEntry;
use crate::domain::shipment::{Shipment, ShipmentStatus};
use super::{Store, StoreError, StoreResult, UnitOfWork};

// ============================================================================
// In-Memory Store
// ============================================================================
//
// Each unit of work holds the store lock for its whole lifetime and mutates a
// private copy of the state; commit swaps the copy in. Units of work are
// therefore fully serialized, which is the strictest isolation the
// fulfillment core can ask for.
//
// Fail points let tests break a specific write to exercise rollback paths.
// The `Raced*` points instead play a concurrent writer that commits right
// before the conditional write, so the write sees a stale precondition.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertOrder,
    InsertOrderItems,
    InsertShipment,
    InsertRouteShipment,
    AppendScanLog,
    /// Another unit takes all remaining stock just before a decrement.
    RacedDecrement,
    /// Another unit applies the same transition just before this one.
    RacedTransition,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    products: HashMap<Uuid, Product>,
    orders: HashMap<Uuid, Order>,
    order_items: Vec<OrderItem>,
    shipments: HashMap<Uuid, Shipment>,
    routes: HashMap<Uuid, Route>,
    route_shipments: Vec<RouteShipment>,
    scan_logs: Vec<ScanLogEntry>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<std::sync::Mutex<HashSet<FailPoint>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_user(&self, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.users.insert(id, User { id, role });
        id
    }

    pub async fn seed_product(
        &self,
        name: &str,
        price: Decimal,
        stock: i32,
        is_active: bool,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let product = Product {
            id,
            name: name.to_string(),
            price,
            stock,
            is_active,
        };
        self.state.lock().await.products.insert(id, product);
        id
    }

    /// Make every unit of work opened from now on fail at `point`.
    pub fn fail_on(&self, point: FailPoint) {
        self.faults_guard().insert(point);
    }

    pub fn clear_faults(&self) {
        self.faults_guard().clear();
    }

    fn faults_guard(&self) -> std::sync::MutexGuard<'_, HashSet<FailPoint>> {
        // A poisoned set of fail points is still a usable set of fail points.
        self.faults.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn product(&self, id: Uuid) -> Option<Product> {
        self.state.lock().await.products.get(&id).cloned()
    }

    pub async fn shipment(&self, id: Uuid) -> Option<Shipment> {
        self.state.lock().await.shipments.get(&id).cloned()
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    pub async fn shipment_count(&self) -> usize {
        self.state.lock().await.shipments.len()
    }

    pub async fn order_items(&self, order_id: Uuid) -> Vec<OrderItem> {
        self.state
            .lock()
            .await
            .order_items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect()
    }

    pub async fn route_links(&self, shipment_id: Uuid) -> usize {
        self.state
            .lock()
            .await
            .route_shipments
            .iter()
            .filter(|link| link.shipment_id == shipment_id)
            .count()
    }

    pub async fn scan_logs(&self, shipment_id: Uuid) -> Vec<ScanLogEntry> {
        self.state
            .lock()
            .await
            .scan_logs
            .iter()
            .filter(|entry| entry.shipment_id == shipment_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        let faults = self.faults_guard().clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            faults,
        }))
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    faults: HashSet<FailPoint>,
}

impl MemoryUnitOfWork {
    fn check(&self, point: FailPoint) -> StoreResult<()> {
        if self.faults.contains(&point) {
            return Err(StoreError::Unavailable(format!("injected failure at {point:?}")));
        }
        Ok(())
    }

    fn raced(&self, point: FailPoint) -> bool {
        self.faults.contains(&point)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn lock_products(&mut self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.working.products.get(id).cloned())
            .collect())
    }

    async fn decrement_stock(&mut self, product_id: Uuid, quantity: i32) -> StoreResult<bool> {
        if self.raced(FailPoint::RacedDecrement) {
            if let Some(product) = self.working.products.get_mut(&product_id) {
                product.stock = 0;
            }
        }

        match self.working.products.get_mut(&product_id) {
            Some(product) if product.is_active && product.stock >= quantity => {
                product.stock -= quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        self.check(FailPoint::InsertOrder)?;
        self.working.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn insert_order_items(&mut self, items: &[OrderItem]) -> StoreResult<()> {
        self.check(FailPoint::InsertOrderItems)?;
        self.working.order_items.extend_from_slice(items);
        Ok(())
    }

    async fn insert_shipment(&mut self, shipment: &Shipment) -> StoreResult<()> {
        self.check(FailPoint::InsertShipment)?;
        if self.working.shipments.values().any(|s| s.code == shipment.code) {
            return Err(StoreError::UniqueViolation("shipments_code_key".into()));
        }
        self.working.shipments.insert(shipment.id, shipment.clone());
        Ok(())
    }

    async fn find_shipment(&mut self, id: Uuid) -> StoreResult<Option<Shipment>> {
        Ok(self.working.shipments.get(&id).cloned())
    }

    async fn find_shipment_by_code(&mut self, code: &str) -> StoreResult<Option<Shipment>> {
        Ok(self
            .working
            .shipments
            .values()
            .find(|s| s.code == code)
            .cloned())
    }

    async fn transition_shipment(
        &mut self,
        id: Uuid,
        from: ShipmentStatus,
        to: ShipmentStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<Shipment>> {
        if self.raced(FailPoint::RacedTransition) {
            if let Some(shipment) = self.working.shipments.get_mut(&id) {
                if shipment.status == from {
                    shipment.status = to;
                    shipment.delivered_at = delivered_at.or(shipment.delivered_at);
                }
            }
        }

        match self.working.shipments.get_mut(&id) {
            Some(shipment) if shipment.status == from => {
                shipment.status = to;
                if delivered_at.is_some() {
                    shipment.delivered_at = delivered_at;
                }
                Ok(Some(shipment.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn set_proof_photo(&mut self, id: Uuid, url: &str) -> StoreResult<Option<Shipment>> {
        Ok(self.working.shipments.get_mut(&id).map(|shipment| {
            shipment.proof_photo_url = Some(url.to_string());
            shipment.clone()
        }))
    }

    async fn insert_route(&mut self, route: &Route) -> StoreResult<()> {
        self.working.routes.insert(route.id, route.clone());
        Ok(())
    }

    async fn find_route(&mut self, id: Uuid) -> StoreResult<Option<Route>> {
        Ok(self.working.routes.get(&id).cloned())
    }

    async fn insert_route_shipment(&mut self, link: &RouteShipment) -> StoreResult<()> {
        self.check(FailPoint::InsertRouteShipment)?;
        if self
            .working
            .route_shipments
            .iter()
            .any(|existing| existing.shipment_id == link.shipment_id)
        {
            return Err(StoreError::UniqueViolation(
                "route_shipments_shipment_id_key".into(),
            ));
        }
        self.working.route_shipments.push(link.clone());
        Ok(())
    }

    async fn driver_owns_shipment(&mut self, driver_id: Uuid, shipment_id: Uuid) -> StoreResult<bool> {
        let routes = &self.working.routes;
        Ok(self.working.route_shipments.iter().any(|link| {
            link.shipment_id == shipment_id
                && routes
                    .get(&link.route_id)
                    .is_some_and(|route| route.driver_id == driver_id)
        }))
    }

    async fn append_scan_log(&mut self, entry: &ScanLogEntry) -> StoreResult<()> {
        self.check(FailPoint::AppendScanLog)?;
        self.working.scan_logs.push(entry.clone());
        Ok(())
    }

    async fn list_scan_logs(&mut self, shipment_id: Uuid) -> StoreResult<Vec<ScanLogEntry>> {
        let mut entries: Vec<ScanLogEntry> = self
            .working
            .scan_logs
            .iter()
            .filter(|entry| entry.shipment_id == shipment_id)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.created_at);
        Ok(entries)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
