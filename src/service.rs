use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::access::{Actor, Operation};
use crate::domain::errors::FulfillmentError;
use crate::domain::inventory::OrderLine;
use crate::domain::order::{CreateOrder, OrderCoordinator, PlacedOrder};
use crate::domain::route::{Route, RouteRegistry, RouteShipment};
use crate::domain::scan::{ScanLedger, ScanLogEntry};
use crate::domain::shipment::state_machine::scan_outcome;
use crate::domain::shipment::{
    AttachProof, CodeGenerator, ScanAction, ScanShipment, Shipment, ShipmentStateMachine,
    ShipmentStatus, Transition,
};
use crate::metrics::Metrics;
use crate::store::Store;

// ============================================================================
// Fulfillment Service - the operations exposed to callers
// ============================================================================
//
// Each operation:
// 1. checks the actor's role against the operation allow-list
// 2. delegates to the owning domain component
// 3. records metrics and latency
//
// The actor comes from an `AccessGate`; nothing here reads credentials.
//
// ============================================================================

pub struct FulfillmentService {
    orders: OrderCoordinator,
    routes: RouteRegistry,
    shipments: ShipmentStateMachine,
    scans: ScanLedger,
    metrics: Arc<Metrics>,
}

impl FulfillmentService {
    pub fn new(store: Arc<dyn Store>, codes: Arc<dyn CodeGenerator>, metrics: Arc<Metrics>) -> Self {
        Self {
            orders: OrderCoordinator::new(store.clone(), codes),
            routes: RouteRegistry::new(store.clone()),
            shipments: ShipmentStateMachine::new(store.clone()),
            scans: ScanLedger::new(store),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub async fn create_order(
        &self,
        actor: &Actor,
        lines: Vec<OrderLine>,
    ) -> Result<PlacedOrder, FulfillmentError> {
        self.authorize(actor, Operation::CreateOrder)?;
        let started = Instant::now();

        let result = self
            .orders
            .create_order(CreateOrder {
                customer_id: actor.id,
                lines,
            })
            .await;

        self.metrics.record_order(result.as_ref().err().map(|e| e.kind()));
        self.finish(Operation::CreateOrder, started, &result);
        result
    }

    pub async fn create_route(
        &self,
        actor: &Actor,
        driver_id: Uuid,
        route_date: NaiveDate,
    ) -> Result<Route, FulfillmentError> {
        self.authorize(actor, Operation::CreateRoute)?;
        let started = Instant::now();

        let result = self.routes.create_route(driver_id, route_date).await;

        self.finish(Operation::CreateRoute, started, &result);
        result
    }

    pub async fn link_shipment_to_route(
        &self,
        actor: &Actor,
        route_id: Uuid,
        shipment_id: Uuid,
    ) -> Result<(RouteShipment, Shipment), FulfillmentError> {
        self.authorize(actor, Operation::LinkShipmentToRoute)?;
        let started = Instant::now();

        let result = self.routes.link_shipment(route_id, shipment_id).await;

        if result.is_ok() {
            self.metrics.record_route_link();
            self.metrics.record_transition(
                ShipmentStatus::Created.as_str(),
                ShipmentStatus::Assigned.as_str(),
            );
        }
        self.finish(Operation::LinkShipmentToRoute, started, &result);
        result
    }

    pub async fn scan_shipment(
        &self,
        actor: &Actor,
        code: String,
        action: ScanAction,
    ) -> Result<Shipment, FulfillmentError> {
        self.authorize(actor, Operation::ScanShipment)?;
        let started = Instant::now();

        let result = self
            .shipments
            .scan(ScanShipment::new(actor.id, &code, action))
            .await;

        if let Some(outcome) = scan_outcome(&result) {
            self.metrics.record_scan(action.as_str(), outcome.as_str());
        }
        if result.is_ok() {
            let transition = Transition::for_action(action);
            self.metrics
                .record_transition(transition.from.as_str(), transition.to.as_str());
        }
        self.finish(Operation::ScanShipment, started, &result);
        result
    }

    pub async fn attach_proof(
        &self,
        actor: &Actor,
        code: String,
        photo_url: String,
    ) -> Result<Shipment, FulfillmentError> {
        self.authorize(actor, Operation::AttachProof)?;
        let started = Instant::now();

        let result = self
            .shipments
            .attach_proof(AttachProof::new(actor.id, &code, &photo_url))
            .await;

        self.finish(Operation::AttachProof, started, &result);
        result
    }

    pub async fn shipment_scan_history(
        &self,
        actor: &Actor,
        shipment_id: Uuid,
    ) -> Result<Vec<ScanLogEntry>, FulfillmentError> {
        self.authorize(actor, Operation::ShipmentScanHistory)?;
        let started = Instant::now();

        let result = self.scans.history(shipment_id).await;

        self.finish(Operation::ShipmentScanHistory, started, &result);
        result
    }

    fn authorize(&self, actor: &Actor, operation: Operation) -> Result<(), FulfillmentError> {
        actor.authorize(operation).inspect_err(|error| {
            tracing::warn!(
                actor_id = %actor.id,
                role = %actor.role,
                operation = %operation,
                error = %error,
                "Operation refused"
            );
        })
    }

    fn finish<T>(&self, operation: Operation, started: Instant, result: &Result<T, FulfillmentError>) {
        self.metrics
            .observe_duration(operation.name(), started.elapsed().as_secs_f64());

        if let Err(error) = result {
            match error {
                FulfillmentError::Storage(_) => tracing::error!(
                    operation = %operation,
                    error = %error,
                    "Operation failed"
                ),
                _ => tracing::debug!(
                    operation = %operation,
                    kind = error.kind(),
                    "Operation rejected"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::access::Role;
    use crate::domain::scan::ScanOutcome;
    use crate::domain::shipment::PepperedCodeGenerator;
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;

    struct World {
        store: MemoryStore,
        service: FulfillmentService,
        customer: Actor,
        admin: Actor,
        driver: Actor,
    }

    async fn world() -> World {
        let store = MemoryStore::new();
        let service = FulfillmentService::new(
            Arc::new(store.clone()),
            Arc::new(PepperedCodeGenerator::new("test-pepper")),
            Arc::new(Metrics::new().unwrap()),
        );

        let customer = Actor::new(store.seed_user(Role::Customer).await, Role::Customer);
        let admin = Actor::new(store.seed_user(Role::Admin).await, Role::Admin);
        let driver = Actor::new(store.seed_user(Role::Driver).await, Role::Driver);

        World {
            store,
            service,
            customer,
            admin,
            driver,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    #[tokio::test]
    async fn test_order_snapshot_and_shipment() {
        let w = world().await;
        let p1 = w.store.seed_product("P1", Decimal::new(1000, 2), 5, true).await;

        let placed = w
            .service
            .create_order(&w.customer, vec![OrderLine::new(p1, 2)])
            .await
            .unwrap();

        assert_eq!(placed.order.total_amount, Decimal::new(2000, 2));
        assert_eq!(placed.items.len(), 1);
        assert_eq!(placed.items[0].price_at_order, Decimal::new(1000, 2));
        assert_eq!(placed.shipment.status, ShipmentStatus::Created);
        assert_eq!(w.store.product(p1).await.unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_out_of_stock_changes_nothing() {
        let w = world().await;
        let p1 = w.store.seed_product("P1", Decimal::new(1000, 2), 1, true).await;

        let err = w
            .service
            .create_order(&w.customer, vec![OrderLine::new(p1, 2)])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "OUT_OF_STOCK");
        assert_eq!(w.store.product(p1).await.unwrap().stock, 1);
        assert_eq!(w.store.order_count().await, 0);
        assert_eq!(w.store.shipment_count().await, 0);
    }

    #[tokio::test]
    async fn test_roles_are_checked_before_any_work() {
        let w = world().await;
        let p1 = w.store.seed_product("P1", Decimal::new(1000, 2), 5, true).await;

        let err = w
            .service
            .create_order(&w.driver, vec![OrderLine::new(p1, 1)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ROLE_NOT_ALLOWED");

        let err = w.service.create_route(&w.customer, w.driver.id, date()).await.unwrap_err();
        assert_eq!(err.kind(), "ROLE_NOT_ALLOWED");

        let err = w
            .service
            .scan_shipment(&w.admin, "whatever-code".into(), ScanAction::Pickup)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ROLE_NOT_ALLOWED");

        assert_eq!(w.store.product(p1).await.unwrap().stock, 5);
        assert_eq!(w.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_full_delivery_lifecycle() {
        let w = world().await;
        let p1 = w.store.seed_product("P1", Decimal::new(250, 2), 10, true).await;

        let placed = w
            .service
            .create_order(&w.customer, vec![OrderLine::new(p1, 4)])
            .await
            .unwrap();
        let shipment = placed.shipment;

        let route = w.service.create_route(&w.admin, w.driver.id, date()).await.unwrap();
        let (_, linked) = w
            .service
            .link_shipment_to_route(&w.admin, route.id, shipment.id)
            .await
            .unwrap();
        assert_eq!(linked.status, ShipmentStatus::Assigned);

        let err = w
            .service
            .link_shipment_to_route(&w.admin, route.id, shipment.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "SHIPMENT_ALREADY_ASSIGNED");

        let picked = w
            .service
            .scan_shipment(&w.driver, shipment.code.clone(), ScanAction::Pickup)
            .await
            .unwrap();
        assert_eq!(picked.status, ShipmentStatus::OutForDelivery);

        let err = w
            .service
            .scan_shipment(&w.driver, shipment.code.clone(), ScanAction::Pickup)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "INVALID_TRANSITION");

        let delivered = w
            .service
            .scan_shipment(&w.driver, shipment.code.clone(), ScanAction::Delivered)
            .await
            .unwrap();
        assert_eq!(delivered.status, ShipmentStatus::Delivered);
        assert!(delivered.delivered_at.is_some());

        let with_proof = w
            .service
            .attach_proof(
                &w.driver,
                shipment.code.clone(),
                "https://cdn.example.com/proof/1.jpg".into(),
            )
            .await
            .unwrap();
        assert_eq!(with_proof.status, ShipmentStatus::Delivered);

        let history = w
            .service
            .shipment_scan_history(&w.admin, shipment.id)
            .await
            .unwrap();
        let outcomes: Vec<ScanOutcome> = history.iter().map(|e| e.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                ScanOutcome::Accepted,
                ScanOutcome::InvalidTransition,
                ScanOutcome::Accepted
            ]
        );
    }

    #[tokio::test]
    async fn test_scanner_newline_is_ignored() {
        let w = world().await;
        let p1 = w.store.seed_product("P1", Decimal::new(100, 2), 1, true).await;
        let placed = w
            .service
            .create_order(&w.customer, vec![OrderLine::new(p1, 1)])
            .await
            .unwrap();
        let route = w.service.create_route(&w.admin, w.driver.id, date()).await.unwrap();
        w.service
            .link_shipment_to_route(&w.admin, route.id, placed.shipment.id)
            .await
            .unwrap();

        let picked = w
            .service
            .scan_shipment(&w.driver, format!("{}\n", placed.shipment.code), ScanAction::Pickup)
            .await
            .unwrap();
        assert_eq!(picked.status, ShipmentStatus::OutForDelivery);

        let logs = w.store.scan_logs(placed.shipment.id).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].code, placed.shipment.code);
    }

    #[tokio::test]
    async fn test_scan_off_route_logs_once() {
        let w = world().await;
        let p1 = w.store.seed_product("P1", Decimal::new(100, 2), 1, true).await;
        let placed = w
            .service
            .create_order(&w.customer, vec![OrderLine::new(p1, 1)])
            .await
            .unwrap();

        let err = w
            .service
            .scan_shipment(&w.driver, placed.shipment.code.clone(), ScanAction::Pickup)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "NOT_IN_YOUR_ROUTE");
        assert_eq!(
            w.store.shipment(placed.shipment.id).await.unwrap().status,
            ShipmentStatus::Created
        );
        assert_eq!(w.store.scan_logs(placed.shipment.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_metrics_follow_operations() {
        let w = world().await;
        let p1 = w.store.seed_product("P1", Decimal::new(100, 2), 1, true).await;

        w.service
            .create_order(&w.customer, vec![OrderLine::new(p1, 1)])
            .await
            .unwrap();
        let _ = w
            .service
            .create_order(&w.customer, vec![OrderLine::new(p1, 1)])
            .await;

        let text = String::from_utf8(w.service.metrics().render().unwrap()).unwrap();
        assert!(text.contains("orders_created_total 1"));
        assert!(text.contains("order_failures_total{kind=\"OUT_OF_STOCK\"} 1"));
    }
}
