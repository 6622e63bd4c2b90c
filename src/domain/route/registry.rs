use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::access::Role;
use crate::domain::errors::FulfillmentError;
use crate::domain::shipment::{Shipment, ShipmentStateMachine};
use crate::store::{settle, Store, StoreError, UnitOfWork};
use super::value_objects::{Route, RouteShipment, RouteStatus};

// ============================================================================
// Route Assignment Registry
// ============================================================================
//
// Links shipments to driver routes. The link insert and the shipment's
// created -> assigned transition share one unit of work, so a link never
// exists without the status change or the other way round. The unique
// constraint on the link's shipment id settles concurrent attempts.
//
// ============================================================================

pub struct RouteRegistry {
    store: Arc<dyn Store>,
}

impl RouteRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create_route(
        &self,
        driver_id: Uuid,
        route_date: NaiveDate,
    ) -> Result<Route, FulfillmentError> {
        let mut uow = self.store.begin().await?;
        let result = Self::insert_route(uow.as_mut(), driver_id, route_date).await;
        let route = settle(uow, result).await?;

        tracing::info!(
            route_id = %route.id,
            driver_id = %route.driver_id,
            route_date = %route.route_date,
            "🚚 Route created"
        );

        Ok(route)
    }

    pub async fn link_shipment(
        &self,
        route_id: Uuid,
        shipment_id: Uuid,
    ) -> Result<(RouteShipment, Shipment), FulfillmentError> {
        let mut uow = self.store.begin().await?;
        let result = Self::link(uow.as_mut(), route_id, shipment_id).await;
        let (link, shipment) = settle(uow, result).await?;

        tracing::info!(
            route_id = %route_id,
            shipment_id = %shipment_id,
            status = %shipment.status,
            "🔗 Shipment linked to route"
        );

        Ok((link, shipment))
    }

    async fn insert_route(
        uow: &mut dyn UnitOfWork,
        driver_id: Uuid,
        route_date: NaiveDate,
    ) -> Result<Route, FulfillmentError> {
        let driver = uow
            .find_user(driver_id)
            .await?
            .ok_or(FulfillmentError::DriverNotFound(driver_id))?;

        if driver.role != Role::Driver {
            return Err(FulfillmentError::TargetNotDriver(driver_id));
        }

        let route = Route {
            id: Uuid::new_v4(),
            driver_id,
            route_date,
            status: RouteStatus::Assigned,
            created_at: Utc::now(),
        };
        uow.insert_route(&route).await?;

        Ok(route)
    }

    async fn link(
        uow: &mut dyn UnitOfWork,
        route_id: Uuid,
        shipment_id: Uuid,
    ) -> Result<(RouteShipment, Shipment), FulfillmentError> {
        uow.find_route(route_id)
            .await?
            .ok_or(FulfillmentError::RouteNotFound(route_id))?;

        let shipment = uow
            .find_shipment(shipment_id)
            .await?
            .ok_or_else(|| FulfillmentError::ShipmentNotFound(shipment_id.to_string()))?;

        let link = RouteShipment::new(route_id, shipment_id);
        match uow.insert_route_shipment(&link).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation(_)) => {
                return Err(FulfillmentError::ShipmentAlreadyAssigned(shipment_id));
            }
            Err(e) => return Err(e.into()),
        }

        let shipment = ShipmentStateMachine::assign(uow, &shipment).await?;

        Ok((link, shipment))
    }
}
