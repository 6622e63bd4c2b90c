use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::FulfillmentError;
use crate::domain::scan::{ScanAttempt, ScanLedger, ScanOutcome};
use crate::store::{settle, Store, UnitOfWork};
use super::commands::{AttachProof, ScanShipment};
use super::value_objects::{ScanAction, Shipment, ShipmentStatus};

// ============================================================================
// Shipment State Machine
// ============================================================================
//
//   created --(route linked)--> assigned --(pickup)--> out_for_delivery
//           --(delivered)--> delivered
//
// No skipping, no moving backward; delivered is terminal.
//
// Every attempt is authorized (route ownership), validated against the
// current state, then applied as a conditional update. Scan attempts are
// logged in the same unit of work whether or not the status moved.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    RouteLinked,
    Scan(ScanAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ShipmentStatus,
    pub to: ShipmentStatus,
}

impl Transition {
    /// The legal move for `trigger` out of `current`, if any.
    pub fn plan(current: ShipmentStatus, trigger: Trigger) -> Option<Transition> {
        use ShipmentStatus::*;

        let to = match (current, trigger) {
            (Created, Trigger::RouteLinked) => Assigned,
            (Assigned, Trigger::Scan(ScanAction::Pickup)) => OutForDelivery,
            (OutForDelivery, Trigger::Scan(ScanAction::Delivered)) => Delivered,
            _ => return None,
        };

        Some(Transition { from: current, to })
    }

    /// The transition a scan action performs when it succeeds.
    pub fn for_action(action: ScanAction) -> Transition {
        match action {
            ScanAction::Pickup => Transition {
                from: ShipmentStatus::Assigned,
                to: ShipmentStatus::OutForDelivery,
            },
            ScanAction::Delivered => Transition {
                from: ShipmentStatus::OutForDelivery,
                to: ShipmentStatus::Delivered,
            },
        }
    }
}

pub struct ShipmentStateMachine {
    store: Arc<dyn Store>,
}

impl ShipmentStateMachine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// created -> assigned, inside the route-link unit of work.
    pub async fn assign(
        uow: &mut dyn UnitOfWork,
        shipment: &Shipment,
    ) -> Result<Shipment, FulfillmentError> {
        let transition = Transition::plan(shipment.status, Trigger::RouteLinked)
            .ok_or(FulfillmentError::ShipmentAlreadyAssigned(shipment.id))?;

        let assigned = uow
            .transition_shipment(shipment.id, transition.from, transition.to, None)
            .await?
            .ok_or(FulfillmentError::ShipmentAlreadyAssigned(shipment.id))?;

        tracing::debug!(
            shipment_id = %shipment.id,
            from = %transition.from,
            to = %transition.to,
            "Shipment transitioned"
        );

        Ok(assigned)
    }

    /// Apply a driver scan. The scan is logged even when it is rejected.
    pub async fn scan(&self, command: ScanShipment) -> Result<Shipment, FulfillmentError> {
        command.validate()?;

        let mut uow = self.store.begin().await?;

        let shipment = match Self::resolve_code(uow.as_mut(), &command.code).await {
            Ok(shipment) => shipment,
            Err(error) => return settle(uow, Err(error)).await,
        };

        let result = Self::advance(uow.as_mut(), &command, &shipment).await;

        let Some(outcome) = scan_outcome(&result) else {
            return settle(uow, result).await;
        };

        let attempt = ScanAttempt {
            actor_id: command.driver_id,
            shipment_id: shipment.id,
            action: command.action,
            code: command.code.clone(),
        };
        if let Err(error) = ScanLedger::record(uow.as_mut(), attempt, outcome).await {
            return settle(uow, Err(error.into())).await;
        }

        uow.commit().await?;

        match &result {
            Ok(updated) => tracing::info!(
                shipment_id = %updated.id,
                driver_id = %command.driver_id,
                action = %command.action,
                status = %updated.status,
                "✅ Scan accepted"
            ),
            Err(error) => tracing::warn!(
                shipment_id = %shipment.id,
                driver_id = %command.driver_id,
                action = %command.action,
                error = %error,
                "Scan rejected"
            ),
        }

        result
    }

    /// Attach a proof photo. Does not gate or trigger any transition.
    pub async fn attach_proof(&self, command: AttachProof) -> Result<Shipment, FulfillmentError> {
        command.validate()?;

        let mut uow = self.store.begin().await?;
        let result = Self::store_proof(uow.as_mut(), &command).await;
        let shipment = settle(uow, result).await?;

        tracing::info!(
            shipment_id = %shipment.id,
            driver_id = %command.driver_id,
            "Proof photo attached"
        );

        Ok(shipment)
    }

    pub async fn resolve_code(
        uow: &mut dyn UnitOfWork,
        code: &str,
    ) -> Result<Shipment, FulfillmentError> {
        uow.find_shipment_by_code(code)
            .await?
            .ok_or_else(|| FulfillmentError::ShipmentNotFound(code.to_string()))
    }

    async fn ensure_on_route(
        uow: &mut dyn UnitOfWork,
        driver_id: Uuid,
        shipment_id: Uuid,
    ) -> Result<(), FulfillmentError> {
        if uow.driver_owns_shipment(driver_id, shipment_id).await? {
            Ok(())
        } else {
            Err(FulfillmentError::NotInYourRoute(shipment_id))
        }
    }

    async fn advance(
        uow: &mut dyn UnitOfWork,
        command: &ScanShipment,
        shipment: &Shipment,
    ) -> Result<Shipment, FulfillmentError> {
        Self::ensure_on_route(uow, command.driver_id, shipment.id).await?;

        let invalid = |from: ShipmentStatus| FulfillmentError::InvalidTransition {
            from,
            action: command.action,
        };

        let transition = Transition::plan(shipment.status, Trigger::Scan(command.action))
            .ok_or_else(|| invalid(shipment.status))?;

        let delivered_at = (transition.to == ShipmentStatus::Delivered).then(Utc::now);

        match uow
            .transition_shipment(shipment.id, transition.from, transition.to, delivered_at)
            .await?
        {
            Some(updated) => Ok(updated),
            None => {
                // Lost a race with a concurrent scan; report what it left behind.
                let current = uow
                    .find_shipment(shipment.id)
                    .await?
                    .map_or(shipment.status, |s| s.status);
                Err(invalid(current))
            }
        }
    }

    async fn store_proof(
        uow: &mut dyn UnitOfWork,
        command: &AttachProof,
    ) -> Result<Shipment, FulfillmentError> {
        let shipment = Self::resolve_code(uow, &command.code).await?;
        Self::ensure_on_route(uow, command.driver_id, shipment.id).await?;

        uow.set_proof_photo(shipment.id, &command.photo_url)
            .await?
            .ok_or_else(|| FulfillmentError::ShipmentNotFound(command.code.clone()))
    }
}

/// What a finished attempt means for the audit trail. `None` for failures
/// that should roll the whole unit back instead.
pub(crate) fn scan_outcome(result: &Result<Shipment, FulfillmentError>) -> Option<ScanOutcome> {
    match result {
        Ok(_) => Some(ScanOutcome::Accepted),
        Err(FulfillmentError::NotInYourRoute(_)) => Some(ScanOutcome::NotInYourRoute),
        Err(FulfillmentError::InvalidTransition { .. }) => Some(ScanOutcome::InvalidTransition),
        Err(_) => None,
    }
}
