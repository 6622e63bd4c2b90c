use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::FulfillmentError;
use crate::domain::shipment::ScanAction;
use crate::store::{settle, Store, StoreResult, UnitOfWork};
use super::value_objects::{ScanLogEntry, ScanOutcome};

// ============================================================================
// Scan Ledger - append-only audit of driver scans
// ============================================================================
//
// One entry per scan attempt, whatever the outcome. No uniqueness: repeating
// the same scan appends the same record again.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct ScanAttempt {
    pub actor_id: Uuid,
    pub shipment_id: Uuid,
    pub action: ScanAction,
    pub code: String,
}

pub struct ScanLedger {
    store: Arc<dyn Store>,
}

impl ScanLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Append an entry inside the caller's unit of work.
    pub async fn record(
        uow: &mut dyn UnitOfWork,
        attempt: ScanAttempt,
        outcome: ScanOutcome,
    ) -> StoreResult<ScanLogEntry> {
        let entry = ScanLogEntry {
            id: Uuid::new_v4(),
            actor_id: attempt.actor_id,
            shipment_id: attempt.shipment_id,
            action: attempt.action,
            code: attempt.code,
            outcome,
            created_at: Utc::now(),
        };

        uow.append_scan_log(&entry).await?;

        tracing::debug!(
            scan_id = %entry.id,
            shipment_id = %entry.shipment_id,
            actor_id = %entry.actor_id,
            action = %entry.action,
            outcome = %entry.outcome,
            "Scan recorded"
        );

        Ok(entry)
    }

    /// Audit trail for one shipment, oldest first.
    pub async fn history(&self, shipment_id: Uuid) -> Result<Vec<ScanLogEntry>, FulfillmentError> {
        let mut uow = self.store.begin().await?;
        let result = Self::load_history(uow.as_mut(), shipment_id).await;
        settle(uow, result).await
    }

    async fn load_history(
        uow: &mut dyn UnitOfWork,
        shipment_id: Uuid,
    ) -> Result<Vec<ScanLogEntry>, FulfillmentError> {
        if uow.find_shipment(shipment_id).await?.is_none() {
            return Err(FulfillmentError::ShipmentNotFound(shipment_id.to_string()));
        }
        Ok(uow.list_scan_logs(shipment_id).await?)
    }
}
