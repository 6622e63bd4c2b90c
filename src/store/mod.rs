// ============================================================================
// Store - Unit of Work over the backing store
// ============================================================================
//
// Every multi-row write goes through one `UnitOfWork`. Nothing is visible to
// other callers until `commit`; `rollback` (or dropping the unit) discards
// everything, which is also how a reservation is released when a later step
// of order creation fails.
//
// Implementations:
// - postgres/ - sqlx transaction with row locks and conditional updates
// - memory/   - serialized in-process store used by tests and demo runs
//
// ============================================================================

mod error;
mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::access::User;
use crate::domain::inventory::Product;
use crate::domain::order::{Order, OrderItem};
use crate::domain::route::{Route, RouteShipment};
use crate::domain::scan::ScanLogEntry;
use crate::domain::shipment::{Shipment, ShipmentStatus};

pub use error::{StoreError, StoreResult};
pub use memory::{FailPoint, MemoryStore};
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Open a new unit of work.
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;
}

#[async_trait]
pub trait UnitOfWork: Send {
    // Users
    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<User>>;

    // Inventory
    /// Load and lock the given products for the rest of the unit of work.
    async fn lock_products(&mut self, ids: &[Uuid]) -> StoreResult<Vec<Product>>;

    /// Decrement stock only if at least `quantity` is left. Returns false otherwise.
    async fn decrement_stock(&mut self, product_id: Uuid, quantity: i32) -> StoreResult<bool>;

    // Orders
    async fn insert_order(&mut self, order: &Order) -> StoreResult<()>;
    async fn insert_order_items(&mut self, items: &[OrderItem]) -> StoreResult<()>;

    // Shipments
    async fn insert_shipment(&mut self, shipment: &Shipment) -> StoreResult<()>;
    async fn find_shipment(&mut self, id: Uuid) -> StoreResult<Option<Shipment>>;
    async fn find_shipment_by_code(&mut self, code: &str) -> StoreResult<Option<Shipment>>;

    /// Move a shipment from `from` to `to` only if it is still in `from`.
    /// Returns the updated shipment, or `None` when the precondition no longer holds.
    async fn transition_shipment(
        &mut self,
        id: Uuid,
        from: ShipmentStatus,
        to: ShipmentStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<Shipment>>;

    async fn set_proof_photo(&mut self, id: Uuid, url: &str) -> StoreResult<Option<Shipment>>;

    // Routes
    async fn insert_route(&mut self, route: &Route) -> StoreResult<()>;
    async fn find_route(&mut self, id: Uuid) -> StoreResult<Option<Route>>;

    /// Fails with [`StoreError::UniqueViolation`] if the shipment is already linked.
    async fn insert_route_shipment(&mut self, link: &RouteShipment) -> StoreResult<()>;

    /// Whether the shipment sits on a route owned by `driver_id`.
    async fn driver_owns_shipment(&mut self, driver_id: Uuid, shipment_id: Uuid) -> StoreResult<bool>;

    // Scan log
    async fn append_scan_log(&mut self, entry: &ScanLogEntry) -> StoreResult<()>;
    async fn list_scan_logs(&mut self, shipment_id: Uuid) -> StoreResult<Vec<ScanLogEntry>>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Commit on success, roll back on failure.
///
/// A rollback failure is logged and the original error is returned; the
/// store discards an unfinished transaction on its own.
pub async fn settle<T, E>(uow: Box<dyn UnitOfWork>, result: Result<T, E>) -> Result<T, E>
where
    E: From<StoreError>,
{
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = uow.rollback().await {
                tracing::warn!(error = %rollback_error, "Rollback failed");
            }
            Err(error)
        }
    }
}
