// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each area has its own subdirectory with value objects and the component
// that owns its invariants:
// - access/    - credential resolution and the role allow-list
// - inventory/ - all-or-nothing stock reservation
// - order/     - order creation as a single unit of work
// - shipment/  - shipment codes and the delivery state machine
// - route/     - routes and the one-route-per-shipment registry
// - scan/      - append-only scan audit trail
//
// Storage lives behind `crate::store`; nothing here knows about SQL.
//
// ============================================================================

pub mod access;
pub mod errors;
pub mod inventory;
pub mod order;
pub mod route;
pub mod scan;
pub mod shipment;

pub use errors::FulfillmentError;
