// ============================================================================
// Order Fulfillment Core
// ============================================================================
//
// Order placement with atomic stock reservation, and the shipment lifecycle
// from route assignment through pickup and delivery, with an audit trail of
// every driver scan.
//
// Layers:
// - domain/  - business rules, one directory per component
// - store/   - unit of work over PostgreSQL or memory
// - service  - role-checked operations
// - api/     - actix-web surface
// - metrics/ - Prometheus registry
//
// ============================================================================

pub mod api;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod service;
pub mod store;
pub mod utils;
