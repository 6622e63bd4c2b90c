// ============================================================================
// HTTP API - thin actix-web surface over FulfillmentService
// ============================================================================
//
// Routes:
// - POST /api/orders                  (customer)
// - POST /api/routes                  (admin)
// - POST /api/routes/shipments        (admin)
// - POST /api/shipments/scan          (driver)
// - POST /api/shipments/proof         (driver)
// - GET  /api/shipments/{id}/scans    (admin)
// - GET  /metrics, GET /health
//
// The caller's credential travels in the `x-actor-id` header and is resolved
// by the configured `AccessGate`.
//
// ============================================================================

mod error;
mod handlers;

use std::sync::Arc;

use actix_web::web;

use crate::domain::access::AccessGate;
use crate::service::FulfillmentService;

pub use error::ErrorBody;

pub const ACTOR_HEADER: &str = "x-actor-id";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FulfillmentService>,
    pub gate: Arc<dyn AccessGate>,
}

impl AppState {
    pub fn new(service: Arc<FulfillmentService>, gate: Arc<dyn AccessGate>) -> Self {
        Self { service, gate }
    }
}

/// Register every route. Shared by the server and the handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health))
        .route("/metrics", web::get().to(handlers::metrics))
        .service(
            web::scope("/api")
                .route("/orders", web::post().to(handlers::create_order))
                .route("/routes", web::post().to(handlers::create_route))
                .route("/routes/shipments", web::post().to(handlers::link_shipment))
                .route("/shipments/scan", web::post().to(handlers::scan_shipment))
                .route("/shipments/proof", web::post().to(handlers::attach_proof))
                .route("/shipments/{id}/scans", web::get().to(handlers::scan_history)),
        );
}
