use actix_web::{web, HttpRequest, HttpResponse};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::access::Actor;
use crate::domain::errors::FulfillmentError;
use crate::domain::inventory::OrderLine;
use crate::domain::shipment::ScanAction;
use super::{AppState, ACTOR_HEADER};

type ApiResult = Result<HttpResponse, FulfillmentError>;

/// A JSON body whose parse failure is reported only after the caller is known.
type Body<T> = Result<web::Json<T>, actix_web::Error>;

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OrderLineBody {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    pub items: Vec<OrderLineBody>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRouteBody {
    pub driver_id: Uuid,
    pub route_date: String,
}

#[derive(Debug, Deserialize)]
pub struct LinkShipmentBody {
    pub route_id: Uuid,
    pub shipment_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ScanBody {
    pub code: String,
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct ProofBody {
    pub code: String,
    pub proof_photo_url: String,
}

// ============================================================================
// Handlers
// ============================================================================

async fn actor(req: &HttpRequest, state: &AppState) -> Result<Actor, FulfillmentError> {
    let credential = req
        .headers()
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok());
    state.gate.resolve(credential).await
}

fn parse<T>(body: Body<T>) -> Result<T, FulfillmentError> {
    body.map(web::Json::into_inner)
        .map_err(|err| FulfillmentError::validation(format!("invalid request body: {err}")))
}

pub async fn create_order(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: Body<CreateOrderBody>,
) -> ApiResult {
    let actor = actor(&req, &state).await?;
    let lines = parse(body)?
        .items
        .into_iter()
        .map(|item| OrderLine::new(item.product_id, item.quantity))
        .collect();

    let placed = state.service.create_order(&actor, lines).await?;
    Ok(HttpResponse::Created().json(placed))
}

pub async fn create_route(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: Body<CreateRouteBody>,
) -> ApiResult {
    let actor = actor(&req, &state).await?;
    let body = parse(body)?;
    let route_date = NaiveDate::parse_from_str(body.route_date.trim(), "%Y-%m-%d")
        .map_err(|_| FulfillmentError::validation("route_date must be YYYY-MM-DD"))?;

    let route = state
        .service
        .create_route(&actor, body.driver_id, route_date)
        .await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "route": route })))
}

pub async fn link_shipment(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: Body<LinkShipmentBody>,
) -> ApiResult {
    let actor = actor(&req, &state).await?;
    let body = parse(body)?;

    let (route_shipment, shipment) = state
        .service
        .link_shipment_to_route(&actor, body.route_id, body.shipment_id)
        .await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "route_shipment": route_shipment,
        "shipment": shipment,
    })))
}

pub async fn scan_shipment(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: Body<ScanBody>,
) -> ApiResult {
    let actor = actor(&req, &state).await?;
    let body = parse(body)?;
    let action: ScanAction = body.action.parse().map_err(FulfillmentError::Validation)?;

    let shipment = state.service.scan_shipment(&actor, body.code, action).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "shipment": shipment })))
}

pub async fn attach_proof(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: Body<ProofBody>,
) -> ApiResult {
    let actor = actor(&req, &state).await?;
    let body = parse(body)?;

    let shipment = state
        .service
        .attach_proof(&actor, body.code, body.proof_photo_url)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "shipment": shipment })))
}

pub async fn scan_history(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult {
    let actor = actor(&req, &state).await?;
    let shipment_id = Uuid::parse_str(&path)
        .map_err(|_| FulfillmentError::validation("shipment id must be a uuid"))?;

    let scans = state.service.shipment_scan_history(&actor, shipment_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "scans": scans })))
}

pub async fn metrics(state: web::Data<AppState>) -> HttpResponse {
    match state.service.metrics().render() {
        Ok(buffer) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(buffer),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "order-fulfillment"
    }))
}
