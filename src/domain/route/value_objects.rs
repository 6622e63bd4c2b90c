use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Route Value Objects
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub route_date: NaiveDate,
    pub status: RouteStatus,
    pub created_at: DateTime<Utc>,
}

/// Route-level status. Independent of the status of the shipments on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Assigned,
}

impl RouteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Assigned => "assigned",
        }
    }
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigned" => Ok(RouteStatus::Assigned),
            other => Err(format!("unknown route status: {other}")),
        }
    }
}

/// Link between a route and a shipment. At most one per shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteShipment {
    pub id: Uuid,
    pub route_id: Uuid,
    pub shipment_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl RouteShipment {
    pub fn new(route_id: Uuid, shipment_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            route_id,
            shipment_id,
            created_at: Utc::now(),
        }
    }
}
