use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::FulfillmentError;

// ============================================================================
// Access Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Driver,
    Warehouse,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Driver => "driver",
            Role::Warehouse => "warehouse",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "driver" => Ok(Role::Driver),
            "warehouse" => Ok(Role::Warehouse),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A user row as far as this core cares: identity plus role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub role: Role,
}

/// The operations a caller can invoke, each with its own role allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateOrder,
    CreateRoute,
    LinkShipmentToRoute,
    ScanShipment,
    AttachProof,
    ShipmentScanHistory,
}

impl Operation {
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Operation::CreateOrder => &[Role::Customer],
            Operation::CreateRoute
            | Operation::LinkShipmentToRoute
            | Operation::ShipmentScanHistory => &[Role::Admin],
            Operation::ScanShipment | Operation::AttachProof => &[Role::Driver],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateOrder => "create_order",
            Operation::CreateRoute => "create_route",
            Operation::LinkShipmentToRoute => "link_shipment_to_route",
            Operation::ScanShipment => "scan_shipment",
            Operation::AttachProof => "attach_proof",
            Operation::ShipmentScanHistory => "shipment_scan_history",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Authenticated caller, as produced by an [`AccessGate`](super::AccessGate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    /// Check the allow-list for `operation`. Runs before any store access.
    pub fn authorize(&self, operation: Operation) -> Result<(), FulfillmentError> {
        if operation.allowed_roles().contains(&self.role) {
            Ok(())
        } else {
            Err(FulfillmentError::RoleNotAllowed {
                role: self.role,
                operation,
            })
        }
    }
}
