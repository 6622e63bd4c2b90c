use uuid::Uuid;

use crate::store::StoreError;
use super::access::{Operation, Role};
use super::shipment::{ScanAction, ShipmentStatus};

// ============================================================================
// Fulfillment Errors
// ============================================================================
//
// Every failure a caller can observe. Each variant carries a stable kind
// string and an HTTP status so the outer surface never has to guess.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FulfillmentError {
    // Authorization
    #[error("Missing or invalid credential")]
    Unauthenticated,

    #[error("Role {role} may not perform {operation}")]
    RoleNotAllowed { role: Role, operation: Operation },

    #[error("Shipment {0} is not on any of your routes")]
    NotInYourRoute(Uuid),

    // Validation
    #[error("Invalid input: {0}")]
    Validation(String),

    // Not found
    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Route not found: {0}")]
    RouteNotFound(Uuid),

    #[error("Shipment not found: {0}")]
    ShipmentNotFound(String),

    #[error("Driver not found: {0}")]
    DriverNotFound(Uuid),

    // Business rules
    #[error("Product is not active: {0}")]
    ProductNotActive(Uuid),

    #[error("Product {product_id} is out of stock (requested {requested}, available {available})")]
    OutOfStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("User {0} is not a driver")]
    TargetNotDriver(Uuid),

    #[error("Shipment {0} is already assigned to a route")]
    ShipmentAlreadyAssigned(Uuid),

    #[error("Cannot apply {action} to a shipment in status {from}")]
    InvalidTransition {
        from: ShipmentStatus,
        action: ScanAction,
    },

    // Infrastructure
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl FulfillmentError {
    /// Stable error kind reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::RoleNotAllowed { .. } => "ROLE_NOT_ALLOWED",
            Self::NotInYourRoute(_) => "NOT_IN_YOUR_ROUTE",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::RouteNotFound(_) => "ROUTE_NOT_FOUND",
            Self::ShipmentNotFound(_) => "SHIPMENT_NOT_FOUND",
            Self::DriverNotFound(_) => "DRIVER_NOT_FOUND",
            Self::ProductNotActive(_) => "PRODUCT_NOT_ACTIVE",
            Self::OutOfStock { .. } => "OUT_OF_STOCK",
            Self::TargetNotDriver(_) => "TARGET_NOT_DRIVER",
            Self::ShipmentAlreadyAssigned(_) => "SHIPMENT_ALREADY_ASSIGNED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Storage(_) => "INTERNAL_ERROR",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::RoleNotAllowed { .. } | Self::NotInYourRoute(_) => 403,
            Self::ProductNotFound(_)
            | Self::RouteNotFound(_)
            | Self::ShipmentNotFound(_)
            | Self::DriverNotFound(_) => 404,
            Self::Validation(_)
            | Self::ProductNotActive(_)
            | Self::OutOfStock { .. }
            | Self::TargetNotDriver(_)
            | Self::ShipmentAlreadyAssigned(_)
            | Self::InvalidTransition { .. } => 400,
            Self::Storage(_) => 500,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_upper_snake() {
        let errors = vec![
            FulfillmentError::Unauthenticated,
            FulfillmentError::NotInYourRoute(Uuid::new_v4()),
            FulfillmentError::OutOfStock {
                product_id: Uuid::new_v4(),
                requested: 2,
                available: 1,
            },
            FulfillmentError::InvalidTransition {
                from: ShipmentStatus::Created,
                action: ScanAction::Pickup,
            },
        ];

        for error in errors {
            let kind = error.kind();
            assert!(kind.chars().all(|c| c.is_ascii_uppercase() || c == '_'), "{kind}");
        }
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(FulfillmentError::Unauthenticated.http_status(), 401);
        assert_eq!(
            FulfillmentError::RoleNotAllowed {
                role: Role::Customer,
                operation: Operation::CreateRoute,
            }
            .http_status(),
            403
        );
        assert_eq!(FulfillmentError::NotInYourRoute(Uuid::new_v4()).http_status(), 403);
        assert_eq!(FulfillmentError::RouteNotFound(Uuid::new_v4()).http_status(), 404);
        assert_eq!(FulfillmentError::ShipmentAlreadyAssigned(Uuid::new_v4()).http_status(), 400);
        assert_eq!(FulfillmentError::validation("empty").http_status(), 400);
        assert_eq!(
            FulfillmentError::Storage(StoreError::Unavailable("down".into())).http_status(),
            500
        );
    }

    #[test]
    fn test_out_of_stock_message_names_the_product() {
        let product_id = Uuid::new_v4();
        let error = FulfillmentError::OutOfStock {
            product_id,
            requested: 3,
            available: 1,
        };

        assert!(error.to_string().contains(&product_id.to_string()));
        assert_eq!(error.kind(), "OUT_OF_STOCK");
    }
}
