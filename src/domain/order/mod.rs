// ============================================================================
// Order Domain
// ============================================================================
//
// - Value objects (Order, OrderItem, OrderStatus)
// - Commands (CreateOrder)
// - Coordinator (OrderCoordinator, the order-creation transaction boundary)
//
// ============================================================================

pub mod value_objects;
pub mod commands;
pub mod coordinator;

// Re-export for convenience
pub use value_objects::*;
pub use commands::*;
pub use coordinator::*;
