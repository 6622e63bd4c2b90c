use uuid::Uuid;

use crate::domain::inventory::OrderLine;

// ============================================================================
// Order Commands
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub customer_id: Uuid,
    pub lines: Vec<OrderLine>,
}
