// ============================================================================
// Inventory Domain - product price, stock and the reservation ledger
// ============================================================================

pub mod value_objects;
pub mod ledger;

pub use value_objects::*;
pub use ledger::*;
