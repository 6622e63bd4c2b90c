// ============================================================================
// Scan Domain - forensic trail of driver scans
// ============================================================================

pub mod value_objects;
pub mod ledger;

pub use value_objects::*;
pub use ledger::*;
