// ============================================================================
// Route Domain - driver routes and shipment assignment
// ============================================================================

pub mod value_objects;
pub mod registry;

pub use value_objects::*;
pub use registry::*;
