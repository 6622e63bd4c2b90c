// ============================================================================
// Access - roles, actors and the per-operation allow-list
// ============================================================================

pub mod value_objects;
pub mod gate;

pub use value_objects::*;
pub use gate::*;
