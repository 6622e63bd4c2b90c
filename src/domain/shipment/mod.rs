// ============================================================================
// Shipment Domain
// ============================================================================
//
// - Value objects (Shipment, ShipmentStatus, ScanAction)
// - Code generation for scannable shipment codes
// - Commands (ScanShipment, AttachProof)
// - State machine (created -> assigned -> out_for_delivery -> delivered)
//
// ============================================================================

pub mod value_objects;
pub mod code;
pub mod commands;
pub mod state_machine;

pub use value_objects::*;
pub use code::*;
pub use commands::*;
pub use state_machine::*;
