use sha2::{Digest, Sha256};
use uuid::Uuid;

// ============================================================================
// Shipment Code Generation
// ============================================================================
//
// Codes are opaque scan tokens. The default generator hashes a random v4
// uuid together with a server-side pepper so codes cannot be enumerated.
//
// ============================================================================

pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

pub struct PepperedCodeGenerator {
    pepper: String,
}

impl PepperedCodeGenerator {
    pub fn new(pepper: impl Into<String>) -> Self {
        Self { pepper: pepper.into() }
    }

    fn peppered(&self, seed: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.pepper.as_bytes());
        hasher.update(b":");
        hasher.update(seed.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl CodeGenerator for PepperedCodeGenerator {
    fn generate(&self) -> String {
        self.peppered(&Uuid::new_v4().to_string())
    }
}
