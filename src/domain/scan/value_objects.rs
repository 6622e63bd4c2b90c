use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::shipment::ScanAction;

// ============================================================================
// Scan Log Value Objects
// ============================================================================

/// Append-only audit record of one scan attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanLogEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub shipment_id: Uuid,
    pub action: ScanAction,
    pub code: String,
    pub outcome: ScanOutcome,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    Accepted,
    NotInYourRoute,
    InvalidTransition,
}

impl ScanOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanOutcome::Accepted => "accepted",
            ScanOutcome::NotInYourRoute => "not_in_your_route",
            ScanOutcome::InvalidTransition => "invalid_transition",
        }
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accepted" => Ok(ScanOutcome::Accepted),
            "not_in_your_route" => Ok(ScanOutcome::NotInYourRoute),
            "invalid_transition" => Ok(ScanOutcome::InvalidTransition),
            other => Err(format!("unknown scan outcome: {other}")),
        }
    }
}
