use uuid::Uuid;

use crate::domain::errors::FulfillmentError;
use super::value_objects::ScanAction;

// ============================================================================
// Shipment Commands - driver intent
// ============================================================================

pub const MIN_CODE_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct ScanShipment {
    pub driver_id: Uuid,
    pub code: String,
    pub action: ScanAction,
}

impl ScanShipment {
    /// Scanners often append whitespace or a newline; the code is stored bare.
    pub fn new(driver_id: Uuid, code: &str, action: ScanAction) -> Self {
        Self {
            driver_id,
            code: code.trim().to_string(),
            action,
        }
    }

    pub fn validate(&self) -> Result<(), FulfillmentError> {
        validate_code(&self.code)
    }
}

#[derive(Debug, Clone)]
pub struct AttachProof {
    pub driver_id: Uuid,
    pub code: String,
    pub photo_url: String,
}

impl AttachProof {
    pub fn new(driver_id: Uuid, code: &str, photo_url: &str) -> Self {
        Self {
            driver_id,
            code: code.trim().to_string(),
            photo_url: photo_url.trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), FulfillmentError> {
        validate_code(&self.code)?;

        let url = self.photo_url.as_str();
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(|| FulfillmentError::validation("proof photo url must be http(s)"))?;

        if rest.is_empty() || rest.starts_with('/') || url.chars().any(char::is_whitespace) {
            return Err(FulfillmentError::validation(format!(
                "malformed proof photo url: {url}"
            )));
        }

        Ok(())
    }
}

/// Checked exactly as it will be looked up.
fn validate_code(code: &str) -> Result<(), FulfillmentError> {
    if code.chars().count() < MIN_CODE_LEN {
        return Err(FulfillmentError::validation(format!(
            "code must be at least {MIN_CODE_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proof(url: &str) -> AttachProof {
        AttachProof {
            driver_id: Uuid::new_v4(),
            code: "abcdef123".into(),
            photo_url: url.into(),
        }
    }

    #[test]
    fn test_short_code_is_rejected() {
        let scan = ScanShipment {
            driver_id: Uuid::new_v4(),
            code: "abc".into(),
            action: ScanAction::Pickup,
        };
        assert!(scan.validate().is_err());
    }

    #[test]
    fn test_proof_url_validation() {
        assert!(proof("https://cdn.example.com/p/1.jpg").validate().is_ok());
        assert!(proof("http://example.com/x").validate().is_ok());
        assert!(proof("ftp://example.com/x").validate().is_err());
        assert!(proof("https://").validate().is_err());
        assert!(proof("https:///path").validate().is_err());
        assert!(proof("https://exa mple.com").validate().is_err());
        assert!(proof("photo.jpg").validate().is_err());
    }

    #[test]
    fn test_constructors_strip_scanner_whitespace() {
        let scan = ScanShipment::new(Uuid::new_v4(), "  abcdef123\r\n", ScanAction::Pickup);
        assert_eq!(scan.code, "abcdef123");
        assert!(scan.validate().is_ok());

        let proof = AttachProof::new(Uuid::new_v4(), "abcdef123\n", " https://cdn.example.com/p.jpg ");
        assert_eq!(proof.code, "abcdef123");
        assert_eq!(proof.photo_url, "https://cdn.example.com/p.jpg");
        assert!(proof.validate().is_ok());
    }

    #[test]
    fn test_padding_does_not_count_toward_code_length() {
        assert!(ScanShipment::new(Uuid::new_v4(), "  abc  ", ScanAction::Pickup)
            .validate()
            .is_err());
    }
}
