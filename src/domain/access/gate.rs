use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::FulfillmentError;
use crate::store::Store;
use super::value_objects::Actor;

// ============================================================================
// Access Gate
// ============================================================================
//
// Turns an opaque credential into a typed (actor id, role) pair. The core
// trusts the result but still checks the per-operation allow-list itself.
//
// ============================================================================

#[async_trait]
pub trait AccessGate: Send + Sync {
    async fn resolve(&self, credential: Option<&str>) -> Result<Actor, FulfillmentError>;
}

/// Resolves the credential as a user id and reads the role from the store.
pub struct StoreAccessGate {
    store: Arc<dyn Store>,
}

impl StoreAccessGate {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AccessGate for StoreAccessGate {
    async fn resolve(&self, credential: Option<&str>) -> Result<Actor, FulfillmentError> {
        let raw = credential
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(FulfillmentError::Unauthenticated)?;

        let user_id = Uuid::parse_str(raw).map_err(|_| FulfillmentError::Unauthenticated)?;

        let mut uow = self.store.begin().await?;
        let user = uow.find_user(user_id).await;
        uow.rollback().await?;

        match user? {
            Some(user) => Ok(Actor::new(user.id, user.role)),
            None => {
                tracing::debug!(user_id = %user_id, "Credential does not match any user");
                Err(FulfillmentError::Unauthenticated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::access::Role;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_resolves_known_user() {
        let store = MemoryStore::new();
        let driver_id = store.seed_user(Role::Driver).await;
        let gate = StoreAccessGate::new(Arc::new(store));

        let actor = gate.resolve(Some(&driver_id.to_string())).await.unwrap();
        assert_eq!(actor, Actor::new(driver_id, Role::Driver));
    }

    #[tokio::test]
    async fn test_rejects_missing_malformed_and_unknown_credentials() {
        let gate = StoreAccessGate::new(Arc::new(MemoryStore::new()));

        for credential in [None, Some(""), Some("   "), Some("not-a-uuid")] {
            let err = gate.resolve(credential).await.unwrap_err();
            assert!(matches!(err, FulfillmentError::Unauthenticated));
        }

        let unknown = Uuid::new_v4().to_string();
        let err = gate.resolve(Some(&unknown)).await.unwrap_err();
        assert_eq!(err.http_status(), 401);
    }
}
