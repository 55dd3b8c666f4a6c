use std::sync::Arc;

use uuid::Uuid;

use super::crypto;
use crate::db::{SessionStore, StoreError};

/// One honoured token per user. A new login overwrites the slot, so two devices
/// logging in as the same user race and the last writer wins; the other device
/// is signed out on its next request.
#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn open(&self, user_id: Uuid, token: &str) -> Result<(), StoreError> {
        self.store.put(user_id, &crypto::get_sha3_256_hash(token)).await
    }

    /// True only if `token` is the one most recently issued to `user_id` and not revoked.
    pub async fn is_current(&self, user_id: Uuid, token: &str) -> Result<bool, StoreError> {
        let stored = self.store.get(user_id).await?;
        Ok(stored.is_some_and(|digest| digest == crypto::get_sha3_256_hash(token)))
    }

    pub async fn revoke(&self, user_id: Uuid) -> Result<bool, StoreError> {
        self.store.delete(user_id).await
    }
}
