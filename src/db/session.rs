use async_trait::async_trait;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use super::{SessionStore, StoreError};
use crate::models::Session;

/// Session slots in the shared database, so every service instance sees the same registry.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn put(&self, user_id: Uuid, token_digest: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sessions (user_id, token_digest, issued_at) VALUES ($1, $2, now()) \
             ON CONFLICT (user_id) DO UPDATE SET token_digest = EXCLUDED.token_digest, \
             issued_at = EXCLUDED.issued_at",
        )
        .bind(user_id)
        .bind(token_digest)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<String>, StoreError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT user_id, token_digest, issued_at FROM sessions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session.map(|s| s.token_digest))
    }

    async fn delete(&self, user_id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
