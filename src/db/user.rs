use async_trait::async_trait;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use super::{StoreError, UserRepository};
use crate::models::User;

const USER_COLUMNS: &str = "id, email, name, pwd_hash, latitude, longitude, address, photo, \
    created_events, responded_events";

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_optional(&self, sql: &str, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Runs a list-column statement of the shape `UPDATE users SET .. WHERE id = $1` with `$2` the event id.
    async fn touch_list(&self, sql: &str, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query(sql)
            .bind(user_id)
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() == 1)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let res = sqlx::query(
            "INSERT INTO users (id, email, name, pwd_hash, latitude, longitude, address, photo, \
             created_events, responded_events) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.pwd_hash)
        .bind(user.latitude)
        .bind(user.longitude)
        .bind(&user.address)
        .bind(&user.photo)
        .bind(&user.created_events)
        .bind(&user.responded_events)
        .execute(&self.pool)
        .await;
        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::Duplicate("email"))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.fetch_optional(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"), id)
            .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_all(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY name"))
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn update_profile(&self, user: &User) -> Result<Option<User>, StoreError> {
        let updated = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = $2, latitude = $3, longitude = $4, address = $5, photo = $6 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(user.latitude)
        .bind(user.longitude)
        .bind(&user.address)
        .bind(&user.photo)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn push_created_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError> {
        self.touch_list(
            "UPDATE users SET created_events = CASE WHEN $2 = ANY(created_events) THEN created_events \
             ELSE array_append(created_events, $2) END WHERE id = $1",
            user_id,
            event_id,
        )
        .await
    }

    async fn pull_created_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError> {
        self.touch_list(
            "UPDATE users SET created_events = array_remove(created_events, $2) WHERE id = $1",
            user_id,
            event_id,
        )
        .await
    }

    async fn push_responded_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError> {
        self.touch_list(
            "UPDATE users SET responded_events = CASE WHEN $2 = ANY(responded_events) THEN responded_events \
             ELSE array_append(responded_events, $2) END WHERE id = $1",
            user_id,
            event_id,
        )
        .await
    }

    async fn pull_responded_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError> {
        self.touch_list(
            "UPDATE users SET responded_events = array_remove(responded_events, $2) WHERE id = $1",
            user_id,
            event_id,
        )
        .await
    }

    async fn delete(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.fetch_optional(&format!("DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"), id)
            .await
    }
}
