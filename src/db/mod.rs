pub mod event;
pub mod memory;
pub mod session;
pub mod user;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::{Display, Error};
use log::info;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::models::{Event, User};

#[derive(Debug, Display, Error)]
pub enum StoreError {
    #[display(fmt = "duplicate {}", _0)]
    Duplicate(#[error(not(source))] &'static str),

    #[display(fmt = "storage backend failure: {}", _0)]
    Backend(#[error(not(source))] String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Time-window selections for event listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    All,
    /// Start strictly after `now`.
    Upcoming { now: DateTime<Utc> },
    /// `user` volunteers and the event has not ended.
    Going { user: Uuid, now: DateTime<Utc> },
    /// Ended events `user` volunteered for or authored.
    History { user: Uuid, now: DateTime<Utc> },
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        match *self {
            EventFilter::All => true,
            EventFilter::Upcoming { now } => event.start_date > now,
            EventFilter::Going { user, now } => event.has_volunteer(user) && event.end_date > now,
            EventFilter::History { user, now } => {
                event.end_date <= now && (event.has_volunteer(user) || event.author == user)
            }
        }
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn insert(&self, user: &User) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_all(&self) -> Result<Vec<User>, StoreError>;

    /// Missing ids are skipped. Order is unspecified.
    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError>;

    /// Writes the profile fields (name, location, photo) of `user`.
    async fn update_profile(&self, user: &User) -> Result<Option<User>, StoreError>;

    /// Returns `false` when the user does not exist. Appending is idempotent.
    async fn push_created_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError>;

    async fn pull_created_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError>;

    async fn push_responded_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError>;

    async fn pull_responded_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn insert(&self, event: &Event) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>, StoreError>;

    /// Ordered by start date.
    async fn find(&self, filter: EventFilter) -> Result<Vec<Event>, StoreError>;

    /// Missing ids are skipped. Order is unspecified.
    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Event>, StoreError>;

    /// Writes every field except `author` and `volunteers`. Refuses (returns `None`)
    /// when the new capacity is below the stored volunteer count.
    async fn update_details(&self, event: &Event) -> Result<Option<Event>, StoreError>;

    /// Compare-and-set on the volunteer list: writes `new` only if the stored list
    /// still equals `expected`. `None` when the event is gone or the list moved.
    async fn set_volunteers_if(
        &self,
        id: Uuid,
        expected: &[Uuid],
        new: &[Uuid],
    ) -> Result<Option<Event>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<Option<Event>, StoreError>;
}

/// Shared key-value store behind the session registry: one slot per user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Unconditionally overwrites the slot.
    async fn put(&self, user_id: Uuid, token_digest: &str) -> Result<(), StoreError>;

    async fn get(&self, user_id: Uuid) -> Result<Option<String>, StoreError>;

    /// Returns whether a slot was removed.
    async fn delete(&self, user_id: Uuid) -> Result<bool, StoreError>;
}

pub async fn init_db_pool(db_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    info!("connecting to database with at most {} connections", max_connections);
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(db_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("{}", "Connected with postgresql, migrations applied");
    Ok(pool)
}
