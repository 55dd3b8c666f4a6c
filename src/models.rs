use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Unlimited capacity marker for [`Event::spots`].
pub const UNLIMITED_SPOTS: i32 = -1;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub pwd_hash: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub photo: Option<String>,
    pub created_events: Vec<Uuid>,
    pub responded_events: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub author: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub category: String,
    pub spots: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub volunteers: Vec<Uuid>,
    pub image: Option<String>,
}

impl Event {
    pub fn is_unlimited(&self) -> bool {
        self.spots == UNLIMITED_SPOTS
    }

    pub fn has_volunteer(&self, user_id: Uuid) -> bool {
        self.volunteers.contains(&user_id)
    }

    pub fn has_free_spot(&self) -> bool {
        self.is_unlimited() || (self.volunteers.len() as i64) < i64::from(self.spots)
    }
}

/// Row of the session registry: the fingerprint of the one token honoured for a user.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub user_id: Uuid,
    pub token_digest: String,
    pub issued_at: DateTime<Utc>,
}
