use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Event, User};

#[derive(Debug, Deserialize, Clone)]
pub struct NewUserDto {
    pub email: String,
    pub name: String,
    pub password: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UpdateUserDto {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub photo: Option<String>,
}

impl UpdateUserDto {
    pub fn apply_to(&self, user: &User) -> User {
        let mut updated = user.clone();
        if let Some(v) = &self.name {
            updated.name = v.trim().to_string();
        }
        if let Some(v) = self.latitude {
            updated.latitude = Some(v);
        }
        if let Some(v) = self.longitude {
            updated.longitude = Some(v);
        }
        if let Some(v) = &self.address {
            updated.address = Some(v.clone());
        }
        if let Some(v) = &self.photo {
            updated.photo = Some(v.clone());
        }
        updated
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewEventDto {
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub category: Option<String>,
    pub spots: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub image: Option<String>,
}

impl NewEventDto {
    pub fn into_event(self, author: Uuid) -> Event {
        Event {
            id: Uuid::new_v4(),
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            author,
            latitude: self.latitude,
            longitude: self.longitude,
            address: self.address.trim().to_string(),
            category: self.category.unwrap_or_default(),
            spots: self.spots,
            start_date: self.start_date,
            end_date: self.end_date,
            volunteers: Vec::new(),
            image: self.image,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub spots: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub image: Option<String>,
}

impl UpdateEventDto {
    /// Merge the supplied fields over `event`. Author and volunteers are never touched.
    pub fn apply_to(&self, event: &Event) -> Event {
        let mut updated = event.clone();
        if let Some(v) = &self.title {
            updated.title = v.trim().to_string();
        }
        if let Some(v) = &self.description {
            updated.description = v.trim().to_string();
        }
        if let Some(v) = self.latitude {
            updated.latitude = v;
        }
        if let Some(v) = self.longitude {
            updated.longitude = v;
        }
        if let Some(v) = &self.address {
            updated.address = v.trim().to_string();
        }
        if let Some(v) = &self.category {
            updated.category = v.clone();
        }
        if let Some(v) = self.spots {
            updated.spots = v;
        }
        if let Some(v) = self.start_date {
            updated.start_date = v;
        }
        if let Some(v) = self.end_date {
            updated.end_date = v;
        }
        if let Some(v) = &self.image {
            updated.image = Some(v.clone());
        }
        updated
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct EventListQuery {
    #[serde(default)]
    pub all: bool,
}

/// Token payload. No `exp`: revocation happens in the session registry.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    pub id: Uuid,
    pub email: String,
    pub iat: i64,
    pub jti: Uuid,
}

impl Claims {
    pub fn new(user_id: Uuid, email: &str) -> Self {
        Self {
            id: user_id,
            email: email.to_string(),
            iat: Utc::now().timestamp(),
            jti: Uuid::new_v4(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: Uuid,
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl From<&Event> for EventSummary {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            start_date: event.start_date,
            end_date: event.end_date,
        }
    }
}

/// An event with its author and volunteers resolved into summaries.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub author: Option<UserSummary>,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub category: String,
    pub spots: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub volunteers: Vec<UserSummary>,
    pub image: Option<String>,
}

impl EventView {
    pub fn new(event: Event, author: Option<UserSummary>, volunteers: Vec<UserSummary>) -> Self {
        Self {
            id: event.id,
            title: event.title,
            description: event.description,
            author,
            latitude: event.latitude,
            longitude: event.longitude,
            address: event.address,
            category: event.category,
            spots: event.spots,
            start_date: event.start_date,
            end_date: event.end_date,
            volunteers,
            image: event.image,
        }
    }
}

/// A user with created/responded event references resolved. Never carries the password hash.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub photo: Option<String>,
    pub created_events: Vec<EventSummary>,
    pub responded_events: Vec<EventSummary>,
}

impl UserView {
    pub fn new(user: User, created_events: Vec<EventSummary>, responded_events: Vec<EventSummary>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            latitude: user.latitude,
            longitude: user.longitude,
            address: user.address,
            photo: user.photo,
            created_events,
            responded_events,
        }
    }
}
