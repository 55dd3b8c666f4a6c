//! Process-local stores implementing the repository traits.
//!
//! Used when no `DATABASE_URL` is configured and throughout the test-suite.
//! The session store here is only shared within one process; run the
//! Postgres backend when more than one instance serves traffic.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EventFilter, EventRepository, SessionStore, StoreError, UserRepository};
use crate::models::{Event, User};

#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn edit<F>(&self, user_id: Uuid, f: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut User) + Send,
    {
        let mut users = self.users.write().await;
        match users.get_mut(&user_id) {
            Some(user) => {
                f(user);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn push_unique(list: &mut Vec<Uuid>, id: Uuid) {
    if !list.contains(&id) {
        list.push(id);
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.values().find(|u| u.email == email).cloned())
    }

    async fn find_all(&self) -> Result<Vec<User>, StoreError> {
        let mut all: Vec<User> = self.users.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn update_profile(&self, user: &User) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&user.id).map(|stored| {
            stored.name = user.name.clone();
            stored.latitude = user.latitude;
            stored.longitude = user.longitude;
            stored.address = user.address.clone();
            stored.photo = user.photo.clone();
            stored.clone()
        }))
    }

    async fn push_created_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError> {
        self.edit(user_id, |u| push_unique(&mut u.created_events, event_id)).await
    }

    async fn pull_created_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError> {
        self.edit(user_id, |u| u.created_events.retain(|e| *e != event_id)).await
    }

    async fn push_responded_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError> {
        self.edit(user_id, |u| push_unique(&mut u.responded_events, event_id)).await
    }

    async fn pull_responded_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError> {
        self.edit(user_id, |u| u.responded_events.retain(|e| *e != event_id)).await
    }

    async fn delete(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.write().await.remove(&id))
    }
}

#[derive(Default)]
pub struct MemoryEventRepository {
    events: RwLock<HashMap<Uuid, Event>>,
}

impl MemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRepository for MemoryEventRepository {
    async fn insert(&self, event: &Event) -> Result<(), StoreError> {
        self.events.write().await.insert(event.id, event.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        Ok(self.events.read().await.get(&id).cloned())
    }

    async fn find(&self, filter: EventFilter) -> Result<Vec<Event>, StoreError> {
        let mut found: Vec<Event> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        found.sort_by_key(|e| e.start_date);
        Ok(found)
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Event>, StoreError> {
        let events = self.events.read().await;
        Ok(ids.iter().filter_map(|id| events.get(id).cloned()).collect())
    }

    async fn update_details(&self, event: &Event) -> Result<Option<Event>, StoreError> {
        let mut events = self.events.write().await;
        let Some(stored) = events.get_mut(&event.id) else {
            return Ok(None);
        };
        if !event.is_unlimited() && stored.volunteers.len() as i64 > i64::from(event.spots) {
            return Ok(None);
        }
        let volunteers = std::mem::take(&mut stored.volunteers);
        let author = stored.author;
        *stored = Event {
            author,
            volunteers,
            ..event.clone()
        };
        Ok(Some(stored.clone()))
    }

    async fn set_volunteers_if(
        &self,
        id: Uuid,
        expected: &[Uuid],
        new: &[Uuid],
    ) -> Result<Option<Event>, StoreError> {
        let mut events = self.events.write().await;
        match events.get_mut(&id) {
            Some(stored) if stored.volunteers == expected => {
                stored.volunteers = new.to_vec();
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        Ok(self.events.write().await.remove(&id))
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<Uuid, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, user_id: Uuid, token_digest: &str) -> Result<(), StoreError> {
        self.sessions.insert(user_id, token_digest.to_string());
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<String>, StoreError> {
        Ok(self.sessions.get(&user_id).map(|d| d.value().clone()))
    }

    async fn delete(&self, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.sessions.remove(&user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: "Ada".to_string(),
            pwd_hash: "hash".to_string(),
            latitude: None,
            longitude: None,
            address: None,
            photo: None,
            created_events: vec![],
            responded_events: vec![],
        }
    }

    fn event(spots: i32, volunteers: Vec<Uuid>) -> Event {
        let start = Utc::now() + Duration::days(1);
        Event {
            id: Uuid::new_v4(),
            title: "Food bank".into(),
            description: "Sorting donations all day".into(),
            author: Uuid::new_v4(),
            latitude: 1.0,
            longitude: 2.0,
            address: "Main St".into(),
            category: String::new(),
            spots,
            start_date: start,
            end_date: start + Duration::hours(3),
            volunteers,
            image: None,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let repo = MemoryUserRepository::new();
        repo.insert(&user("a@x.com")).await.unwrap();
        let err = repo.insert(&user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("email")));
    }

    #[tokio::test]
    async fn reference_lists_are_idempotent() {
        let repo = MemoryUserRepository::new();
        let u = user("b@x.com");
        repo.insert(&u).await.unwrap();
        let event_id = Uuid::new_v4();

        assert!(repo.push_created_event(u.id, event_id).await.unwrap());
        assert!(repo.push_created_event(u.id, event_id).await.unwrap());
        assert_eq!(repo.find_by_id(u.id).await.unwrap().unwrap().created_events, vec![event_id]);

        assert!(repo.pull_created_event(u.id, event_id).await.unwrap());
        assert!(repo.find_by_id(u.id).await.unwrap().unwrap().created_events.is_empty());

        assert!(!repo.push_created_event(Uuid::new_v4(), event_id).await.unwrap());
    }

    #[tokio::test]
    async fn volunteer_cas_requires_expected_list() {
        let repo = MemoryEventRepository::new();
        let e = event(2, vec![]);
        repo.insert(&e).await.unwrap();
        let a = Uuid::new_v4();

        let stale = vec![Uuid::new_v4()];
        assert!(repo.set_volunteers_if(e.id, &stale, &[a]).await.unwrap().is_none());

        let updated = repo.set_volunteers_if(e.id, &[], &[a]).await.unwrap().unwrap();
        assert_eq!(updated.volunteers, vec![a]);
    }

    #[tokio::test]
    async fn update_keeps_author_and_volunteers() {
        let repo = MemoryEventRepository::new();
        let v = Uuid::new_v4();
        let e = event(3, vec![v]);
        repo.insert(&e).await.unwrap();

        let mut changed = e.clone();
        changed.title = "Food bank shift".into();
        changed.author = Uuid::new_v4();
        changed.volunteers = vec![];
        let stored = repo.update_details(&changed).await.unwrap().unwrap();
        assert_eq!(stored.title, "Food bank shift");
        assert_eq!(stored.author, e.author);
        assert_eq!(stored.volunteers, vec![v]);

        changed.spots = 0;
        assert!(repo.update_details(&changed).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn session_slot_is_overwritten() {
        let store = MemorySessionStore::new();
        let id = Uuid::new_v4();
        store.put(id, "first").await.unwrap();
        store.put(id, "second").await.unwrap();
        assert_eq!(store.get(id).await.unwrap().as_deref(), Some("second"));
        assert!(store.delete(id).await.unwrap());
        assert!(!store.delete(id).await.unwrap());
        assert_eq!(store.get(id).await.unwrap(), None);
    }
}
