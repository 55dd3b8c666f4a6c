//! Multi-step writes when one of the steps fails or stalls.

mod common;

use std::{
    future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration as StdDuration,
};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Notify;
use uuid::Uuid;
use volunteer_hub::{
    db::{
        memory::{MemoryEventRepository, MemorySessionStore, MemoryUserRepository},
        EventFilter, EventRepository, StoreError, UserRepository,
    },
    dto::{NewEventDto, UpdateEventDto},
    errors::ApiError,
    models::{Event, User},
    service::{
        auth::AuthenticatedUser,
        event,
        media::{MediaError, MediaStore, NoopMediaStore},
        rsvp,
    },
    AppState,
};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Memory-backed users whose list writes can be switched to fail.
#[derive(Default)]
struct FlakyUsers {
    inner: MemoryUserRepository,
    fail_created: AtomicBool,
    fail_responded: AtomicBool,
}

impl FlakyUsers {
    fn check(flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection reset by peer".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for FlakyUsers {
    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        self.inner.insert(user).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_by_email(email).await
    }

    async fn find_all(&self) -> Result<Vec<User>, StoreError> {
        self.inner.find_all().await
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        self.inner.find_many(ids).await
    }

    async fn update_profile(&self, user: &User) -> Result<Option<User>, StoreError> {
        self.inner.update_profile(user).await
    }

    async fn push_created_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError> {
        Self::check(&self.fail_created)?;
        self.inner.push_created_event(user_id, event_id).await
    }

    async fn pull_created_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError> {
        Self::check(&self.fail_created)?;
        self.inner.pull_created_event(user_id, event_id).await
    }

    async fn push_responded_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError> {
        Self::check(&self.fail_responded)?;
        self.inner.push_responded_event(user_id, event_id).await
    }

    async fn pull_responded_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, StoreError> {
        Self::check(&self.fail_responded)?;
        self.inner.pull_responded_event(user_id, event_id).await
    }

    async fn delete(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.inner.delete(id).await
    }
}

/// Memory-backed events where one volunteer list write sneaks in right
/// before the next details update, as another instance would.
struct RacingEvents {
    inner: MemoryEventRepository,
    intruders: Vec<Uuid>,
    armed: AtomicBool,
}

#[async_trait]
impl EventRepository for RacingEvents {
    async fn insert(&self, event: &Event) -> Result<(), StoreError> {
        self.inner.insert(event).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find(&self, filter: EventFilter) -> Result<Vec<Event>, StoreError> {
        self.inner.find(filter).await
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Event>, StoreError> {
        self.inner.find_many(ids).await
    }

    async fn update_details(&self, event: &Event) -> Result<Option<Event>, StoreError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            if let Some(stored) = self.inner.find_by_id(event.id).await? {
                self.inner
                    .set_volunteers_if(event.id, &stored.volunteers, &self.intruders)
                    .await?;
            }
        }
        self.inner.update_details(event).await
    }

    async fn set_volunteers_if(
        &self,
        id: Uuid,
        expected: &[Uuid],
        new: &[Uuid],
    ) -> Result<Option<Event>, StoreError> {
        self.inner.set_volunteers_if(id, expected, new).await
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        self.inner.delete(id).await
    }
}

struct FailingMedia;

#[async_trait]
impl MediaStore for FailingMedia {
    async fn destroy(&self, reference: &str) -> Result<(), MediaError> {
        Err(MediaError::Rejected {
            reference: reference.to_string(),
            status: 503,
        })
    }
}

/// Never answers. Signals once a destroy call is in flight.
#[derive(Default)]
struct StalledMedia {
    entered: Notify,
}

#[async_trait]
impl MediaStore for StalledMedia {
    async fn destroy(&self, _reference: &str) -> Result<(), MediaError> {
        self.entered.notify_one();
        future::pending::<()>().await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn member(name: &str) -> User {
    User {
        id: Uuid::new_v4(),
        email: format!("{}@x.com", name.to_lowercase()),
        name: name.to_string(),
        pwd_hash: "unused".into(),
        latitude: None,
        longitude: None,
        address: None,
        photo: None,
        created_events: vec![],
        responded_events: vec![],
    }
}

fn identity(user: &User) -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
    }
}

fn new_event(spots: i32, image: Option<&str>) -> NewEventDto {
    let start = Utc::now() + Duration::days(2);
    NewEventDto {
        title: "Library book sorting".into(),
        description: "Sorting donated books for the spring sale".into(),
        latitude: 60.17,
        longitude: 24.93,
        address: "Central library".into(),
        category: Some("education".into()),
        spots,
        start_date: start,
        end_date: start + Duration::hours(3),
        image: image.map(str::to_string),
    }
}

fn state_with(
    users: Arc<dyn UserRepository>,
    events: Arc<dyn EventRepository>,
    media: Arc<dyn MediaStore>,
) -> AppState {
    AppState::new(users, events, Arc::new(MemorySessionStore::new()), media, common::SECRET)
}

async fn seeded(users: &dyn UserRepository, names: &[&str]) -> Vec<User> {
    let mut seeded = Vec::new();
    for name in names {
        let user = member(name);
        users.insert(&user).await.unwrap();
        seeded.push(user);
    }
    seeded
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_removes_the_event_when_linking_the_author_fails() {
    let users = Arc::new(FlakyUsers::default());
    let events = Arc::new(MemoryEventRepository::new());
    let state = state_with(users.clone(), events.clone(), Arc::new(NoopMediaStore));
    let author = seeded(users.as_ref(), &["Alice"]).await.remove(0);

    users.fail_created.store(true, Ordering::SeqCst);
    let err = event::create(&state, &identity(&author), new_event(3, None)).await.unwrap_err();
    assert!(matches!(err, ApiError::Internal));

    assert!(events.find(EventFilter::All).await.unwrap().is_empty());
    let stored = users.find_by_id(author.id).await.unwrap().unwrap();
    assert!(stored.created_events.is_empty());
}

#[tokio::test]
async fn create_by_a_vanished_author_leaves_nothing_behind() {
    let users = Arc::new(MemoryUserRepository::new());
    let events = Arc::new(MemoryEventRepository::new());
    let state = state_with(users.clone(), events.clone(), Arc::new(NoopMediaStore));
    let ghost = member("Ghost");

    let err = event::create(&state, &identity(&ghost), new_event(3, None)).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert!(events.find(EventFilter::All).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// RSVP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rsvp_is_rolled_back_when_bookkeeping_fails() {
    let users = Arc::new(FlakyUsers::default());
    let events = Arc::new(MemoryEventRepository::new());
    let state = state_with(users.clone(), events.clone(), Arc::new(NoopMediaStore));
    let people = seeded(users.as_ref(), &["Alice", "Bob"]).await;
    let created = event::create(&state, &identity(&people[0]), new_event(1, None)).await.unwrap();

    users.fail_responded.store(true, Ordering::SeqCst);
    let err = rsvp::toggle(&state, created.id, &identity(&people[1])).await.unwrap_err();
    assert!(matches!(err, ApiError::Internal));

    let stored = events.find_by_id(created.id).await.unwrap().unwrap();
    assert!(stored.volunteers.is_empty());
    assert!(stored.has_free_spot());
    let bob = users.find_by_id(people[1].id).await.unwrap().unwrap();
    assert!(bob.responded_events.is_empty());

    // Once the store recovers the same request goes through.
    users.fail_responded.store(false, Ordering::SeqCst);
    let joined = rsvp::toggle(&state, created.id, &identity(&people[1])).await.unwrap();
    assert_eq!(joined.volunteers.len(), 1);
}

#[tokio::test]
async fn deleted_volunteer_is_hidden_but_keeps_the_spot() {
    let users = Arc::new(MemoryUserRepository::new());
    let events = Arc::new(MemoryEventRepository::new());
    let state = state_with(users.clone(), events.clone(), Arc::new(NoopMediaStore));
    let people = seeded(users.as_ref(), &["Alice", "Bob", "Carol"]).await;
    let created = event::create(&state, &identity(&people[0]), new_event(1, None)).await.unwrap();
    rsvp::toggle(&state, created.id, &identity(&people[1])).await.unwrap();

    users.delete(people[1].id).await.unwrap();

    let shown = event::get_by_id(&state, created.id).await.unwrap();
    assert!(shown.volunteers.is_empty());
    let err = rsvp::toggle(&state, created.id, &identity(&people[2])).await.unwrap_err();
    assert!(matches!(err, ApiError::CapacityExceeded));
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_reports_a_failed_image_cleanup() {
    let users = Arc::new(MemoryUserRepository::new());
    let events = Arc::new(MemoryEventRepository::new());
    let state = state_with(users.clone(), events.clone(), Arc::new(FailingMedia));
    let author = seeded(users.as_ref(), &["Alice"]).await.remove(0);
    let created = event::create(&state, &identity(&author), new_event(3, Some("events/books.jpg")))
        .await
        .unwrap();

    let err = event::delete(&state, created.id, &identity(&author)).await.unwrap_err();
    assert!(matches!(err, ApiError::Internal));

    // The earlier steps stay applied.
    assert!(events.find_by_id(created.id).await.unwrap().is_none());
    let stored = users.find_by_id(author.id).await.unwrap().unwrap();
    assert!(stored.created_events.is_empty());
}

#[tokio::test]
async fn delete_reports_a_failed_author_unlink() {
    let users = Arc::new(FlakyUsers::default());
    let events = Arc::new(MemoryEventRepository::new());
    let media = Arc::new(common::RecordingMediaStore::default());
    let state = state_with(users.clone(), events.clone(), media.clone());
    let author = seeded(users.as_ref(), &["Alice"]).await.remove(0);
    let created = event::create(&state, &identity(&author), new_event(3, Some("events/books.jpg")))
        .await
        .unwrap();

    users.fail_created.store(true, Ordering::SeqCst);
    let err = event::delete(&state, created.id, &identity(&author)).await.unwrap_err();
    assert!(matches!(err, ApiError::Internal));

    assert!(events.find_by_id(created.id).await.unwrap().is_none());
    // The image is still destroyed after the unlink failed.
    assert_eq!(media.destroyed(), vec!["events/books.jpg".to_string()]);
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stalled_image_cleanup_does_not_block_rsvps() {
    let users = Arc::new(MemoryUserRepository::new());
    let events = Arc::new(MemoryEventRepository::new());
    let media = Arc::new(StalledMedia::default());
    let state = Arc::new(state_with(users.clone(), events.clone(), media.clone()));
    let people = seeded(users.as_ref(), &["Alice", "Bob"]).await;
    let author = identity(&people[0]);
    let created = event::create(&state, &author, new_event(2, Some("events/old.jpg")))
        .await
        .unwrap();

    let pending_update = {
        let state = state.clone();
        let event_id = created.id;
        tokio::spawn(async move {
            let dto = UpdateEventDto {
                image: Some("events/new.jpg".into()),
                ..Default::default()
            };
            event::update(&state, event_id, dto, &author).await
        })
    };
    tokio::time::timeout(StdDuration::from_secs(2), media.entered.notified())
        .await
        .expect("update never reached the media store");

    let joined = tokio::time::timeout(
        StdDuration::from_secs(2),
        rsvp::toggle(&state, created.id, &identity(&people[1])),
    )
    .await
    .expect("rsvp waited on the media store")
    .unwrap();
    assert_eq!(joined.volunteers.len(), 1);
    assert_eq!(joined.image.as_deref(), Some("events/new.jpg"));

    pending_update.abort();
}

#[tokio::test]
async fn capacity_race_with_another_instance_is_a_conflict() {
    let users = Arc::new(MemoryUserRepository::new());
    let people = seeded(users.as_ref(), &["Alice", "Bob", "Carol"]).await;
    let events = Arc::new(RacingEvents {
        inner: MemoryEventRepository::new(),
        intruders: vec![people[1].id, people[2].id],
        armed: AtomicBool::new(false),
    });
    let state = state_with(users.clone(), events.clone(), Arc::new(NoopMediaStore));
    let author = identity(&people[0]);
    let created = event::create(&state, &author, new_event(3, None)).await.unwrap();

    events.armed.store(true, Ordering::SeqCst);
    let dto = UpdateEventDto {
        spots: Some(1),
        ..Default::default()
    };
    let err = event::update(&state, created.id, dto, &author).await.unwrap_err();
    assert!(matches!(err, ApiError::ConcurrentModification));

    let stored = events.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(stored.spots, 3);
    assert_eq!(stored.volunteers.len(), 2);
}
