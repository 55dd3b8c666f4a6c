//! Read-time joins: stored ids become embedded summaries.
//!
//! References to entities that no longer exist are dropped (an event whose
//! author was deleted gets `author: null`).

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    db::{EventRepository, StoreError, UserRepository},
    dto::{EventSummary, EventView, UserSummary, UserView},
    models::{Event, User},
};

fn unique_ids<'a>(lists: impl Iterator<Item = &'a Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = lists.copied().collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

pub async fn populate_events(users: &dyn UserRepository, events: Vec<Event>) -> Result<Vec<EventView>, StoreError> {
    let referenced = unique_ids(events.iter().flat_map(|e| std::iter::once(&e.author).chain(e.volunteers.iter())));
    let found: HashMap<Uuid, UserSummary> = users
        .find_many(&referenced)
        .await?
        .iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect();

    Ok(events
        .into_iter()
        .map(|event| {
            let author = found.get(&event.author).cloned();
            let volunteers = event.volunteers.iter().filter_map(|id| found.get(id).cloned()).collect();
            EventView::new(event, author, volunteers)
        })
        .collect())
}

pub async fn populate_event(users: &dyn UserRepository, event: Event) -> Result<EventView, StoreError> {
    let mut views = populate_events(users, vec![event]).await?;
    Ok(views.remove(0))
}

pub async fn populate_users(events: &dyn EventRepository, users: Vec<User>) -> Result<Vec<UserView>, StoreError> {
    let referenced = unique_ids(
        users
            .iter()
            .flat_map(|u| u.created_events.iter().chain(u.responded_events.iter())),
    );
    let found: HashMap<Uuid, EventSummary> = events
        .find_many(&referenced)
        .await?
        .iter()
        .map(|e| (e.id, EventSummary::from(e)))
        .collect();
    let resolve = |ids: &[Uuid]| -> Vec<EventSummary> { ids.iter().filter_map(|id| found.get(id).cloned()).collect() };

    Ok(users
        .into_iter()
        .map(|user| {
            let created = resolve(&user.created_events);
            let responded = resolve(&user.responded_events);
            UserView::new(user, created, responded)
        })
        .collect())
}

pub async fn populate_user(events: &dyn EventRepository, user: User) -> Result<UserView, StoreError> {
    let mut views = populate_users(events, vec![user]).await?;
    Ok(views.remove(0))
}
