//! Volunteer sign-up / cancel with capacity enforcement.
//!
//! Transitions on one event are serialized by a per-event async mutex, and the
//! write itself is a compare-and-set on the volunteer list read under that
//! mutex. The mutex keeps concurrent requests in this process from
//! overbooking; the compare-and-set catches writers in other processes.

use std::sync::Arc;

use dashmap::DashMap;
use log::{error, info, warn};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::populate;
use crate::{
    dto::EventView,
    errors::ApiError,
    models::Event,
    service::auth::AuthenticatedUser,
    AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsvpChange {
    Joined,
    Left,
}

/// Compute the volunteer list after `user_id` toggles their RSVP on `event`.
///
/// Leaving is always allowed. Joining needs unlimited capacity or a free spot.
pub fn transition(event: &Event, user_id: Uuid) -> Result<(Vec<Uuid>, RsvpChange), ApiError> {
    if event.has_volunteer(user_id) {
        let remaining = event.volunteers.iter().copied().filter(|v| *v != user_id).collect();
        return Ok((remaining, RsvpChange::Left));
    }
    if !event.has_free_spot() {
        return Err(ApiError::CapacityExceeded);
    }
    let mut joined = event.volunteers.clone();
    joined.push(user_id);
    Ok((joined, RsvpChange::Joined))
}

/// Per-event mutexes. Entries are dropped once nobody holds or awaits them.
#[derive(Default)]
pub struct EventLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

pub struct EventLockGuard<'a> {
    owner: &'a EventLocks,
    event_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl EventLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, event_id: Uuid) -> EventLockGuard<'_> {
        let mutex = self.locks.entry(event_id).or_default().value().clone();
        EventLockGuard {
            owner: self,
            event_id,
            guard: Some(mutex.lock_owned().await),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for EventLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.owner
            .locks
            .remove_if(&self.event_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// Toggle `user`'s RSVP on `event_id` and return the populated event.
pub async fn toggle(state: &AppState, event_id: Uuid, user: &AuthenticatedUser) -> Result<EventView, ApiError> {
    let _lock = state.event_locks.lock(event_id).await;

    let event = state
        .events
        .find_by_id(event_id)
        .await?
        .ok_or_else(|| ApiError::not_found("event"))?;
    let (volunteers, change) = transition(&event, user.user_id)?;

    let Some(updated) = state
        .events
        .set_volunteers_if(event_id, &event.volunteers, &volunteers)
        .await?
    else {
        return match state.events.find_by_id(event_id).await? {
            None => Err(ApiError::not_found("event")),
            Some(_) => {
                warn!("volunteer list of event {} changed under rsvp by {}", event_id, user.user_id);
                Err(ApiError::ConcurrentModification)
            }
        };
    };

    let bookkeeping = match change {
        RsvpChange::Joined => state.users.push_responded_event(user.user_id, event_id).await,
        RsvpChange::Left => state.users.pull_responded_event(user.user_id, event_id).await,
    };
    if let Err(err) = bookkeeping {
        error!(
            "[{:} : {:}] rsvp of {} on {} applied but responded-events update failed: {}",
            file!(),
            line!(),
            user.user_id,
            event_id,
            err
        );
        match state
            .events
            .set_volunteers_if(event_id, &updated.volunteers, &event.volunteers)
            .await
        {
            Ok(Some(_)) => info!("rolled back rsvp of {} on {}", user.user_id, event_id),
            _ => error!(
                "[{:} : {:}] INCONSISTENT: could not roll back rsvp of {} on {}",
                file!(),
                line!(),
                user.user_id,
                event_id
            ),
        }
        return Err(ApiError::Internal);
    }

    info!("user {} {:?} event {}", user.user_id, change, event_id);
    Ok(populate::populate_event(state.users.as_ref(), updated).await?)
}
