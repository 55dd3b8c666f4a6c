use chrono::Utc;
use log::{error, info, warn};
use uuid::Uuid;

use super::{auth::AuthenticatedUser, populate, validate};
use crate::{
    db::EventFilter,
    dto::{EventView, NewEventDto, UpdateEventDto},
    errors::{ApiError, AuthFailure},
    models::Event,
    AppState,
};

/// Which time window a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    All,
    Upcoming,
    Going,
    History,
}

/// Persist a new event authored by `author` and link it into the author's created list.
///
/// The two writes are not atomic. If linking fails the event is deleted again;
/// if that also fails the event is left orphaned and logged as inconsistent.
pub async fn create(state: &AppState, author: &AuthenticatedUser, dto: NewEventDto) -> Result<EventView, ApiError> {
    let event = dto.into_event(author.user_id);
    validate::validate_event(&event)?;

    state.events.insert(&event).await?;

    let linked = state.users.push_created_event(author.user_id, event.id).await;
    if !matches!(linked, Ok(true)) {
        match &linked {
            Ok(_) => warn!("author {} vanished while creating event {}", author.user_id, event.id),
            Err(err) => error!(
                "[{:} : {:}] linking event {} to author {} failed: {}",
                file!(),
                line!(),
                event.id,
                author.user_id,
                err
            ),
        }
        if let Err(err) = state.events.delete(event.id).await {
            error!(
                "[{:} : {:}] INCONSISTENT: event {} exists without author back-reference: {}",
                file!(),
                line!(),
                event.id,
                err
            );
        }
        return Err(match linked {
            Ok(_) => ApiError::unknown_user(),
            Err(_) => ApiError::Internal,
        });
    }

    info!("user {} created event {}", author.user_id, event.id);
    Ok(populate::populate_event(state.users.as_ref(), event).await?)
}

pub async fn list(state: &AppState, listing: Listing, requester: Option<&AuthenticatedUser>) -> Result<Vec<EventView>, ApiError> {
    let now = Utc::now();
    let filter = match (listing, requester) {
        (Listing::All, _) => EventFilter::All,
        (Listing::Upcoming, _) => EventFilter::Upcoming { now },
        (Listing::Going, Some(user)) => EventFilter::Going { user: user.user_id, now },
        (Listing::History, Some(user)) => EventFilter::History { user: user.user_id, now },
        (Listing::Going | Listing::History, None) => {
            return Err(ApiError::Unauthorized(AuthFailure::MissingToken))
        }
    };
    let events = state.events.find(filter).await?;
    Ok(populate::populate_events(state.users.as_ref(), events).await?)
}

pub async fn get_by_id(state: &AppState, id: Uuid) -> Result<EventView, ApiError> {
    let event = state
        .events
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("event"))?;
    Ok(populate::populate_event(state.users.as_ref(), event).await?)
}

async fn find_authored(state: &AppState, id: Uuid, requester: &AuthenticatedUser, action: &str) -> Result<Event, ApiError> {
    let event = state
        .events
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("event"))?;
    if event.author != requester.user_id {
        return Err(ApiError::Forbidden(format!("only the creator can {action} this event")));
    }
    Ok(event)
}

/// Author-only partial update, validated on the merged event.
///
/// The write runs under the event's lock so capacity cannot shrink below a
/// concurrent RSVP. The lock is released before a replaced image is destroyed
/// in the media store.
pub async fn update(
    state: &AppState,
    id: Uuid,
    dto: UpdateEventDto,
    requester: &AuthenticatedUser,
) -> Result<EventView, ApiError> {
    let lock = state.event_locks.lock(id).await;
    let current = find_authored(state, id, requester, "update").await?;

    let merged = dto.apply_to(&current);
    validate::validate_event(&merged)?;
    validate::validate_capacity(&merged)?;

    let Some(updated) = state.events.update_details(&merged).await? else {
        // The store refuses a capacity below its own volunteer count, which
        // only differs from ours if another instance wrote in between.
        return match state.events.find_by_id(id).await? {
            None => Err(ApiError::not_found("event")),
            Some(_) => {
                warn!("volunteers of event {} changed under update by {}", id, requester.user_id);
                Err(ApiError::ConcurrentModification)
            }
        };
    };
    drop(lock);

    if let Some(old) = current.image.as_deref().filter(|old| updated.image.as_deref() != Some(*old)) {
        if let Err(err) = state.media.destroy(old).await {
            error!(
                "[{:} : {:}] INCONSISTENT: event {} updated but old image {} not destroyed: {}",
                file!(),
                line!(),
                id,
                old,
                err
            );
            return Err(ApiError::Internal);
        }
    }

    info!("user {} updated event {}", requester.user_id, id);
    Ok(populate::populate_event(state.users.as_ref(), updated).await?)
}

/// Author-only delete. Unlinks the event from the author and destroys its image.
pub async fn delete(state: &AppState, id: Uuid, requester: &AuthenticatedUser) -> Result<(), ApiError> {
    let lock = state.event_locks.lock(id).await;
    find_authored(state, id, requester, "delete").await?;

    let deleted = state
        .events
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::not_found("event"))?;
    drop(lock);

    let mut consistent = true;
    if let Err(err) = state.users.pull_created_event(deleted.author, id).await {
        error!(
            "[{:} : {:}] INCONSISTENT: event {} deleted but still listed by author {}: {}",
            file!(),
            line!(),
            id,
            deleted.author,
            err
        );
        consistent = false;
    }
    if let Some(image) = deleted.image.as_deref() {
        if let Err(err) = state.media.destroy(image).await {
            error!(
                "[{:} : {:}] INCONSISTENT: event {} deleted but image {} not destroyed: {}",
                file!(),
                line!(),
                id,
                image,
                err
            );
            consistent = false;
        }
    }
    if !consistent {
        return Err(ApiError::Internal);
    }

    info!("user {} deleted event {}", requester.user_id, id);
    Ok(())
}
