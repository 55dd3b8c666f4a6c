use async_trait::async_trait;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use super::{EventFilter, EventRepository, StoreError};
use crate::models::Event;

const EVENT_COLUMNS: &str = "id, title, description, author, latitude, longitude, address, category, \
    spots, start_date, end_date, volunteers, image";

#[derive(Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn insert(&self, event: &Event) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO events (id, title, description, author, latitude, longitude, address, category, \
             spots, start_date, end_date, volunteers, image) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.author)
        .bind(event.latitude)
        .bind(event.longitude)
        .bind(&event.address)
        .bind(&event.category)
        .bind(event.spots)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(&event.volunteers)
        .bind(&event.image)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let event = sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn find(&self, filter: EventFilter) -> Result<Vec<Event>, StoreError> {
        let events = match filter {
            EventFilter::All => {
                sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY start_date"))
                    .fetch_all(&self.pool)
                    .await?
            }
            EventFilter::Upcoming { now } => {
                sqlx::query_as::<_, Event>(&format!(
                    "SELECT {EVENT_COLUMNS} FROM events WHERE start_date > $1 ORDER BY start_date"
                ))
                .bind(now)
                .fetch_all(&self.pool)
                .await?
            }
            EventFilter::Going { user, now } => {
                sqlx::query_as::<_, Event>(&format!(
                    "SELECT {EVENT_COLUMNS} FROM events WHERE $1 = ANY(volunteers) AND end_date > $2 \
                     ORDER BY start_date"
                ))
                .bind(user)
                .bind(now)
                .fetch_all(&self.pool)
                .await?
            }
            EventFilter::History { user, now } => {
                sqlx::query_as::<_, Event>(&format!(
                    "SELECT {EVENT_COLUMNS} FROM events WHERE end_date <= $2 \
                     AND ($1 = ANY(volunteers) OR author = $1) ORDER BY start_date"
                ))
                .bind(user)
                .bind(now)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(events)
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Event>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let events = sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    async fn update_details(&self, event: &Event) -> Result<Option<Event>, StoreError> {
        let updated = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET title = $2, description = $3, latitude = $4, longitude = $5, address = $6, \
             category = $7, spots = $8, start_date = $9, end_date = $10, image = $11 \
             WHERE id = $1 AND ($8 = -1 OR cardinality(volunteers) <= $8) RETURNING {EVENT_COLUMNS}"
        ))
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.latitude)
        .bind(event.longitude)
        .bind(&event.address)
        .bind(&event.category)
        .bind(event.spots)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(&event.image)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn set_volunteers_if(
        &self,
        id: Uuid,
        expected: &[Uuid],
        new: &[Uuid],
    ) -> Result<Option<Event>, StoreError> {
        let updated = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET volunteers = $3 WHERE id = $1 AND volunteers = $2 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id)
        .bind(expected)
        .bind(new)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let deleted = sqlx::query_as::<_, Event>(&format!("DELETE FROM events WHERE id = $1 RETURNING {EVENT_COLUMNS}"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(deleted)
    }
}
