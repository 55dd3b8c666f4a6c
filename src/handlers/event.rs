use actix_web::{delete, get, post, put, web, HttpResponse};
use uuid::Uuid;

use crate::{
    dto::{EventListQuery, NewEventDto, UpdateEventDto},
    errors::ApiError,
    service::{self, auth::AuthenticatedUser, event::Listing},
    AppState,
};

#[get("/events")]
pub async fn get_all(query: web::Query<EventListQuery>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let listing = if query.all { Listing::All } else { Listing::Upcoming };
    let events = service::event::list(&state, listing, None).await?;
    Ok(HttpResponse::Ok().json(events))
}

#[get("/events/going")]
pub async fn going(user: AuthenticatedUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let events = service::event::list(&state, Listing::Going, Some(&user)).await?;
    Ok(HttpResponse::Ok().json(events))
}

#[get("/events/history")]
pub async fn history(user: AuthenticatedUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let events = service::event::list(&state, Listing::History, Some(&user)).await?;
    Ok(HttpResponse::Ok().json(events))
}

#[get("/events/{id}")]
pub async fn get_by_id(id: web::Path<Uuid>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let event = service::event::get_by_id(&state, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(event))
}

#[post("/events")]
pub async fn create(
    user: AuthenticatedUser,
    dto: web::Json<NewEventDto>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let event = service::event::create(&state, &user, dto.into_inner()).await?;
    Ok(HttpResponse::Created().json(event))
}

#[put("/events/{id}")]
pub async fn update(
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    dto: web::Json<UpdateEventDto>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let event = service::event::update(&state, id.into_inner(), dto.into_inner(), &user).await?;
    Ok(HttpResponse::Ok().json(event))
}

#[delete("/events/{id}")]
pub async fn delete(
    id: web::Path<Uuid>,
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    service::event::delete(&state, id.into_inner(), &user).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[put("/events/{id}/rsvp")]
pub async fn rsvp(
    id: web::Path<Uuid>,
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let event = service::rsvp::toggle(&state, id.into_inner(), &user).await?;
    Ok(HttpResponse::Ok().json(event))
}

/// `going` and `history` must be registered before `{id}`.
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(going)
        .service(history)
        .service(get_all)
        .service(get_by_id)
        .service(create)
        .service(update)
        .service(delete)
        .service(rsvp);
}
