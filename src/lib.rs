pub mod config;
pub mod db;
pub mod dto;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod service;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{
    error::ResponseError,
    http::header,
    middleware::DefaultHeaders,
    web, HttpResponse,
};
use log::debug;
use sqlx::postgres::PgPool;

use crate::{
    db::{
        event::PgEventRepository,
        memory::{MemoryEventRepository, MemorySessionStore, MemoryUserRepository},
        session::PgSessionStore,
        user::PgUserRepository,
        EventRepository, SessionStore, UserRepository,
    },
    errors::ApiError,
    service::{auth::jwt::TokenKeys, media::MediaStore, rsvp::EventLocks, session::SessionRegistry},
};

/// Everything a request handler needs, shared across workers.
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub events: Arc<dyn EventRepository>,
    pub sessions: SessionRegistry,
    pub tokens: TokenKeys,
    pub media: Arc<dyn MediaStore>,
    pub event_locks: EventLocks,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserRepository>,
        events: Arc<dyn EventRepository>,
        sessions: Arc<dyn SessionStore>,
        media: Arc<dyn MediaStore>,
        secret: &str,
    ) -> Self {
        Self {
            users,
            events,
            sessions: SessionRegistry::new(sessions),
            tokens: TokenKeys::from_secret(secret),
            media,
            event_locks: EventLocks::new(),
        }
    }

    pub fn postgres(pool: PgPool, media: Arc<dyn MediaStore>, secret: &str) -> Self {
        Self::new(
            Arc::new(PgUserRepository::new(pool.clone())),
            Arc::new(PgEventRepository::new(pool.clone())),
            Arc::new(PgSessionStore::new(pool)),
            media,
            secret,
        )
    }

    pub fn in_memory(media: Arc<dyn MediaStore>, secret: &str) -> Self {
        Self::new(
            Arc::new(MemoryUserRepository::new()),
            Arc::new(MemoryEventRepository::new()),
            Arc::new(MemorySessionStore::new()),
            media,
            secret,
        )
    }
}

/// Cross-origin policy for the browser front end. No origins means any origin.
pub fn cors(origins: &[String]) -> Cors {
    let cors = origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin));
    let cors = if origins.is_empty() { cors.allow_any_origin() } else { cors };
    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(3600)
}

/// Hardening headers added to every response.
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Content-Security-Policy", "default-src 'self'; frame-ancestors 'self'; object-src 'none'"))
        .add(("Cross-Origin-Opener-Policy", "same-origin"))
        .add(("Cross-Origin-Resource-Policy", "same-origin"))
        .add(("Origin-Agent-Cluster", "?1"))
        .add(("Referrer-Policy", "no-referrer"))
        .add(("Strict-Transport-Security", "max-age=15552000; includeSubDomains"))
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-DNS-Prefetch-Control", "off"))
        .add(("X-Download-Options", "noopen"))
        .add(("X-Frame-Options", "SAMEORIGIN"))
        .add(("X-Permitted-Cross-Domain-Policies", "none"))
        .add(("X-XSS-Protection", "0"))
}

fn bad_request(message: &str, detail: impl std::fmt::Display) -> actix_web::Error {
    debug!("rejecting request: {}", detail);
    ApiError::BadRequest(message.to_string()).into()
}

/// Mount the `/api` scope with JSON error handling for malformed bodies and ids.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(|err, _| bad_request("invalid request", err)))
            .app_data(web::PathConfig::default().error_handler(|err, _| bad_request("malformatted id", err)))
            .app_data(web::QueryConfig::default().error_handler(|err, _| bad_request("invalid query", err)))
            .configure(handlers::auth::init_routes)
            .configure(handlers::user::init_routes)
            .configure(handlers::event::init_routes),
    );
}

pub async fn unknown_endpoint() -> HttpResponse {
    ApiError::NotFound("unknown endpoint".to_string()).error_response()
}
