#![allow(dead_code, unused_macros)]

use std::sync::{Arc, Mutex};

use actix_web::web;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use volunteer_hub::{
    service::media::{MediaError, MediaStore},
    AppState,
};

pub const SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "password1";

/// Remembers every destroyed reference.
#[derive(Default)]
pub struct RecordingMediaStore {
    pub destroyed: Mutex<Vec<String>>,
}

impl RecordingMediaStore {
    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStore for RecordingMediaStore {
    async fn destroy(&self, reference: &str) -> Result<(), MediaError> {
        self.destroyed.lock().unwrap().push(reference.to_string());
        Ok(())
    }
}

pub fn test_state() -> (web::Data<AppState>, Arc<RecordingMediaStore>) {
    let media = Arc::new(RecordingMediaStore::default());
    let state = web::Data::new(AppState::in_memory(media.clone(), SECRET));
    (state, media)
}

/// Build the service under test around `state`.
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.clone())
                .wrap(volunteer_hub::security_headers())
                .wrap(volunteer_hub::cors(&[]))
                .configure(volunteer_hub::configure)
                .default_service(actix_web::web::to(volunteer_hub::unknown_endpoint)),
        )
        .await
    };
}

/// Register a user and return the response body.
macro_rules! register {
    ($app:expr, $email:expr, $name:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/api/users")
            .set_json($crate::common::new_user($email, $name))
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED, "registering {}", $email);
        let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
        body
    }};
}

/// Log in with the shared test password and return the token.
macro_rules! login {
    ($app:expr, $email:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/api/login")
            .set_json(serde_json::json!({ "email": $email, "password": $crate::common::PASSWORD }))
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK, "logging in {}", $email);
        let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
        body["token"].as_str().expect("token in login response").to_string()
    }};
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

pub fn new_user(email: &str, name: &str) -> Value {
    json!({ "email": email, "name": name, "password": PASSWORD, "latitude": 60.1, "longitude": 24.9 })
}

pub fn new_event(spots: i32) -> Value {
    let start = Utc::now() + Duration::days(3);
    json!({
        "title": "Beach cleanup",
        "description": "Collecting plastic along the shore",
        "latitude": 60.15,
        "longitude": 24.95,
        "address": "Hietaranta beach",
        "category": "environment",
        "spots": spots,
        "startDate": start,
        "endDate": start + Duration::hours(3),
    })
}
