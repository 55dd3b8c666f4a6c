use actix_web::{post, web, HttpResponse};
use log::info;

use crate::{dto::LoginRequest, errors::ApiError, service, service::auth::AuthenticatedUser, AppState};

#[post("/login")]
pub async fn login(dto: web::Json<LoginRequest>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let response = service::user::login(&state, dto.into_inner()).await?;
    info!("RESPONSE /API/LOGIN: {}", response.email);
    Ok(HttpResponse::Ok().json(response))
}

#[post("/logout")]
pub async fn logout(user: AuthenticatedUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    service::user::logout(&state, &user).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(login).service(logout);
}
