use actix_web::{delete, get, post, put, web, HttpResponse};
use uuid::Uuid;

use crate::{
    dto::{NewUserDto, UpdateUserDto},
    errors::ApiError,
    service::{self, auth::AuthenticatedUser},
    AppState,
};

#[post("/users")]
pub async fn register(dto: web::Json<NewUserDto>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let user = service::user::create(&state, dto.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

#[get("/users")]
pub async fn get_all(_user: AuthenticatedUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let users = service::user::get_all(&state).await?;
    Ok(HttpResponse::Ok().json(users))
}

#[get("/users/{id}")]
pub async fn get_by_id(
    id: web::Path<Uuid>,
    _user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let user = service::user::get_by_id(&state, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[put("/users/{id}")]
pub async fn update(
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    dto: web::Json<UpdateUserDto>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let updated = service::user::update(&state, id.into_inner(), dto.into_inner(), &user).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/users/{id}")]
pub async fn delete(
    id: web::Path<Uuid>,
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    service::user::delete(&state, id.into_inner(), &user).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register)
        .service(get_all)
        .service(get_by_id)
        .service(update)
        .service(delete);
}
