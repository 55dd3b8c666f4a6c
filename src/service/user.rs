use log::{error, info};
use uuid::Uuid;

use super::{auth::AuthenticatedUser, crypto, populate, validate};
use crate::{
    dto::{LoginRequest, LoginResponse, NewUserDto, UpdateUserDto, UserView},
    errors::{ApiError, AuthFailure},
    models::User,
    AppState,
};

async fn hash_password(password: String) -> Result<String, ApiError> {
    let hashed = tokio::task::spawn_blocking(move || crypto::hash_password(&password)).await;
    match hashed {
        Ok(Ok(hash)) => Ok(hash),
        Ok(Err(err)) => {
            error!("[{:} : {:}] PASSWORD HASHING ERROR: {}", file!(), line!(), err);
            Err(ApiError::Internal)
        }
        Err(err) => {
            error!("[{:} : {:}] PASSWORD HASHING TASK FAILED: {}", file!(), line!(), err);
            Err(ApiError::Internal)
        }
    }
}

async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    let verified = tokio::task::spawn_blocking(move || crypto::verify_password(&password, &hash)).await;
    match verified {
        Ok(Ok(ok)) => Ok(ok),
        Ok(Err(err)) => {
            error!("[{:} : {:}] STORED PASSWORD HASH UNREADABLE: {}", file!(), line!(), err);
            Ok(false)
        }
        Err(err) => {
            error!("[{:} : {:}] PASSWORD CHECK TASK FAILED: {}", file!(), line!(), err);
            Err(ApiError::Internal)
        }
    }
}

/// Register a new account. The email is normalized before the uniqueness check.
pub async fn create(state: &AppState, dto: NewUserDto) -> Result<UserView, ApiError> {
    let NewUserDto {
        email,
        name,
        password,
        latitude,
        longitude,
        address,
        photo,
    } = dto;
    let email = validate::normalize_email(&email);
    validate::validate_password(&password)?;
    validate::validate_email(&email)?;
    validate::validate_name(&name)?;
    validate::validate_coordinates(latitude, longitude)?;

    if state.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("this email is already registered".to_string()));
    }

    let user = User {
        id: Uuid::new_v4(),
        email,
        name: name.trim().to_string(),
        pwd_hash: hash_password(password).await?,
        latitude,
        longitude,
        address,
        photo,
        created_events: Vec::new(),
        responded_events: Vec::new(),
    };
    // A concurrent registration can still win the race; the store reports it as a duplicate.
    state.users.insert(&user).await?;

    info!("registered user {}", user.id);
    Ok(UserView::new(user, Vec::new(), Vec::new()))
}

/// Check credentials, issue a token and make it the user's only live session.
pub async fn login(state: &AppState, req: LoginRequest) -> Result<LoginResponse, ApiError> {
    let email = validate::normalize_email(&req.email);
    let Some(user) = state.users.find_by_email(&email).await? else {
        return Err(ApiError::Unauthorized(AuthFailure::BadCredentials));
    };
    if !verify_password(req.password, user.pwd_hash.clone()).await? {
        return Err(ApiError::Unauthorized(AuthFailure::BadCredentials));
    }

    let token = state.tokens.issue(user.id, &user.email)?;
    state.sessions.open(user.id, &token).await?;

    info!("user {} logged in", user.id);
    Ok(LoginResponse {
        token,
        email: user.email,
        name: user.name,
    })
}

pub async fn logout(state: &AppState, user: &AuthenticatedUser) -> Result<(), ApiError> {
    state.sessions.revoke(user.user_id).await?;
    info!("user {} logged out", user.user_id);
    Ok(())
}

pub async fn get_all(state: &AppState) -> Result<Vec<UserView>, ApiError> {
    let users = state.users.find_all().await?;
    Ok(populate::populate_users(state.events.as_ref(), users).await?)
}

pub async fn get_by_id(state: &AppState, id: Uuid) -> Result<UserView, ApiError> {
    let user = state.users.find_by_id(id).await?.ok_or_else(|| ApiError::not_found("user"))?;
    Ok(populate::populate_user(state.events.as_ref(), user).await?)
}

async fn find_self(state: &AppState, id: Uuid, requester: &AuthenticatedUser, action: &str) -> Result<User, ApiError> {
    let user = state.users.find_by_id(id).await?.ok_or_else(|| ApiError::not_found("user"))?;
    if user.id != requester.user_id {
        return Err(ApiError::Forbidden(format!("users can only {action} their own account")));
    }
    Ok(user)
}

pub async fn update(
    state: &AppState,
    id: Uuid,
    dto: UpdateUserDto,
    requester: &AuthenticatedUser,
) -> Result<UserView, ApiError> {
    let current = find_self(state, id, requester, "update").await?;
    let merged = dto.apply_to(&current);
    validate::validate_name(&merged.name)?;
    validate::validate_coordinates(merged.latitude, merged.longitude)?;

    let updated = state
        .users
        .update_profile(&merged)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;

    if let Some(old) = current.photo.as_deref().filter(|old| updated.photo.as_deref() != Some(*old)) {
        if let Err(err) = state.media.destroy(old).await {
            error!(
                "[{:} : {:}] INCONSISTENT: user {} updated but old photo {} not destroyed: {}",
                file!(),
                line!(),
                id,
                old,
                err
            );
            return Err(ApiError::Internal);
        }
    }

    info!("user {} updated their profile", id);
    Ok(populate::populate_user(state.events.as_ref(), updated).await?)
}

/// Delete the requester's own account, revoke its session and destroy its photo.
///
/// Events the user volunteered for keep the dangling id; population drops it.
pub async fn delete(state: &AppState, id: Uuid, requester: &AuthenticatedUser) -> Result<(), ApiError> {
    find_self(state, id, requester, "delete").await?;
    let deleted = state.users.delete(id).await?.ok_or_else(|| ApiError::not_found("user"))?;

    let mut consistent = true;
    if let Err(err) = state.sessions.revoke(id).await {
        error!(
            "[{:} : {:}] INCONSISTENT: user {} deleted but session not revoked: {}",
            file!(),
            line!(),
            id,
            err
        );
        consistent = false;
    }
    if let Some(photo) = deleted.photo.as_deref() {
        if let Err(err) = state.media.destroy(photo).await {
            error!(
                "[{:} : {:}] INCONSISTENT: user {} deleted but photo {} not destroyed: {}",
                file!(),
                line!(),
                id,
                photo,
                err
            );
            consistent = false;
        }
    }
    if !consistent {
        return Err(ApiError::Internal);
    }

    info!("user {} deleted their account", id);
    Ok(())
}
