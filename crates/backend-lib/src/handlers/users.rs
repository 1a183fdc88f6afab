//! User registration, login and profile handlers.
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use notes_common::{DataResponse, LoginRequest, RegisterRequest, UpdateUserRequest, UserProfile};
use tracing::info;

use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::error::AppError;
use crate::middleware::auth::{clear_session_cookie, session_cookie};
use crate::middleware::CurrentUser;
use crate::storage::UserRecord;
use crate::validation;
use crate::AppState;

/// `POST /api/users/register`
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<DataResponse<UserProfile>>, AppError> {
    let Json(request) = payload?;
    let user = validation::validate_register(request)?;

    if state.storage.find_user(&user.username).await?.is_some() {
        return Err(AppError::Conflict("username already exists".to_string()));
    }

    let password_hash = hash_password_blocking(user.password, state.settings.password_hash_log_n).await?;
    let profile = state
        .storage
        .create_user(UserRecord {
            username: user.username,
            name: user.name,
            password_hash,
        })
        .await?;

    info!(username = %profile.username, "user registered");
    Ok(Json(DataResponse::new(profile)))
}

/// `POST /api/users/login`
///
/// Sits behind the login rate limiter, which reads the status code: 401 means
/// a failed attempt, 2xx a successful one.
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let credentials = validation::validate_login(request)?;

    let user = state
        .storage
        .find_user(&credentials.username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password_blocking(user.password_hash.clone(), credentials.password).await {
        return Err(AppError::InvalidCredentials);
    }

    let token = state.sessions.new_session(&user.username).await;
    let cookie = session_cookie(&token, state.sessions.ttl())?;

    info!(username = %user.username, "user logged in");
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(DataResponse::new(user.profile())),
    )
        .into_response())
}

/// `GET /api/users/current`
pub async fn current(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<DataResponse<UserProfile>>, AppError> {
    let record = state
        .storage
        .find_user(&user.username)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;
    Ok(Json(DataResponse::new(record.profile())))
}

/// `PATCH /api/users/current`
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<DataResponse<UserProfile>>, AppError> {
    let Json(request) = payload?;
    let changes = validation::validate_user_update(request)?;

    let record = state
        .storage
        .find_user(&user.username)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    let password_hash = match changes.password {
        Some(password) => {
            if verify_password_blocking(record.password_hash.clone(), password.clone()).await {
                return Err(AppError::BadRequest(
                    "new password must differ from the current one".to_string(),
                ));
            }
            Some(hash_password_blocking(password, state.settings.password_hash_log_n).await?)
        }
        None => None,
    };

    let profile = state
        .storage
        .update_user(&user.username, changes.name, password_hash)
        .await?;
    Ok(Json(DataResponse::new(profile)))
}

/// `DELETE /api/users/logout`
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, AppError> {
    let revoked = state.sessions.revoke_user(&user.username).await;
    info!(username = %user.username, revoked, "user logged out");
    Ok((
        [(header::SET_COOKIE, clear_session_cookie()?)],
        Json(DataResponse::new("OK")),
    )
        .into_response())
}
