//! Session authentication for the protected API routes.
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use tracing::debug;

use crate::{error::AppError, AppState};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "token";

/// Authenticated user, inserted into request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub username: String,
}

/// Session token from the `token` cookie, or else from `Authorization`
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string());

    from_cookie
        .or_else(|| {
            let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
            Some(raw.strip_prefix("Bearer ").unwrap_or(raw).trim().to_string())
        })
        .filter(|token| !token.is_empty())
}

fn base_cookie(value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .build()
}

fn set_cookie_value(cookie: &Cookie<'_>) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&cookie.to_string()).map_err(|e| AppError::Internal(e.to_string()))
}

/// `Set-Cookie` value for a fresh session
pub fn session_cookie(token: &str, ttl: Duration) -> Result<HeaderValue, AppError> {
    let mut cookie = base_cookie(token.to_string());
    cookie.set_max_age(CookieDuration::try_from(ttl).unwrap_or(CookieDuration::MAX));
    set_cookie_value(&cookie)
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie() -> Result<HeaderValue, AppError> {
    let mut cookie = base_cookie(String::new());
    cookie.make_removal();
    set_cookie_value(&cookie)
}

/// Reject requests without a live session
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = session_token(request.headers()) else {
        return AppError::Unauthorized.into_response();
    };

    match state.sessions.get(&token).await {
        Some(session) => {
            request.extensions_mut().insert(CurrentUser {
                username: session.username,
            });
            next.run(request).await
        }
        None => {
            debug!("unknown or expired session token");
            let mut response = AppError::Unauthorized.into_response();
            if let Ok(cleared) = clear_session_cookie() {
                response.headers_mut().append(header::SET_COOKIE, cleared);
            }
            response
        }
    }
}
