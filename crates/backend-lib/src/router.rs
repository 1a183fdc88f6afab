// ============================
// notes-backend-lib/src/router.rs
// ============================
//! HTTP route table.
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::handlers::{categories, notes, ping, users};
use crate::middleware::{login_rate_limit, require_user};
use crate::AppState;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let login = Router::new()
        .route("/api/users/login", post(users::login))
        .route_layer(from_fn_with_state(state.clone(), login_rate_limit));

    let public = Router::new()
        .route("/api/users/register", post(users::register))
        .route("/api/ping", get(ping::ping))
        .merge(login);

    let protected = Router::new()
        .route(
            "/api/users/current",
            get(users::current).patch(users::update),
        )
        .route("/api/users/logout", delete(users::logout))
        .route(
            "/api/categories",
            post(categories::create).get(categories::list),
        )
        .route(
            "/api/categories/{category_id}",
            put(categories::update).delete(categories::remove),
        )
        .route("/api/notes", post(notes::create).get(notes::list))
        .route(
            "/api/notes/{note_id}",
            get(notes::get).put(notes::update).delete(notes::remove),
        )
        .route_layer(from_fn_with_state(state.clone(), require_user));

    let mut router = public
        .merge(protected)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(state.settings.frontend_url.as_deref()) {
        router = router.layer(cors);
    }

    router.with_state(state)
}

/// CORS for the configured frontend origin, with credentials
fn cors_layer(frontend_url: Option<&str>) -> Option<CorsLayer> {
    let origin = frontend_url?;
    let origin = match HeaderValue::from_str(origin) {
        Ok(origin) => origin,
        Err(_) => {
            warn!(origin, "ignoring invalid frontend_url for CORS");
            return None;
        }
    };
    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    )
}
