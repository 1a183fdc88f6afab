//! Shared setup for the HTTP integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use cookie::Cookie;
use notes_backend_lib::{
    clock::ManualClock, config::Settings, router::create_router, storage::MemoryStorage, AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Start of the manual clock, an arbitrary 2023 timestamp
pub const START_MILLIS: u64 = 1_700_000_000_000;

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Cookie set by the response, parsed
    pub fn set_cookie(&self) -> Option<Cookie<'static>> {
        let raw = self.headers.get(header::SET_COOKIE)?.to_str().ok()?;
        Cookie::parse(raw.to_string()).ok()
    }

    /// Session token from the `Set-Cookie` header
    pub fn session_token(&self) -> Option<String> {
        self.set_cookie()
            .filter(|cookie| cookie.name() == "token" && !cookie.value().is_empty())
            .map(|cookie| cookie.value().to_string())
    }
}

/// Settings with a cheap password hash so tests stay fast
pub fn test_settings() -> Settings {
    Settings {
        password_hash_log_n: 4,
        ..Settings::default()
    }
}

pub fn test_app() -> TestApp {
    test_app_with(test_settings())
}

pub fn test_app_with(settings: Settings) -> TestApp {
    let clock = Arc::new(ManualClock::new(START_MILLIS));
    let state = Arc::new(AppState::new(
        Arc::new(MemoryStorage::new()),
        settings,
        clock.clone(),
    ));
    let router = create_router(state.clone());
    TestApp {
        router,
        state,
        clock,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> TestResponse {
        self.send(json_request(
            Method::POST,
            "/api/users/register",
            json!({ "username": username, "password": password, "name": username }),
        ))
        .await
    }

    /// Log in from `peer` (an `ip:port` string)
    pub async fn login_from(&self, peer: &str, username: &str, password: &str) -> TestResponse {
        let request = with_peer(
            json_request(
                Method::POST,
                "/api/users/login",
                json!({ "username": username, "password": password }),
            ),
            peer,
        );
        self.send(request).await
    }

    /// Register and log in, returning the session token
    pub async fn signed_in(&self, username: &str) -> String {
        assert_eq!(self.register(username, "rahasia").await.status, StatusCode::OK);
        let response = self.login_from("127.0.0.1:40000", username, "rahasia").await;
        assert_eq!(response.status, StatusCode::OK);
        response.session_token().expect("login sets a session cookie")
    }
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn with_peer(mut request: Request<Body>, peer: &str) -> Request<Body> {
    let addr: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

pub fn with_token(mut request: Request<Body>, token: &str) -> Request<Body> {
    let cookie = Cookie::new("token", token.to_string());
    request.headers_mut().insert(
        header::COOKIE,
        cookie.stripped().to_string().parse().unwrap(),
    );
    request
}
