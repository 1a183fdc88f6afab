//! Login rate limiting middleware.
//!
//! Wraps the login handler: a locked-out client gets a 429 before its
//! credentials are looked at, a 401 from the handler counts as a failure and a
//! successful login wipes the client's limiter state.
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::{debug, warn};

use crate::auth::Admission;
use crate::metrics::{LOGIN_LOCKOUT, LOGIN_REJECTED};
use crate::{error::AppError, AppState};

/// Identifier used when no address is available
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derive the limiter key of a request.
///
/// Proxy headers are only honored when `trust_proxy_headers` is set, since
/// anyone can send them.
pub fn client_identifier(request: &Request, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(ip) = forwarded_ip(request) {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn forwarded_ip(request: &Request) -> Option<IpAddr> {
    let headers = request.headers();

    // leftmost X-Forwarded-For entry is the original client
    let xff = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok());

    xff.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    })
}

/// Login rate limiter middleware
pub async fn login_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let client_id = client_identifier(&request, state.settings.trust_proxy_headers);
    let limiter = &state.login_limiter;

    let admitted = match limiter.check_and_admit(&client_id, state.clock.now_millis()) {
        Admission::Rejected { retry_after_secs } => {
            counter!(LOGIN_REJECTED).increment(1);
            warn!(%client_id, retry_after_secs, "login attempt rejected");
            return AppError::RateLimited { retry_after_secs }.into_response();
        }
        Admission::Admitted(admitted) => admitted,
    };

    let response = next.run(request).await;
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        let lockout_secs = limiter.record_failure(admitted, state.clock.now_millis());
        if lockout_secs > 0 {
            counter!(LOGIN_LOCKOUT).increment(1);
            return AppError::RateLimited {
                retry_after_secs: lockout_secs,
            }
            .into_response();
        }
    } else if status.is_success() {
        debug!(%client_id, "login succeeded, limiter state cleared");
        limiter.reset(&client_id);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(peer: Option<&str>, headers: &[(&str, &str)]) -> Request {
        let mut builder = Request::builder().uri("/api/users/login");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        if let Some(peer) = peer {
            let addr: SocketAddr = peer.parse().unwrap();
            request.extensions_mut().insert(ConnectInfo(addr));
        }
        request
    }

    #[test]
    fn peer_address_is_the_default_key() {
        let req = request(Some("10.1.2.3:5555"), &[("x-forwarded-for", "1.1.1.1")]);
        assert_eq!(client_identifier(&req, false), "10.1.2.3");
    }

    #[test]
    fn missing_peer_is_unknown() {
        let req = request(None, &[]);
        assert_eq!(client_identifier(&req, false), UNKNOWN_CLIENT);
    }

    #[test]
    fn trusted_proxy_headers() {
        let req = request(
            Some("10.0.0.1:1"),
            &[("x-forwarded-for", " 203.0.113.7 , 10.0.0.1"), ("x-real-ip", "198.51.100.1")],
        );
        assert_eq!(client_identifier(&req, true), "203.0.113.7");

        let req = request(Some("10.0.0.1:1"), &[("x-real-ip", "198.51.100.1")]);
        assert_eq!(client_identifier(&req, true), "198.51.100.1");

        let req = request(Some("10.0.0.1:1"), &[("x-forwarded-for", "garbage")]);
        assert_eq!(client_identifier(&req, true), "10.0.0.1");
    }
}
