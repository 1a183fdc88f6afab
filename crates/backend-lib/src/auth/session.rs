// ============================
// notes-backend-lib/src/auth/session.rs
// ============================
//! Session token handling and management.
use metrics::{counter, gauge};
use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::metrics::{SESSION_ACTIVE, SESSION_CREATED, SESSION_EXPIRED};

/// Default session TTL, matching the login cookie lifetime
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24); // 1 day

/// Session information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    /// Epoch milliseconds
    pub created_at: u64,
    /// Epoch milliseconds
    pub expires_at: u64,
}

/// Session manager for handling authentication tokens
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a new session for `username`, revoking the user's previous ones.
    pub async fn new_session(&self, username: &str) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let now = self.clock.now_millis();
        let ttl_ms = u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX);
        let session = Session {
            username: username.to_string(),
            created_at: now,
            expires_at: now.saturating_add(ttl_ms),
        };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.username != username);
        sessions.insert(token.clone(), session);

        counter!(SESSION_CREATED).increment(1);
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        debug!(username, "session created");

        token
    }

    /// Get a live session by token
    pub async fn get(&self, token: &str) -> Option<Session> {
        let now = self.clock.now_millis();
        let sessions = self.sessions.read().await;
        sessions
            .get(token)
            .filter(|session| now < session.expires_at)
            .cloned()
    }

    /// Revoke every session of `username`. Returns how many were removed.
    pub async fn revoke_user(&self, username: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.username != username);
        let removed = before - sessions.len();
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        removed
    }

    /// Remove expired sessions. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| now < session.expires_at);
        let after = sessions.len();
        let removed = before - after;

        if removed > 0 {
            counter!(SESSION_EXPIRED).increment(removed as u64);
            gauge!(SESSION_ACTIVE).set(after as f64);
        }
        removed
    }

    /// Cleanup task that runs periodically to remove expired sessions
    pub async fn cleanup_task(self, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let removed = self.purge_expired().await;
            if removed > 0 {
                info!(removed, "expired sessions purged");
            }
        }
    }
}
