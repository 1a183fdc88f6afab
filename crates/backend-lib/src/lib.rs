// ============================
// notes-backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the notes REST service.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::auth::{LoginRateLimiter, SessionManager};
use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::storage::{MemoryStorage, Storage};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Storage backend
    pub storage: Arc<dyn Storage>,
    /// Session manager
    pub sessions: SessionManager,
    /// Loaded settings
    pub settings: Arc<Settings>,
    /// Login rate limiter, one registry per process
    pub login_limiter: Arc<LoginRateLimiter>,
    /// Time source for the limiter and sessions
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Create a new application state
    pub fn new(storage: Arc<dyn Storage>, settings: Settings, clock: Arc<dyn Clock>) -> Self {
        let sessions = SessionManager::new(settings.session_ttl(), clock.clone());
        let login_limiter = Arc::new(LoginRateLimiter::new(settings.login_limit.policy()));

        Self {
            storage,
            sessions,
            settings: Arc::new(settings),
            login_limiter,
            clock,
        }
    }

    /// In-memory storage and the system clock
    pub fn in_memory(settings: Settings) -> Self {
        Self::new(Arc::new(MemoryStorage::new()), settings, Arc::new(SystemClock))
    }

    /// Spawn the periodic maintenance tasks: the expired-session sweep, and
    /// the limiter idle sweep when `login_limit.idle_eviction_secs` is set.
    pub fn spawn_background_tasks(&self) {
        let sessions = self.sessions.clone();
        let every = Duration::from_secs(self.settings.session_sweep_secs);
        tokio::spawn(sessions.cleanup_task(every));

        if let Some(idle) = self.settings.login_limit.idle_eviction() {
            let limiter = self.login_limiter.clone();
            let clock = self.clock.clone();
            let every = Duration::from_secs(self.settings.login_limit.sweep_interval_secs);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(every);
                loop {
                    ticker.tick().await;
                    let removed = limiter.evict_idle(clock.now_millis(), idle);
                    if removed > 0 {
                        info!(removed, remaining = limiter.len(), "idle login limiter entries evicted");
                    }
                }
            });
        }
    }
}
