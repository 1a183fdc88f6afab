// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Adaptive rate limiting for login attempts.
//!
//! Every client identifier (normally the source IP) gets a lazily created
//! [`ClientLimitState`]. Failed logins are counted; once the threshold is hit
//! the client is locked out for `base * 2^level` seconds and `level` grows by
//! one, so each later violation is punished twice as long. Lockout expiry is
//! checked lazily on the next request, there are no timers.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Failed attempts that trigger a lockout
pub const DEFAULT_THRESHOLD: u32 = 6;

/// Length of the first lockout in seconds
pub const DEFAULT_BASE_LOCKOUT_SECS: u64 = 30;

/// Per-client limiter state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientLimitState {
    /// Consecutive failures since the last lockout or reset
    pub attempts: u32,
    /// Epoch ms until which the client is rejected, 0 when not blocked
    pub blocked_until: u64,
    /// Lockouts already imposed
    pub level: u32,
    /// Epoch ms of the last admit or failure, used by idle eviction only
    pub last_seen: u64,
}

impl ClientLimitState {
    pub fn is_blocked(&self, now: u64) -> bool {
        self.blocked_until > now
    }
}

/// Lockout policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub threshold: u32,
    pub base_lockout_secs: u64,
    /// Upper bound for a single lockout. `None` lets it double forever.
    pub max_lockout_secs: Option<u64>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            base_lockout_secs: DEFAULT_BASE_LOCKOUT_SECS,
            max_lockout_secs: None,
        }
    }
}

impl BackoffPolicy {
    /// Duration in seconds of the lockout imposed at `level`.
    ///
    /// Saturates at `u64::MAX` instead of overflowing.
    pub fn lockout_secs(&self, level: u32) -> u64 {
        let factor = 1u64.checked_shl(level).unwrap_or(u64::MAX);
        let secs = self.base_lockout_secs.saturating_mul(factor);
        match self.max_lockout_secs {
            Some(cap) => secs.min(cap),
            None => secs,
        }
    }
}

/// Outcome of [`LoginRateLimiter::check_and_admit`]
#[derive(Debug)]
pub enum Admission {
    /// Proceed to the credential check
    Admitted(AdmittedClient),
    /// Locked out for this many more seconds
    Rejected { retry_after_secs: u64 },
}

/// Handle to an admitted client's state.
///
/// Consumed by [`LoginRateLimiter::record_failure`], so a single admitted
/// attempt can record at most one failure.
#[derive(Debug)]
pub struct AdmittedClient {
    client_id: String,
    state: Arc<Mutex<ClientLimitState>>,
}

/// Registry of client limiter states
#[derive(Debug, Default)]
pub struct LoginRateLimiter {
    clients: DashMap<String, Arc<Mutex<ClientLimitState>>>,
    policy: BackoffPolicy,
}

impl LoginRateLimiter {
    /// Create a new limiter
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            clients: DashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Admit or reject a request from `client_id` at `now` (epoch ms).
    ///
    /// A lockout that has already elapsed is cleared, together with the
    /// attempt counter. `level` is kept.
    pub fn check_and_admit(&self, client_id: &str, now: u64) -> Admission {
        // The shard guard is released before the entry mutex is taken.
        let state = self
            .clients
            .entry(client_id.to_owned())
            .or_default()
            .value()
            .clone();

        {
            let mut entry = state.lock();
            if entry.blocked_until > now {
                let retry_after_secs = (entry.blocked_until - now).div_ceil(1000);
                return Admission::Rejected { retry_after_secs };
            }

            if entry.blocked_until != 0 {
                debug!(client_id, level = entry.level, "lockout expired");
                entry.blocked_until = 0;
                entry.attempts = 0;
            }
            entry.last_seen = now;
        }

        Admission::Admitted(AdmittedClient {
            client_id: client_id.to_owned(),
            state,
        })
    }

    /// Record a failed login for an admitted client.
    ///
    /// Returns the lockout just imposed in seconds, or 0 when the threshold
    /// has not been reached yet.
    pub fn record_failure(&self, admitted: AdmittedClient, now: u64) -> u64 {
        let mut entry = admitted.state.lock();
        entry.attempts = entry.attempts.saturating_add(1);
        entry.last_seen = now;

        if entry.attempts < self.policy.threshold {
            return 0;
        }

        let duration_secs = self.policy.lockout_secs(entry.level);
        entry.blocked_until = now.saturating_add(duration_secs.saturating_mul(1000));
        entry.level = entry.level.saturating_add(1);
        entry.attempts = 0;

        warn!(
            client_id = %admitted.client_id,
            level = entry.level,
            duration_secs,
            "client locked out after repeated login failures"
        );
        duration_secs
    }

    /// Forget everything about `client_id`, `level` included
    pub fn reset(&self, client_id: &str) {
        self.clients.remove(client_id);
    }

    /// Copy of the current state of `client_id`
    pub fn snapshot(&self, client_id: &str) -> Option<ClientLimitState> {
        let state = self.clients.get(client_id)?.value().clone();
        let copy = *state.lock();
        Some(copy)
    }

    /// Number of tracked clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Drop entries that are not blocked and were last seen more than `idle`
    /// before `now`. Returns how many were removed.
    pub fn evict_idle(&self, now: u64, idle: Duration) -> usize {
        let idle_ms = u64::try_from(idle.as_millis()).unwrap_or(u64::MAX);
        let before = self.clients.len();
        self.clients.retain(|_, state| {
            let entry = state.lock();
            entry.is_blocked(now) || now.saturating_sub(entry.last_seen) < idle_ms
        });
        before.saturating_sub(self.clients.len())
    }
}
