// ============================
// notes-backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! Sources, later ones winning: built-in defaults, a TOML file, then
//! `NOTES_`-prefixed environment variables (`__` separates nested keys, e.g.
//! `NOTES_LOGIN_LIMIT__THRESHOLD=10`).
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::auth::password::DEFAULT_LOG_N;
use crate::auth::SESSION_TTL;
use crate::auth::rate_limit::{BackoffPolicy, DEFAULT_BASE_LOCKOUT_SECS, DEFAULT_THRESHOLD};

/// Default configuration file
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "NOTES_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level, overridden by `RUST_LOG`
    pub log_level: String,
    pub log_format: LogFormat,
    /// Origin allowed by CORS, with credentials
    pub frontend_url: Option<String>,
    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`
    pub trust_proxy_headers: bool,
    /// Session TTL in seconds
    pub session_ttl_secs: u64,
    /// Interval of the expired-session sweep in seconds
    pub session_sweep_secs: u64,
    /// scrypt cost exponent
    pub password_hash_log_n: u8,
    pub login_limit: LoginLimitSettings,
}

/// Login rate limiter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginLimitSettings {
    /// Failed attempts before a lockout
    pub threshold: u32,
    /// First lockout in seconds, doubled on every later lockout
    pub base_lockout_secs: u64,
    /// Ceiling for a single lockout, unbounded when unset
    pub max_lockout_secs: Option<u64>,
    /// Forget idle, unblocked clients after this many seconds. Off when unset.
    pub idle_eviction_secs: Option<u64>,
    /// How often the idle sweep runs
    pub sweep_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            frontend_url: None,
            trust_proxy_headers: false,
            session_ttl_secs: SESSION_TTL.as_secs(),
            session_sweep_secs: 60 * 60,
            password_hash_log_n: DEFAULT_LOG_N,
            login_limit: LoginLimitSettings::default(),
        }
    }
}

impl Default for LoginLimitSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            base_lockout_secs: DEFAULT_BASE_LOCKOUT_SECS,
            max_lockout_secs: None,
            idle_eviction_secs: None,
            sweep_interval_secs: 60,
        }
    }
}

impl LoginLimitSettings {
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            threshold: self.threshold,
            base_lockout_secs: self.base_lockout_secs,
            max_lockout_secs: self.max_lockout_secs,
        }
    }

    pub fn idle_eviction(&self) -> Option<Duration> {
        self.idle_eviction_secs.map(Duration::from_secs)
    }
}

impl Settings {
    /// Load from the given TOML file (if present) and the environment.
    ///
    /// Not validated: callers apply their overrides first, then call
    /// [`Settings::validate`].
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::figment(path.as_ref()).extract()?)
    }

    /// Layered configuration sources. Missing keys fall back to `Default`.
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            bail!("invalid log_level {:?}", self.log_level);
        }
        if self.session_ttl_secs == 0 {
            bail!("session_ttl_secs must be greater than zero");
        }
        if self.session_sweep_secs == 0 {
            bail!("session_sweep_secs must be greater than zero");
        }
        if !(1..=20).contains(&self.password_hash_log_n) {
            bail!("password_hash_log_n must be between 1 and 20");
        }

        let limit = &self.login_limit;
        if limit.threshold == 0 {
            bail!("login_limit.threshold must be greater than zero");
        }
        if limit.base_lockout_secs == 0 {
            bail!("login_limit.base_lockout_secs must be greater than zero");
        }
        if let Some(cap) = limit.max_lockout_secs {
            if cap < limit.base_lockout_secs {
                bail!("login_limit.max_lockout_secs must not be below base_lockout_secs");
            }
        }
        if limit.idle_eviction_secs == Some(0) {
            bail!("login_limit.idle_eviction_secs must be greater than zero when set");
        }
        if limit.sweep_interval_secs == 0 {
            bail!("login_limit.sweep_interval_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}
