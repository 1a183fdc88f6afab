// ============================
// notes-backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod password;
pub mod rate_limit;
pub mod session;

pub use password::{hash_password, verify_password, MAX_PASSWORD_LENGTH};
pub use rate_limit::{
    Admission, AdmittedClient, BackoffPolicy, ClientLimitState, LoginRateLimiter,
};
pub use session::{Session, SessionManager, SESSION_TTL};
