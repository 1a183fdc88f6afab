// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the notes API.

pub mod auth;
pub mod login_limit;

pub use auth::{require_user, CurrentUser};
pub use login_limit::login_rate_limit;
