//! HTTP handlers for the notes API.

pub mod categories;
pub mod notes;
pub mod ping;
pub mod users;
