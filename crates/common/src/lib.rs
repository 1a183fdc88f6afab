// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! exchanged between the notes frontend and the backend.
//! This module defines the JSON request and response bodies of the REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a category or a note
pub type Id = u64;

/// Successful response envelope: `{ "data": ... }`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Error response body used by every failure except rate limiting
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    /// Human readable message
    pub errors: String,
    /// Stable error code (e.g. `AUTH_001`)
    pub code: String,
}

/// Body of a `429 Too Many Requests` answer from the login limiter
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RateLimitedBody {
    /// Always `"ERROR"`
    pub status: String,
    pub message: String,
    /// Seconds until the lockout ends
    #[serde(rename = "retryAfter")]
    pub retry_after: u64,
}

/// Body of `GET /api/ping`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PingBody {
    pub status: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// `POST /api/users/register`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// `POST /api/users/login`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// `PATCH /api/users/current`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Public view of a user; never carries the password hash
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub username: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Body of `POST /api/categories` and `PUT /api/categories/{id}`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CategoryRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Category {
    pub id: Id,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

/// Body of `POST /api/notes`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
}

/// Body of `PUT /api/notes/{id}`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
}

/// Query string of `GET /api/notes`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct NoteListQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Id,
    pub title: String,
    pub content: String,
    pub category_id: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Embedded on reads, omitted on writes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

/// Pagination block of a note listing
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Paging {
    pub page: u64,
    pub total_item: u64,
    pub total_page: u64,
}

/// Response of `GET /api/notes`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NotePage {
    pub data: Vec<Note>,
    pub paging: Paging,
}
