// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Request validation module.
//!
//! Each function takes a raw request body from `notes_common` and returns a
//! validated, owned value or the first rule it broke.

use notes_common::{
    CategoryRequest, CreateNoteRequest, Id, LoginRequest, NoteListQuery, RegisterRequest,
    UpdateNoteRequest, UpdateUserRequest,
};
use thiserror::Error;

// Common validation constants
pub const MAX_USERNAME_LENGTH: usize = 100;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_PASSWORD_LENGTH: usize = crate::auth::MAX_PASSWORD_LENGTH;
pub const MAX_CATEGORY_NAME_LENGTH: usize = 100;
pub const MAX_NOTE_TITLE_LENGTH: usize = 30;
pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("\"{0}\" is required")]
    Required(&'static str),

    #[error("\"{field}\" length must be less than or equal to {max} characters long")]
    TooLong { field: &'static str, max: usize },

    #[error("\"{0}\" must be a positive number")]
    NotPositive(&'static str),

    #[error("\"{field}\" must be less than or equal to {max}")]
    TooLarge { field: &'static str, max: u64 },

    #[error("\"{field}\" must be one of {allowed}")]
    NotAllowed {
        field: &'static str,
        allowed: &'static str,
    },

    #[error("Invalid request: {0}")]
    Malformed(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validated registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub name: String,
}

/// Validated login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Validated profile change; both parts optional
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub password: Option<String>,
}

/// Validated note creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub category_id: Id,
}

/// Validated note update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteChanges {
    pub title: String,
    pub content: Option<String>,
    pub category_id: Option<Id>,
}

/// Ordering of a note listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoteSort {
    /// Ascending id, the store's natural order
    #[default]
    Oldest,
    Newest,
}

/// Validated note listing query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSearch {
    pub page: u64,
    pub size: u64,
    pub search: Option<String>,
    pub category_id: Option<Id>,
    pub sort: NoteSort,
}

fn required(field: &'static str, value: Option<String>, max: usize) -> ValidationResult<String> {
    match value {
        Some(v) if !v.is_empty() => bounded(field, v, max),
        _ => Err(ValidationError::Required(field)),
    }
}

fn optional(field: &'static str, value: Option<String>, max: usize) -> ValidationResult<Option<String>> {
    match value {
        None => Ok(None),
        Some(v) if v.is_empty() => Err(ValidationError::Required(field)),
        Some(v) => bounded(field, v, max).map(Some),
    }
}

fn bounded(field: &'static str, value: String, max: usize) -> ValidationResult<String> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(value)
}

/// Validate a positive identifier
pub fn validate_id(field: &'static str, value: i64) -> ValidationResult<Id> {
    if value <= 0 {
        return Err(ValidationError::NotPositive(field));
    }
    Ok(value as Id)
}

pub fn validate_register(req: RegisterRequest) -> ValidationResult<NewUser> {
    Ok(NewUser {
        username: required("username", req.username, MAX_USERNAME_LENGTH)?,
        password: required("password", req.password, MAX_PASSWORD_LENGTH)?,
        name: required("name", req.name, MAX_NAME_LENGTH)?,
    })
}

pub fn validate_login(req: LoginRequest) -> ValidationResult<Credentials> {
    Ok(Credentials {
        username: required("username", req.username, MAX_USERNAME_LENGTH)?,
        password: required("password", req.password, MAX_PASSWORD_LENGTH)?,
    })
}

pub fn validate_user_update(req: UpdateUserRequest) -> ValidationResult<UserChanges> {
    Ok(UserChanges {
        name: optional("name", req.name, MAX_NAME_LENGTH)?,
        password: optional("password", req.password, MAX_PASSWORD_LENGTH)?,
    })
}

/// Validate a category name (create and rename share the rule)
pub fn validate_category(req: CategoryRequest) -> ValidationResult<String> {
    required("name", req.name, MAX_CATEGORY_NAME_LENGTH)
}

pub fn validate_new_note(req: CreateNoteRequest) -> ValidationResult<NewNote> {
    let title = required("title", req.title, MAX_NOTE_TITLE_LENGTH)?;
    let content = required("content", req.content, usize::MAX)?;
    let category_id = req
        .category_id
        .ok_or(ValidationError::Required("categoryId"))
        .and_then(|id| validate_id("categoryId", id))?;
    Ok(NewNote {
        title,
        content,
        category_id,
    })
}

pub fn validate_note_update(req: UpdateNoteRequest) -> ValidationResult<NoteChanges> {
    let title = required("title", req.title, MAX_NOTE_TITLE_LENGTH)?;
    let content = optional("content", req.content, usize::MAX)?;
    let category_id = req
        .category_id
        .map(|id| validate_id("categoryId", id))
        .transpose()?;
    Ok(NoteChanges {
        title,
        content,
        category_id,
    })
}

pub fn validate_note_query(query: NoteListQuery) -> ValidationResult<NoteSearch> {
    let page = match query.page {
        None => 1,
        Some(p) => validate_id("page", p)?,
    };
    let size = match query.size {
        None => DEFAULT_PAGE_SIZE,
        Some(s) => validate_id("size", s)?,
    };
    if size > MAX_PAGE_SIZE {
        return Err(ValidationError::TooLarge {
            field: "size",
            max: MAX_PAGE_SIZE,
        });
    }

    let search = query.search.filter(|s| !s.is_empty());
    let category_id = match query.category.as_deref() {
        None | Some("") => None,
        Some(raw) => {
            let id: i64 = raw
                .parse()
                .map_err(|_| ValidationError::NotPositive("category"))?;
            Some(validate_id("category", id)?)
        }
    };
    let sort = match query.sort.as_deref() {
        None | Some("") | Some("oldest") => NoteSort::Oldest,
        Some("newest") => NoteSort::Newest,
        Some(_) => {
            return Err(ValidationError::NotAllowed {
                field: "sort",
                allowed: "[newest, oldest]",
            })
        }
    };

    Ok(NoteSearch {
        page,
        size,
        search,
        category_id,
        sort,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn register_requires_every_field() {
        let err = validate_register(RegisterRequest {
            username: s(""),
            password: s(""),
            name: s(""),
        })
        .unwrap_err();
        assert_eq!(err, ValidationError::Required("username"));

        let err = validate_register(RegisterRequest {
            username: s("test"),
            password: s("rahasia"),
            name: None,
        })
        .unwrap_err();
        assert_eq!(err, ValidationError::Required("name"));

        let ok = validate_register(RegisterRequest {
            username: s("test"),
            password: s("rahasia"),
            name: s("test"),
        })
        .unwrap();
        assert_eq!(ok.username, "test");
    }

    #[test]
    fn lengths_count_characters() {
        let title = "é".repeat(30);
        assert!(validate_new_note(CreateNoteRequest {
            title: Some(title),
            content: s("c"),
            category_id: Some(1),
        })
        .is_ok());

        let err = validate_new_note(CreateNoteRequest {
            title: Some("x".repeat(31)),
            content: s("c"),
            category_id: Some(1),
        })
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong {
                field: "title",
                max: 30
            }
        );
    }

    #[test]
    fn note_ids_must_be_positive() {
        let err = validate_new_note(CreateNoteRequest {
            title: s("t"),
            content: s("c"),
            category_id: Some(0),
        })
        .unwrap_err();
        assert_eq!(err, ValidationError::NotPositive("categoryId"));
        assert_eq!(validate_id("noteId", -3), Err(ValidationError::NotPositive("noteId")));
    }

    #[test]
    fn note_update_allows_partial_changes() {
        let changes = validate_note_update(UpdateNoteRequest {
            title: s("new"),
            content: None,
            category_id: None,
        })
        .unwrap();
        assert_eq!(changes.content, None);
        assert_eq!(changes.category_id, None);

        assert!(validate_note_update(UpdateNoteRequest::default()).is_err());
    }

    #[test]
    fn query_defaults_and_bounds() {
        let q = validate_note_query(NoteListQuery::default()).unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.size, DEFAULT_PAGE_SIZE);
        assert_eq!(q.sort, NoteSort::Oldest);

        let err = validate_note_query(NoteListQuery {
            size: Some(101),
            ..NoteListQuery::default()
        })
        .unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));

        assert!(validate_note_query(NoteListQuery {
            page: Some(0),
            ..NoteListQuery::default()
        })
        .is_err());
    }

    #[test]
    fn query_parses_category_and_sort() {
        let q = validate_note_query(NoteListQuery {
            category: s("7"),
            sort: s("newest"),
            search: s(""),
            ..NoteListQuery::default()
        })
        .unwrap();
        assert_eq!(q.category_id, Some(7));
        assert_eq!(q.sort, NoteSort::Newest);
        assert_eq!(q.search, None);

        assert!(validate_note_query(NoteListQuery {
            category: s("work"),
            ..NoteListQuery::default()
        })
        .is_err());
        assert!(validate_note_query(NoteListQuery {
            sort: s("random"),
            ..NoteListQuery::default()
        })
        .is_err());
    }

    #[test]
    fn user_update_rejects_empty_strings() {
        assert_eq!(
            validate_user_update(UpdateUserRequest::default()).unwrap(),
            UserChanges::default()
        );
        assert!(validate_user_update(UpdateUserRequest {
            name: s(""),
            password: None,
        })
        .is_err());
    }
}
