//! Note handlers.
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use notes_common::{
    CreateNoteRequest, DataResponse, Note, NoteListQuery, NotePage, Paging, UpdateNoteRequest,
};

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::storage::NotePatch;
use crate::validation::{self, validate_id};
use crate::AppState;

fn not_found() -> AppError {
    AppError::NotFound("Note not found".to_string())
}

fn note_id(path: Result<Path<i64>, PathRejection>) -> Result<u64, AppError> {
    let Path(raw_id) = path?;
    Ok(validate_id("noteId", raw_id)?)
}

/// `POST /api/notes`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<Json<DataResponse<Note>>, AppError> {
    let Json(request) = payload?;
    let note = validation::validate_new_note(request)?;
    let created = state
        .storage
        .create_note(&user.username, note, state.clock.now_utc())
        .await?;
    Ok(Json(DataResponse::new(created)))
}

/// `GET /api/notes`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    query: Result<Query<NoteListQuery>, QueryRejection>,
) -> Result<Json<NotePage>, AppError> {
    let Query(query) = query?;
    let search = validation::validate_note_query(query)?;
    let (data, total_item) = state.storage.search_notes(&user.username, &search).await?;

    Ok(Json(NotePage {
        data,
        paging: Paging {
            page: search.page,
            total_item,
            total_page: total_item.div_ceil(search.size),
        },
    }))
}

/// `GET /api/notes/{noteId}`
pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<DataResponse<Note>>, AppError> {
    let id = note_id(path)?;
    let note = state
        .storage
        .find_note(&user.username, id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(DataResponse::new(note)))
}

/// `PUT /api/notes/{noteId}`
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateNoteRequest>, JsonRejection>,
) -> Result<Json<DataResponse<Note>>, AppError> {
    let id = note_id(path)?;
    let Json(request) = payload?;
    let changes = validation::validate_note_update(request)?;

    let patch = NotePatch {
        title: Some(changes.title),
        content: changes.content,
        category_id: changes.category_id,
    };
    let note = state
        .storage
        .update_note(&user.username, id, patch, state.clock.now_utc())
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(DataResponse::new(note)))
}

/// `DELETE /api/notes/{noteId}`
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<DataResponse<&'static str>>, AppError> {
    let id = note_id(path)?;
    if !state.storage.delete_note(&user.username, id).await? {
        return Err(not_found());
    }
    Ok(Json(DataResponse::new("OK")))
}
