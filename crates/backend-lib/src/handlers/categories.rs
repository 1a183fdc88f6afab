//! Category handlers.
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use notes_common::{Category, CategoryRequest, DataResponse};

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::validation::{self, validate_id};
use crate::AppState;

fn not_found() -> AppError {
    AppError::NotFound("Category not found".to_string())
}

/// `POST /api/categories`
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<CategoryRequest>, JsonRejection>,
) -> Result<Json<DataResponse<Category>>, AppError> {
    let Json(request) = payload?;
    let name = validation::validate_category(request)?;
    let category = state.storage.create_category(&user.username, name).await?;
    Ok(Json(DataResponse::new(category)))
}

/// `GET /api/categories`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<DataResponse<Vec<Category>>>, AppError> {
    let categories = state.storage.list_categories(&user.username).await?;
    Ok(Json(DataResponse::new(categories)))
}

/// `PUT /api/categories/{categoryId}`
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CategoryRequest>, JsonRejection>,
) -> Result<Json<DataResponse<Category>>, AppError> {
    let Path(raw_id) = path?;
    let id = validate_id("categoryId", raw_id)?;
    let Json(request) = payload?;
    let name = validation::validate_category(request)?;

    let category = state
        .storage
        .rename_category(&user.username, id, name)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(DataResponse::new(category)))
}

/// `DELETE /api/categories/{categoryId}`
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<DataResponse<&'static str>>, AppError> {
    let Path(raw_id) = path?;
    let id = validate_id("categoryId", raw_id)?;
    if !state.storage.delete_category(&user.username, id).await? {
        return Err(not_found());
    }
    Ok(Json(DataResponse::new("OK")))
}
