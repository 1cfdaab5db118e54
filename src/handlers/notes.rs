use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::query::{clean_tags, ListParams, NoteQuery, Pagination};
use crate::database::store::{NewNote, Note, NoteChanges};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::state::AppState;

const TITLE_MAX: usize = 200;
const CONTENT_MAX: usize = 10_000;
const TAG_MAX: usize = 30;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
    pub tags: Option<Vec<String>>,
    pub is_archived: Option<bool>,
    // Any ownerId in the body is ignored; ownership always comes from the
    // authenticated identity.
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_archived: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub notes: Vec<Note>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

/// GET /notes - Owner-scoped listing with filters and pagination
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<ListResponse> {
    let query = NoteQuery::build(user.account_id, &params);

    let notes = state.notes.find(&query).await?;
    let total = state.notes.count(&query).await?;
    let pagination = Pagination::compute(query.page, query.limit, total);

    Ok(ApiResponse::success(ListResponse { notes, pagination }))
}

/// POST /notes - Create a note owned by the authenticated account
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateNoteRequest>,
) -> ApiResult<Note> {
    let tags = clean_tags(payload.tags.unwrap_or_default());
    validate_note_fields(Some(&payload.title), Some(&payload.content), &tags)?;

    let note = state
        .notes
        .create(NewNote {
            owner_id: user.account_id,
            title: payload.title,
            content: payload.content,
            tags,
            is_archived: payload.is_archived.unwrap_or(false),
        })
        .await?;

    Ok(ApiResponse::created(note))
}

/// GET /notes/:id
pub async fn get_one(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Note> {
    let note = state
        .notes
        .find_one(id, user.account_id)
        .await?
        .ok_or_else(note_not_found)?;

    Ok(ApiResponse::success(note))
}

/// PUT|PATCH /notes/:id - Partial merge of the provided fields
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateNoteRequest>,
) -> ApiResult<Note> {
    let changes = NoteChanges {
        title: payload.title,
        content: payload.content,
        tags: payload.tags.map(clean_tags),
        is_archived: payload.is_archived,
    };

    if changes.is_empty() {
        return Err(ApiError::validation("no updates provided"));
    }
    validate_note_fields(
        changes.title.as_deref(),
        changes.content.as_deref(),
        changes.tags.as_deref().unwrap_or(&[]),
    )?;

    let note = state
        .notes
        .update(id, user.account_id, changes)
        .await?
        .ok_or_else(note_not_found)?;

    Ok(ApiResponse::success(note))
}

/// DELETE /notes/:id
pub async fn remove(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    if !state.notes.delete(id, user.account_id).await? {
        return Err(note_not_found());
    }

    Ok(ApiResponse::success(json!({ "deleted": true })))
}

/// The same 404 whether the id does not exist or belongs to someone else,
/// so note ids cannot be enumerated across accounts.
fn note_not_found() -> ApiError {
    ApiError::not_found("Note not found")
}

fn validate_note_fields(
    title: Option<&str>,
    content: Option<&str>,
    tags: &[String],
) -> Result<(), ApiError> {
    let mut field_errors = HashMap::new();

    if let Some(title) = title {
        if title.trim().is_empty() {
            field_errors.insert("title".to_string(), "Title is required".to_string());
        } else if title.chars().count() > TITLE_MAX {
            field_errors.insert(
                "title".to_string(),
                format!("Title must be at most {} characters", TITLE_MAX),
            );
        }
    }

    if let Some(content) = content {
        if content.trim().is_empty() {
            field_errors.insert("content".to_string(), "Content is required".to_string());
        } else if content.chars().count() > CONTENT_MAX {
            field_errors.insert(
                "content".to_string(),
                format!("Content must be at most {} characters", CONTENT_MAX),
            );
        }
    }

    // Tags arrive already trimmed and cleaned of empties
    if tags.iter().any(|t| t.chars().count() > TAG_MAX) {
        field_errors.insert(
            "tags".to_string(),
            format!("Each tag must be at most {} characters", TAG_MAX),
        );
    }

    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_fields("Invalid note", field_errors))
    }
}
