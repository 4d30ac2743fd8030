use std::time::Instant;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use supernote_core::{Metadata, NewNote, Note, Page};

use super::parse_note_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Raw query pairs, in request order. Pagination never rejects a request:
/// repeated keys take their first value and anything unparsable falls back
/// to the defaults.
pub type RawPairs = Vec<(String, String)>;

fn first<'a>(pairs: &'a RawPairs, key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[derive(Debug, Serialize)]
pub struct ListNotesResponse {
    pub notes: Vec<Note>,
    pub limit: i64,
    pub offset: i64,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub note: Note,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Body of `POST /api/notes`.
#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub chunk_content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl From<CreateNoteRequest> for NewNote {
    fn from(req: CreateNoteRequest) -> Self {
        NewNote {
            id: req.id,
            user_id: req.user_id,
            title: req.title,
            content: req.content,
            chunk_content: req.chunk_content,
            metadata: req.metadata,
            ..Default::default()
        }
    }
}

/// `GET /api/notes`
pub async fn list_notes(
    State(state): State<AppState>,
    query: Result<Query<RawPairs>, QueryRejection>,
) -> Result<Json<ListNotesResponse>, ApiError> {
    let pairs = query.map(|Query(pairs)| pairs).unwrap_or_default();
    let page = Page::from_raw(first(&pairs, "limit"), first(&pairs, "offset"));
    let notes = state.notes.list(page).await?;

    Ok(Json(ListNotesResponse {
        count: notes.len(),
        notes,
        limit: page.limit,
        offset: page.offset,
    }))
}

/// `POST /api/notes`
pub async fn create_note(
    State(state): State<AppState>,
    payload: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<NoteResponse>), ApiError> {
    let Json(req) = payload?;
    let new_note = NewNote::from(req);
    // Reject before the gateway sees it.
    new_note.validate()?;

    let start = Instant::now();
    let note = state.notes.insert(new_note).await?;
    info!(
        subsystem = "api",
        component = "notes",
        op = "create",
        note_id = %note.id,
        duration_ms = start.elapsed().as_millis() as u64,
        "Note created"
    );

    Ok((StatusCode::CREATED, Json(NoteResponse { note })))
}

/// `GET /api/notes/:id`
pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NoteResponse>, ApiError> {
    let id = parse_note_id(&id)?;
    let note = state.notes.fetch(id).await?;
    Ok(Json(NoteResponse { note }))
}

/// `DELETE /api/notes/:id`
pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_note_id(&id)?;
    state.notes.delete(id).await?;
    info!(
        subsystem = "api",
        component = "notes",
        op = "delete",
        note_id = %id,
        "Note deleted"
    );
    Ok(Json(MessageResponse {
        message: "Note deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> RawPairs {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_first_value_wins() {
        let query = pairs(&[("limit", "5"), ("offset", "1"), ("limit", "7")]);
        assert_eq!(first(&query, "limit"), Some("5"));
        assert_eq!(first(&query, "offset"), Some("1"));
        assert_eq!(first(&query, "missing"), None);
    }

    #[test]
    fn test_create_request_never_carries_embedding() {
        let req: CreateNoteRequest =
            serde_json::from_str(r#"{"title":"t","content":"c","embedding":[1.0]}"#).unwrap();
        let note = NewNote::from(req);
        assert!(note.embedding.is_none());
        assert!(note.id.is_none());
    }
}
