//! Note HTTP handlers.
//!
//! Create and update accept either a JSON body or `multipart/form-data`
//! (the browser client's form, with an optional `image` file field).

use axum::{
    async_trait,
    extract::{rejection::QueryRejection, FromRequest, Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    Json,
};
use tracing::debug;
use uuid::Uuid;

use crate::query_types::{parse_bool, ListNotesQuery, NoteBody};
use crate::{ApiError, AppState};
use jotter_core::{
    AttachmentUpload, CreateNoteRequest, ImageChange, Note, NoteRepository, UpdateNoteRequest,
};

/// Note fields plus an optional uploaded image, from JSON or multipart.
#[derive(Debug, Default)]
pub struct NoteForm {
    pub body: NoteBody,
    pub image: Option<AttachmentUpload>,
}

#[async_trait]
impl FromRequest<AppState> for NoteForm {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("multipart/form-data"))
            .unwrap_or(false);

        if is_multipart {
            let multipart = Multipart::from_request(req, state).await?;
            read_multipart(multipart, state.config.max_upload_bytes).await
        } else {
            let Json(body) = Json::<NoteBody>::from_request(req, state).await?;
            Ok(Self { body, image: None })
        }
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ApiError> {
    parse_bool(value)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid boolean for {}: '{}'", name, value)))
}

/// Read form fields, streaming the image so an oversized upload is cut off
/// as soon as it crosses `max_upload_bytes`.
async fn read_multipart(mut multipart: Multipart, max_upload_bytes: usize) -> Result<NoteForm, ApiError> {
    let mut form = NoteForm::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let mut data = Vec::new();
                while let Some(chunk) = field.chunk().await? {
                    if data.len() + chunk.len() > max_upload_bytes {
                        return Err(ApiError::BadRequest(format!(
                            "Image exceeds maximum size of {} bytes",
                            max_upload_bytes
                        )));
                    }
                    data.extend_from_slice(&chunk);
                }
                // an empty file input still sends the part
                if !filename.is_empty() || !data.is_empty() {
                    form.image = Some(AttachmentUpload::new(filename, data));
                }
            }
            "title" => form.body.title = Some(field.text().await?),
            "content" => form.body.content = Some(field.text().await?),
            "category" => form.body.category = Some(Some(field.text().await?)),
            "is_important" => {
                form.body.is_important = Some(parse_flag("is_important", &field.text().await?)?)
            }
            "clear_image" => {
                form.body.clear_image = Some(parse_flag("clear_image", &field.text().await?)?)
            }
            other => debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}

/// Ids that are not UUIDs cannot name a note.
fn parse_note_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Note not found".into()))
}

/// List notes with filtering, sorting and pagination.
///
/// # Query Parameters
/// - `query`: case-insensitive substring of title or content
/// - `category`: case-insensitive exact category
/// - `sort_by`: `title`, `category`, `importance`, `created_at`, `updated_at`
/// - `sort_order`: `asc` (default) or `desc`
/// - `include_archived`: include archived notes (default false)
/// - `skip`, `limit`: pagination
///
/// # Returns
/// - 200 OK with an array of notes
/// - 400 Bad Request for an unknown sort key/order or `limit=0`
pub async fn list_notes(
    State(state): State<AppState>,
    query: Result<Query<ListNotesQuery>, QueryRejection>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let Query(query) = query?;
    let notes = state.db.notes.list(query.into()).await?;
    Ok(Json(notes))
}

/// Create a note.
///
/// # Returns
/// - 201 Created with the note
/// - 400 Bad Request if title or content is missing, or the image is invalid
pub async fn create_note(
    State(state): State<AppState>,
    form: NoteForm,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let NoteForm { body, image } = form;

    let title = body
        .title
        .ok_or_else(|| ApiError::BadRequest("Missing required field: title".into()))?;
    let content = body
        .content
        .ok_or_else(|| ApiError::BadRequest("Missing required field: content".into()))?;

    let req = CreateNoteRequest {
        title,
        content,
        category: body.category.flatten(),
        is_important: body.is_important.unwrap_or(false),
        image,
    };

    let note = state.db.notes.create(req).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// Get a note by id. Archived notes are returned too.
pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    let id = parse_note_id(&id)?;
    Ok(Json(state.db.notes.fetch(id).await?))
}

/// Partially update a note.
///
/// Only supplied fields change. A JSON `"category": null` (or an empty
/// multipart `category`) clears the category. A new `image` replaces the
/// current one; `clear_image=true` without an image removes it.
pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    form: NoteForm,
) -> Result<Json<Note>, ApiError> {
    let id = parse_note_id(&id)?;
    let NoteForm { body, image } = form;

    let image = match image {
        Some(upload) => ImageChange::Replace(upload),
        None if body.clear_image.unwrap_or(false) => ImageChange::Clear,
        None => ImageChange::Keep,
    };

    let req = UpdateNoteRequest {
        title: body.title,
        content: body.content,
        category: body.category,
        is_important: body.is_important,
        image,
    };

    Ok(Json(state.db.notes.update(id, req).await?))
}

/// Permanently delete a note and its image.
pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_note_id(&id)?;
    state.db.notes.hard_delete(id).await?;
    Ok(Json(serde_json::json!({
        "message": format!("Note {} deleted successfully.", id)
    })))
}

/// Hide a note from default listings.
///
/// # Returns
/// - 200 OK with the archived note
/// - 404 Not Found / 409 Conflict if already archived
pub async fn archive_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    let id = parse_note_id(&id)?;
    Ok(Json(state.db.notes.archive(id).await?))
}

/// Restore an archived note.
pub async fn unarchive_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    let id = parse_note_id(&id)?;
    Ok(Json(state.db.notes.unarchive(id).await?))
}
