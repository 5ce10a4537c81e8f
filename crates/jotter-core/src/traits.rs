//! Core traits for jotter abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, so the HTTP layer never depends on how notes are kept.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// NOTE REPOSITORY TRAITS
// =============================================================================

/// Request for listing notes.
#[derive(Debug, Clone, Default)]
pub struct ListNotesRequest {
    /// Case-insensitive substring matched against title or content
    pub query: Option<String>,
    /// Case-insensitive exact category match
    pub category: Option<String>,
    /// Field to sort by: "title", "category", "importance", "created_at", "updated_at"
    pub sort_by: Option<String>,
    /// Sort order: "asc" or "desc"
    pub sort_order: Option<String>,
    /// Include archived notes in the result
    pub include_archived: bool,
    /// Pagination offset
    pub skip: Option<usize>,
    /// Maximum results
    pub limit: Option<usize>,
}

/// Request for creating a new note.
#[derive(Debug, Clone)]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub is_important: bool,
    pub image: Option<AttachmentUpload>,
}

impl CreateNoteRequest {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category: None,
            is_important: false,
            image: None,
        }
    }
}

/// Partial update. `None` means "leave the field alone".
///
/// `category` is tri-state: `None` keeps the current value, `Some(None)`
/// clears it, `Some(Some(v))` sets it.
#[derive(Debug, Clone, Default)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<Option<String>>,
    pub is_important: Option<bool>,
    pub image: ImageChange,
}

/// Repository for note CRUD operations.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a new note, storing its image first when one is supplied.
    async fn create(&self, req: CreateNoteRequest) -> Result<Note>;

    /// Fetch a note by ID. Archived notes are returned too.
    async fn fetch(&self, id: Uuid) -> Result<Note>;

    /// List notes with filtering, sorting and pagination.
    async fn list(&self, req: ListNotesRequest) -> Result<Vec<Note>>;

    /// Merge the supplied fields into an existing note.
    async fn update(&self, id: Uuid, req: UpdateNoteRequest) -> Result<Note>;

    /// Soft-delete: hide the note from default listings.
    async fn archive(&self, id: Uuid) -> Result<Note>;

    /// Undo `archive`.
    async fn unarchive(&self, id: Uuid) -> Result<Note>;

    /// Permanently delete a note and release its attachment.
    async fn hard_delete(&self, id: Uuid) -> Result<Note>;

    /// Check if a note exists.
    async fn exists(&self, id: Uuid) -> Result<bool>;

    /// Number of stored notes, archived included.
    async fn count(&self) -> Result<usize>;
}
