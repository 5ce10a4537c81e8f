//! # jotter-db
//!
//! Storage layer for jotter.
//!
//! This crate provides:
//! - The in-memory note repository (`MemNoteRepository`)
//! - Attachment storage with a filesystem backend (`FileStorage`)
//! - `Database`, which wires the two together
//!
//! ## Example
//!
//! ```rust,ignore
//! use jotter_db::{CreateNoteRequest, Database, NoteRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::with_filesystem_storage("uploads", 10 * 1024 * 1024);
//!
//!     let note = db.notes.create(CreateNoteRequest::new("Hello", "world")).await?;
//!
//!     println!("Created note: {}", note.id);
//!     Ok(())
//! }
//! ```
pub mod file_storage;
pub mod notes;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) and the API crate can use them
pub mod test_fixtures;

// Re-export core types
pub use jotter_core::*;

// Re-export repository implementations
pub use file_storage::{FileStorage, FilesystemBackend, StorageBackend};
pub use notes::MemNoteRepository;

use std::sync::Arc;

/// Combined storage context.
pub struct Database {
    /// Note repository for CRUD operations.
    pub notes: MemNoteRepository,
    /// Attachment storage, shared with `notes`.
    pub file_storage: Arc<FileStorage>,
}

impl Database {
    /// Create a new Database around an attachment store.
    pub fn new(file_storage: FileStorage) -> Self {
        let file_storage = Arc::new(file_storage);
        Self {
            notes: MemNoteRepository::new(Arc::clone(&file_storage)),
            file_storage,
        }
    }

    /// Create a Database whose attachments live under `path` on the local
    /// filesystem.
    pub fn with_filesystem_storage(path: &str, max_upload_bytes: usize) -> Self {
        Self::new(FileStorage::new(
            FilesystemBackend::new(path),
            max_upload_bytes,
        ))
    }

    /// Delete stored attachments that no note references.
    ///
    /// Returns the number of objects removed.
    pub async fn collect_orphaned_attachments(&self) -> Result<usize> {
        let live = self.notes.live_references().await;
        self.file_storage.collect_garbage(&live).await
    }
}
