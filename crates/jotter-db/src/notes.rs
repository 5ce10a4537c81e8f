//! In-memory note repository.
//!
//! The collection lives behind one `RwLock`: listings clone a snapshot
//! under the read lock, mutations take the write lock. Attachment I/O never
//! happens while the lock is held; new uploads are stored before the swap and
//! superseded ones are released after it.

use async_trait::async_trait;
use jotter_core::{
    models::normalize_category, CreateNoteRequest, Error, ImageChange, ListNotesRequest, Note,
    NoteQuery, NoteRepository, Result, UpdateNoteRequest,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::file_storage::FileStorage;

/// Notes keyed by id, plus creation order.
#[derive(Debug, Default)]
struct NoteTable {
    by_id: HashMap<Uuid, Note>,
    order: Vec<Uuid>,
}

impl NoteTable {
    fn insert(&mut self, note: Note) {
        self.order.push(note.id);
        self.by_id.insert(note.id, note);
    }

    fn remove(&mut self, id: Uuid) -> Option<Note> {
        let note = self.by_id.remove(&id)?;
        if let Some(pos) = self.order.iter().position(|o| *o == id) {
            self.order.remove(pos);
        }
        Some(note)
    }

    /// Every note, in creation order.
    fn snapshot(&self) -> Vec<Note> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect()
    }
}

/// Note store backed by process memory.
pub struct MemNoteRepository {
    table: RwLock<NoteTable>,
    files: Arc<FileStorage>,
}

impl MemNoteRepository {
    /// Create an empty repository that keeps attachments in `files`.
    pub fn new(files: Arc<FileStorage>) -> Self {
        Self {
            table: RwLock::new(NoteTable::default()),
            files,
        }
    }

    /// Attachment references currently held by any note, archived included.
    pub async fn live_references(&self) -> HashSet<String> {
        self.table
            .read()
            .await
            .by_id
            .values()
            .filter_map(|n| n.image_reference.clone())
            .collect()
    }

    /// Release an attachment that is no longer referenced. Failures are
    /// logged, never returned: the note mutation has already happened.
    async fn release_quietly(&self, reference: &str, note_id: Uuid) {
        if let Err(e) = self.files.release(reference).await {
            warn!(
                subsystem = "store",
                component = "mem_notes",
                note_id = %note_id,
                reference = %reference,
                error = %e,
                "Failed to release attachment"
            );
        }
    }

    async fn set_archived(&self, id: Uuid, archived: bool) -> Result<Note> {
        let mut table = self.table.write().await;
        let note = table.by_id.get_mut(&id).ok_or(Error::NoteNotFound(id))?;

        if note.is_archived == archived {
            return Err(Error::Conflict(if archived {
                format!("Note {} is already archived", id)
            } else {
                format!("Note {} is not archived", id)
            }));
        }

        note.is_archived = archived;
        note.touch();
        Ok(note.clone())
    }
}

#[async_trait]
impl NoteRepository for MemNoteRepository {
    #[instrument(skip(self, req), fields(subsystem = "store", component = "mem_notes", op = "create"))]
    async fn create(&self, req: CreateNoteRequest) -> Result<Note> {
        let image_reference = match req.image {
            Some(upload) => Some(self.files.store(upload.data, &upload.filename).await?),
            None => None,
        };

        let note = Note::new(
            req.title,
            req.content,
            req.category,
            req.is_important,
            image_reference,
        );
        self.table.write().await.insert(note.clone());

        info!(
            note_id = %note.id,
            has_image = note.image_reference.is_some(),
            "Note created"
        );
        Ok(note)
    }

    async fn fetch(&self, id: Uuid) -> Result<Note> {
        self.table
            .read()
            .await
            .by_id
            .get(&id)
            .cloned()
            .ok_or(Error::NoteNotFound(id))
    }

    #[instrument(skip(self, req), fields(subsystem = "store", component = "mem_notes", op = "list"))]
    async fn list(&self, req: ListNotesRequest) -> Result<Vec<Note>> {
        let start = Instant::now();
        let query = NoteQuery::from_request(&req)?;

        let snapshot = self.table.read().await.snapshot();
        let total = snapshot.len();
        let notes = query.apply(snapshot);

        debug!(
            query = ?req.query,
            category = ?req.category,
            sort_by = ?req.sort_by,
            include_archived = req.include_archived,
            total,
            result_count = notes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Listed notes"
        );
        Ok(notes)
    }

    #[instrument(skip(self, req), fields(subsystem = "store", component = "mem_notes", op = "update", note_id = %id))]
    async fn update(&self, id: Uuid, req: UpdateNoteRequest) -> Result<Note> {
        // Cheap pre-check so a missing note never costs an upload.
        if !self.exists(id).await? {
            return Err(Error::NoteNotFound(id));
        }

        let UpdateNoteRequest {
            title,
            content,
            category,
            is_important,
            image,
        } = req;

        let (new_reference, clear) = match image {
            ImageChange::Keep => (None, false),
            ImageChange::Clear => (None, true),
            ImageChange::Replace(upload) => (
                Some(self.files.store(upload.data, &upload.filename).await?),
                false,
            ),
        };

        let outcome = {
            let mut table = self.table.write().await;
            let merged = table.by_id.get_mut(&id).map(|note| {
                if let Some(title) = title {
                    note.title = title;
                }
                if let Some(content) = content {
                    note.content = content;
                }
                if let Some(category) = category {
                    note.category = normalize_category(category);
                }
                if let Some(is_important) = is_important {
                    note.is_important = is_important;
                }

                let superseded = if new_reference.is_some() {
                    std::mem::replace(&mut note.image_reference, new_reference.clone())
                } else if clear {
                    note.image_reference.take()
                } else {
                    None
                };

                note.touch();
                (note.clone(), superseded)
            });
            merged
        };

        let Some((updated, superseded)) = outcome else {
            // deleted while the upload was in flight
            if let Some(reference) = new_reference {
                self.release_quietly(&reference, id).await;
            }
            return Err(Error::NoteNotFound(id));
        };

        if let Some(old) = superseded {
            self.release_quietly(&old, id).await;
        }

        debug!(has_image = updated.image_reference.is_some(), "Note updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "mem_notes", op = "archive", note_id = %id))]
    async fn archive(&self, id: Uuid) -> Result<Note> {
        let note = self.set_archived(id, true).await?;
        info!("Note archived");
        Ok(note)
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "mem_notes", op = "unarchive", note_id = %id))]
    async fn unarchive(&self, id: Uuid) -> Result<Note> {
        let note = self.set_archived(id, false).await?;
        info!("Note unarchived");
        Ok(note)
    }

    #[instrument(skip(self), fields(subsystem = "store", component = "mem_notes", op = "delete", note_id = %id))]
    async fn hard_delete(&self, id: Uuid) -> Result<Note> {
        let removed = self
            .table
            .write()
            .await
            .remove(id)
            .ok_or(Error::NoteNotFound(id))?;

        if let Some(reference) = &removed.image_reference {
            self.release_quietly(reference, id).await;
        }

        info!("Note deleted");
        Ok(removed)
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.table.read().await.by_id.contains_key(&id))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.table.read().await.by_id.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(title: &str) -> Note {
        Note::new(title.into(), "c".into(), None, false, None)
    }

    #[test]
    fn test_table_snapshot_keeps_insertion_order() {
        let mut table = NoteTable::default();
        let a = note("a");
        let b = note("b");
        let c = note("c");
        let b_id = b.id;
        table.insert(a);
        table.insert(b);
        table.insert(c);

        assert!(table.remove(b_id).is_some());
        let titles: Vec<String> = table.snapshot().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["a", "c"]);
        assert_eq!(table.order.len(), table.by_id.len());
    }

    #[test]
    fn test_table_remove_missing() {
        let mut table = NoteTable::default();
        assert!(table.remove(Uuid::nil()).is_none());
    }
}
