//! Core data models for jotter.
//!
//! These types are shared across all jotter crates and represent
//! the core domain entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::uuid_utils::new_v7;

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A user-authored note.
///
/// `image_reference` is the opaque name of the stored attachment. It is
/// serialized as `image_filename`, the field name clients already use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub is_important: bool,
    pub is_archived: bool,
    #[serde(rename = "image_filename")]
    pub image_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Build a fresh note with a generated UUIDv7 and identical timestamps.
    pub fn new(
        title: String,
        content: String,
        category: Option<String>,
        is_important: bool,
        image_reference: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_v7(),
            title,
            content,
            category: normalize_category(category),
            is_important,
            is_archived: false,
            image_reference,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at`.
    ///
    /// Never moves backwards: if the wall clock reads earlier than the last
    /// recorded mutation (clock step, coarse resolution) the previous value is
    /// kept, so `updated_at >= created_at` always holds.
    pub fn touch(&mut self) {
        let now = Utc::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    /// Lower-cased category, used by filtering and sorting.
    pub fn category_key(&self) -> Option<String> {
        self.category.as_ref().map(|c| c.to_lowercase())
    }
}

/// Trim surrounding whitespace; blank categories become "no category".
pub fn normalize_category(category: Option<String>) -> Option<String> {
    category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

// =============================================================================
// ATTACHMENT TYPES
// =============================================================================

/// Raw upload handed to the attachment manager.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    /// Client-supplied file name; only its extension is kept.
    pub filename: String,
    pub data: Vec<u8>,
}

impl AttachmentUpload {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
        }
    }
}

/// What an update does to the note's attachment.
#[derive(Debug, Clone, Default)]
pub enum ImageChange {
    /// Leave the current attachment alone.
    #[default]
    Keep,
    /// Drop the current attachment without replacement.
    Clear,
    /// Store a new attachment, then release the old one.
    Replace(AttachmentUpload),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_creation() {
        let note = Note::new("Title".into(), "Body".into(), None, false, None);
        assert_eq!(note.title, "Title");
        assert_eq!(note.created_at, note.updated_at);
        assert!(!note.is_archived);
        assert!(crate::uuid_utils::is_v7(&note.id));
    }

    #[test]
    fn test_blank_category_is_none() {
        let note = Note::new("t".into(), "c".into(), Some("   ".into()), false, None);
        assert_eq!(note.category, None);
        assert_eq!(normalize_category(Some("Work".into())), Some("Work".into()));
    }

    #[test]
    fn test_category_is_trimmed() {
        let note = Note::new("t".into(), "c".into(), Some("  Work \t".into()), false, None);
        assert_eq!(note.category.as_deref(), Some("Work"));
        assert_eq!(note.category_key().as_deref(), Some("work"));
    }

    #[test]
    fn test_note_touch() {
        let mut note = Note::new("Test".into(), "c".into(), None, false, None);
        let original = note.updated_at;

        std::thread::sleep(std::time::Duration::from_millis(10));
        note.touch();

        assert!(note.updated_at > original);
        assert!(note.updated_at >= note.created_at);
    }

    #[test]
    fn test_touch_never_goes_backwards() {
        let mut note = Note::new("Test".into(), "c".into(), None, false, None);
        let future = Utc::now() + chrono::Duration::hours(1);
        note.updated_at = future;
        note.touch();
        assert_eq!(note.updated_at, future);
    }

    #[test]
    fn test_serialized_field_names() {
        let note = Note::new("t".into(), "c".into(), Some("Work".into()), true, Some("a.png".into()));
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["image_filename"], "a.png");
        assert_eq!(json["category"], "Work");
        assert_eq!(json["is_important"], true);
        assert_eq!(json["is_archived"], false);
        assert!(json.get("image_reference").is_none());
    }

    #[test]
    fn test_category_key_lowercases() {
        let note = Note::new("t".into(), "c".into(), Some("WoRk".into()), false, None);
        assert_eq!(note.category_key().as_deref(), Some("work"));
    }
}
