//! Test fixtures for storage and API tests.
//!
//! Provides a temp-dir backed `Database` and image payloads encoded on the
//! fly, so tests never depend on binary files checked into the repo.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use jotter_db::test_fixtures::{png_bytes, TestDatabase};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let test_db = TestDatabase::new();
//!     let note = test_db.db.notes.create(...).await.unwrap();
//!     // Run your tests...
//! }
//! ```

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

use crate::{AttachmentUpload, Database};

/// Upload ceiling used by fixtures: small enough for oversize tests to stay fast.
pub const TEST_MAX_UPLOAD_BYTES: usize = 256 * 1024;

/// Database whose attachment directory is removed on drop.
pub struct TestDatabase {
    pub db: Database,
    dir: TempDir,
}

impl TestDatabase {
    /// Fresh database in a new temp directory.
    ///
    /// Panics if the temp directory cannot be created (tests only).
    pub fn new() -> Self {
        Self::with_max_upload(TEST_MAX_UPLOAD_BYTES)
    }

    pub fn with_max_upload(max_upload_bytes: usize) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().to_string_lossy().into_owned();
        Self {
            db: Database::with_filesystem_storage(&path, max_upload_bytes),
            dir,
        }
    }

    /// Directory the attachments are written to.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Names of the files currently stored, dotfiles excluded.
    pub fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.file_name().into_string().ok())
                    .filter(|n| !n.starts_with('.'))
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// A solid-colour PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

/// A solid-colour GIF of the given size.
pub fn gif_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Gif)
}

/// PNG upload named `name`.
pub fn png_upload(name: &str) -> AttachmentUpload {
    AttachmentUpload::new(name, png_bytes(4, 4))
}

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([40, 120, 200]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format)
        .expect("in-memory image encoding cannot fail");
    buf.into_inner()
}
