//! Attachment storage with a pluggable backend and per-reference locking.
//!
//! This module provides image storage for note attachments with:
//! - Filesystem backend with flat UUIDv7-based names (`{uuid}{.ext}`)
//! - Atomic write operations (temp file + rename, mode 0644)
//! - Image validation after write, with the object removed on failure
//! - Per-reference serialization of store/retrieve/release
//! - Garbage collection of objects no note references
//!
//! ## Example
//!
//! ```rust,ignore
//! use jotter_db::file_storage::{FileStorage, FilesystemBackend};
//!
//! let storage = FileStorage::new(FilesystemBackend::new("/var/jotter/uploads"), 10_485_760);
//!
//! let reference = storage.store(png_bytes, "cat.png").await?;
//! let (data, content_type) = storage.retrieve(&reference).await?;
//! storage.release(&reference).await?;
//! ```

use async_trait::async_trait;
use jotter_core::{
    check_size, detect_content_type, is_safe_reference, new_v7, sanitize_extension,
    validate_image, Error, Result,
};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Storage backend trait for different storage implementations.
///
/// Paths are flat object names; backends never see a separator.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write data to the specified path.
    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Read data from the specified path. `Error::NotFound` if absent.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete data at the specified path. Absent data is not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check if data exists at the specified path.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Names of every stored object.
    async fn list(&self) -> Result<Vec<String>>;
}

/// Filesystem storage backend.
///
/// Objects live directly under the base directory. Dot-prefixed entries are
/// in-flight temp files or health-check artifacts and are never listed.
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }

    fn temp_path(&self, path: &str) -> PathBuf {
        self.base_path.join(format!(".{}.tmp", path))
    }

    /// Validate that the storage backend can write, read, and delete files.
    ///
    /// Performs a full round-trip test at startup to catch filesystem issues
    /// (permission errors, read-only mounts, missing directories) early.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.base_path.join(".health-check");
        let test_file = test_dir.join("test.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await; // Best-effort cleanup

        Ok(())
    }

    async fn write_temp(&self, temp_path: &Path, data: &[u8]) -> Result<()> {
        let mut file = fs::File::create(temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "file_storage: File::create failed");
            e
        })?;
        file.write_all(data).await.map_err(|e| {
            warn!(error = %e, "file_storage: write_all failed");
            e
        })?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);
        debug!(storage_path = %path, full_path = %full_path.display(), size = data.len(), "file_storage: write");

        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            warn!(base = %self.base_path.display(), error = %e, "file_storage: create_dir_all failed");
            e
        })?;

        // Atomic write: temp file + rename
        let temp_path = self.temp_path(path);
        if let Err(e) = self.write_temp(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, &full_path).await {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "file_storage: rename failed");
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        // Set permissions to 0644 (rw-r--r--, no execute)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&full_path, std::fs::Permissions::from_mode(0o644)).await?;
        }

        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(path);
        match fs::read(full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("Attachment {} not found", path)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.full_path(path);
        match fs::remove_file(full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full_path = self.full_path(path);
        Ok(fs::try_exists(full_path).await?)
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Attachment manager.
///
/// Owns the backend, enforces the upload ceiling, validates images, and
/// serializes operations on the same reference.
pub struct FileStorage {
    backend: Box<dyn StorageBackend>,
    max_upload_bytes: usize,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileStorage {
    /// Create a new attachment manager.
    ///
    /// # Arguments
    ///
    /// * `backend` - Storage backend (filesystem, or anything else implementing the trait)
    /// * `max_upload_bytes` - Uploads larger than this are rejected before touching storage
    pub fn new(backend: impl StorageBackend + 'static, max_upload_bytes: usize) -> Self {
        Self {
            backend: Box::new(backend),
            max_upload_bytes,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Run `op` while holding the lock for `reference`.
    ///
    /// Lock entries are dropped from the map once nobody holds or waits on
    /// them, so the map only grows with in-flight references.
    async fn with_reference_lock<F, T>(&self, reference: &str, op: F) -> T
    where
        F: Future<Output = T>,
    {
        let entry = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(reference.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let out = {
            let _guard = entry.lock().await;
            op.await
        };
        drop(entry);

        let mut locks = self.locks.lock().await;
        if let Some(existing) = locks.get(reference) {
            if Arc::strong_count(existing) == 1 {
                locks.remove(reference);
            }
        }
        out
    }

    /// Store an uploaded image and return its reference.
    ///
    /// The reference is `{uuidv7}{.ext}` with the sanitized extension of
    /// `original_name`. Oversized payloads are rejected with
    /// `Error::InvalidInput`, undecodable ones with `Error::InvalidAttachment`;
    /// in both cases nothing is left behind in storage.
    pub async fn store(&self, data: Vec<u8>, original_name: &str) -> Result<String> {
        check_size(data.len(), self.max_upload_bytes)?;

        let reference = format!(
            "{}{}",
            new_v7(),
            sanitize_extension(original_name).unwrap_or_default()
        );
        let size = data.len();

        self.with_reference_lock(&reference, async {
            if let Err(e) = self.backend.write(&reference, &data).await {
                warn!(
                    subsystem = "attachments",
                    component = "file_storage",
                    op = "store",
                    reference = %reference,
                    error = %e,
                    "Attachment write failed"
                );
                if let Err(cleanup) = self.backend.delete(&reference).await {
                    warn!(reference = %reference, error = %cleanup, "file_storage: cleanup after failed write failed");
                }
                return Err(Error::Storage(format!("Could not upload image: {}", e)));
            }

            let verdict = tokio::task::spawn_blocking(move || validate_image(&data))
                .await
                .map_err(|e| Error::Internal(format!("image validation task failed: {}", e)))?;

            if let Err(e) = verdict {
                debug!(
                    subsystem = "attachments",
                    component = "file_storage",
                    op = "store",
                    reference = %reference,
                    error = %e,
                    "Rejected upload, removing stored object"
                );
                if let Err(cleanup) = self.backend.delete(&reference).await {
                    warn!(reference = %reference, error = %cleanup, "file_storage: cleanup after rejected upload failed");
                }
                return Err(e);
            }
            Ok::<(), Error>(())
        })
        .await?;

        info!(
            subsystem = "attachments",
            component = "file_storage",
            op = "store",
            reference = %reference,
            size_bytes = size,
            "Attachment stored"
        );
        Ok(reference)
    }

    /// Fetch stored bytes and their detected content type.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the reference is unknown or is not a plain
    /// file name.
    pub async fn retrieve(&self, reference: &str) -> Result<(Vec<u8>, String)> {
        if !is_safe_reference(reference) {
            return Err(Error::NotFound("Image not found".into()));
        }

        let data = self
            .with_reference_lock(reference, self.backend.read(reference))
            .await
            .map_err(|e| match e {
                Error::NotFound(_) => Error::NotFound("Image not found".into()),
                other => other,
            })?;

        let content_type = detect_content_type(&data);
        debug!(
            subsystem = "attachments",
            component = "file_storage",
            op = "retrieve",
            reference = %reference,
            size_bytes = data.len(),
            content_type = %content_type,
            "Attachment read"
        );
        Ok((data, content_type))
    }

    /// Delete a stored object. Releasing an unknown reference is a no-op.
    pub async fn release(&self, reference: &str) -> Result<()> {
        if !is_safe_reference(reference) {
            debug!(reference = %reference, "file_storage: ignoring release of unsafe reference");
            return Ok(());
        }

        self.with_reference_lock(reference, self.backend.delete(reference))
            .await?;
        debug!(
            subsystem = "attachments",
            component = "file_storage",
            op = "release",
            reference = %reference,
            "Attachment released"
        );
        Ok(())
    }

    /// Whether an object is stored under `reference`.
    pub async fn exists(&self, reference: &str) -> Result<bool> {
        if !is_safe_reference(reference) {
            return Ok(false);
        }
        self.backend.exists(reference).await
    }

    /// Remove every stored object not named in `live`. Returns how many
    /// objects were removed.
    ///
    /// Per-object failures are logged and skipped.
    pub async fn collect_garbage(&self, live: &HashSet<String>) -> Result<usize> {
        let mut removed = 0;
        for name in self.backend.list().await? {
            if live.contains(&name) {
                continue;
            }
            match self.release(&name).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(
                    subsystem = "attachments",
                    component = "file_storage",
                    op = "collect_garbage",
                    reference = %name,
                    error = %e,
                    "Failed to remove orphaned attachment"
                ),
            }
        }
        info!(
            subsystem = "attachments",
            component = "file_storage",
            op = "collect_garbage",
            removed,
            "Orphaned attachments collected"
        );
        Ok(removed)
    }
}
