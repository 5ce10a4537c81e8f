//! Attachment safety checks.
//!
//! Layers applied to every upload:
//! 1. Size ceiling
//! 2. Magic byte detection for executables
//! 3. Full image decode (the bytes must be a real image, not just a header)
//!
//! Plus helpers for the names and content types attachments are served with.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::defaults::{FALLBACK_CONTENT_TYPE, MAX_EXTENSION_LEN};
use crate::error::{Error, Result};

/// Magic byte signatures for executable files
pub const MAGIC_SIGNATURES: &[(&str, &[u8])] = &[
    ("Windows PE/MZ", &[0x4D, 0x5A]),
    ("ELF", &[0x7F, 0x45, 0x4C, 0x46]),
    ("Mach-O 32", &[0xFE, 0xED, 0xFA, 0xCE]),
    ("Mach-O 64", &[0xFE, 0xED, 0xFA, 0xCF]),
    ("Mach-O Fat / Java Class", &[0xCA, 0xFE, 0xBA, 0xBE]),
    ("WebAssembly", &[0x00, 0x61, 0x73, 0x6D]),
];

/// Extensions never carried over to a stored name (case-insensitive)
static BLOCKED_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "exe", "dll", "scr", "pif", "com", "msi", "bat", "cmd", "sh", "so", "dylib", "jar",
        "class", "apk", "app", "dmg", "pkg", "lnk", "hta", "html", "htm", "svg", "js",
    ]
    .into_iter()
    .collect()
});

/// Reject uploads larger than `max_bytes`.
pub fn check_size(len: usize, max_bytes: usize) -> Result<()> {
    if len > max_bytes {
        return Err(Error::InvalidInput(format!(
            "Image exceeds maximum size of {} bytes",
            max_bytes
        )));
    }
    Ok(())
}

/// Name of the executable format `data` starts with, if any.
pub fn executable_signature(data: &[u8]) -> Option<&'static str> {
    MAGIC_SIGNATURES
        .iter()
        .find(|(_, magic)| data.starts_with(magic))
        .map(|(name, _)| *name)
}

/// Check that `data` decodes as an image.
///
/// CPU-bound: callers on the async runtime should run it via
/// `spawn_blocking`.
pub fn validate_image(data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Err(Error::InvalidAttachment(
            "Invalid image file provided.".into(),
        ));
    }
    if let Some(kind) = executable_signature(data) {
        return Err(Error::InvalidAttachment(format!(
            "Executable file detected: {}",
            kind
        )));
    }
    image::load_from_memory(data).map_err(|e| {
        tracing::debug!(error = %e, "image decode failed");
        Error::InvalidAttachment("Invalid image file provided.".into())
    })?;
    Ok(())
}

/// Extension to keep from a client-supplied file name, dot included.
///
/// Only short ASCII-alphanumeric extensions survive, lower-cased; anything
/// else (no extension, path tricks, blocked types) yields `None`.
pub fn sanitize_extension(filename: &str) -> Option<String> {
    // strip any client-side directory part, both separator styles
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let ext = ext.to_ascii_lowercase();
    if BLOCKED_EXTENSIONS.contains(ext.as_str()) {
        return None;
    }
    Some(format!(".{}", ext))
}

/// Whether `reference` is a plain file name that can be resolved in storage.
pub fn is_safe_reference(reference: &str) -> bool {
    !reference.is_empty()
        && reference != "."
        && !reference.contains("..")
        && !reference.contains(['/', '\\', '\0'])
}

/// Content type for stored bytes, from magic bytes only.
pub fn detect_content_type(data: &[u8]) -> String {
    infer::get(data)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
}
