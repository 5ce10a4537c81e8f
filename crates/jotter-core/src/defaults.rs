//! Centralized default constants for jotter.
//!
//! Every crate references these instead of defining its own magic numbers.

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page offset.
pub const PAGE_OFFSET: usize = 0;

// =============================================================================
// ATTACHMENTS
// =============================================================================

/// Upload ceiling for a single image (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Longest file extension kept from a client-supplied file name.
pub const MAX_EXTENSION_LEN: usize = 10;

/// Directory used for attachment storage when none is configured.
pub const FILE_STORAGE_PATH: &str = "uploads";

/// Content type returned when the stored bytes match no known signature.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

// =============================================================================
// SERVER
// =============================================================================

/// Default bind address.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default listen port (the port the browser client talks to).
pub const SERVER_PORT: u16 = 8080;

/// Origins allowed by CORS when `ALLOWED_ORIGINS` is unset.
pub const ALLOWED_ORIGINS: &str = "http://localhost,http://localhost:3000";

/// Default tracing filter for the server binary.
pub const LOG_FILTER: &str = "jotter_api=debug,jotter_db=debug,tower_http=debug";
