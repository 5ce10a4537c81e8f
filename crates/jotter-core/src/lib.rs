//! # jotter-core
//!
//! Core types, traits, and the listing query engine for jotter.
//!
//! This crate provides the data structures and trait definitions that the
//! store (`jotter-db`) and the HTTP layer (`jotter-api`) depend on. It does
//! no I/O of its own.

pub mod defaults;
pub mod error;
pub mod file_safety;
pub mod models;
pub mod query;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use file_safety::{
    check_size, detect_content_type, is_safe_reference, sanitize_extension, validate_image,
};
pub use models::*;
pub use query::{NoteQuery, SortField, SortOrder};
pub use traits::*;
pub use uuid_utils::{is_v7, new_v7};
