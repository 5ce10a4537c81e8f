//! HTTP handlers for jotter-api.

pub mod images;
pub mod notes;
pub mod system;
