//! Service info endpoints.

use axum::{extract::State, Json};

use crate::{ApiError, AppState};
use jotter_core::NoteRepository;

pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to the Jotter API",
    }))
}

/// Liveness plus the number of stored notes.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let notes = state.db.notes.count().await?;
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "notes": notes,
    })))
}
