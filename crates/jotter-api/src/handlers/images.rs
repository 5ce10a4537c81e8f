//! Attachment download.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use crate::{ApiError, AppState};

/// Serve a stored image with its detected content type.
///
/// # Returns
/// - 200 OK with the raw bytes
/// - 404 Not Found for unknown references and anything that is not a plain file name
pub async fn get_image(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (data, content_type) = state.db.file_storage.retrieve(&reference).await?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        data,
    ))
}
