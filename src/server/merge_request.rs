//! Merge request inspection endpoint for observability.
//!
//! Provides a read-only view of a merge request and its system note
//! timeline for debugging and monitoring.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AppState;
use crate::store::{ActivityRecorder, MergeRequestStore, StoreError};
use crate::types::{MergeRequest, MergeRequestId, Note};

/// What the inspection endpoint returns: the merge request plus its system
/// notes, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequestSnapshot {
    pub merge_request: MergeRequest,
    pub notes: Vec<Note>,
}

/// Errors that can occur when fetching a merge request.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// No merge request with the given id.
    #[error("merge request not found: {0}")]
    NotFound(MergeRequestId),

    /// Storage failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for SnapshotError {
    fn into_response(self) -> Response {
        let status = match &self {
            SnapshotError::NotFound(_) => StatusCode::NOT_FOUND,
            SnapshotError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

/// Merge request inspection handler.
///
/// # Response
///
/// - 200 OK with a JSON [`MergeRequestSnapshot`]
/// - 404 Not Found if no such merge request exists
pub async fn merge_request_handler(
    State(app_state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<MergeRequestSnapshot>, SnapshotError> {
    let id = MergeRequestId::from(id);
    let store = app_state.store();

    let merge_request = store
        .find_merge_request(id)
        .await?
        .ok_or(SnapshotError::NotFound(id))?;
    let notes = store.notes(id).await?;

    Ok(Json(MergeRequestSnapshot {
        merge_request,
        notes,
    }))
}
