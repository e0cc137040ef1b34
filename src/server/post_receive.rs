//! Post-receive endpoint handler.
//!
//! Accepts one ref update per request, as delivered by a git server's
//! post-receive hook, and runs the refresh pipeline synchronously. The
//! response body is the [`RefreshSummary`] for the push.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::AppState;
use super::signature::verify_signature;
use crate::refresh::{RefreshError, RefreshSummary};
use crate::types::{InvalidSha, ProjectId, Sha, UserId};

/// Header carrying the HMAC-SHA256 signature of the request body.
const HEADER_SIGNATURE: &str = "x-hook-signature-256";

/// JSON body of a post-receive delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct PostReceivePayload {
    /// Project the ref was pushed to.
    pub project_id: ProjectId,

    /// User who performed the push.
    pub user_id: UserId,

    /// Revision the ref pointed at before the push (all zeros for a branch
    /// creation).
    pub before: String,

    /// Revision the ref points at after the push (all zeros for a branch
    /// deletion).
    pub after: String,

    /// Fully qualified ref name, e.g. `refs/heads/master`.
    #[serde(rename = "ref")]
    pub ref_name: String,
}

/// Errors that can occur when processing a post-receive delivery.
#[derive(Debug, Error)]
pub enum PostReceiveError {
    /// Missing required header.
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// Invalid signature.
    #[error("invalid signature")]
    InvalidSignature,

    /// Invalid JSON body.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A revision field is not a well-formed SHA.
    #[error(transparent)]
    InvalidRevision(#[from] InvalidSha),

    /// The refresh itself failed.
    #[error(transparent)]
    Refresh(#[from] RefreshError),
}

impl IntoResponse for PostReceiveError {
    fn into_response(self) -> Response {
        let status = match &self {
            PostReceiveError::MissingHeader(_)
            | PostReceiveError::InvalidJson(_)
            | PostReceiveError::InvalidRevision(_) => StatusCode::BAD_REQUEST,
            PostReceiveError::InvalidSignature => StatusCode::UNAUTHORIZED,
            PostReceiveError::Refresh(RefreshError::UnknownProject(_)) => StatusCode::NOT_FOUND,
            PostReceiveError::Refresh(RefreshError::InvalidRef(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            PostReceiveError::Refresh(RefreshError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

/// Post-receive handler.
///
/// # Request
///
/// - Method: POST
/// - Required header: `X-Hook-Signature-256`, the HMAC-SHA256 of the body
/// - Body: JSON [`PostReceivePayload`]
///
/// # Response
///
/// - 200 OK with the [`RefreshSummary`] as JSON
/// - 400 Bad Request: missing header, invalid JSON, or malformed revision
/// - 401 Unauthorized: invalid signature
/// - 404 Not Found: the project does not exist
/// - 422 Unprocessable Entity: the ref is not a branch
/// - 500 Internal Server Error: storage failure
pub async fn post_receive_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<RefreshSummary>, PostReceiveError> {
    let signature_header = get_header(&headers, HEADER_SIGNATURE)?;

    // Verify the signature before parsing anything else.
    if !verify_signature(&body, &signature_header, app_state.hook_secret()) {
        warn!("rejected post-receive delivery with invalid signature");
        return Err(PostReceiveError::InvalidSignature);
    }

    let payload: PostReceivePayload = serde_json::from_slice(&body)?;
    let old_rev = Sha::parse(payload.before)?;
    let new_rev = Sha::parse(payload.after)?;

    debug!(
        project = %payload.project_id,
        user = %payload.user_id,
        reference = %payload.ref_name,
        "accepted post-receive delivery"
    );

    let summary = app_state
        .service()
        .refresh(
            payload.project_id,
            payload.user_id,
            old_rev,
            new_rev,
            &payload.ref_name,
        )
        .await?;

    Ok(Json(summary))
}

/// Extracts a required header value as a string.
fn get_header(headers: &HeaderMap, name: &'static str) -> Result<String, PostReceiveError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or(PostReceiveError::MissingHeader(name))
}
