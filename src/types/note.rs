//! System notes: the append-only activity timeline of a merge request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{MergeRequestId, NoteId, UserId};

/// A single timeline entry on a merge request.
///
/// Notes are immutable once created and ordered by `created_at`; the store
/// guarantees strictly increasing timestamps within one merge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub merge_request: MergeRequestId,
    pub author: UserId,
    pub body: String,

    /// True for engine-generated notes, false for human comments.
    pub system: bool,

    pub created_at: DateTime<Utc>,
}

impl Note {
    /// Creates a system note (the only kind this engine produces).
    pub fn system(
        id: NoteId,
        merge_request: MergeRequestId,
        author: UserId,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Note {
            id,
            merge_request,
            author,
            body: body.into(),
            system: true,
            created_at,
        }
    }
}
