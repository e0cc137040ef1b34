//! Core domain types for the merge-request refresh engine.
//!
//! This module contains all the fundamental types used throughout the
//! application, designed to encode invariants via the type system.

pub mod ids;
pub mod merge_request;
pub mod note;
pub mod project;
pub mod todo;

// Re-export commonly used types at the module level
pub use ids::{
    BLANK_SHA, InvalidSha, MergeRequestId, NoteId, ProjectId, Sha, TodoId, UserId,
};
pub use merge_request::{
    MergeRequest, MergeRequestState, MergeStatus, TransitionRejected,
};
pub use note::Note;
pub use project::Project;
pub use todo::{Todo, TodoKind, TodoState};
