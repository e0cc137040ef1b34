//! Entity storage traits.
//!
//! The engine reads and writes four kinds of entities: projects, merge
//! requests, system notes, and todos. Each concern is a separate trait so
//! tests can substitute narrow fakes; the bundled [`InMemoryStore`]
//! implements all of them behind one handle.
//!
//! # Concurrency
//!
//! There is no cross-entity transaction. The one guarded write is
//! [`MergeRequestStore::try_transition`], a compare-and-set against the state
//! the caller read at the start of processing: if another writer transitioned
//! the merge request in the meantime, the call reports
//! [`TransitionOutcome::Superseded`] and changes nothing. Every other write is
//! last-writer-wins.

use std::fmt;
use std::future::Future;

use thiserror::Error;

use crate::types::{
    MergeRequest, MergeRequestId, MergeRequestState, Note, Project, ProjectId, Todo, TodoId,
    TransitionRejected, UserId,
};

pub mod memory;

pub use memory::InMemoryStore;

/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A write targeted a merge request that does not exist.
    #[error("merge request not found: {0}")]
    MergeRequestNotFound(MergeRequestId),

    /// A write targeted a todo that does not exist.
    #[error("todo not found: {0}")]
    TodoNotFound(TodoId),

    /// The caller asked for a transition the state machine forbids.
    ///
    /// Distinct from losing the compare-and-set race, which is reported as
    /// [`TransitionOutcome::Superseded`], not an error.
    #[error(transparent)]
    IllegalTransition(#[from] TransitionRejected),
}

/// Which end of a merge request a branch matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchRole {
    Source,
    Target,
}

impl BranchRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchRole::Source => "source",
            BranchRole::Target => "target",
        }
    }
}

impl fmt::Display for BranchRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a compare-and-set state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The stored state matched the expected pre-image and was transitioned.
    Applied,

    /// Another writer got there first; nothing was changed.
    Superseded { current: MergeRequestState },
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied)
    }
}

/// Project lookup.
///
/// Lookups return `Ok(None)` for unknown or deleted projects; absence is a
/// normal topology state, not an error.
pub trait ProjectStore {
    fn find_project(
        &self,
        id: ProjectId,
    ) -> impl Future<Output = Result<Option<Project>, StoreError>> + Send;
}

/// Merge request lookup and guarded mutation.
pub trait MergeRequestStore {
    fn find_merge_request(
        &self,
        id: MergeRequestId,
    ) -> impl Future<Output = Result<Option<MergeRequest>, StoreError>> + Send;

    /// Returns the open merge requests whose `role` end is `branch` in
    /// `project`, in ascending id order.
    ///
    /// For [`BranchRole::Source`] the project must match the merge request's
    /// source project link; a nulled link matches nothing.
    fn open_by_role(
        &self,
        project: ProjectId,
        branch: &str,
        role: BranchRole,
    ) -> impl Future<Output = Result<Vec<MergeRequest>, StoreError>> + Send;

    /// Compare-and-set state transition.
    ///
    /// Applies `expected → target` only if the stored state still equals
    /// `expected`; otherwise reports [`TransitionOutcome::Superseded`] and
    /// leaves the entity untouched. When `target` is
    /// [`MergeRequestState::Merged`], the applied write also records `user`
    /// as the merge user.
    fn try_transition(
        &self,
        id: MergeRequestId,
        expected: MergeRequestState,
        target: MergeRequestState,
        user: UserId,
    ) -> impl Future<Output = Result<TransitionOutcome, StoreError>> + Send;

    /// Drops a pending merge-when-build-succeeds intent. Idempotent.
    fn clear_auto_merge(
        &self,
        id: MergeRequestId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Resets the cached mergeability verdict to unchecked. Idempotent.
    fn mark_unchecked(
        &self,
        id: MergeRequestId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Append-only activity timeline.
pub trait ActivityRecorder {
    /// Appends a system note to a merge request's timeline.
    ///
    /// Timestamps within one merge request are strictly increasing, so note
    /// order is well defined even when appends land within one clock tick.
    fn append_system_note(
        &self,
        merge_request: MergeRequestId,
        author: UserId,
        body: &str,
    ) -> impl Future<Output = Result<Note, StoreError>> + Send;

    /// Returns a merge request's notes in timeline order.
    fn notes(
        &self,
        merge_request: MergeRequestId,
    ) -> impl Future<Output = Result<Vec<Note>, StoreError>> + Send;
}

/// Todo lookup and resolution.
pub trait TodoStore {
    /// Returns the pending build-failure todos attached to a merge request,
    /// in ascending id order. Other todo kinds are never returned.
    fn pending_build_failure_todos(
        &self,
        merge_request: MergeRequestId,
    ) -> impl Future<Output = Result<Vec<Todo>, StoreError>> + Send;

    /// Marks a todo done. Resolving an already-done todo is a no-op.
    fn resolve_todo(&self, id: TodoId) -> impl Future<Output = Result<(), StoreError>> + Send;
}
