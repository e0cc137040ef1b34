//! Merge request entity and its state machine.
//!
//! The state machine is an explicit tagged enum with a guarded transition
//! function. The refresh engine only ever performs Open → Merged; closing is
//! listed as legal because the surrounding platform performs it through the
//! same guard.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::ids::{MergeRequestId, ProjectId, UserId};

/// The state of a merge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeRequestState {
    /// The merge request is open and tracked by the refresh engine.
    Open,

    /// The source branch has been integrated into the target branch.
    Merged,

    /// The merge request was closed without merging.
    Closed,
}

impl MergeRequestState {
    /// Returns true if the merge request is open.
    pub fn is_open(&self) -> bool {
        matches!(self, MergeRequestState::Open)
    }

    /// Returns true if the merge request was merged.
    pub fn is_merged(&self) -> bool {
        matches!(self, MergeRequestState::Merged)
    }

    /// Returns the state name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            MergeRequestState::Open => "open",
            MergeRequestState::Merged => "merged",
            MergeRequestState::Closed => "closed",
        }
    }

    /// Computes the state after a guarded transition.
    ///
    /// Legal transitions: Open → Merged, Open → Closed. Everything else is
    /// rejected; Merged and Closed are terminal as far as this engine is
    /// concerned.
    pub fn try_transition(
        self,
        target: MergeRequestState,
    ) -> Result<MergeRequestState, TransitionRejected> {
        match (self, target) {
            (MergeRequestState::Open, MergeRequestState::Merged) => Ok(MergeRequestState::Merged),
            (MergeRequestState::Open, MergeRequestState::Closed) => Ok(MergeRequestState::Closed),
            (from, to) => Err(TransitionRejected { from, to }),
        }
    }
}

impl fmt::Display for MergeRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error returned when a state transition is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot transition merge request from {from} to {to}")]
pub struct TransitionRejected {
    pub from: MergeRequestState,
    pub to: MergeRequestState,
}

/// The cached mergeability verdict for a merge request.
///
/// Any push touching a merge request invalidates this back to `Unchecked`;
/// the (external) mergeability checker recomputes it lazily.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStatus {
    /// Not computed since the last push that touched either branch.
    Unchecked,

    /// The source branch merges cleanly into the target branch.
    CanBeMerged,

    /// The branches conflict.
    CannotBeMerged,
}

/// A merge request: a proposal to integrate a source branch into a target
/// branch.
///
/// `source_project` is a weak reference. Deleting a fork nulls the link
/// rather than deleting the merge request, so every consumer must tolerate
/// `None` (the "absent project" topology state).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub id: MergeRequestId,

    /// The project hosting the source branch; `None` once that project
    /// (typically a fork) has been deleted.
    pub source_project: Option<ProjectId>,
    pub source_branch: String,

    pub target_project: ProjectId,
    pub target_branch: String,

    pub state: MergeRequestState,

    /// Cached mergeability verdict; reset to `Unchecked` on every push that
    /// locates this merge request.
    pub merge_status: MergeStatus,

    /// "Merge automatically once the pending build succeeds." Invalidated
    /// whenever the source tip changes.
    pub merge_when_build_succeeds: bool,

    /// The user credited with the merge, set when the engine detects one.
    pub merge_user: Option<UserId>,
}

impl MergeRequest {
    /// Creates an open merge request with no pending auto-merge intent.
    pub fn new(
        id: MergeRequestId,
        source_project: ProjectId,
        source_branch: impl Into<String>,
        target_project: ProjectId,
        target_branch: impl Into<String>,
    ) -> Self {
        MergeRequest {
            id,
            source_project: Some(source_project),
            source_branch: source_branch.into(),
            target_project,
            target_branch: target_branch.into(),
            state: MergeRequestState::Open,
            merge_status: MergeStatus::Unchecked,
            merge_when_build_succeeds: false,
            merge_user: None,
        }
    }

    /// Returns true if the merge request is open.
    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }
}
