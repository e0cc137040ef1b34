//! Read-only queries against the commit graph.
//!
//! The refresh engine never writes to a repository; it only asks topology
//! questions about revisions and branch tips. Those questions are expressed
//! as the [`CommitGraph`] trait so the engine can run against the in-memory
//! implementation in tests and against a real object store in production.
//!
//! # Fork networks
//!
//! Forks share one object database with their origin. Commit reachability is
//! therefore answered against a single shared graph, while branch tips are
//! scoped per project: `refs/heads/master` in a fork and in its origin are
//! different refs that may point at different commits. Every query still takes
//! a `ProjectId` because a production implementation routes the question to
//! that project's repository.

use std::future::Future;

use thiserror::Error;

use crate::types::{ProjectId, Sha};

pub mod memory;

pub use memory::InMemoryCommitGraph;

/// Errors from commit graph queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GitError {
    /// A queried revision is not present in the object database.
    ///
    /// Scoped to the merge request being processed; siblings of the same push
    /// are unaffected.
    #[error("revision not found: {0}")]
    RevisionNotFound(Sha),
}

/// Topology queries the refresh engine needs.
///
/// All queries are read-only. Implementations must tolerate questions about
/// projects and branches that no longer exist: a missing branch resolves to
/// `None`, a missing commit surfaces as [`GitError::RevisionNotFound`].
///
/// # Example (mock for testing)
///
/// ```ignore
/// struct FixedTip(Sha);
///
/// impl CommitGraph for FixedTip {
///     async fn resolve_branch_tip(
///         &self,
///         _project: ProjectId,
///         _branch: &str,
///     ) -> Result<Option<Sha>, GitError> {
///         Ok(Some(self.0.clone()))
///     }
///     // ...
/// }
/// ```
pub trait CommitGraph {
    /// Resolves the tip of `branch` in `project`.
    ///
    /// Returns `None` when the branch (or the whole project) does not exist.
    fn resolve_branch_tip(
        &self,
        project: ProjectId,
        branch: &str,
    ) -> impl Future<Output = Result<Option<Sha>, GitError>> + Send;

    /// Returns true if `potential_ancestor` is reachable from `descendant`.
    ///
    /// A commit is considered its own ancestor.
    fn is_ancestor(
        &self,
        project: ProjectId,
        potential_ancestor: &Sha,
        descendant: &Sha,
    ) -> impl Future<Output = Result<bool, GitError>> + Send;

    /// Returns the nearest common ancestor of `left` and `right`, or `None`
    /// when the two revisions share no history.
    fn merge_base(
        &self,
        project: ProjectId,
        left: &Sha,
        right: &Sha,
    ) -> impl Future<Output = Result<Option<Sha>, GitError>> + Send;

    /// Enumerates the commits reachable from `new_rev` but not from
    /// `old_rev`, newest first.
    ///
    /// This is the `old_rev..new_rev` range a push advanced the branch by.
    fn commits_between(
        &self,
        project: ProjectId,
        old_rev: &Sha,
        new_rev: &Sha,
    ) -> impl Future<Output = Result<Vec<Sha>, GitError>> + Send;
}
