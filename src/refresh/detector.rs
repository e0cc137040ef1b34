//! Externally-performed merge detection.
//!
//! A push to a merge request's target branch may carry the source branch's
//! history with it (a local `git merge` pushed by hand, a rebase landing the
//! same commits, and so on). When the source tip is already reachable from
//! the pushed revision there is nothing left to integrate, so the merge
//! request is recorded as merged even though nobody pressed the merge button.
//!
//! Detection is deliberately conservative: any doubt (missing project,
//! unresolvable tip, unknown revision) skips the check for that merge request
//! and touches nothing.

use std::fmt;

use crate::git::{CommitGraph, GitError};
use crate::hooks::HookAction;
use crate::types::{MergeRequest, MergeRequestState, Sha};

use super::notes;
use super::plan::{Effect, MergeRequestPlan, StateChange};

/// Why merge detection was skipped for one merge request.
///
/// None of these are errors; they are normal topology states the engine
/// tolerates silently (logged, never surfaced to the merge request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The source project link is nulled; the fork that hosted the source
    /// branch is gone.
    AbsentProject,

    /// The source branch has no resolvable tip.
    UnresolvedSourceTip,

    /// A graph query hit a revision the object database does not have.
    RevisionNotFound(Sha),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AbsentProject => write!(f, "source project is absent"),
            SkipReason::UnresolvedSourceTip => write!(f, "source branch tip is unresolvable"),
            SkipReason::RevisionNotFound(sha) => write!(f, "revision not found: {sha}"),
        }
    }
}

/// Outcome of checking one merge request against a pushed revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeCheck {
    /// The source tip is contained in the pushed revision; the plan records
    /// the merge.
    Merged(MergeRequestPlan),

    /// Ancestry does not hold; the merge request stays as it is.
    StillOpen,

    /// The check could not be performed for this merge request.
    Skipped(SkipReason),
}

/// Checks whether a push to the target branch already contains the merge
/// request's source tip.
///
/// The ancestry question is asked of the target project's repository: that is
/// where the push landed, and fork networks share one object database, so the
/// source tip is visible there whichever project hosts the source branch.
pub async fn check_merged<G: CommitGraph>(
    graph: &G,
    merge_request: &MergeRequest,
    new_rev: &Sha,
) -> MergeCheck {
    let Some(source_project) = merge_request.source_project else {
        return MergeCheck::Skipped(SkipReason::AbsentProject);
    };

    let source_tip = match graph
        .resolve_branch_tip(source_project, &merge_request.source_branch)
        .await
    {
        Ok(Some(tip)) => tip,
        Ok(None) => return MergeCheck::Skipped(SkipReason::UnresolvedSourceTip),
        Err(GitError::RevisionNotFound(sha)) => {
            return MergeCheck::Skipped(SkipReason::RevisionNotFound(sha));
        }
    };

    match graph
        .is_ancestor(merge_request.target_project, &source_tip, new_rev)
        .await
    {
        Ok(true) => MergeCheck::Merged(merged_plan(merge_request)),
        Ok(false) => MergeCheck::StillOpen,
        Err(GitError::RevisionNotFound(sha)) => MergeCheck::Skipped(SkipReason::RevisionNotFound(sha)),
    }
}

fn merged_plan(merge_request: &MergeRequest) -> MergeRequestPlan {
    let mut plan = MergeRequestPlan::empty(merge_request.id);
    plan.state_changes.push(StateChange::Transition {
        expected: merge_request.state,
        target: MergeRequestState::Merged,
    });
    plan.effects.push(Effect::AppendNote {
        body: notes::merged(),
    });
    plan.effects.push(Effect::FireHook {
        action: HookAction::Merge,
    });
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::InMemoryCommitGraph;
    use crate::types::{MergeRequestId, ProjectId};

    fn make_sha(n: u64) -> Sha {
        Sha::parse(format!("{:0>40x}", n)).unwrap()
    }

    fn merge_request() -> MergeRequest {
        MergeRequest::new(
            MergeRequestId(1),
            ProjectId(2),
            "master",
            ProjectId(1),
            "feature",
        )
    }

    /// Chain 1 <- 2 <- 3; fork's master points at 2.
    async fn seeded_graph() -> InMemoryCommitGraph {
        let graph = InMemoryCommitGraph::new();
        graph.add_commit(make_sha(1), vec![]).await;
        graph.add_commit(make_sha(2), vec![make_sha(1)]).await;
        graph.add_commit(make_sha(3), vec![make_sha(2)]).await;
        graph.set_branch(ProjectId(2), "master", make_sha(2)).await;
        graph
    }

    #[tokio::test]
    async fn contained_source_tip_yields_a_merge_plan() {
        let graph = seeded_graph().await;
        let mr = merge_request();

        let check = check_merged(&graph, &mr, &make_sha(3)).await;

        let MergeCheck::Merged(plan) = check else {
            panic!("expected a merge plan, got {check:?}");
        };
        assert_eq!(plan.merge_request, mr.id);
        assert_eq!(
            plan.state_changes,
            vec![StateChange::Transition {
                expected: MergeRequestState::Open,
                target: MergeRequestState::Merged,
            }]
        );
        assert_eq!(
            plan.effects,
            vec![
                Effect::AppendNote {
                    body: "Status changed to merged".to_string(),
                },
                Effect::FireHook {
                    action: HookAction::Merge,
                },
            ]
        );
    }

    #[tokio::test]
    async fn pushed_revision_equal_to_source_tip_counts_as_merged() {
        let graph = seeded_graph().await;
        let mr = merge_request();

        let check = check_merged(&graph, &mr, &make_sha(2)).await;
        assert!(matches!(check, MergeCheck::Merged(_)));
    }

    #[tokio::test]
    async fn uncontained_source_tip_stays_open() {
        let graph = seeded_graph().await;
        let mr = merge_request();

        // Push of the fork point itself: the source tip (2) is not in 1's
        // history.
        let check = check_merged(&graph, &mr, &make_sha(1)).await;
        assert_eq!(check, MergeCheck::StillOpen);
    }

    #[tokio::test]
    async fn nulled_source_project_skips_silently() {
        let graph = seeded_graph().await;
        let mut mr = merge_request();
        mr.source_project = None;

        let check = check_merged(&graph, &mr, &make_sha(3)).await;
        assert_eq!(check, MergeCheck::Skipped(SkipReason::AbsentProject));
    }

    #[tokio::test]
    async fn missing_source_branch_skips() {
        let graph = seeded_graph().await;
        graph.delete_branch(ProjectId(2), "master").await;
        let mr = merge_request();

        let check = check_merged(&graph, &mr, &make_sha(3)).await;
        assert_eq!(check, MergeCheck::Skipped(SkipReason::UnresolvedSourceTip));
    }

    #[tokio::test]
    async fn dangling_tip_skips_with_the_missing_revision() {
        let graph = seeded_graph().await;
        // Point the branch at a commit the object database never saw.
        graph.set_branch(ProjectId(2), "master", make_sha(9)).await;
        let mr = merge_request();

        let check = check_merged(&graph, &mr, &make_sha(3)).await;
        assert_eq!(
            check,
            MergeCheck::Skipped(SkipReason::RevisionNotFound(make_sha(9)))
        );
    }
}
