//! The refresh service.
//!
//! One entry point, [`RefreshService::refresh`], processes one ref update:
//! parse the pushed ref, locate the open merge requests the branch touches in
//! either role, invalidate their cached mergeability, detect
//! externally-performed merges (target role), and bring source-role
//! bookkeeping up to date. Planning is delegated to the pure planners in this
//! module; this file owns locating, sequencing, and plan execution.
//!
//! # Failure isolation
//!
//! Push-level problems (unparsable ref, unknown project) abort the whole
//! call. Anything that goes wrong for a single merge request — missing
//! revisions, a lost transition race, a store write failing — is logged,
//! recorded in the summary, and never stops the siblings from processing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::git::CommitGraph;
use crate::hooks::HookNotifier;
use crate::push::{InvalidRef, PushDescriptor};
use crate::store::{
    ActivityRecorder, BranchRole, MergeRequestStore, ProjectStore, StoreError, TodoStore,
    TransitionOutcome,
};
use crate::types::{MergeRequest, MergeRequestId, MergeRequestState, ProjectId, Sha, UserId};

use super::detector::{MergeCheck, check_merged};
use super::plan::{Effect, MergeRequestPlan, StateChange};
use super::source_sync::plan_source_push;

/// Errors that abort a whole refresh call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The pushed ref is not a branch ref the engine handles.
    #[error(transparent)]
    InvalidRef(#[from] InvalidRef),

    /// The pushed-to project is not known to the store.
    #[error("unknown project: {0}")]
    UnknownProject(ProjectId),

    /// A store operation failed outside per-merge-request processing.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// A merge request the engine looked at but did not update, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedMergeRequest {
    pub merge_request: MergeRequestId,
    pub reason: String,
}

impl SkippedMergeRequest {
    fn new(merge_request: MergeRequestId, reason: impl Into<String>) -> Self {
        SkippedMergeRequest {
            merge_request,
            reason: reason.into(),
        }
    }
}

/// What one refresh call did, per merge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    /// The branch the push touched.
    pub branch: String,

    /// Merge requests transitioned to merged by this push.
    pub merged: Vec<MergeRequestId>,

    /// Source-role merge requests whose bookkeeping was brought up to date.
    pub updated: Vec<MergeRequestId>,

    /// Merge requests skipped or partially processed, with reasons.
    pub skipped: Vec<SkippedMergeRequest>,
}

/// Outcome of executing one plan.
enum PlanOutcome {
    Applied,
    Superseded(MergeRequestState),
}

/// The refresh engine, generic over storage, commit graph, and hook
/// delivery.
#[derive(Debug, Clone)]
pub struct RefreshService<S, G, H> {
    store: S,
    graph: G,
    hooks: H,
}

impl<S, G, H> RefreshService<S, G, H> {
    pub fn new(store: S, graph: G, hooks: H) -> Self {
        RefreshService {
            store,
            graph,
            hooks,
        }
    }
}

impl<S, G, H> RefreshService<S, G, H>
where
    S: ProjectStore + MergeRequestStore + ActivityRecorder + TodoStore + Send + Sync,
    G: CommitGraph + Send + Sync,
    H: HookNotifier + Send + Sync,
{
    /// Processes one ref update pushed by `user` to `project`.
    ///
    /// Returns the per-merge-request outcome summary. `Err` means the push
    /// itself could not be processed; per-merge-request failures land in
    /// [`RefreshSummary::skipped`] instead.
    #[instrument(
        skip(self, old_rev, new_rev),
        fields(project = %project, user = %user, reference = ref_name)
    )]
    pub async fn refresh(
        &self,
        project: ProjectId,
        user: UserId,
        old_rev: Sha,
        new_rev: Sha,
        ref_name: &str,
    ) -> Result<RefreshSummary, RefreshError> {
        let push = PushDescriptor::parse(old_rev, new_rev, ref_name)?;
        debug!(
            old_rev = %push.old_rev,
            new_rev = %push.new_rev,
            branch = %push.branch,
            "processing push"
        );

        if self.store.find_project(project).await?.is_none() {
            return Err(RefreshError::UnknownProject(project));
        }

        let source_matches = self
            .store
            .open_by_role(project, &push.branch, BranchRole::Source)
            .await?;
        let target_matches = self
            .store
            .open_by_role(project, &push.branch, BranchRole::Target)
            .await?;
        debug!(
            source = source_matches.len(),
            target = target_matches.len(),
            "located open merge requests"
        );

        let mut summary = RefreshSummary {
            branch: push.branch.clone(),
            merged: Vec::new(),
            updated: Vec::new(),
            skipped: Vec::new(),
        };

        self.invalidate_merge_status(&source_matches, &target_matches, user)
            .await;

        if push.branch_deleted() {
            debug!("branch deleted; merge detection skipped");
        } else {
            self.detect_merges(&target_matches, &push, user, &mut summary)
                .await;
        }

        self.sync_source_branches(project, &source_matches, &push, user, &mut summary)
            .await;

        info!(
            merged = summary.merged.len(),
            updated = summary.updated.len(),
            skipped = summary.skipped.len(),
            "refresh complete"
        );
        Ok(summary)
    }

    /// Resets the cached mergeability verdict of every located merge
    /// request, once each, before any other processing.
    async fn invalidate_merge_status(
        &self,
        source_matches: &[MergeRequest],
        target_matches: &[MergeRequest],
        user: UserId,
    ) {
        let mut touched: BTreeMap<MergeRequestId, &MergeRequest> = BTreeMap::new();
        for mr in source_matches.iter().chain(target_matches) {
            touched.entry(mr.id).or_insert(mr);
        }

        for (id, mr) in touched {
            let mut plan = MergeRequestPlan::empty(id);
            plan.state_changes.push(StateChange::MarkUnchecked);
            if let Err(e) = self.execute(mr, plan, user).await {
                warn!(merge_request = %id, error = %e, "failed to invalidate merge status");
            }
        }
    }

    /// Checks each target-role merge request for an externally-performed
    /// merge and records the ones the push completed.
    async fn detect_merges(
        &self,
        target_matches: &[MergeRequest],
        push: &PushDescriptor,
        user: UserId,
        summary: &mut RefreshSummary,
    ) {
        for mr in target_matches {
            match check_merged(&self.graph, mr, &push.new_rev).await {
                MergeCheck::Merged(plan) => match self.execute(mr, plan, user).await {
                    Ok(PlanOutcome::Applied) => {
                        info!(merge_request = %mr.id, "merge request merged by push");
                        summary.merged.push(mr.id);
                    }
                    Ok(PlanOutcome::Superseded(current)) => {
                        summary.skipped.push(SkippedMergeRequest::new(
                            mr.id,
                            format!("transition superseded: already {current}"),
                        ));
                    }
                    Err(e) => {
                        warn!(merge_request = %mr.id, error = %e, "failed to record merge");
                        summary
                            .skipped
                            .push(SkippedMergeRequest::new(mr.id, e.to_string()));
                    }
                },
                MergeCheck::StillOpen => {}
                MergeCheck::Skipped(reason) => {
                    debug!(merge_request = %mr.id, reason = %reason, "merge detection skipped");
                    summary
                        .skipped
                        .push(SkippedMergeRequest::new(mr.id, reason.to_string()));
                }
            }
        }
    }

    /// Brings source-role bookkeeping up to date: stale auto-merge intents,
    /// timeline notes, build-failure todos, and the update hook.
    async fn sync_source_branches(
        &self,
        project: ProjectId,
        source_matches: &[MergeRequest],
        push: &PushDescriptor,
        user: UserId,
        summary: &mut RefreshSummary,
    ) {
        if source_matches.is_empty() {
            return;
        }

        // One enumeration serves every merge request for an ordinary push;
        // per-merge-request ranges exist only for restored branches.
        let pushed_range = if push.branch_deleted() || push.branch_created() {
            Vec::new()
        } else {
            match self
                .graph
                .commits_between(project, &push.old_rev, &push.new_rev)
                .await
            {
                Ok(range) => range,
                Err(e) => {
                    warn!(error = %e, "could not enumerate pushed commits");
                    Vec::new()
                }
            }
        };

        for mr in source_matches {
            let commit_range = if push.branch_created() {
                self.restored_range(mr, &push.new_rev).await
            } else {
                pushed_range.clone()
            };

            let pending_todos = match self.store.pending_build_failure_todos(mr.id).await {
                Ok(todos) => todos,
                Err(e) => {
                    warn!(merge_request = %mr.id, error = %e, "failed to load todos");
                    summary
                        .skipped
                        .push(SkippedMergeRequest::new(mr.id, e.to_string()));
                    continue;
                }
            };

            let plan = plan_source_push(mr, push, &commit_range, &pending_todos);
            match self.execute(mr, plan, user).await {
                Ok(_) => summary.updated.push(mr.id),
                Err(e) => {
                    warn!(merge_request = %mr.id, error = %e, "failed to sync source branch");
                    summary
                        .skipped
                        .push(SkippedMergeRequest::new(mr.id, e.to_string()));
                }
            }
        }
    }

    /// Commit range for a branch that reappeared after deletion.
    ///
    /// There is no meaningful old revision in the push, so the range is
    /// taken from the merge base of the target branch tip and the pushed
    /// revision. Any gap in that computation degrades to an empty range; the
    /// restoration note still happens, only the commit note is omitted.
    async fn restored_range(&self, merge_request: &MergeRequest, new_rev: &Sha) -> Vec<Sha> {
        let target = merge_request.target_project;

        let tip = match self
            .graph
            .resolve_branch_tip(target, &merge_request.target_branch)
            .await
        {
            Ok(Some(tip)) => tip,
            Ok(None) => {
                debug!(
                    merge_request = %merge_request.id,
                    "target branch has no tip; omitting commit note"
                );
                return Vec::new();
            }
            Err(e) => {
                debug!(merge_request = %merge_request.id, error = %e, "omitting commit note");
                return Vec::new();
            }
        };

        let base = match self.graph.merge_base(target, &tip, new_rev).await {
            Ok(Some(base)) => base,
            Ok(None) => {
                debug!(
                    merge_request = %merge_request.id,
                    "no common history with target; omitting commit note"
                );
                return Vec::new();
            }
            Err(e) => {
                debug!(merge_request = %merge_request.id, error = %e, "omitting commit note");
                return Vec::new();
            }
        };

        match self.graph.commits_between(target, &base, new_rev).await {
            Ok(range) => range,
            Err(e) => {
                debug!(merge_request = %merge_request.id, error = %e, "omitting commit note");
                Vec::new()
            }
        }
    }

    /// Applies one plan: state changes first, then effects.
    ///
    /// A superseded transition drops the remainder of the plan wholesale.
    /// Hook failures are logged and swallowed; they never roll anything
    /// back.
    async fn execute(
        &self,
        merge_request: &MergeRequest,
        plan: MergeRequestPlan,
        user: UserId,
    ) -> Result<PlanOutcome, StoreError> {
        let id = plan.merge_request;

        for change in plan.state_changes {
            match change {
                StateChange::Transition { expected, target } => {
                    match self.store.try_transition(id, expected, target, user).await? {
                        TransitionOutcome::Applied => {}
                        TransitionOutcome::Superseded { current } => {
                            info!(
                                merge_request = %id,
                                current = %current,
                                "transition superseded; dropping plan"
                            );
                            return Ok(PlanOutcome::Superseded(current));
                        }
                    }
                }
                StateChange::ClearAutoMerge => self.store.clear_auto_merge(id).await?,
                StateChange::MarkUnchecked => self.store.mark_unchecked(id).await?,
                StateChange::ResolveTodo { todo } => self.store.resolve_todo(todo).await?,
            }
        }

        for effect in plan.effects {
            match effect {
                Effect::AppendNote { body } => {
                    self.store.append_system_note(id, user, &body).await?;
                }
                Effect::FireHook { action } => {
                    // Deliver the freshest entity; fall back to the located
                    // snapshot if it vanished mid-plan.
                    let current = self
                        .store
                        .find_merge_request(id)
                        .await?
                        .unwrap_or_else(|| merge_request.clone());
                    if let Err(e) = self.hooks.notify(&current, action).await {
                        warn!(
                            merge_request = %id,
                            action = %action,
                            error = %e,
                            "hook delivery failed"
                        );
                    }
                }
            }
        }

        Ok(PlanOutcome::Applied)
    }
}
