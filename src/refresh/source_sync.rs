//! Source-branch bookkeeping.
//!
//! Every push to a merge request's source branch invalidates what the merge
//! request believed about that branch: a pending auto-merge intent now refers
//! to a stale tip, the timeline is missing the new commits, and build-failure
//! todos refer to builds of revisions that no longer matter. This planner
//! turns one (merge request, push) pair into the plan that settles all of it.

use crate::hooks::HookAction;
use crate::push::PushDescriptor;
use crate::types::{MergeRequest, Sha, Todo, TodoKind};

use super::notes;
use super::plan::{Effect, MergeRequestPlan, StateChange};

/// Plans the bookkeeping for one merge request whose source branch was
/// pushed.
///
/// `commit_range` is the pushed range, newest first, already computed by the
/// caller (empty for deletions and for pushes with no enumerable range).
/// `pending_todos` are the merge request's candidate todos; anything that is
/// not a pending build-failure todo is ignored.
///
/// Plan order is fixed: clear stale auto-merge intent, note a branch
/// restoration or deletion, note the pushed commits, resolve todos, and
/// finally notify hook consumers with an `update` action. The update hook
/// fires even when nothing else changed; consumers learn about every source
/// branch push.
pub fn plan_source_push(
    merge_request: &MergeRequest,
    push: &PushDescriptor,
    commit_range: &[Sha],
    pending_todos: &[Todo],
) -> MergeRequestPlan {
    let mut plan = MergeRequestPlan::empty(merge_request.id);

    if merge_request.merge_when_build_succeeds {
        plan.state_changes.push(StateChange::ClearAutoMerge);
    }

    if push.branch_deleted() {
        plan.effects.push(Effect::AppendNote {
            body: notes::deleted_source_branch(&push.branch),
        });
    } else if push.branch_created() {
        // The branch exists again after having been deleted; the merge
        // request referencing it is being revived.
        plan.effects.push(Effect::AppendNote {
            body: notes::restored_source_branch(&push.branch),
        });
    }

    if !commit_range.is_empty() {
        plan.effects.push(Effect::AppendNote {
            body: notes::added_commits(commit_range),
        });
    }

    for todo in pending_todos {
        if todo.merge_request == merge_request.id
            && todo.kind == TodoKind::BuildFailed
            && todo.is_pending()
        {
            plan.state_changes.push(StateChange::ResolveTodo { todo: todo.id });
        }
    }

    plan.effects.push(Effect::FireHook {
        action: HookAction::Update,
    });

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MergeRequestId, ProjectId, TodoId, TodoState, UserId};

    fn make_sha(n: u64) -> Sha {
        Sha::parse(format!("{:0>40x}", n)).unwrap()
    }

    fn merge_request() -> MergeRequest {
        MergeRequest::new(
            MergeRequestId(1),
            ProjectId(1),
            "feature",
            ProjectId(1),
            "master",
        )
    }

    fn update_push() -> PushDescriptor {
        PushDescriptor::parse(make_sha(1), make_sha(2), "refs/heads/feature").unwrap()
    }

    #[test]
    fn ordinary_push_notes_commits_resolves_todos_and_fires_update() {
        let mut mr = merge_request();
        mr.merge_when_build_succeeds = true;
        let todos = vec![
            Todo::pending(TodoId(1), UserId(5), mr.id, TodoKind::BuildFailed),
            Todo::pending(TodoId(2), UserId(6), mr.id, TodoKind::BuildFailed),
        ];
        let range = vec![make_sha(2)];

        let plan = plan_source_push(&mr, &update_push(), &range, &todos);

        assert_eq!(
            plan.state_changes,
            vec![
                StateChange::ClearAutoMerge,
                StateChange::ResolveTodo { todo: TodoId(1) },
                StateChange::ResolveTodo { todo: TodoId(2) },
            ]
        );
        assert_eq!(
            plan.effects,
            vec![
                Effect::AppendNote {
                    body: notes::added_commits(&range),
                },
                Effect::FireHook {
                    action: HookAction::Update,
                },
            ]
        );
    }

    #[test]
    fn no_auto_merge_intent_means_no_clear() {
        let plan = plan_source_push(&merge_request(), &update_push(), &[], &[]);
        assert!(plan.state_changes.is_empty());
        assert_eq!(
            plan.effects,
            vec![Effect::FireHook {
                action: HookAction::Update,
            }]
        );
    }

    #[test]
    fn deletion_notes_the_branch_and_skips_commit_note() {
        let push =
            PushDescriptor::parse(make_sha(2), Sha::blank(), "refs/heads/feature").unwrap();

        let plan = plan_source_push(&merge_request(), &push, &[], &[]);

        assert_eq!(
            plan.effects,
            vec![
                Effect::AppendNote {
                    body: "Deleted source branch `feature`".to_string(),
                },
                Effect::FireHook {
                    action: HookAction::Update,
                },
            ]
        );
    }

    #[test]
    fn restoration_note_precedes_commit_note() {
        let push =
            PushDescriptor::parse(Sha::blank(), make_sha(5), "refs/heads/feature").unwrap();
        let range = vec![make_sha(5), make_sha(4)];

        let plan = plan_source_push(&merge_request(), &push, &range, &[]);

        assert_eq!(
            plan.effects,
            vec![
                Effect::AppendNote {
                    body: "Restored source branch `feature`".to_string(),
                },
                Effect::AppendNote {
                    body: notes::added_commits(&range),
                },
                Effect::FireHook {
                    action: HookAction::Update,
                },
            ]
        );
    }

    #[test]
    fn only_pending_build_failure_todos_resolve() {
        let mr = merge_request();
        let mut done = Todo::pending(TodoId(1), UserId(5), mr.id, TodoKind::BuildFailed);
        done.state = TodoState::Done;
        let todos = vec![
            done,
            Todo::pending(TodoId(2), UserId(5), mr.id, TodoKind::Mentioned),
            Todo::pending(TodoId(3), UserId(5), MergeRequestId(99), TodoKind::BuildFailed),
            Todo::pending(TodoId(4), UserId(5), mr.id, TodoKind::BuildFailed),
        ];

        let plan = plan_source_push(&mr, &update_push(), &[], &todos);

        assert_eq!(
            plan.state_changes,
            vec![StateChange::ResolveTodo { todo: TodoId(4) }]
        );
    }
}
