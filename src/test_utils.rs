//! Shared test utilities and arbitrary generators for property-based testing.

use std::future::Future;
use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use crate::git::InMemoryCommitGraph;
use crate::hooks::{HookAction, HookError, HookNotifier};
use crate::store::InMemoryStore;
use crate::types::{
    MergeRequest, MergeRequestId, Project, ProjectId, Sha, Todo, TodoId, TodoKind, UserId,
};

pub fn arb_sha() -> impl Strategy<Value = Sha> {
    "[0-9a-f]{40}".prop_map(|s| Sha::parse(s).unwrap())
}

pub fn arb_branch_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9/-]{0,50}".prop_map(String::from)
}

pub fn arb_merge_request_id() -> impl Strategy<Value = MergeRequestId> {
    any::<u64>().prop_map(MergeRequestId)
}

/// Deterministic sha from a small number, for fixtures.
pub fn make_sha(n: u64) -> Sha {
    Sha::parse(format!("{:0>40x}", n)).unwrap()
}

/// Hook notifier that records every delivery for assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingHooks {
    deliveries: Arc<Mutex<Vec<(MergeRequestId, HookAction)>>>,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<(MergeRequestId, HookAction)> {
        self.deliveries.lock().unwrap().clone()
    }
}

impl HookNotifier for RecordingHooks {
    fn notify(
        &self,
        merge_request: &MergeRequest,
        action: HookAction,
    ) -> impl Future<Output = Result<(), HookError>> + Send {
        let deliveries = Arc::clone(&self.deliveries);
        let id = merge_request.id;
        async move {
            deliveries.lock().unwrap().push((id, action));
            Ok(())
        }
    }
}

/// Handles into the standard two-project fixture built by
/// [`seed_fork_network`].
pub struct ForkNetwork {
    pub origin: ProjectId,
    pub fork: ProjectId,
    pub pusher: UserId,

    /// origin/master → origin/feature, auto-merge intent set.
    pub origin_mr: MergeRequestId,

    /// fork/master → origin/feature.
    pub fork_mr: MergeRequestId,

    /// Pending build-failure todos, both targeting `origin_mr`.
    pub todo_a: TodoId,
    pub todo_b: TodoId,

    /// The commit feature forked off from.
    pub base: Sha,
    pub feature_tip: Sha,

    /// Old and new master tips of the ordinary four-commit push.
    pub master_old: Sha,
    pub master_new: Sha,
}

/// Seeds the fixture most engine tests share: an origin project with a fork,
/// one merge request per project (both targeting origin's `feature`), and a
/// commit graph where `master` has advanced four commits past the pushed-from
/// revision.
///
/// Branch refs are set to their post-push positions: `master` at
/// `master_new` in both projects, `feature` at `feature_tip` in origin.
pub async fn seed_fork_network(store: &InMemoryStore, graph: &InMemoryCommitGraph) -> ForkNetwork {
    let origin = ProjectId(1);
    let fork = ProjectId(2);
    let pusher = UserId(7);

    store.insert_project(Project::new(origin, "group/app")).await;
    store
        .insert_project(Project::new(fork, "contributor/app"))
        .await;

    // base <- feature_tip (feature)
    // base <- m1 <- m2 <- m3 <- m4 <- m5 (master); the push was m1 -> m5.
    let base = make_sha(1);
    let feature_tip = make_sha(2);
    graph.add_commit(base.clone(), vec![]).await;
    graph
        .add_commit(feature_tip.clone(), vec![base.clone()])
        .await;

    let mut parent = base.clone();
    let mut master = Vec::new();
    for n in 3..=7 {
        let sha = make_sha(n);
        graph.add_commit(sha.clone(), vec![parent]).await;
        parent = sha.clone();
        master.push(sha);
    }
    let master_old = master[0].clone();
    let master_new = master[4].clone();

    graph.set_branch(origin, "master", master_new.clone()).await;
    graph
        .set_branch(origin, "feature", feature_tip.clone())
        .await;
    graph.set_branch(fork, "master", master_new.clone()).await;

    let origin_mr = MergeRequestId(1);
    let fork_mr = MergeRequestId(2);
    let mut mr = MergeRequest::new(origin_mr, origin, "master", origin, "feature");
    mr.merge_when_build_succeeds = true;
    store.insert_merge_request(mr).await;
    store
        .insert_merge_request(MergeRequest::new(fork_mr, fork, "master", origin, "feature"))
        .await;

    let todo_a = TodoId(1);
    let todo_b = TodoId(2);
    store
        .insert_todo(Todo::pending(todo_a, pusher, origin_mr, TodoKind::BuildFailed))
        .await;
    store
        .insert_todo(Todo::pending(todo_b, pusher, origin_mr, TodoKind::BuildFailed))
        .await;

    ForkNetwork {
        origin,
        fork,
        pusher,
        origin_mr,
        fork_mr,
        todo_a,
        todo_b,
        base,
        feature_tip,
        master_old,
        master_new,
    }
}
