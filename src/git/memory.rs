//! In-memory commit graph.
//!
//! Backs the engine in tests and in the reference server binary. One object
//! database is shared by every project (the fork-network model); branch refs
//! are keyed by `(project, branch)`.
//!
//! Reachability is answered by a breadth-first walk over parent links, which
//! is plenty for the graph sizes tests construct.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{CommitGraph, GitError};
use crate::types::{ProjectId, Sha};

/// Shared mutable commit graph.
///
/// Cheap to clone; clones share the same underlying graph, so tests can keep
/// a handle for seeding while the engine holds its own.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCommitGraph {
    inner: Arc<RwLock<GraphInner>>,
}

#[derive(Debug, Default)]
struct GraphInner {
    /// Object database: commit id to parent ids. Shared by all projects.
    commits: HashMap<Sha, Vec<Sha>>,

    /// Branch tips, scoped per project.
    refs: HashMap<(ProjectId, String), Sha>,
}

impl InMemoryCommitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a commit into the shared object database.
    ///
    /// Parents should already be present; the walk treats a dangling parent
    /// link as a missing revision.
    pub async fn add_commit(&self, sha: Sha, parents: Vec<Sha>) {
        let mut inner = self.inner.write().await;
        inner.commits.insert(sha, parents);
    }

    /// Points `branch` in `project` at `tip`.
    pub async fn set_branch(&self, project: ProjectId, branch: &str, tip: Sha) {
        let mut inner = self.inner.write().await;
        inner.refs.insert((project, branch.to_string()), tip);
    }

    /// Removes `branch` from `project`. Unknown branches are ignored.
    pub async fn delete_branch(&self, project: ProjectId, branch: &str) {
        let mut inner = self.inner.write().await;
        inner.refs.remove(&(project, branch.to_string()));
    }
}

impl GraphInner {
    fn require(&self, sha: &Sha) -> Result<&[Sha], GitError> {
        self.commits
            .get(sha)
            .map(Vec::as_slice)
            .ok_or_else(|| GitError::RevisionNotFound(sha.clone()))
    }

    /// All commits reachable from `start`, including `start` itself.
    fn reachable(&self, start: &Sha) -> Result<HashSet<Sha>, GitError> {
        self.require(start)?;

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start.clone()]);
        while let Some(sha) = queue.pop_front() {
            if !seen.insert(sha.clone()) {
                continue;
            }
            for parent in self.require(&sha)? {
                if !seen.contains(parent) {
                    queue.push_back(parent.clone());
                }
            }
        }
        Ok(seen)
    }

    fn is_ancestor(&self, potential_ancestor: &Sha, descendant: &Sha) -> Result<bool, GitError> {
        self.require(potential_ancestor)?;
        Ok(self.reachable(descendant)?.contains(potential_ancestor))
    }

    /// Nearest common ancestor by breadth-first distance from `left`.
    fn merge_base(&self, left: &Sha, right: &Sha) -> Result<Option<Sha>, GitError> {
        let right_ancestors = self.reachable(right)?;

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([left.clone()]);
        while let Some(sha) = queue.pop_front() {
            if !seen.insert(sha.clone()) {
                continue;
            }
            if right_ancestors.contains(&sha) {
                return Ok(Some(sha));
            }
            for parent in self.require(&sha)? {
                if !seen.contains(parent) {
                    queue.push_back(parent.clone());
                }
            }
        }
        Ok(None)
    }

    /// Commits in `old..new`, newest first.
    ///
    /// The walk from `new` prunes at any commit reachable from `old`; the
    /// excluded set is closed under ancestry, so nothing behind it can be in
    /// the range.
    fn commits_between(&self, old_rev: &Sha, new_rev: &Sha) -> Result<Vec<Sha>, GitError> {
        let excluded = self.reachable(old_rev)?;

        let mut range = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([new_rev.clone()]);
        while let Some(sha) = queue.pop_front() {
            if excluded.contains(&sha) || !seen.insert(sha.clone()) {
                continue;
            }
            for parent in self.require(&sha)? {
                if !seen.contains(parent) {
                    queue.push_back(parent.clone());
                }
            }
            range.push(sha);
        }
        Ok(range)
    }
}

impl CommitGraph for InMemoryCommitGraph {
    fn resolve_branch_tip(
        &self,
        project: ProjectId,
        branch: &str,
    ) -> impl Future<Output = Result<Option<Sha>, GitError>> + Send {
        async move {
            let inner = self.inner.read().await;
            Ok(inner.refs.get(&(project, branch.to_string())).cloned())
        }
    }

    fn is_ancestor(
        &self,
        _project: ProjectId,
        potential_ancestor: &Sha,
        descendant: &Sha,
    ) -> impl Future<Output = Result<bool, GitError>> + Send {
        async move {
            let inner = self.inner.read().await;
            inner.is_ancestor(potential_ancestor, descendant)
        }
    }

    fn merge_base(
        &self,
        _project: ProjectId,
        left: &Sha,
        right: &Sha,
    ) -> impl Future<Output = Result<Option<Sha>, GitError>> + Send {
        async move {
            let inner = self.inner.read().await;
            inner.merge_base(left, right)
        }
    }

    fn commits_between(
        &self,
        _project: ProjectId,
        old_rev: &Sha,
        new_rev: &Sha,
    ) -> impl Future<Output = Result<Vec<Sha>, GitError>> + Send {
        async move {
            let inner = self.inner.read().await;
            inner.commits_between(old_rev, new_rev)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_sha(n: u64) -> Sha {
        Sha::parse(format!("{:0>40x}", n)).unwrap()
    }

    /// Builds the chain `1 <- 2 <- ... <- n` and returns the shas in order.
    async fn chain(graph: &InMemoryCommitGraph, n: u64) -> Vec<Sha> {
        let mut shas = Vec::new();
        for i in 1..=n {
            let sha = make_sha(i);
            let parents = if i == 1 {
                vec![]
            } else {
                vec![make_sha(i - 1)]
            };
            graph.add_commit(sha.clone(), parents).await;
            shas.push(sha);
        }
        shas
    }

    #[tokio::test]
    async fn ancestry_holds_along_a_chain() {
        let graph = InMemoryCommitGraph::new();
        let shas = chain(&graph, 4).await;
        let project = ProjectId(1);

        assert!(
            graph
                .is_ancestor(project, &shas[0], &shas[3])
                .await
                .unwrap()
        );
        assert!(
            !graph
                .is_ancestor(project, &shas[3], &shas[0])
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn a_commit_is_its_own_ancestor() {
        let graph = InMemoryCommitGraph::new();
        let shas = chain(&graph, 2).await;

        assert!(
            graph
                .is_ancestor(ProjectId(1), &shas[1], &shas[1])
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn unrelated_roots_are_not_ancestors() {
        let graph = InMemoryCommitGraph::new();
        graph.add_commit(make_sha(1), vec![]).await;
        graph.add_commit(make_sha(2), vec![]).await;

        assert!(
            !graph
                .is_ancestor(ProjectId(1), &make_sha(1), &make_sha(2))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn unknown_revision_is_an_error() {
        let graph = InMemoryCommitGraph::new();
        graph.add_commit(make_sha(1), vec![]).await;

        let err = graph
            .is_ancestor(ProjectId(1), &make_sha(9), &make_sha(1))
            .await
            .unwrap_err();
        assert_eq!(err, GitError::RevisionNotFound(make_sha(9)));
    }

    #[tokio::test]
    async fn blank_sha_is_not_a_revision() {
        let graph = InMemoryCommitGraph::new();
        graph.add_commit(make_sha(1), vec![]).await;

        let err = graph
            .commits_between(ProjectId(1), &Sha::blank(), &make_sha(1))
            .await
            .unwrap_err();
        assert_eq!(err, GitError::RevisionNotFound(Sha::blank()));
    }

    #[tokio::test]
    async fn commits_between_is_newest_first() {
        let graph = InMemoryCommitGraph::new();
        let shas = chain(&graph, 5).await;

        let range = graph
            .commits_between(ProjectId(1), &shas[1], &shas[4])
            .await
            .unwrap();
        assert_eq!(range, vec![shas[4].clone(), shas[3].clone(), shas[2].clone()]);
    }

    #[tokio::test]
    async fn commits_between_same_revision_is_empty() {
        let graph = InMemoryCommitGraph::new();
        let shas = chain(&graph, 3).await;

        let range = graph
            .commits_between(ProjectId(1), &shas[2], &shas[2])
            .await
            .unwrap();
        assert!(range.is_empty());
    }

    #[tokio::test]
    async fn merge_base_of_forked_branches_is_the_fork_point() {
        // 1 <- 2 <- 3 (left), with 4 <- 5 forking off 2 (right).
        let graph = InMemoryCommitGraph::new();
        chain(&graph, 3).await;
        graph.add_commit(make_sha(4), vec![make_sha(2)]).await;
        graph.add_commit(make_sha(5), vec![make_sha(4)]).await;

        let base = graph
            .merge_base(ProjectId(1), &make_sha(3), &make_sha(5))
            .await
            .unwrap();
        assert_eq!(base, Some(make_sha(2)));
    }

    #[tokio::test]
    async fn merge_base_of_ancestor_pair_is_the_ancestor() {
        let graph = InMemoryCommitGraph::new();
        let shas = chain(&graph, 3).await;

        let base = graph
            .merge_base(ProjectId(1), &shas[0], &shas[2])
            .await
            .unwrap();
        assert_eq!(base, Some(shas[0].clone()));
    }

    #[tokio::test]
    async fn merge_base_of_disjoint_histories_is_none() {
        let graph = InMemoryCommitGraph::new();
        graph.add_commit(make_sha(1), vec![]).await;
        graph.add_commit(make_sha(2), vec![]).await;

        let base = graph
            .merge_base(ProjectId(1), &make_sha(1), &make_sha(2))
            .await
            .unwrap();
        assert_eq!(base, None);
    }

    #[tokio::test]
    async fn branch_tips_are_scoped_per_project() {
        let graph = InMemoryCommitGraph::new();
        let shas = chain(&graph, 2).await;
        let origin = ProjectId(1);
        let fork = ProjectId(2);

        graph.set_branch(origin, "master", shas[1].clone()).await;
        graph.set_branch(fork, "master", shas[0].clone()).await;

        assert_eq!(
            graph.resolve_branch_tip(origin, "master").await.unwrap(),
            Some(shas[1].clone())
        );
        assert_eq!(
            graph.resolve_branch_tip(fork, "master").await.unwrap(),
            Some(shas[0].clone())
        );
        assert_eq!(graph.resolve_branch_tip(fork, "feature").await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleted_branch_no_longer_resolves() {
        let graph = InMemoryCommitGraph::new();
        let shas = chain(&graph, 1).await;
        let project = ProjectId(1);

        graph.set_branch(project, "feature", shas[0].clone()).await;
        graph.delete_branch(project, "feature").await;

        assert_eq!(graph.resolve_branch_tip(project, "feature").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clones_share_the_graph() {
        let graph = InMemoryCommitGraph::new();
        let handle = graph.clone();
        handle.add_commit(make_sha(1), vec![]).await;
        handle.set_branch(ProjectId(1), "master", make_sha(1)).await;

        assert_eq!(
            graph.resolve_branch_tip(ProjectId(1), "master").await.unwrap(),
            Some(make_sha(1))
        );
    }
}
