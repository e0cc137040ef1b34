//! In-memory entity store.
//!
//! Implements every storage trait behind one cloneable handle. Entities live
//! in `BTreeMap`s so listings come back in stable ascending-id order without
//! extra sorting.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use super::{
    ActivityRecorder, BranchRole, MergeRequestStore, ProjectStore, StoreError, TodoStore,
    TransitionOutcome,
};
use crate::types::{
    MergeRequest, MergeRequestId, MergeRequestState, MergeStatus, Note, NoteId, Project,
    ProjectId, Todo, TodoId, TodoKind, TodoState, UserId,
};

/// Shared mutable entity store.
///
/// Cheap to clone; clones share the same underlying tables, so the server
/// and the engine (or a test and the engine) can hold separate handles.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<StoreInner>>,
}

#[derive(Debug, Default)]
struct StoreInner {
    projects: BTreeMap<ProjectId, Project>,
    merge_requests: BTreeMap<MergeRequestId, MergeRequest>,
    notes: BTreeMap<MergeRequestId, Vec<Note>>,
    todos: BTreeMap<TodoId, Todo>,
    next_note_id: u64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_project(&self, project: Project) {
        let mut inner = self.inner.write().await;
        inner.projects.insert(project.id, project);
    }

    /// Deletes a project and nulls the source link of every merge request
    /// that referenced it.
    ///
    /// This is the fork-deletion cascade: the merge requests survive with an
    /// absent source project, they are not deleted alongside the fork.
    pub async fn remove_project(&self, id: ProjectId) {
        let mut inner = self.inner.write().await;
        inner.projects.remove(&id);
        for mr in inner.merge_requests.values_mut() {
            if mr.source_project == Some(id) {
                mr.source_project = None;
            }
        }
    }

    pub async fn insert_merge_request(&self, merge_request: MergeRequest) {
        let mut inner = self.inner.write().await;
        inner.merge_requests.insert(merge_request.id, merge_request);
    }

    pub async fn insert_todo(&self, todo: Todo) {
        let mut inner = self.inner.write().await;
        inner.todos.insert(todo.id, todo);
    }

    /// Inspection helper for tests.
    pub async fn todo(&self, id: TodoId) -> Option<Todo> {
        let inner = self.inner.read().await;
        inner.todos.get(&id).cloned()
    }
}

impl ProjectStore for InMemoryStore {
    fn find_project(
        &self,
        id: ProjectId,
    ) -> impl Future<Output = Result<Option<Project>, StoreError>> + Send {
        async move {
            let inner = self.inner.read().await;
            Ok(inner.projects.get(&id).cloned())
        }
    }
}

impl MergeRequestStore for InMemoryStore {
    fn find_merge_request(
        &self,
        id: MergeRequestId,
    ) -> impl Future<Output = Result<Option<MergeRequest>, StoreError>> + Send {
        async move {
            let inner = self.inner.read().await;
            Ok(inner.merge_requests.get(&id).cloned())
        }
    }

    fn open_by_role(
        &self,
        project: ProjectId,
        branch: &str,
        role: BranchRole,
    ) -> impl Future<Output = Result<Vec<MergeRequest>, StoreError>> + Send {
        async move {
            let inner = self.inner.read().await;
            let matches = inner
                .merge_requests
                .values()
                .filter(|mr| {
                    mr.is_open()
                        && match role {
                            BranchRole::Source => {
                                mr.source_project == Some(project) && mr.source_branch == branch
                            }
                            BranchRole::Target => {
                                mr.target_project == project && mr.target_branch == branch
                            }
                        }
                })
                .cloned()
                .collect();
            Ok(matches)
        }
    }

    fn try_transition(
        &self,
        id: MergeRequestId,
        expected: MergeRequestState,
        target: MergeRequestState,
        user: UserId,
    ) -> impl Future<Output = Result<TransitionOutcome, StoreError>> + Send {
        async move {
            let mut inner = self.inner.write().await;
            let mr = inner
                .merge_requests
                .get_mut(&id)
                .ok_or(StoreError::MergeRequestNotFound(id))?;

            if mr.state != expected {
                return Ok(TransitionOutcome::Superseded { current: mr.state });
            }

            mr.state = expected.try_transition(target)?;
            if mr.state == MergeRequestState::Merged {
                mr.merge_user = Some(user);
            }
            Ok(TransitionOutcome::Applied)
        }
    }

    fn clear_auto_merge(
        &self,
        id: MergeRequestId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        async move {
            let mut inner = self.inner.write().await;
            let mr = inner
                .merge_requests
                .get_mut(&id)
                .ok_or(StoreError::MergeRequestNotFound(id))?;
            mr.merge_when_build_succeeds = false;
            Ok(())
        }
    }

    fn mark_unchecked(
        &self,
        id: MergeRequestId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        async move {
            let mut inner = self.inner.write().await;
            let mr = inner
                .merge_requests
                .get_mut(&id)
                .ok_or(StoreError::MergeRequestNotFound(id))?;
            mr.merge_status = MergeStatus::Unchecked;
            Ok(())
        }
    }
}

impl ActivityRecorder for InMemoryStore {
    fn append_system_note(
        &self,
        merge_request: MergeRequestId,
        author: UserId,
        body: &str,
    ) -> impl Future<Output = Result<Note, StoreError>> + Send {
        async move {
            let mut inner = self.inner.write().await;
            if !inner.merge_requests.contains_key(&merge_request) {
                return Err(StoreError::MergeRequestNotFound(merge_request));
            }

            inner.next_note_id += 1;
            let id = NoteId(inner.next_note_id);

            let timeline = inner.notes.entry(merge_request).or_default();

            // The wall clock may not advance between two appends; bump past
            // the previous note to keep timeline order strict.
            let mut created_at = Utc::now();
            if let Some(last) = timeline.last() {
                if created_at <= last.created_at {
                    created_at = last.created_at + Duration::milliseconds(1);
                }
            }

            let note = Note::system(id, merge_request, author, body, created_at);
            timeline.push(note.clone());
            Ok(note)
        }
    }

    fn notes(
        &self,
        merge_request: MergeRequestId,
    ) -> impl Future<Output = Result<Vec<Note>, StoreError>> + Send {
        async move {
            let inner = self.inner.read().await;
            Ok(inner.notes.get(&merge_request).cloned().unwrap_or_default())
        }
    }
}

impl TodoStore for InMemoryStore {
    fn pending_build_failure_todos(
        &self,
        merge_request: MergeRequestId,
    ) -> impl Future<Output = Result<Vec<Todo>, StoreError>> + Send {
        async move {
            let inner = self.inner.read().await;
            let pending = inner
                .todos
                .values()
                .filter(|todo| {
                    todo.merge_request == merge_request
                        && todo.kind == TodoKind::BuildFailed
                        && todo.is_pending()
                })
                .cloned()
                .collect();
            Ok(pending)
        }
    }

    fn resolve_todo(&self, id: TodoId) -> impl Future<Output = Result<(), StoreError>> + Send {
        async move {
            let mut inner = self.inner.write().await;
            let todo = inner
                .todos
                .get_mut(&id)
                .ok_or(StoreError::TodoNotFound(id))?;
            todo.state = TodoState::Done;
            Ok(())
        }
    }
}
