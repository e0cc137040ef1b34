//! Todos: per-user pending notifications attached to a merge request.

use serde::{Deserialize, Serialize};

use super::ids::{MergeRequestId, TodoId, UserId};

/// The lifecycle state of a todo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoState {
    /// Waiting for the user (or this engine) to act on it.
    Pending,

    /// Resolved; kept for history.
    Done,
}

impl TodoState {
    pub fn is_pending(&self) -> bool {
        matches!(self, TodoState::Pending)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TodoState::Done)
    }
}

/// Why the todo was created.
///
/// The refresh engine only ever resolves `BuildFailed` todos; other kinds
/// pass through it untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoKind {
    /// The CI build for the merge request's source tip failed.
    BuildFailed,

    /// The user was mentioned in a discussion.
    Mentioned,
}

/// A pending notification for one user about one merge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub user: UserId,
    pub merge_request: MergeRequestId,
    pub kind: TodoKind,
    pub state: TodoState,
}

impl Todo {
    /// Creates a pending todo.
    pub fn pending(id: TodoId, user: UserId, merge_request: MergeRequestId, kind: TodoKind) -> Self {
        Todo {
            id,
            user,
            merge_request,
            kind,
            state: TodoState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_constructor_sets_state() {
        let todo = Todo::pending(TodoId(1), UserId(2), MergeRequestId(3), TodoKind::BuildFailed);
        assert!(todo.is_pending());
        assert_eq!(todo.kind, TodoKind::BuildFailed);
    }

    #[test]
    fn todo_state_predicates() {
        assert!(TodoState::Pending.is_pending());
        assert!(!TodoState::Pending.is_done());
        assert!(TodoState::Done.is_done());
    }
}
