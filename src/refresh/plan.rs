//! Per-merge-request plans.
//!
//! Planners are pure functions following the effects-as-data pattern: they
//! look at a merge request plus the push being processed and return the state
//! changes and effects to apply, without performing any I/O. The service
//! executes plans against the stores and the hook notifier.
//!
//! # Execution contract
//!
//! State changes run first, in order, then effects, in order. If the plan's
//! [`StateChange::Transition`] loses its compare-and-set race, the rest of
//! the plan is dropped wholesale: no further changes, no notes, no hooks for
//! that merge request.

use crate::hooks::HookAction;
use crate::types::{MergeRequestId, MergeRequestState, TodoId};

/// A guarded or unguarded entity write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    /// Compare-and-set state transition; `expected` is the pre-image the
    /// planner read.
    Transition {
        expected: MergeRequestState,
        target: MergeRequestState,
    },

    /// Drop a pending merge-when-build-succeeds intent.
    ClearAutoMerge,

    /// Reset the cached mergeability verdict to unchecked.
    MarkUnchecked,

    /// Mark one todo done.
    ResolveTodo { todo: TodoId },
}

/// An observable side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a system note to the merge request's timeline.
    AppendNote { body: String },

    /// Notify hook consumers.
    FireHook { action: HookAction },
}

/// Everything the engine decided to do to one merge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequestPlan {
    pub merge_request: MergeRequestId,

    /// Entity writes, applied in order before any effect.
    pub state_changes: Vec<StateChange>,

    /// Side effects, applied in order after all state changes.
    pub effects: Vec<Effect>,
}

impl MergeRequestPlan {
    /// Creates a plan that does nothing.
    pub fn empty(merge_request: MergeRequestId) -> Self {
        MergeRequestPlan {
            merge_request,
            state_changes: Vec::new(),
            effects: Vec::new(),
        }
    }

    /// Returns true if executing this plan would do nothing.
    pub fn is_empty(&self) -> bool {
        self.state_changes.is_empty() && self.effects.is_empty()
    }
}
