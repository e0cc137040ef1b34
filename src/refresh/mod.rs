//! Merge request refresh: everything one push triggers.
//!
//! A push to any branch may affect the merge requests that reference that
//! branch as source or target. This module locates them, decides what the
//! push means for each one, and applies the outcome:
//!
//! - **Merge detection** (target role): the push may already contain the
//!   source branch's history, in which case the merge request is merged.
//! - **Source sync** (source role): stale auto-merge intents are cleared,
//!   timeline notes record what happened to the branch, build-failure todos
//!   resolve, and hook consumers are notified.
//!
//! # Architecture
//!
//! Planning follows the effects-as-data pattern:
//! - Pure planners ([`detector`], [`source_sync`]) compute per-merge-request
//!   plans without any I/O
//! - [`service::RefreshService`] executes plans against the stores and the
//!   hook notifier
//!
//! # Key invariants
//!
//! 1. **Compare-and-set transitions**: the merged transition only applies if
//!    the state still matches what the planner read. A plan that loses the
//!    race is dropped wholesale; no note, no hook.
//!
//! 2. **Failure isolation**: nothing that goes wrong for one merge request
//!    stops the siblings from processing.
//!
//! 3. **Note order**: a branch restoration note always precedes the commit
//!    note of the same push, and hooks fire after the notes they announce.

pub mod detector;
pub mod notes;
pub mod plan;
pub mod service;
pub mod source_sync;


pub use detector::{MergeCheck, SkipReason, check_merged};
pub use plan::{Effect, MergeRequestPlan, StateChange};
pub use service::{RefreshError, RefreshService, RefreshSummary, SkippedMergeRequest};
pub use source_sync::plan_source_push;
