//! Outbound hook notifications.
//!
//! Downstream systems (CI, chat, indexers) learn about merge request changes
//! through hooks. Delivery is fire-and-forget from the engine's point of
//! view: a failed notification is logged and never rolls back the state
//! changes that triggered it.

use std::fmt;
use std::future::Future;

use thiserror::Error;
use tracing::debug;

use crate::types::MergeRequest;

/// What happened to the merge request, as seen by hook consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookAction {
    /// The merge request's branches moved or its bookkeeping changed.
    Update,

    /// The merge request was detected as merged.
    Merge,
}

impl HookAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookAction::Update => "update",
            HookAction::Merge => "merge",
        }
    }
}

impl fmt::Display for HookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors from hook delivery.
#[derive(Debug, Error)]
pub enum HookError {
    /// The notification could not be delivered.
    #[error("hook delivery failed: {0}")]
    Delivery(String),
}

/// Delivers merge request hooks to interested consumers.
pub trait HookNotifier {
    fn notify(
        &self,
        merge_request: &MergeRequest,
        action: HookAction,
    ) -> impl Future<Output = Result<(), HookError>> + Send;
}

/// Notifier that records deliveries in the log and nothing else.
///
/// Stands in for a real dispatcher in the reference binary and in tests that
/// do not assert on hook traffic.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHooks;

impl HookNotifier for LoggingHooks {
    fn notify(
        &self,
        merge_request: &MergeRequest,
        action: HookAction,
    ) -> impl Future<Output = Result<(), HookError>> + Send {
        async move {
            debug!(
                merge_request = %merge_request.id,
                action = %action,
                "merge request hook"
            );
            Ok(())
        }
    }
}
