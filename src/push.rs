//! Ref-update parsing.
//!
//! A push reaches the engine as `(old revision, new revision, ref name)`. Only
//! branch refs (`refs/heads/...`) are processed; tags, notes refs and anything
//! else are rejected up front, before any store access.
//!
//! The commit range is *not* computed here. Enumerating it needs the commit
//! graph (and, for re-created branches, a merge-base query), so the refresh
//! service derives it per merge request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Sha;

/// Prefix that marks a ref as a branch.
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Error returned for refs the engine does not process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a branch ref: {0:?}")]
pub struct InvalidRef(pub String);

/// A parsed branch push.
///
/// Exactly one of the revisions may be the blank sentinel: old for a branch
/// creation (or re-creation after deletion), new for a branch deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushDescriptor {
    pub old_rev: Sha,
    pub new_rev: Sha,

    /// Branch name with the `refs/heads/` prefix stripped.
    pub branch: String,
}

impl PushDescriptor {
    /// Parses a raw ref update into a branch push.
    ///
    /// Fails with [`InvalidRef`] if `ref_name` does not denote a branch.
    pub fn parse(old_rev: Sha, new_rev: Sha, ref_name: &str) -> Result<Self, InvalidRef> {
        let branch = ref_name
            .strip_prefix(BRANCH_REF_PREFIX)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| InvalidRef(ref_name.to_string()))?;

        Ok(PushDescriptor {
            old_rev,
            new_rev,
            branch: branch.to_string(),
        })
    }

    /// True if the old revision is the blank sentinel.
    ///
    /// Whether this is a plain creation or a *restore* depends on the stores:
    /// a merge request already referencing the branch as source means the
    /// branch existed before and was deleted.
    pub fn branch_created(&self) -> bool {
        self.old_rev.is_blank()
    }

    /// True if the new revision is the blank sentinel.
    pub fn branch_deleted(&self) -> bool {
        self.new_rev.is_blank()
    }
}
