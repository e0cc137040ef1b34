//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different ID types (e.g., using a
//! TodoId where a MergeRequestId is expected) and make the code more
//! self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A project (repository) identifier.
///
/// Forks are projects in their own right; a merge request may reference one
/// project as source and another as target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub u64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProjectId {
    fn from(n: u64) -> Self {
        ProjectId(n)
    }
}

/// A user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(n: u64) -> Self {
        UserId(n)
    }
}

/// A merge request identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergeRequestId(pub u64);

impl fmt::Display for MergeRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "!{}", self.0)
    }
}

impl From<u64> for MergeRequestId {
    fn from(n: u64) -> Self {
        MergeRequestId(n)
    }
}

/// A system note identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub u64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NoteId {
    fn from(n: u64) -> Self {
        NoteId(n)
    }
}

/// A todo identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(pub u64);

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TodoId {
    fn from(n: u64) -> Self {
        TodoId(n)
    }
}

/// The all-zero revision sentinel denoting "no commit".
///
/// A ref update whose old revision is blank describes a branch creation; one
/// whose new revision is blank describes a branch deletion.
pub const BLANK_SHA: &str = "0000000000000000000000000000000000000000";

/// Error returned when a string is not a valid commit SHA.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid commit sha: {0:?}")]
pub struct InvalidSha(pub String);

/// A git commit SHA (40 lowercase hex characters).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sha(String);

impl Sha {
    /// Parses and validates a SHA (40 lowercase hex characters).
    ///
    /// The blank sentinel is a valid SHA for parsing purposes; callers use
    /// [`Sha::is_blank`] to distinguish it from real commits.
    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidSha> {
        let s = s.into();
        if s.len() == 40 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            Ok(Sha(s))
        } else {
            Err(InvalidSha(s))
        }
    }

    /// Returns the blank (all-zero) sentinel.
    pub fn blank() -> Self {
        Sha(BLANK_SHA.to_string())
    }

    /// Returns true if this is the blank sentinel.
    pub fn is_blank(&self) -> bool {
        self.0 == BLANK_SHA
    }

    /// Returns the SHA as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short (8-character) version of the SHA for display.
    pub fn short(&self) -> &str {
        // Parse guarantees ASCII, but stay panic-free on principle.
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
