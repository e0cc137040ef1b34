//! System note bodies.
//!
//! The exact wording is a compatibility surface: timeline consumers and
//! existing tests match on these strings, so they change only deliberately.

use crate::types::Sha;

/// Body of the note recording a detected merge.
pub fn merged() -> String {
    "Status changed to merged".to_string()
}

/// Body of the note recording a source branch restoration.
pub fn restored_source_branch(branch: &str) -> String {
    format!("Restored source branch `{branch}`")
}

/// Body of the note recording a source branch deletion.
pub fn deleted_source_branch(branch: &str) -> String {
    format!("Deleted source branch `{branch}`")
}

/// Body of the note enumerating newly pushed commits, newest first.
///
/// Callers skip the note entirely when the range is empty; this function
/// renders whatever it is given.
pub fn added_commits(commits: &[Sha]) -> String {
    let noun = if commits.len() == 1 { "commit" } else { "commits" };
    let bullets: Vec<String> = commits
        .iter()
        .map(|sha| format!("* {}", sha.short()))
        .collect();
    format!("Added {} {}:\n\n{}", commits.len(), noun, bullets.join("\n"))
}
