//! Projects: repositories that host branches and merge requests.

use serde::{Deserialize, Serialize};

use super::ids::ProjectId;

/// A project (origin repository or fork).
///
/// The refresh engine treats forks and origins identically; fork topology is
/// expressed entirely through merge requests' source/target project links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,

    /// Human-readable path, e.g. "group/app" or "contributor/app".
    pub path: String,
}

impl Project {
    pub fn new(id: ProjectId, path: impl Into<String>) -> Self {
        Project {
            id,
            path: path.into(),
        }
    }
}
