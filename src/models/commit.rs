use serde::{Deserialize, Serialize};

/// One entry of a project's recent history, parsed from `hash|subject|date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitCommit {
    pub hash: String,
    pub subject: String,
    pub date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitListResponse {
    pub commits: Vec<GitCommit>,
}
