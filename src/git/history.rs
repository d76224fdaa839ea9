use std::path::Path;
use std::sync::Arc;

use crate::git::log::{LogSource, parse_log};
use crate::git::worktree::find_work_tree;
use crate::models::GitCommit;

/// Most commits returned for one project.
pub const MAX_COMMITS: usize = 10;

/// Resolves a project's recent commits. Stateless: every call locates the
/// working tree and runs the log source afresh.
#[derive(Clone)]
pub struct HistoryResolver {
    source: Arc<dyn LogSource>,
    limit: usize,
}

impl HistoryResolver {
    pub fn new(source: Arc<dyn LogSource>) -> Self {
        Self {
            source,
            limit: MAX_COMMITS,
        }
    }

    /// Recent commits for the project at `dir`, newest first. Any failure
    /// is logged and reported as an empty history.
    pub async fn recent_commits(&self, dir: &Path, project_name: &str) -> Vec<GitCommit> {
        match self.try_recent_commits(dir, project_name).await {
            Ok(commits) => commits,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "git history unavailable");
                Vec::new()
            }
        }
    }

    async fn try_recent_commits(
        &self,
        dir: &Path,
        project_name: &str,
    ) -> anyhow::Result<Vec<GitCommit>> {
        let owned_dir = dir.to_path_buf();
        let name = project_name.to_string();
        let work_tree =
            tokio::task::spawn_blocking(move || find_work_tree(&owned_dir, &name)).await??;

        let Some(work_tree) = work_tree else {
            return Ok(Vec::new());
        };

        let raw = self.source.recent(&work_tree, self.limit).await?;
        let mut commits = parse_log(&raw);
        commits.truncate(self.limit);

        tracing::debug!(
            work_tree = %work_tree.display(),
            count = commits.len(),
            "loaded git history"
        );
        Ok(commits)
    }
}
