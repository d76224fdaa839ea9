//! Recent history of a registered project.
//!
//! - GET /api/projects/{id}/git-log
//!   Always answers 200 with `{ "commits": [...] }`; an unknown project, a
//!   missing directory or a failing `git` all produce an empty list.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::models::CommitListResponse;
use crate::routes::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/projects/{id}/git-log", get(get_git_log))
        .with_state(state)
}

async fn get_git_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<CommitListResponse> {
    let store = state.store.clone();
    let lookup = id.clone();
    let project = match tokio::task::spawn_blocking(move || store.get(&lookup)).await {
        Ok(project) => project,
        Err(e) => {
            tracing::warn!(id = %id, error = %e, "project lookup failed");
            None
        }
    };

    let Some(project) = project.filter(|p| !p.path.trim().is_empty()) else {
        tracing::debug!(id = %id, "no project or path for git log");
        return Json(CommitListResponse::default());
    };

    let dir = state.paths.resolve(&project.path);
    let commits = state.history.recent_commits(&dir, &project.name).await;
    Json(CommitListResponse { commits })
}
