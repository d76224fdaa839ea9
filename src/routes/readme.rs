//! - GET /api/projects/{id}/readme
//!   Returns `{ "content": "..." }`, empty when the project has no readme.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::error::{AppError, Result};
use crate::models::ReadmeResponse;
use crate::readme::read_readme;
use crate::routes::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/projects/{id}/readme", get(get_readme))
        .with_state(state)
}

async fn get_readme(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReadmeResponse>> {
    let store = state.store.clone();
    let lookup = id.clone();
    let project = tokio::task::spawn_blocking(move || store.get(&lookup))
        .await?
        .ok_or(AppError::NotFound(id))?;

    if project.path.trim().is_empty() {
        return Err(AppError::InvalidInput("Project has no path defined".to_string()));
    }

    let dir = state.paths.resolve(&project.path);
    let content = tokio::task::spawn_blocking(move || read_readme(&dir)).await?;
    Ok(Json(ReadmeResponse { content }))
}
