//! Registry CRUD.
//!
//! Mutations answer with the full collection after the change. Updating or
//! deleting an unknown id is not an error: the unchanged collection comes
//! back.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    routing::get,
};

use crate::error::{AppError, Result};
use crate::models::{Project, ProjectFilter, ProjectPatch};
use crate::routes::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .with_state(state)
}

fn payload(body: std::result::Result<Json<ProjectPatch>, JsonRejection>) -> Result<ProjectPatch> {
    body.map(|Json(patch)| patch)
        .map_err(|rejection| AppError::InvalidInput(rejection.body_text()))
}

async fn list_projects(
    State(state): State<AppState>,
    Query(filter): Query<ProjectFilter>,
) -> Result<Json<Vec<Project>>> {
    let store = state.store.clone();
    let projects = tokio::task::spawn_blocking(move || store.search(&filter)).await?;
    Ok(Json(projects))
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Project>> {
    let store = state.store.clone();
    let lookup = id.clone();
    let project = tokio::task::spawn_blocking(move || store.get(&lookup)).await?;
    project.map(Json).ok_or(AppError::NotFound(id))
}

async fn create_project(
    State(state): State<AppState>,
    body: std::result::Result<Json<ProjectPatch>, JsonRejection>,
) -> Result<Json<Vec<Project>>> {
    let patch = payload(body)?;
    let store = state.store.clone();
    let projects = tokio::task::spawn_blocking(move || store.create(patch)).await??;
    Ok(Json(projects))
}

async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<ProjectPatch>, JsonRejection>,
) -> Result<Json<Vec<Project>>> {
    let patch = payload(body)?;
    let store = state.store.clone();
    let projects = tokio::task::spawn_blocking(move || store.update(&id, patch)).await??;
    Ok(Json(projects))
}

async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Project>>> {
    let store = state.store.clone();
    let projects = tokio::task::spawn_blocking(move || store.delete(&id)).await??;
    Ok(Json(projects))
}
