//! API route handlers - map HTTP endpoints to the registry and history lookup.
//!
//! Each submodule defines routes for a feature area:
//! - `projects`: CRUD over the registry (GET/POST /api/projects, GET/PUT/DELETE /api/projects/{id})
//! - `commits`: Recent git history (GET /api/projects/{id}/git-log)
//! - `readme`: Readme text (GET /api/projects/{id}/readme)

pub mod commits;
pub mod projects;
pub mod readme;

use std::sync::Arc;

use axum::Router;

use crate::git::HistoryResolver;
use crate::paths::PathResolver;
use crate::store::SharedStore;

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub paths: Arc<PathResolver>,
    pub history: HistoryResolver,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(projects::routes(state.clone()))
        .merge(commits::routes(state.clone()))
        .merge(readme::routes(state))
}
