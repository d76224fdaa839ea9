use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{NaiveDate, Utc};
use fd_lock::RwLock;

use crate::error::{AppError, Result};
use crate::models::{Project, ProjectFilter, ProjectPatch};
use crate::store::document;

/// File-backed project registry.
///
/// Reads are lock-free and rely on atomic replacement of the document.
/// Every mutation is a full read-modify-write performed while holding both
/// an in-process mutex and an exclusive advisory lock on a sidecar file, so
/// concurrent requests and concurrent processes cannot lose updates.
pub struct ProjectStore {
    path: PathBuf,
    lock_path: PathBuf,
    /// Last issued id, guarded together with the write section.
    last_id: Mutex<u64>,
}

pub type SharedStore = Arc<ProjectStore>;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

impl ProjectStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let lock_path = document::lock_path(&path);
        Self {
            path,
            lock_path,
            last_id: Mutex::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the full collection. Never fails: a document that cannot be
    /// read or parsed is logged and treated as empty, and single records
    /// that do not decode are logged and left out.
    pub fn list(&self) -> Vec<Project> {
        if let Err(e) = document::ensure(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "could not materialize projects document");
        }
        match document::read_lenient(&self.path) {
            Ok(projects) => projects,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "serving empty project list");
                Vec::new()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Project> {
        self.list().into_iter().find(|p| p.id == id)
    }

    pub fn search(&self, filter: &ProjectFilter) -> Vec<Project> {
        let projects = self.list();
        if filter.is_empty() {
            return projects;
        }
        projects.into_iter().filter(|p| filter.matches(p)).collect()
    }

    /// Appends a new record with a store-assigned id.
    pub fn create(&self, patch: ProjectPatch) -> Result<Vec<Project>> {
        patch.validate_new()?;

        self.mutate(|projects, last_id| {
            let id = next_id(last_id, projects);
            let project = Project::create(id, today(), patch)?;
            tracing::info!(id = %project.id, name = %project.name, "project created");
            projects.push(project);
            Ok(true)
        })
    }

    /// Merges `patch` into the record with `id`. Unknown ids leave the
    /// collection untouched.
    pub fn update(&self, id: &str, patch: ProjectPatch) -> Result<Vec<Project>> {
        patch.validate_update()?;

        self.mutate(|projects, _| {
            let Some(project) = projects.iter_mut().find(|p| p.id == id) else {
                tracing::debug!(id, "update of unknown project ignored");
                return Ok(false);
            };
            project.apply(patch, today());
            tracing::info!(id, "project updated");
            Ok(true)
        })
    }

    pub fn delete(&self, id: &str) -> Result<Vec<Project>> {
        self.mutate(|projects, _| {
            let before = projects.len();
            projects.retain(|p| p.id != id);
            let removed = projects.len() != before;
            if removed {
                tracing::info!(id, "project deleted");
            } else {
                tracing::debug!(id, "delete of unknown project ignored");
            }
            Ok(removed)
        })
    }

    /// Runs one read-modify-write cycle under mutual exclusion. `f` returns
    /// whether the collection changed and needs to be written back.
    fn mutate<F>(&self, f: F) -> Result<Vec<Project>>
    where
        F: FnOnce(&mut Vec<Project>, &mut u64) -> Result<bool>,
    {
        let mut last_id = self
            .last_id
            .lock()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;

        if let Some(parent) = self.lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.lock_path)?;
        let mut lock = RwLock::new(lock_file);
        let _guard = lock
            .write()
            .map_err(|e| AppError::storage("failed to lock projects document", e))?;

        let mut projects = document::read(&self.path)?;
        if f(&mut projects, &mut *last_id)? {
            document::write(&self.path, &projects)?;
        }
        Ok(projects)
    }
}

/// Time-based id, bumped past the last issued one and past anything already
/// in the collection.
fn next_id(last_id: &mut u64, projects: &[Project]) -> String {
    let mut candidate = now_ms().max(*last_id + 1);
    while projects.iter().any(|p| p.id == candidate.to_string()) {
        candidate += 1;
    }
    *last_id = candidate;
    candidate.to_string()
}
