use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};

/// Lifecycle state of a project.
///
/// Other tools sharing the document may write values outside the known
/// set; those are kept verbatim in `Other` so they survive a rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectStatus {
    #[default]
    InProgress,
    Completed,
    Archived,
    Other(String),
}

impl ProjectStatus {
    /// Lenient parse used by query filters.
    pub fn parse(value: &str) -> Self {
        Self::from(value.trim().to_lowercase())
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ProjectStatus::Other(_))
    }
}

impl From<String> for ProjectStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "in-progress" | "in progress" => ProjectStatus::InProgress,
            "completed" => ProjectStatus::Completed,
            "archived" => ProjectStatus::Archived,
            _ => ProjectStatus::Other(value),
        }
    }
}

impl From<ProjectStatus> for String {
    fn from(status: ProjectStatus) -> Self {
        match status {
            ProjectStatus::InProgress => "in-progress".to_string(),
            ProjectStatus::Completed => "completed".to_string(),
            ProjectStatus::Archived => "archived".to_string(),
            ProjectStatus::Other(value) => value,
        }
    }
}

/// A registry record, persisted as one element of the projects document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    pub date_created: NaiveDate,
    pub last_updated: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_server_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme_preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_count: Option<u32>,
    /// Keys written by other tools that this model does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial project payload used by both create and update.
///
/// Every key is optional. For optional record fields an explicit `null`
/// clears the stored value, while an absent key leaves it alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    // Identity fields: accepted so they never leak into `extra`, but only
    // create honours the dates and nothing honours `id`.
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub date_created: Option<NaiveDate>,
    #[serde(default)]
    pub last_updated: Option<NaiveDate>,

    pub name: Option<String>,
    pub path: Option<String>,
    pub tech_stack: Option<Vec<String>>,
    pub status: Option<ProjectStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub github_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub project_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub pinned: Option<Option<bool>>,
    #[serde(default, deserialize_with = "nullable")]
    pub tags: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub goals: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub dev_server_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_command: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub readme_preview: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub doc_count: Option<Option<u32>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Distinguishes `"key": null` (`Some(None)`) from a missing key (`None`).
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn non_empty(field: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(v) if v.trim().is_empty() => {
            Err(AppError::InvalidInput(format!("{field} must not be empty")))
        }
        _ => Ok(()),
    }
}

impl ProjectPatch {
    /// Checks a payload meant for creating a new record.
    pub fn validate_new(&self) -> Result<()> {
        if self.name.is_none() {
            return Err(AppError::InvalidInput("name is required".to_string()));
        }
        if self.path.is_none() {
            return Err(AppError::InvalidInput("path is required".to_string()));
        }
        self.validate_update()
    }

    /// Checks a payload meant for merging over an existing record.
    pub fn validate_update(&self) -> Result<()> {
        non_empty("name", self.name.as_deref())?;
        non_empty("path", self.path.as_deref())?;
        match &self.status {
            Some(status) if !status.is_known() => Err(AppError::InvalidInput(format!(
                "status must be one of in-progress, completed, archived (got {:?})",
                String::from(status.clone())
            ))),
            _ => Ok(()),
        }
    }
}

impl Project {
    /// Builds a fresh record from a validated payload.
    ///
    /// `id` is always the one supplied by the store. Dates missing from the
    /// payload default to `today`.
    pub fn create(id: String, today: NaiveDate, patch: ProjectPatch) -> Result<Self> {
        patch.validate_new()?;

        let mut project = Project {
            id,
            name: String::new(),
            path: String::new(),
            tech_stack: Vec::new(),
            status: ProjectStatus::default(),
            date_created: patch.date_created.unwrap_or(today),
            last_updated: patch.last_updated.unwrap_or(today),
            url: None,
            github_url: None,
            project_type: None,
            pinned: None,
            tags: None,
            notes: None,
            goals: None,
            dev_server_url: None,
            start_command: None,
            readme_preview: None,
            doc_count: None,
            extra: Map::new(),
        };
        project.merge(patch);
        Ok(project)
    }

    /// Merges `patch` over this record and stamps `last_updated`.
    ///
    /// `id` and `date_created` are never touched.
    pub fn apply(&mut self, patch: ProjectPatch, today: NaiveDate) {
        self.merge(patch);
        self.last_updated = today;
    }

    fn merge(&mut self, patch: ProjectPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(path) = patch.path {
            self.path = path;
        }
        if let Some(tech_stack) = patch.tech_stack {
            self.tech_stack = tech_stack;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        replace(&mut self.url, patch.url);
        replace(&mut self.github_url, patch.github_url);
        replace(&mut self.project_type, patch.project_type);
        replace(&mut self.pinned, patch.pinned);
        replace(&mut self.tags, patch.tags);
        replace(&mut self.notes, patch.notes);
        replace(&mut self.goals, patch.goals);
        replace(&mut self.dev_server_url, patch.dev_server_url);
        replace(&mut self.start_command, patch.start_command);
        replace(&mut self.readme_preview, patch.readme_preview);
        replace(&mut self.doc_count, patch.doc_count);
        self.extra.extend(patch.extra);
    }
}

fn replace<T>(slot: &mut Option<T>, value: Option<Option<T>>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Server-side search over the registry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectFilter {
    /// Substring of name or path.
    pub q: Option<String>,
    pub status: Option<String>,
    /// Exact entry of the tech stack.
    pub tech: Option<String>,
}

impl ProjectFilter {
    pub fn is_empty(&self) -> bool {
        [&self.q, &self.status, &self.tech]
            .iter()
            .all(|v| v.as_deref().is_none_or(|s| s.trim().is_empty()))
    }

    pub fn matches(&self, project: &Project) -> bool {
        if let Some(q) = self.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let q = q.to_lowercase();
            if !project.name.to_lowercase().contains(&q) && !project.path.to_lowercase().contains(&q) {
                return false;
            }
        }

        if let Some(status) = self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if ProjectStatus::parse(status) != project.status {
                return false;
            }
        }

        if let Some(tech) = self.tech.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let tech = tech.to_lowercase();
            if !project.tech_stack.iter().any(|t| t.to_lowercase() == tech) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn patch(json: &str) -> ProjectPatch {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn legacy_status_spelling_is_accepted() {
        let status: ProjectStatus = serde_json::from_str("\"in progress\"").unwrap();
        assert_eq!(status, ProjectStatus::InProgress);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"in-progress\"");
    }

    #[test]
    fn unknown_status_is_kept_verbatim() {
        let status: ProjectStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(status, ProjectStatus::Other("paused".into()));
        assert!(!status.is_known());
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"paused\"");
    }

    #[test]
    fn payload_with_unknown_status_is_rejected() {
        let err = patch(r#"{"status": "paused"}"#).validate_update().unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(patch(r#"{"status": "archived"}"#).validate_update().is_ok());
    }

    #[test]
    fn create_requires_name_and_path() {
        let today = date("2024-05-01");
        let err = Project::create("1".into(), today, patch(r#"{"path": "/x"}"#)).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = Project::create("1".into(), today, patch(r#"{"name": " ", "path": "/x"}"#))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn create_ignores_payload_id_and_fills_dates() {
        let today = date("2024-05-01");
        let project = Project::create(
            "42".into(),
            today,
            patch(r#"{"id": "evil", "name": "Hub", "path": "/src/hub", "techStack": ["rust"]}"#),
        )
        .unwrap();

        assert_eq!(project.id, "42");
        assert_eq!(project.date_created, today);
        assert_eq!(project.last_updated, today);
        assert_eq!(project.status, ProjectStatus::InProgress);
        assert!(project.extra.is_empty());
    }

    #[test]
    fn apply_merges_and_keeps_identity() {
        let mut project = Project::create(
            "7".into(),
            date("2023-01-01"),
            patch(r#"{"name": "Hub", "path": "/a", "notes": "keep", "url": "http://x"}"#),
        )
        .unwrap();

        project.apply(
            patch(r#"{"id": "8", "dateCreated": "2020-02-02", "status": "archived", "url": null}"#),
            date("2024-06-01"),
        );

        assert_eq!(project.id, "7");
        assert_eq!(project.date_created, date("2023-01-01"));
        assert_eq!(project.last_updated, date("2024-06-01"));
        assert_eq!(project.status, ProjectStatus::Archived);
        assert_eq!(project.notes.as_deref(), Some("keep"));
        assert_eq!(project.name, "Hub");
        assert_eq!(project.url, None);
    }

    #[test]
    fn unknown_keys_round_trip() {
        let raw = r#"{"id":"1","name":"n","path":"/p","techStack":[],"status":"completed",
            "dateCreated":"2024-01-01","lastUpdated":"2024-01-02","color":"teal"}"#;
        let project: Project = serde_json::from_str(raw).unwrap();
        assert_eq!(project.extra.get("color"), Some(&Value::from("teal")));

        let back = serde_json::to_value(&project).unwrap();
        assert_eq!(back["color"], "teal");
        assert_eq!(back["techStack"], serde_json::json!([]));
    }

    #[test]
    fn filter_matches_query_status_and_tech() {
        let project = Project::create(
            "1".into(),
            date("2024-01-01"),
            patch(r#"{"name": "Project Hub", "path": "/code/hub", "techStack": ["Rust", "Axum"]}"#),
        )
        .unwrap();

        let filter = |q: Option<&str>, status: Option<&str>, tech: Option<&str>| ProjectFilter {
            q: q.map(String::from),
            status: status.map(String::from),
            tech: tech.map(String::from),
        };

        assert!(filter(None, None, None).is_empty());
        assert!(filter(Some("HUB"), None, None).matches(&project));
        assert!(filter(Some("code/"), None, None).matches(&project));
        assert!(!filter(Some("other"), None, None).matches(&project));
        assert!(filter(None, Some("in progress"), Some("rust")).matches(&project));
        assert!(!filter(None, Some("archived"), None).matches(&project));
        assert!(!filter(None, None, Some("go")).matches(&project));
    }
}
