//! Data transfer objects for the registry document and API responses.
//!
//! - `project`: Project, ProjectStatus, ProjectPatch, ProjectFilter
//! - `commit`: GitCommit, CommitListResponse
//! - `readme`: ReadmeResponse

pub mod commit;
pub mod project;
pub mod readme;

pub use commit::*;
pub use project::*;
pub use readme::*;
