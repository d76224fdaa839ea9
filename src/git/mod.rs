//! Git history lookup for registered projects.
//!
//! - `worktree`: find the real working tree below a project directory
//! - `log`: log extraction backends (`git` CLI, libgit2) and line parsing
//! - `history`: `HistoryResolver`, the never-failing entry point

pub mod history;
pub mod log;
pub mod worktree;

pub use history::HistoryResolver;
pub use log::{GitCli, Libgit2, LogSource};
