use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the version-control metadata entry (a directory, or a file for
/// linked worktrees and submodules).
pub const CONTROL_ENTRY: &str = ".git";

pub fn has_control_entry(dir: &Path) -> bool {
    fs::metadata(dir.join(CONTROL_ENTRY))
        .map(|m| m.is_dir() || m.is_file())
        .unwrap_or(false)
}

/// Lowercases and turns each whitespace run into a single hyphen, so
/// `"My Project"` and `my-project` compare equal.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('-');
            }
            in_whitespace = true;
        } else {
            out.extend(c.to_lowercase());
            in_whitespace = false;
        }
    }
    out
}

/// Locates the working tree for a project directory.
///
/// Returns the directory itself when it carries a `.git` entry, otherwise the
/// one child directory that does. With several candidates the child named
/// like the project wins; failing that the first by name. `Ok(None)` means
/// there is no history to show.
pub fn find_work_tree(dir: &Path, project_name: &str) -> io::Result<Option<PathBuf>> {
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "project directory does not exist");
        return Ok(None);
    }

    if has_control_entry(dir) {
        return Ok(Some(dir.to_path_buf()));
    }

    let mut candidates: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() && has_control_entry(&path) {
            candidates.push((entry.file_name().to_string_lossy().to_string(), path));
        }
    }
    // read_dir order is platform-dependent
    candidates.sort_by(|a, b| a.0.cmp(&b.0));

    match candidates.len() {
        0 => {
            tracing::debug!(dir = %dir.display(), "no .git in directory or its children");
            Ok(None)
        }
        1 => {
            let (_, path) = candidates.remove(0);
            tracing::debug!(work_tree = %path.display(), "using subdirectory as git root");
            Ok(Some(path))
        }
        n => {
            let wanted = normalize_name(project_name);
            let index = candidates
                .iter()
                .position(|(name, _)| normalize_name(name) == wanted)
                .unwrap_or(0);
            let (_, path) = candidates.swap_remove(index);
            tracing::debug!(
                candidates = n,
                work_tree = %path.display(),
                "multiple git roots, picked one"
            );
            Ok(Some(path))
        }
    }
}
