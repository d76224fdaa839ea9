//! Maps declared project paths into the serving process's filesystem view.
//!
//! A catalog may be written on the host (`/Users/me/code/app`) while the
//! server runs in a container that sees the same tree at another prefix
//! (`/projects/app`). Configure both roots to translate between them.

use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    declared_root: Option<PathBuf>,
    reachable_root: Option<PathBuf>,
}

impl PathResolver {
    /// Translation is active only when both roots are set.
    pub fn new(declared_root: Option<PathBuf>, reachable_root: Option<PathBuf>) -> Self {
        let declared_root = declared_root.filter(|p| !p.as_os_str().is_empty());
        let reachable_root = reachable_root.filter(|p| !p.as_os_str().is_empty());
        if declared_root.is_some() != reachable_root.is_some() {
            tracing::warn!("only one of the project roots is configured; path translation disabled");
        }
        Self {
            declared_root,
            reachable_root,
        }
    }

    pub fn is_translating(&self) -> bool {
        self.declared_root.is_some() && self.reachable_root.is_some()
    }

    /// Resolves `declared` to an absolute, lexically normalized path that the
    /// current process can open.
    pub fn resolve(&self, declared: &str) -> PathBuf {
        let normalized = normalize(Path::new(declared));

        if let (Some(from), Some(to)) = (&self.declared_root, &self.reachable_root) {
            if let Ok(rest) = normalized.strip_prefix(normalize(from)) {
                let translated = absolute(&normalize(&to.join(rest)));
                tracing::debug!(
                    declared,
                    resolved = %translated.display(),
                    "translated project path"
                );
                return translated;
            }
        }

        absolute(&normalized)
    }
}

/// Lexical normalization: drops `.`, folds `..` into its parent, collapses
/// separators. Does not touch the filesystem or follow symlinks.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize(&cwd.join(path)),
        Err(e) => {
            tracing::warn!(error = %e, "cannot read working directory; keeping relative path");
            path.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(declared: &str, reachable: &str) -> PathResolver {
        PathResolver::new(Some(declared.into()), Some(reachable.into()))
    }

    #[test]
    fn normalize_folds_dots() {
        assert_eq!(normalize(Path::new("/a/./b//c/../d/")), Path::new("/a/b/d"));
        assert_eq!(normalize(Path::new("/../a")), Path::new("/a"));
        assert_eq!(normalize(Path::new("../a/../../b")), Path::new("../../b"));
    }

    #[test]
    fn translates_paths_under_declared_root() {
        let r = resolver("/Users/me/code", "/projects");
        assert!(r.is_translating());
        assert_eq!(r.resolve("/Users/me/code/app"), Path::new("/projects/app"));
        assert_eq!(r.resolve("/Users/me/code/./app/src/.."), Path::new("/projects/app"));
        assert_eq!(r.resolve("/Users/me/code"), Path::new("/projects"));
    }

    #[test]
    fn root_match_is_component_wise() {
        let r = resolver("/Users/me/code", "/projects");
        assert_eq!(r.resolve("/Users/me/codebase/app"), Path::new("/Users/me/codebase/app"));
    }

    #[test]
    fn unconfigured_resolver_only_normalizes() {
        let r = PathResolver::default();
        assert!(!r.is_translating());
        assert_eq!(r.resolve("/srv/app/../other"), Path::new("/srv/other"));
    }

    #[test]
    fn one_root_disables_translation() {
        let r = PathResolver::new(Some("/Users/me".into()), None);
        assert_eq!(r.resolve("/Users/me/app"), Path::new("/Users/me/app"));
    }

    #[test]
    fn relative_paths_become_absolute() {
        let r = PathResolver::default();
        let resolved = r.resolve("some/project");
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("some/project"));
    }
}
