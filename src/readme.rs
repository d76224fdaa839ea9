use std::fs;
use std::path::Path;

/// Checked in order; the first one present wins.
pub const README_NAMES: [&str; 5] = ["README.md", "Readme.md", "readme.md", "README.txt", "readme.txt"];

/// Returns the project's readme text, or an empty string when there is none
/// or it cannot be read.
pub fn read_readme(dir: &Path) -> String {
    for name in README_NAMES {
        let candidate = dir.join(name);
        if !candidate.is_file() {
            continue;
        }
        return match fs::read_to_string(&candidate) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %candidate.display(), error = %e, "failed to read readme");
                String::new()
            }
        };
    }
    String::new()
}
