//! Log extraction backends and the parser for their output.
//!
//! Every backend emits one `hash|subject|date` line per commit, newest
//! first. The subject may itself contain `|`, so parsing takes the first
//! field as the hash, the last as the date and re-joins the rest.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use chrono::{FixedOffset, TimeZone};
use git2::{Repository, Sort};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::models::GitCommit;

pub const FIELD_DELIMITER: char = '|';
pub const LOG_FORMAT: &str = "%h|%s|%ci";

/// Captured stdout above this size is treated as a failure.
pub const MAX_OUTPUT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_STDERR_BYTES: u64 = 16 * 1024;

/// Produces raw history lines for a working tree.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn recent(&self, work_tree: &Path, limit: usize) -> anyhow::Result<String>;
}

/// Runs `git log` as a child process with a wall-clock timeout and a cap on
/// captured output.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
    timeout: Duration,
    max_output: usize,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl GitCli {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: PathBuf::from("git"),
            timeout,
            max_output: MAX_OUTPUT_BYTES,
        }
    }

    #[cfg(test)]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    #[cfg(test)]
    pub fn with_max_output(mut self, max_output: usize) -> Self {
        self.max_output = max_output;
        self
    }
}

#[async_trait]
impl LogSource for GitCli {
    async fn recent(&self, work_tree: &Path, limit: usize) -> anyhow::Result<String> {
        let mut child = Command::new(&self.program)
            .arg("log")
            .arg("-n")
            .arg(limit.to_string())
            .arg(format!("--format={LOG_FORMAT}"))
            .arg("--no-color")
            .current_dir(work_tree)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.program.display()))?;

        let stdout = child.stdout.take().context("git log stdout not captured")?;
        let stderr = child.stderr.take().context("git log stderr not captured")?;
        let cap = self.max_output;

        // Dropping the future on timeout drops `child`, which kills it.
        let run = async move {
            let mut out = Vec::new();
            let mut err = Vec::new();
            let mut stdout = stdout.take(cap as u64 + 1);
            let mut stderr = stderr.take(MAX_STDERR_BYTES);
            let (read_out, read_err) = tokio::join!(
                stdout.read_to_end(&mut out),
                stderr.read_to_end(&mut err),
            );
            read_out?;
            read_err?;
            if out.len() > cap {
                child.kill().await.ok();
                bail!("git log output exceeded {cap} bytes");
            }
            let status = child.wait().await?;
            Ok::<_, anyhow::Error>((status, out, err))
        };

        let (status, out, err) = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| anyhow!("git log timed out after {:?}", self.timeout))??;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&err);
            bail!("git log failed ({status}): {}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

/// Walks history in-process with libgit2.
#[derive(Debug, Clone, Copy, Default)]
pub struct Libgit2;

#[async_trait]
impl LogSource for Libgit2 {
    async fn recent(&self, work_tree: &Path, limit: usize) -> anyhow::Result<String> {
        let dir = work_tree.to_path_buf();
        tokio::task::spawn_blocking(move || render_log(&dir, limit)).await?
    }
}

fn render_log(dir: &Path, limit: usize) -> anyhow::Result<String> {
    let repo = Repository::open(dir)?;
    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TIME)?;
    revwalk.push_head()?;

    let mut lines = Vec::new();
    for oid in revwalk.take(limit) {
        let commit = repo.find_commit(oid?)?;
        let short = commit.as_object().short_id()?;
        lines.push(format!(
            "{}{FIELD_DELIMITER}{}{FIELD_DELIMITER}{}",
            short.as_str().unwrap_or_default(),
            commit.summary().unwrap_or(""),
            format_commit_time(commit.time()),
        ));
    }
    Ok(lines.join("\n"))
}

/// Same shape as git's `%ci`: `2024-05-01 12:30:00 +0200`.
fn format_commit_time(time: git2::Time) -> String {
    FixedOffset::east_opt(time.offset_minutes() * 60)
        .and_then(|tz| tz.timestamp_opt(time.seconds(), 0).single())
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S %z").to_string())
        .unwrap_or_default()
}

/// Parses log output into commits. Blank output is an empty history; lines
/// without all three fields are skipped.
pub fn parse_log(output: &str) -> Vec<GitCommit> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let commit = parse_line(line);
            if commit.is_none() {
                tracing::debug!(line, "skipping malformed log line");
            }
            commit
        })
        .collect()
}

pub fn parse_line(line: &str) -> Option<GitCommit> {
    let parts: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if parts.len() < 3 {
        return None;
    }

    let hash = parts[0].trim();
    if hash.is_empty() {
        return None;
    }
    let date = parts[parts.len() - 1].trim();
    let subject = parts[1..parts.len() - 1].join("|");

    Some(GitCommit {
        hash: hash.to_string(),
        subject: subject.trim().to_string(),
        date: date.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lines_in_order() {
        let out = "abc1234|Add store|2024-05-02 10:00:00 +0000\n\
                   def5678|Initial commit|2024-05-01 09:00:00 +0000\n";
        let commits = parse_log(out);

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash, "abc1234");
        assert_eq!(commits[0].subject, "Add store");
        assert_eq!(commits[0].date, "2024-05-02 10:00:00 +0000");
        assert_eq!(commits[1].hash, "def5678");
    }

    #[test]
    fn delimiter_inside_subject_survives() {
        let commit = parse_line("a1b2c3d|fix: a|b case|2024-01-01 00:00:00 +0100").unwrap();
        assert_eq!(commit.subject, "fix: a|b case");
        assert_eq!(commit.date, "2024-01-01 00:00:00 +0100");
    }

    #[test]
    fn empty_subject_is_allowed() {
        let commit = parse_line("a1b2c3d||2024-01-01 00:00:00 +0100").unwrap();
        assert_eq!(commit.subject, "");
    }

    #[test]
    fn blank_output_is_empty_history() {
        assert!(parse_log("").is_empty());
        assert!(parse_log("  \n\n").is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let commits = parse_log("garbage\nabc|ok|2024-01-01 00:00:00 +0000\n|x|y");
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].subject, "ok");
    }

    #[test]
    fn commit_time_matches_git_format() {
        let time = git2::Time::new(1_700_000_000, 120);
        assert_eq!(format_commit_time(time), "2023-11-15 00:13:20 +0200");
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = GitCli::default().with_program("/nonexistent/git-binary");
        assert!(cli.recent(tmp.path(), 10).await.is_err());
    }

    fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .is_ok_and(|out| out.status.success())
    }

    fn repo_with_commits(dir: &Path, messages: &[&str]) {
        let repo = Repository::init(dir).unwrap();
        let mut parent: Option<git2::Oid> = None;
        for (i, message) in messages.iter().enumerate() {
            let time = git2::Time::new(1_700_000_000 + i as i64 * 60, 0);
            let sig = git2::Signature::new("Tester", "tester@example.com", &time).unwrap();
            let tree_id = {
                let mut index = repo.index().unwrap();
                std::fs::write(dir.join("file.txt"), message).unwrap();
                index.add_path(Path::new("file.txt")).unwrap();
                index.write().unwrap();
                index.write_tree().unwrap()
            };
            let tree = repo.find_tree(tree_id).unwrap();
            let parents: Vec<git2::Commit> = parent
                .iter()
                .map(|id| repo.find_commit(*id).unwrap())
                .collect();
            let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
            let id = repo
                .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
                .unwrap();
            parent = Some(id);
        }
    }

    #[tokio::test]
    async fn git_binary_reads_real_history() {
        if !git_available() {
            eprintln!("git not installed, skipping");
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        repo_with_commits(tmp.path(), &["Initial commit", "fix: a|b case"]);

        let out = GitCli::default().recent(tmp.path(), 10).await.unwrap();
        let commits = parse_log(&out);

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].subject, "fix: a|b case");
        assert_eq!(commits[1].subject, "Initial commit");
        assert!(!commits[0].hash.is_empty());
        assert!(commits[0].date.starts_with("2023-11-14"), "{}", commits[0].date);
    }

    #[tokio::test]
    async fn oversized_output_is_an_error() {
        if !git_available() {
            eprintln!("git not installed, skipping");
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        repo_with_commits(tmp.path(), &["one", "two", "three"]);

        let cli = GitCli::default().with_max_output(16);
        let err = cli.recent(tmp.path(), 10).await.unwrap_err();
        assert!(err.to_string().contains("exceeded"), "{err}");
    }

    /// A `sh` run from a directory holding a `log` script: `sh log -n ...`
    /// runs that script instead of git.
    fn slow_work_tree() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        std::fs::write(tmp.path().join("log"), "sleep 5\n").unwrap();
        tmp
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_program_times_out() {
        let tmp = slow_work_tree();
        let cli = GitCli::new(Duration::from_millis(200)).with_program("sh");

        let started = std::time::Instant::now();
        let err = cli.recent(tmp.path(), 10).await.unwrap_err();

        assert!(err.to_string().contains("timed out"), "{err}");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timed_out_history_is_empty() {
        let tmp = slow_work_tree();
        let cli = GitCli::new(Duration::from_millis(200)).with_program("sh");
        let resolver = crate::git::HistoryResolver::new(std::sync::Arc::new(cli));

        assert!(resolver.recent_commits(tmp.path(), "slow").await.is_empty());
    }
}
