//! Git subprocess client.
//!
//! Thin async wrapper over the `git` binary: tree listing and blob reads on
//! the checkpoint branch, change detection against the index watermark, and
//! the history window for co-change mining. Non-zero exits surface stderr
//! in the error.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::debug;

use yepmem_core::analytics::CommitFiles;

use crate::error::{IngestError, Result};

/// Async git client rooted at a repository.
#[derive(Debug, Clone)]
pub struct GitClient {
    repo: PathBuf,
}

impl GitClient {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo)
            .output()
            .await?;

        if !output.status.success() {
            return Err(IngestError::Git {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Whether `branch` exists (locally or as a remote ref).
    pub async fn branch_exists(&self, branch: &str) -> bool {
        self.run(&["rev-parse", "--verify", "--quiet", branch])
            .await
            .is_ok()
    }

    /// HEAD commit sha.
    pub async fn rev_parse_head(&self) -> Result<String> {
        Ok(self.run(&["rev-parse", "HEAD"]).await?.trim().to_string())
    }

    /// All blob paths reachable from `branch`.
    pub async fn ls_tree(&self, branch: &str) -> Result<Vec<String>> {
        let out = self.run(&["ls-tree", "-r", "--name-only", branch]).await?;
        Ok(out.lines().map(|l| l.to_string()).collect())
    }

    /// Contents of `path` at `branch`.
    pub async fn show(&self, branch: &str, path: &str) -> Result<String> {
        self.run(&["show", &format!("{}:{}", branch, path)]).await
    }

    /// All tracked files on the current branch.
    pub async fn ls_files(&self) -> Result<Vec<String>> {
        let out = self.run(&["ls-files"]).await?;
        Ok(out.lines().map(|l| l.to_string()).collect())
    }

    /// Files changed between `from` and HEAD, plus uncommitted edits.
    pub async fn changed_files_since(&self, from: &str) -> Result<Vec<String>> {
        let range = format!("{}..HEAD", from);
        let out = self.run(&["diff", "--name-only", &range]).await?;
        let mut files: Vec<String> = out.lines().map(|l| l.to_string()).collect();

        // Uncommitted edits count as changed too
        let dirty = self.run(&["diff", "--name-only", "HEAD"]).await?;
        for file in dirty.lines() {
            if !files.iter().any(|f| f == file) {
                files.push(file.to_string());
            }
        }
        Ok(files)
    }

    /// Commit window for co-change mining: sha, author timestamp, and the
    /// files each commit touched.
    pub async fn log_since(&self, days: u32) -> Result<Vec<CommitFiles>> {
        let since = format!("--since={} days ago", days);
        let out = self
            .run(&["log", &since, "--name-only", "--pretty=format:%H%n%aI"])
            .await?;
        Ok(parse_log_output(&out))
    }
}

/// Parse `git log --name-only --pretty=format:%H%n%aI` output.
///
/// Each commit block is `sha\ntimestamp\nfile...` separated by blank
/// lines; commits with no file list (merges under some configs) are kept
/// with an empty file set.
fn parse_log_output(out: &str) -> Vec<CommitFiles> {
    let mut commits = Vec::new();
    let mut lines = out.lines().peekable();

    while let Some(line) = lines.next() {
        let sha = line.trim();
        if sha.is_empty() || !sha.chars().all(|c| c.is_ascii_hexdigit()) || sha.len() < 7 {
            continue;
        }
        let timestamp = lines.next().unwrap_or("").trim().to_string();

        let mut files = Vec::new();
        while let Some(next) = lines.peek() {
            let next = next.trim();
            if next.is_empty() {
                lines.next();
                break;
            }
            // A new commit block starts with a full sha; file paths with 40
            // hex characters and no slash do not occur in practice
            if next.len() == 40 && next.chars().all(|c| c.is_ascii_hexdigit()) {
                break;
            }
            files.push(next.to_string());
            lines.next();
        }

        commits.push(CommitFiles {
            sha: sha.to_string(),
            timestamp,
            files,
        });
    }

    commits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_blocks() {
        let out = "\
aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa
2026-07-01T10:00:00+02:00
src/a.ts
src/b.ts

bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb
2026-07-02T11:00:00+02:00
src/a.ts
";
        let commits = parse_log_output(out);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].sha, "a".repeat(40));
        assert_eq!(commits[0].timestamp, "2026-07-01T10:00:00+02:00");
        assert_eq!(commits[0].files, vec!["src/a.ts", "src/b.ts"]);
        assert_eq!(commits[1].files, vec!["src/a.ts"]);
    }

    #[test]
    fn tolerates_empty_output() {
        assert!(parse_log_output("").is_empty());
        assert!(parse_log_output("\n\n").is_empty());
    }

    #[test]
    fn commit_without_files_keeps_empty_set() {
        let out = "\
aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa
2026-07-01T10:00:00+02:00

bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb
2026-07-02T11:00:00+02:00
src/x.ts
";
        let commits = parse_log_output(out);
        assert_eq!(commits.len(), 2);
        assert!(commits[0].files.is_empty());
        assert_eq!(commits[1].files, vec!["src/x.ts"]);
    }
}
