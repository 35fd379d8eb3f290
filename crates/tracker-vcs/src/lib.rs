//! Thin typed wrapper over git operations (spec §4.4).
//!
//! Every operation shells out via `std::process::Command`, scoped to a
//! `cwd`, and returns the raw `(ok, stdout, stderr)` triple for the caller
//! to apply policy to — no retries, no interpretation beyond porcelain
//! parsing. Grounded on the git-wrapper style of `csa-session::git` and
//! `csa-todo::git` (argument vectors built inline, `Command::output()`,
//! `status.success()` checked explicitly, stderr surfaced on failure).

use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;
use tracker_core::{Error, Result};

/// Raw result of a git invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub ok: bool,
    pub stdout: String,
    pub stderr: String,
}

fn run(cwd: &Path, args: &[&str]) -> Result<CommandOutput> {
    tracing::debug!(?args, cwd = %cwd.display(), "running git command");
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| Error::vcs(format!("failed to spawn git {args:?}: {e}")))?;
    Ok(CommandOutput {
        ok: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

pub fn checkout(cwd: &Path, branch: &str) -> Result<CommandOutput> {
    run(cwd, &["checkout", branch])
}

pub fn create_branch(cwd: &Path, branch: &str, from: &str) -> Result<CommandOutput> {
    run(cwd, &["branch", branch, from])
}

pub fn branch_exists(cwd: &Path, branch: &str) -> Result<bool> {
    let result = run(cwd, &["show-ref", "--verify", "--quiet", &format!("refs/heads/{branch}")])?;
    Ok(result.ok)
}

pub fn current_branch(cwd: &Path) -> Result<String> {
    let result = run(cwd, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    if !result.ok {
        return Err(Error::vcs(result.stderr));
    }
    Ok(result.stdout.trim().to_string())
}

pub fn status_porcelain(cwd: &Path) -> Result<CommandOutput> {
    run(cwd, &["status", "--porcelain"])
}

/// Diff a range with a generous buffer (spec §4.4: "`main...HEAD` with a
/// generous buffer").
pub fn diff_range(cwd: &Path, range: &str) -> Result<String> {
    let result = run(cwd, &["diff", range, "--unified=10"])?;
    if !result.ok {
        return Err(Error::vcs(result.stderr));
    }
    Ok(result.stdout)
}

pub fn merge(cwd: &Path, branch: &str) -> Result<CommandOutput> {
    run(cwd, &["merge", "--no-edit", branch])
}

pub fn fetch(cwd: &Path) -> Result<CommandOutput> {
    run(cwd, &["fetch"])
}

pub fn log_range(cwd: &Path, range: &str) -> Result<String> {
    let result = run(cwd, &["log", "--oneline", range])?;
    if !result.ok {
        return Err(Error::vcs(result.stderr));
    }
    Ok(result.stdout)
}

pub fn branch_delete(cwd: &Path, branch: &str, force: bool) -> Result<CommandOutput> {
    let flag = if force { "-D" } else { "-d" };
    run(cwd, &["branch", flag, branch])
}

/// One entry from `git worktree list --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeEntry {
    pub path: String,
    pub head: String,
    pub branch: Option<String>,
}

pub fn worktree_list(cwd: &Path) -> Result<Vec<WorktreeEntry>> {
    let result = run(cwd, &["worktree", "list", "--porcelain"])?;
    if !result.ok {
        return Err(Error::vcs(result.stderr));
    }
    Ok(parse_worktree_porcelain(&result.stdout))
}

pub fn worktree_add(cwd: &Path, path: &Path, branch: &str) -> Result<CommandOutput> {
    run(cwd, &["worktree", "add", &path.to_string_lossy(), branch])
}

pub fn worktree_remove(cwd: &Path, path: &Path, force: bool) -> Result<CommandOutput> {
    if force {
        run(cwd, &["worktree", "remove", "--force", &path.to_string_lossy()])
    } else {
        run(cwd, &["worktree", "remove", &path.to_string_lossy()])
    }
}

pub fn worktree_prune(cwd: &Path) -> Result<CommandOutput> {
    run(cwd, &["worktree", "prune"])
}

fn parse_worktree_porcelain(stdout: &str) -> Vec<WorktreeEntry> {
    let mut entries = Vec::new();
    let mut path: Option<String> = None;
    let mut head: Option<String> = None;
    let mut branch: Option<String> = None;

    for line in stdout.lines() {
        if let Some(value) = line.strip_prefix("worktree ") {
            if let Some(p) = path.take() {
                entries.push(WorktreeEntry {
                    path: p,
                    head: head.take().unwrap_or_default(),
                    branch: branch.take(),
                });
            }
            path = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix("HEAD ") {
            head = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix("branch ") {
            branch = Some(value.trim_start_matches("refs/heads/").to_string());
        } else if line.is_empty() {
            if let Some(p) = path.take() {
                entries.push(WorktreeEntry {
                    path: p,
                    head: head.take().unwrap_or_default(),
                    branch: branch.take(),
                });
            }
        }
    }
    if let Some(p) = path.take() {
        entries.push(WorktreeEntry {
            path: p,
            head: head.take().unwrap_or_default(),
            branch: branch.take(),
        });
    }
    entries
}

/// Derive a branch name `plan/<id>-<slug(title)>` (spec §6).
///
/// Lowercases, collapses non-alphanumerics to `-`, trims leading/trailing
/// `-`, truncates to 50 chars. An empty-slug title is allowed: the id
/// prefix alone still makes a valid branch name (spec §8 boundary case).
pub fn branch_name(id: i64, title: &str) -> String {
    format!("plan/{id}-{}", slugify(title, 50))
}

fn non_alphanumeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex is valid"))
}

pub fn slugify(title: &str, max_len: usize) -> String {
    let lower = title.to_lowercase();
    let collapsed = non_alphanumeric_re().replace_all(&lower, "-");
    let trimmed = collapsed.trim_matches('-');
    if trimmed.len() <= max_len {
        trimmed.to_string()
    } else {
        trimmed.chars().take(max_len).collect::<String>().trim_end_matches('-').to_string()
    }
}
