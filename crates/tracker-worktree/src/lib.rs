//! Per-plan isolated filesystem checkouts (spec §4.3).
//!
//! Grounded on the repo-as-single-git-checkout bootstrap pattern of
//! `csa-session::git::ensure_git_init` / `csa-todo::git::ensure_git_init`,
//! generalized from "init a fresh tracking repo" to "add a worktree of an
//! existing repo at a derived path". The gitignore matcher uses the `ignore`
//! crate's `GitignoreBuilder` (already a teacher dependency), which
//! implements the full glob dialect spec §4.3 requires rather than a
//! hand-rolled matcher.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ignore::gitignore::GitignoreBuilder;
use regex::Regex;
use tracker_core::{Error, Result};

pub const MAX_COPY_BYTES: u64 = 10 * 1024 * 1024;

/// Candidate dotfiles/env files worth copying into a fresh worktree even
/// when they're gitignored, so the agent has the same local environment it
/// would have in the main checkout (spec §4.3).
const RECOGNIZED_ENV_FILES: &[&str] = &[
    ".env",
    ".env.local",
    ".env.development",
    ".env.production",
    ".envrc",
    ".npmrc",
    ".tool-versions",
];

fn non_alphanumeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]+").expect("static regex is valid"))
}

/// Derive `<project-slug>` from the last two path components of a project's
/// absolute path, joined with `-`, non-alphanumerics collapsed to `-`
/// (spec §4.3).
pub fn project_slug(project_path: &Path) -> String {
    let components: Vec<&str> = project_path
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    let tail: Vec<&str> = components.iter().rev().take(2).rev().copied().collect();
    let joined = tail.join("-");
    non_alphanumeric_re()
        .replace_all(&joined, "-")
        .trim_matches('-')
        .to_string()
}

/// Default worktree base: `<home>/.task-tracker/worktrees`.
pub fn default_base() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".task-tracker").join("worktrees"))
        .unwrap_or_else(|| PathBuf::from(".task-tracker/worktrees"))
}

pub fn worktree_path(base: &Path, project_path: &Path, plan_id: i64) -> PathBuf {
    base.join(project_slug(project_path)).join(plan_id.to_string())
}

/// Whether the host git supports out-of-tree working copies. Degrades
/// gracefully (returns `false`) on any invocation failure.
pub fn supported() -> bool {
    let output = std::process::Command::new("git").arg("worktree").arg("--help").output();
    matches!(output, Ok(o) if o.status.success())
}

pub fn exists(base: &Path, project_path: &Path, plan_id: i64) -> bool {
    let path = worktree_path(base, project_path, plan_id);
    path.is_dir() && path.join(".git").exists()
}

/// Ensure `branch` exists off `main`, add a worktree at the derived path,
/// then copy gitignored environment files into it. Re-invoking on an
/// existing worktree is a no-op (spec §8 idempotence law).
pub fn create(
    base: &Path,
    project_path: &Path,
    branch: &str,
    plan_id: i64,
    copy_gitignored: bool,
) -> Result<PathBuf> {
    let path = worktree_path(base, project_path, plan_id);
    if exists(base, project_path, plan_id) {
        return Ok(path);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !tracker_vcs::branch_exists(project_path, branch)? {
        let created = tracker_vcs::create_branch(project_path, branch, "main")?;
        if !created.ok {
            return Err(Error::vcs(created.stderr));
        }
    }

    let added = tracker_vcs::worktree_add(project_path, &path, branch)?;
    if !added.ok {
        return Err(Error::vcs(added.stderr));
    }

    if copy_gitignored {
        copy_gitignored_files(project_path, &path)?;
    }

    Ok(path)
}

pub fn remove(base: &Path, project_path: &Path, plan_id: i64) -> Result<()> {
    let path = worktree_path(base, project_path, plan_id);
    if path.exists() {
        let result = tracker_vcs::worktree_remove(project_path, &path, true)?;
        if !result.ok {
            // Worktree metadata may already be stale; fall back to a raw
            // directory removal so callers can still make progress.
            std::fs::remove_dir_all(&path).ok();
        }
    }
    tracker_vcs::worktree_prune(project_path)?;
    Ok(())
}

/// A worktree directory under `base` with no corresponding plan record.
#[derive(Debug, Clone)]
pub struct Orphan {
    pub path: PathBuf,
    pub project_slug: String,
    pub plan_id: Option<i64>,
}

/// Enumerate worktrees under `base` whose `(project_slug, plan_id)` has no
/// match in `known_plan_ids` for that slug.
pub fn scan_orphans(
    base: &Path,
    known: &[(String, i64)],
) -> Result<Vec<Orphan>> {
    let mut orphans = Vec::new();
    if !base.is_dir() {
        return Ok(orphans);
    }

    for project_entry in std::fs::read_dir(base)? {
        let project_entry = project_entry?;
        if !project_entry.file_type()?.is_dir() {
            continue;
        }
        let slug = project_entry.file_name().to_string_lossy().to_string();

        for plan_entry in std::fs::read_dir(project_entry.path())? {
            let plan_entry = plan_entry?;
            if !plan_entry.file_type()?.is_dir() {
                continue;
            }
            let plan_id: Option<i64> = plan_entry.file_name().to_string_lossy().parse().ok();
            let is_known = match plan_id {
                Some(id) => known.iter().any(|(s, i)| *s == slug && *i == id),
                None => false,
            };
            if !is_known {
                orphans.push(Orphan {
                    path: plan_entry.path(),
                    project_slug: slug.clone(),
                    plan_id,
                });
            }
        }
    }

    Ok(orphans)
}

fn copy_gitignored_files(project_path: &Path, dest: &Path) -> Result<()> {
    let mut builder = GitignoreBuilder::new(project_path);
    builder.add(project_path.join(".gitignore"));
    let matcher = builder
        .build()
        .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;

    for candidate in RECOGNIZED_ENV_FILES {
        let source = project_path.join(candidate);
        if !source.is_file() {
            continue;
        }
        let destination = dest.join(candidate);
        if destination.exists() {
            continue;
        }
        if !matcher.matched(&source, false).is_ignore() {
            // Spec §4.3: "files failing the matcher are not copied" — a
            // recognized name that the repo's own `.gitignore` doesn't
            // actually catch is left for the normal checkout to carry.
            continue;
        }
        let Ok(metadata) = source.metadata() else {
            continue;
        };
        if metadata.len() > MAX_COPY_BYTES {
            tracing::warn!(file = candidate, "skipping oversized env file during worktree copy");
            continue;
        }
        std::fs::copy(&source, &destination)?;
    }

    Ok(())
}
