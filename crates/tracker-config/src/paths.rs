//! XDG path layout (spec §6).
//!
//! `<data>` resolves via `directories::ProjectDirs::from("", "", "tracker")`,
//! matching the teacher's `csa-config::paths` pattern of one canonical
//! `ProjectDirs` handle per app name — unlike the teacher, this is a new
//! product with no prior `csa`-era install to migrate from, so there is no
//! legacy-path fallback here.

use std::path::PathBuf;

pub const APP_NAME: &str = "tracker";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// `<data>`: the XDG data directory for this app.
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".").join(format!(".{APP_NAME}")))
}

/// `<data>/plans.db`.
pub fn db_path() -> PathBuf {
    data_dir().join("plans.db")
}

/// `<data>/config.json`.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// `<data>/logs/`.
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// `<data>/plans/`: generated plan markdown for plans drafted through the
/// dashboard rather than handed to `tracker add` as an existing file.
pub fn plans_dir() -> PathBuf {
    data_dir().join("plans")
}

/// `<id>-<iso-utc-timestamp-with-separators-replaced-by-dash>.jsonl`
/// (spec §6's log-file naming rule).
pub fn log_file_name(plan_id: i64, timestamp: chrono::DateTime<chrono::Utc>) -> String {
    let stamp = timestamp
        .to_rfc3339()
        .replace([':', '.', '+'], "-");
    format!("{plan_id}-{stamp}.jsonl")
}

/// `<home>/.task-tracker/worktrees` (spec §4.3 default base — deliberately
/// not under `<data>`, matching spec.md's literal wording).
pub fn worktree_base() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".task-tracker").join("worktrees"))
        .unwrap_or_else(|| PathBuf::from(".task-tracker/worktrees"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_path_is_under_data_dir() {
        assert!(db_path().starts_with(data_dir()));
        assert_eq!(db_path().file_name().unwrap(), "plans.db");
    }

    #[test]
    fn logs_dir_is_under_data_dir() {
        assert!(logs_dir().starts_with(data_dir()));
    }

    #[test]
    fn plans_dir_is_under_data_dir() {
        assert!(plans_dir().starts_with(data_dir()));
    }

    #[test]
    fn worktree_base_ends_with_task_tracker_worktrees() {
        let base = worktree_base();
        assert!(base.ends_with(".task-tracker/worktrees"));
    }

    #[test]
    fn log_file_name_has_no_colons_or_dots() {
        let name = log_file_name(7, chrono::Utc::now());
        assert!(name.starts_with("7-"));
        assert!(name.ends_with(".jsonl"));
        let stem = name.trim_end_matches(".jsonl");
        assert!(!stem.contains(':'));
    }
}
